// PMW3360 Mouse Sensor Driver
//
// Bring-up follows the PMW3360 datasheet power-up sequence: reset, prime the motion registers,
// upload the SROM, verify identity and SROM checksum, then configure.

pub mod diagnostics;
pub mod motion;
pub mod registers;
pub mod transport;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

pub use self::diagnostics::{
    CaptureError, CsvSampleWriter, DUMP_SAMPLE_COUNT, FRAME_CAPTURE_LEN, SampleSink, SensorStatus,
};
pub use self::motion::{IrqCounters, MOTION_REPORT_LEN, MotionAccumulator, MotionReport, PowerState, delta_from_raw};
use self::registers::*;
use self::transport::RegisterTransport;
use crate::config::SensorConfig;
use crate::driver::irq::{IrqMask, MotionInterrupt};
use crate::input_device::MotionSensor;

// Timing constants
const RESET_DELAY_MS: u32 = 50;
const SROM_ENABLE_DELAY_MS: u32 = 10;
const SROM_START_DELAY_US: u32 = 120;
const SROM_LOAD_DELAY_US: u32 = 200;
const SROM_CRC_DELAY_MS: u32 = 10;

// Resolution constants
const RES_STEP: u16 = 100;
const RES_MIN: u16 = 100;
const RES_MAX: u16 = 12000;

/// Highest sensitivity code, 12000 CPI
pub const SENSITIVITY_MAX: u8 = 0x77;

/// CPI of a sensitivity code: 0x00 is 100 CPI, every step adds 100
pub const fn sense_to_cpi(sense: u8) -> u16 {
    RES_STEP * (sense as u16 + 1)
}

/// Sensitivity code of a CPI value, clamped to the valid code range
pub const fn cpi_to_sense(cpi: u16) -> u8 {
    let steps = cpi / RES_STEP;
    let sense = if steps == 0 { 0 } else { steps - 1 };
    if sense > SENSITIVITY_MAX as u16 {
        SENSITIVITY_MAX
    } else {
        sense as u8
    }
}

/// SROM firmware blob, together with the id and checksum that ship with it
#[derive(Clone, Copy, Debug)]
pub struct Srom<'a> {
    pub data: &'a [u8],
    /// Value of SROM_ID after a successful upload
    pub id: u8,
    /// Value read back through the SROM CRC test
    pub checksum: u16,
}

/// Bring-up stage of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    Reset,
    RegistersPrimed,
    SromLoading,
    SromVerified,
    Configured,
    Running,
}

/// Initialization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Product id is not the complement of the inverse product id
    InvalidProductId { product_id: u8, inverse_product_id: u8 },
    /// SROM_ID after upload does not match the firmware
    SromIdMismatch { expected: u8, actual: u8 },
    /// SROM CRC test does not match the firmware
    SromChecksumMismatch { expected: u16, actual: u16 },
    /// No sensor is installed in the [`SharedSensor`](crate::SharedSensor)
    NotInstalled,
}

/// CPI outside of 100..=12000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidCpi(pub u16);

/// Identification values read during the last bring-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorIds {
    pub product_id: u8,
    pub inverse_product_id: u8,
    pub revision_id: u8,
    pub srom_id: u8,
    pub srom_checksum: u16,
}

/// Sensor protocol engine: the register-level state machine on top of the transport
pub(crate) struct ProtocolEngine<'a, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    transport: RegisterTransport<SPI, CS, D>,
    srom: Srom<'a>,
    config: SensorConfig,
    stage: Stage,
    ids: SensorIds,
}

impl<'a, SPI, CS, D> ProtocolEngine<'a, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    fn bring_up(&mut self) -> Result<(), InitError> {
        self.stage = Stage::Reset;
        self.power_up();
        self.stage = Stage::RegistersPrimed;

        self.stage = Stage::SromLoading;
        let srom_id = self.upload_srom();

        self.verify(srom_id)?;
        self.stage = Stage::SromVerified;
        info!("PMW3360: SROM verified, id 0x{:02x}, checksum 0x{:04x}", srom_id, self.ids.srom_checksum);

        self.configure();
        self.stage = Stage::Configured;
        Ok(())
    }

    fn power_up(&mut self) {
        self.transport.write_register(Register::PowerUpReset, POWER_UP_RESET_VAL);
        self.transport.delay_ms(RESET_DELAY_MS);

        // Read motion registers once to clear them
        for register in [
            Register::Motion,
            Register::DeltaXL,
            Register::DeltaXH,
            Register::DeltaYL,
            Register::DeltaYH,
        ] {
            self.transport.read_register(register);
        }
    }

    fn upload_srom(&mut self) -> u8 {
        // Disable REST mode
        self.transport.write_register(Register::Config2, 0x00);

        self.transport.write_register(Register::SromEnable, SROM_ENABLE_INIT);
        self.transport.delay_ms(SROM_ENABLE_DELAY_MS);
        self.transport.write_register(Register::SromEnable, SROM_ENABLE_START);
        self.transport.delay_us(SROM_START_DELAY_US);

        info!("PMW3360: Uploading {} bytes of SROM", self.srom.data.len());
        self.transport.write_burst(Register::SromLoadBurst, self.srom.data);
        self.transport.delay_us(SROM_LOAD_DELAY_US);

        // SROM_ID has to be the first register read after the upload
        self.transport.read_register(Register::SromId)
    }

    fn srom_checksum(&mut self) -> u16 {
        self.transport.write_register(Register::SromEnable, SROM_ENABLE_CRC);
        self.transport.delay_ms(SROM_CRC_DELAY_MS);

        let lower = self.transport.read_register(Register::DataOutLower);
        let upper = self.transport.read_register(Register::DataOutUpper);
        u16::from_le_bytes([lower, upper])
    }

    fn verify(&mut self, srom_id: u8) -> Result<(), InitError> {
        let product_id = self.transport.read_register(Register::ProductId);
        let inverse_product_id = self.transport.read_register(Register::InverseProductId);
        let revision_id = self.transport.read_register(Register::RevisionId);
        let srom_checksum = self.srom_checksum();

        self.ids = SensorIds {
            product_id,
            inverse_product_id,
            revision_id,
            srom_id,
            srom_checksum,
        };
        debug!("PMW3360: ids {:?}", self.ids);

        if product_id != !inverse_product_id {
            error!(
                "PMW3360: SPI communication error, product id 0x{:02x} != ~0x{:02x}",
                product_id, inverse_product_id
            );
            return Err(InitError::InvalidProductId {
                product_id,
                inverse_product_id,
            });
        }
        if product_id != PRODUCT_ID_PMW3360 {
            warn!("PMW3360: Unexpected product id 0x{:02x}", product_id);
        }

        if srom_id != self.srom.id {
            error!(
                "PMW3360: SROM upload failed, expected SROM-Id 0x{:02x}, got 0x{:02x}",
                self.srom.id, srom_id
            );
            return Err(InitError::SromIdMismatch {
                expected: self.srom.id,
                actual: srom_id,
            });
        }

        if srom_checksum != self.srom.checksum {
            error!(
                "PMW3360: SROM checksum mismatch, expected 0x{:04x}, got 0x{:04x}",
                self.srom.checksum, srom_checksum
            );
            return Err(InitError::SromChecksumMismatch {
                expected: self.srom.checksum,
                actual: srom_checksum,
            });
        }

        Ok(())
    }

    fn configure(&mut self) {
        // 0x00 for a wired design (always run), 0x20 for wireless (rest modes).
        // Rpt_Mod selects separate X and Y resolution registers.
        let mut config2 = CONFIG2_RPT_MOD;
        if self.config.wireless {
            config2 |= CONFIG2_REST_EN;
        }
        self.transport.write_register(Register::Config2, config2);

        self.set_sensitivity(self.config.sensitivity);
        self.set_angle(self.config.angle);
        self.transport
            .write_register(Register::LiftConfig, self.config.lift_cutoff.value());
    }

    fn set_sensitivity(&mut self, sense: u8) {
        let sense = if sense > SENSITIVITY_MAX {
            warn!("PMW3360: Sensitivity 0x{:02x} clamped to 0x{:02x}", sense, SENSITIVITY_MAX);
            SENSITIVITY_MAX
        } else {
            sense
        };

        self.config.sensitivity = sense;
        self.transport.write_register(Register::Config1, sense);
        self.transport.write_register(Register::Config5, sense);
        debug!("PMW3360: Sensitivity set to 0x{:02x} ({} CPI)", sense, sense_to_cpi(sense));
    }

    fn sensitivity(&mut self) -> u8 {
        let x = self.transport.read_register(Register::Config1);
        let y = self.transport.read_register(Register::Config5);
        if x != y {
            warn!("PMW3360: Sensitivity mismatch x=0x{:02x} y=0x{:02x}, rewriting y", x, y);
            self.transport.write_register(Register::Config5, x);
        }
        x
    }

    fn set_angle(&mut self, angle: i8) {
        self.config.angle = angle;
        self.transport.write_register(Register::AngleTune, angle as u8);
        debug!("PMW3360: Angle tune set to {}", angle);
    }

    fn angle(&mut self) -> i8 {
        self.transport.read_register(Register::AngleTune) as i8
    }

    fn check_identity(&mut self) -> bool {
        let product_id = self.transport.read_register(Register::ProductId);
        let inverse_product_id = self.transport.read_register(Register::InverseProductId);
        product_id == !inverse_product_id
    }

    fn read_motion_report(&mut self) -> MotionReport {
        self.transport.write_register(Register::MotionBurst, MOTION_BURST_START);

        let mut burst = [0u8; MOTION_REPORT_LEN];
        self.transport.read_burst(Register::MotionBurst, &mut burst);
        MotionReport::from_burst(&burst)
    }
}

/// PMW3360 driver using embedded-hal blocking SPI traits
///
/// Owns the protocol engine, the motion interrupt line and the state the interrupt handler
/// updates. The board calls [`handle_interrupt`](Self::handle_interrupt) from its GPIO interrupt,
/// usually through a [`SharedSensor`].
pub struct Pmw3360<'a, SPI, CS, D, IRQ>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
    IRQ: MotionInterrupt,
{
    engine: ProtocolEngine<'a, SPI, CS, D>,
    irq: IRQ,
    accumulator: MotionAccumulator,
    counters: IrqCounters,
}

impl<'a, SPI, CS, D, IRQ> Pmw3360<'a, SPI, CS, D, IRQ>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
    IRQ: MotionInterrupt,
{
    /// Create a new PMW3360 driver instance. Nothing is sent to the sensor until
    /// [`initialize`](Self::initialize).
    pub fn new(spi: SPI, cs: CS, delay: D, mut irq: IRQ, srom: Srom<'a>, config: SensorConfig) -> Self {
        irq.disable();
        Self {
            engine: ProtocolEngine {
                transport: RegisterTransport::new(spi, cs, delay),
                srom,
                config,
                stage: Stage::Reset,
                ids: SensorIds::default(),
            },
            irq,
            accumulator: MotionAccumulator::new(),
            counters: IrqCounters::default(),
        }
    }

    /// Run the full bring-up. Can be called again at any time with the same semantics.
    ///
    /// The motion interrupt stays masked if bring-up fails.
    pub fn initialize(&mut self) -> Result<(), InitError> {
        self.irq.disable();
        info!("PMW3360: Initializing");

        self.engine.bring_up()?;

        self.accumulator.clear();
        self.irq.configure(self.engine.config.trigger);
        self.irq.enable();
        self.engine.stage = Stage::Running;
        info!("PMW3360: Initialized, running");
        Ok(())
    }

    pub fn stage(&self) -> Stage {
        self.engine.stage
    }

    pub fn is_running(&self) -> bool {
        self.engine.stage == Stage::Running
    }

    /// Ids and SROM checksum read during the last bring-up
    pub fn ids(&self) -> SensorIds {
        self.engine.ids
    }

    pub fn counters(&self) -> IrqCounters {
        self.counters
    }

    pub fn bus_errors(&self) -> u32 {
        self.engine.transport.bus_errors()
    }

    /// Motion interrupt handler. Performs one burst read and accumulates the deltas.
    pub fn handle_interrupt(&mut self) {
        if self.engine.stage != Stage::Running {
            return;
        }

        let report = self.engine.read_motion_report();
        self.counters.record(&report);
        trace!("PMW3360: motion 0x{:02x} x: {}, y: {}", report.motion, report.delta_x, report.delta_y);

        if report.has_motion() && !report.is_lifted() {
            self.accumulator.add(report.delta_x, report.delta_y);
        }
    }

    /// Drain the motion accumulated since the last call
    pub fn poll_motion(&mut self) -> Option<(i32, i32)> {
        self.accumulator.drain(&mut self.irq)
    }

    /// Liveness probe: product id must still match its complement
    pub fn is_alive(&mut self) -> bool {
        let _mask = IrqMask::new(&mut self.irq);
        self.engine.check_identity()
    }

    /// Set the sensitivity code of both axes. Codes above 0x77 are clamped.
    ///
    /// The code is kept across re-initialization, as is the angle.
    pub fn set_sensitivity(&mut self, sense: u8) {
        let _mask = IrqMask::new(&mut self.irq);
        self.engine.set_sensitivity(sense);
    }

    /// Read the sensitivity code.
    ///
    /// If the two axis registers diverge the Y register is rewritten from the X register.
    pub fn sensitivity(&mut self) -> u8 {
        let _mask = IrqMask::new(&mut self.irq);
        self.engine.sensitivity()
    }

    /// Set sensor resolution in CPI (100-12000, rounded down to a step of 100)
    pub fn set_cpi(&mut self, cpi: u16) -> Result<(), InvalidCpi> {
        if !(RES_MIN..=RES_MAX).contains(&cpi) {
            return Err(InvalidCpi(cpi));
        }
        self.set_sensitivity(cpi_to_sense(cpi));
        Ok(())
    }

    pub fn cpi(&mut self) -> u16 {
        sense_to_cpi(self.sensitivity())
    }

    pub fn set_angle(&mut self, angle: i8) {
        let _mask = IrqMask::new(&mut self.irq);
        self.engine.set_angle(angle);
    }

    pub fn angle(&mut self) -> i8 {
        let _mask = IrqMask::new(&mut self.irq);
        self.engine.angle()
    }
}

impl<'a, SPI, CS, D, IRQ> MotionSensor for Pmw3360<'a, SPI, CS, D, IRQ>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
    IRQ: MotionInterrupt,
{
    fn initialize(&mut self) -> Result<(), InitError> {
        Pmw3360::initialize(self)
    }

    fn handle_interrupt(&mut self) {
        Pmw3360::handle_interrupt(self)
    }

    fn poll_motion(&mut self) -> Option<(i32, i32)> {
        Pmw3360::poll_motion(self)
    }

    fn is_alive(&mut self) -> bool {
        Pmw3360::is_alive(self)
    }

    fn is_running(&self) -> bool {
        Pmw3360::is_running(self)
    }
}
