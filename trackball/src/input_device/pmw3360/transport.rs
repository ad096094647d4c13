//! Register transport for the PMW3360 serial port.
//!
//! Every transaction is chip-select framed and padded with the inter-transaction delays from the
//! PMW3360 datasheet. All delays are busy waits through the injected [`DelayNs`], since the
//! transport is also driven from the motion interrupt.
//!
//! There is no failure signal at this layer: a failed transaction yields a meaningless byte
//! which the protocol engine catches through its identity and checksum checks. Bus and pin
//! errors are only counted.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use super::registers::Register;
use crate::driver::gpio::ChipSelect;

// SPI timing constants (from PMW3360 datasheet)
const T_NCS_SCLK_US: u32 = 1;
const T_SRAD_US: u32 = 160;
const T_SRAD_MOTBR_US: u32 = 35;
const T_SCLK_NCS_RD_NS: u32 = 120;
const T_SRX_US: u32 = 20 - T_NCS_SCLK_US;
const T_SCLK_NCS_WR_US: u32 = 35 - T_NCS_SCLK_US;
const T_SWX_US: u32 = 180 - T_SCLK_NCS_WR_US;
const T_BEXIT_US: u32 = 1;
const T_BRSEP_US: u32 = 15;

/// Single-register and burst access to the sensor
pub struct RegisterTransport<SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    spi: SPI,
    cs: ChipSelect<CS>,
    delay: D,
    bus_errors: u32,
}

impl<SPI, CS, D> RegisterTransport<SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    /// Create the transport, chip-select is released immediately
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        let mut transport = Self {
            spi,
            cs: ChipSelect::new(cs, true),
            delay,
            bus_errors: 0,
        };
        let ok = transport.cs.deselect();
        transport.check(ok);
        transport
    }

    /// Give back the bus, chip-select pin and delay
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs.into_inner(), self.delay)
    }

    /// Number of SPI or chip-select errors seen so far
    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    pub fn read_register(&mut self, register: Register) -> u8 {
        let mut value = [0u8];

        self.begin();
        let r = self.spi.write(&[register.read_addr()]);
        self.check_result(r);
        let r = self.spi.flush();
        self.check_result(r);

        self.delay.delay_us(T_SRAD_US);

        let r = self.spi.read(&mut value);
        self.check_result(r);
        self.end(T_SCLK_NCS_RD_NS, T_SRX_US);

        value[0]
    }

    pub fn write_register(&mut self, register: Register, value: u8) {
        self.begin();
        let r = self.spi.write(&[register.write_addr(), value]);
        self.check_result(r);
        self.end(T_SCLK_NCS_WR_US * 1000, T_SWX_US);
    }

    /// Read `data.len()` bytes starting at `register` under one chip-select assertion
    pub fn read_burst(&mut self, register: Register, data: &mut [u8]) {
        self.begin();
        let r = self.spi.write(&[register.read_addr()]);
        self.check_result(r);
        let r = self.spi.flush();
        self.check_result(r);

        self.delay.delay_us(T_SRAD_MOTBR_US);

        let r = self.spi.read(data);
        self.check_result(r);
        self.end(T_SCLK_NCS_RD_NS, T_BEXIT_US);
    }

    /// Write `data` to `register` under one chip-select assertion, pausing between bytes
    pub fn write_burst(&mut self, register: Register, data: &[u8]) {
        self.begin();
        let r = self.spi.write(&[register.write_addr()]);
        self.check_result(r);
        let r = self.spi.flush();
        self.check_result(r);
        self.delay.delay_us(T_BRSEP_US);

        for byte in data {
            let r = self.spi.write(core::slice::from_ref(byte));
            self.check_result(r);
            let r = self.spi.flush();
            self.check_result(r);
            self.delay.delay_us(T_BRSEP_US);
        }

        let ok = self.cs.deselect();
        self.check(ok);
        self.delay.delay_us(T_BEXIT_US);
    }

    fn begin(&mut self) {
        let ok = self.cs.select();
        self.check(ok);
        self.delay.delay_us(T_NCS_SCLK_US);
    }

    fn end(&mut self, hold_ns: u32, release_us: u32) {
        let r = self.spi.flush();
        self.check_result(r);
        self.delay.delay_ns(hold_ns);
        let ok = self.cs.deselect();
        self.check(ok);
        self.delay.delay_us(release_us);
    }

    #[inline(always)]
    fn check(&mut self, ok: bool) {
        if !ok {
            self.bus_errors = self.bus_errors.wrapping_add(1);
        }
    }

    #[inline(always)]
    fn check_result<E>(&mut self, r: Result<(), E>) {
        self.check(r.is_ok());
    }
}
