//! Simulated PMW3360 behind `embedded-hal` traits, plus fake board primitives.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, SpiBus};
use pmw_trackball::config::{MotionTrigger, SensorConfig};
use pmw_trackball::driver::irq::MotionInterrupt;
use pmw_trackball::driver::watchdog::Watchdog;
use pmw_trackball::input_device::pmw3360::registers::Register;
use pmw_trackball::input_device::pmw3360::{FRAME_CAPTURE_LEN, MOTION_REPORT_LEN, Pmw3360, Srom};

pub const TEST_SROM_DATA: [u8; 32] = [
    0x01, 0x04, 0x8e, 0x96, 0x6e, 0x77, 0x3e, 0xfe, 0x7e, 0x5f, 0x1d, 0xb8, 0xf2, 0x66, 0x4e, 0xff, //
    0x5d, 0x19, 0xb0, 0xc2, 0x04, 0x69, 0x54, 0x2a, 0xd6, 0x2e, 0xbf, 0xdd, 0x19, 0xb0, 0xc2, 0x04,
];
pub const TEST_SROM_ID: u8 = 0x04;
pub const TEST_SROM_CHECKSUM: u16 = 0xbeef;

pub const TEST_SROM: Srom<'static> = Srom {
    data: &TEST_SROM_DATA,
    id: TEST_SROM_ID,
    checksum: TEST_SROM_CHECKSUM,
};

/// One register access seen by the simulated sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u8),
    Write(u8, u8),
    BurstRead(u8, usize),
    BurstWrite(u8, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Address,
    Read { addr: u8, count: usize },
    Write { addr: u8, count: usize },
}

pub struct SimState {
    pub regs: [u8; 128],
    pub selected: bool,
    phase: Phase,
    /// Every completed transaction, in order
    pub log: Vec<Access>,
    /// Bytes received through SROM_Load_Burst
    pub srom_upload: Vec<u8>,
    /// SROM_ID reported after an upload
    pub srom_id: u8,
    /// Value produced by the SROM CRC test
    pub srom_checksum: u16,
    pub product_id: u8,
    pub inverse_product_id: u8,
    /// Reads return zero
    pub dead: bool,
    /// Motion bursts served in order, an empty burst once exhausted
    pub motion: VecDeque<[u8; MOTION_REPORT_LEN]>,
    burst: [u8; MOTION_REPORT_LEN],
    pub frame: Vec<u8>,
    pub frame_captures: u32,
}

impl SimState {
    fn new() -> Self {
        Self {
            regs: [0; 128],
            selected: false,
            phase: Phase::Idle,
            log: Vec::new(),
            srom_upload: Vec::new(),
            srom_id: TEST_SROM_ID,
            srom_checksum: TEST_SROM_CHECKSUM,
            product_id: 0x42,
            inverse_product_id: 0xbd,
            dead: false,
            motion: VecDeque::new(),
            burst: [0; MOTION_REPORT_LEN],
            frame: (0..FRAME_CAPTURE_LEN).map(|i| (i % 251) as u8).collect(),
            frame_captures: 0,
        }
    }

    fn power_up_reset(&mut self) {
        self.regs = [0; 128];
        self.regs[Register::ProductId.addr() as usize] = self.product_id;
        self.regs[Register::InverseProductId.addr() as usize] = self.inverse_product_id;
        self.regs[Register::RevisionId.addr() as usize] = 0x01;
        self.regs[Register::Config1.addr() as usize] = 0x31;
        self.regs[Register::Config2.addr() as usize] = 0x20;
        self.regs[Register::Config5.addr() as usize] = 0x31;
    }

    fn write(&mut self, addr: u8, value: u8) {
        self.regs[addr as usize] = value;

        match addr {
            a if a == Register::PowerUpReset.addr() && value == 0x5a => self.power_up_reset(),
            a if a == Register::SromEnable.addr() => match value {
                0x18 => self.srom_upload.clear(),
                0x15 => {
                    let [lower, upper] = self.srom_checksum.to_le_bytes();
                    self.regs[Register::DataOutLower.addr() as usize] = lower;
                    self.regs[Register::DataOutUpper.addr() as usize] = upper;
                }
                _ => {}
            },
            a if a == Register::MotionBurst.addr() => {
                self.burst = self.motion.pop_front().unwrap_or([0; MOTION_REPORT_LEN]);
            }
            a if a == Register::FrameCapture.addr() && value == 0xc5 => self.frame_captures += 1,
            _ => {}
        }
    }

    fn read(&mut self, addr: u8, index: usize) -> u8 {
        if self.dead {
            return 0;
        }
        if addr == Register::MotionBurst.addr() {
            self.burst.get(index).copied().unwrap_or(0)
        } else if addr == Register::RawDataBurst.addr() {
            self.frame.get(index).copied().unwrap_or(0)
        } else {
            self.regs[addr as usize]
        }
    }

    fn end_transaction(&mut self) {
        match self.phase {
            Phase::Read { addr, count } if count == 1 && !is_burst(addr) => self.log.push(Access::Read(addr)),
            Phase::Read { addr, count } => self.log.push(Access::BurstRead(addr, count)),
            Phase::Write { addr, count } if addr == Register::SromLoadBurst.addr() => {
                self.log.push(Access::BurstWrite(addr, count));
                self.regs[Register::SromId.addr() as usize] = self.srom_id;
            }
            _ => {}
        }
        self.phase = Phase::Idle;
    }

    /// Values written to `register`, in order
    pub fn writes_to(&self, register: Register) -> Vec<u8> {
        self.log
            .iter()
            .filter_map(|a| match a {
                Access::Write(addr, value) if *addr == register.addr() => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn reads_of(&self, register: Register) -> usize {
        self.log
            .iter()
            .filter(|a| matches!(a, Access::Read(addr) if *addr == register.addr()))
            .count()
    }

    pub fn reg(&self, register: Register) -> u8 {
        self.regs[register.addr() as usize]
    }

    pub fn set_reg(&mut self, register: Register, value: u8) {
        self.regs[register.addr() as usize] = value;
    }
}

fn is_burst(addr: u8) -> bool {
    addr == Register::MotionBurst.addr() || addr == Register::RawDataBurst.addr()
}

/// Handle on the simulated sensor, cloned into the SPI bus and chip-select
#[derive(Clone)]
pub struct Sim(Rc<RefCell<SimState>>);

impl Sim {
    pub fn new() -> Self {
        Sim(Rc::new(RefCell::new(SimState::new())))
    }

    pub fn state(&self) -> std::cell::RefMut<'_, SimState> {
        self.0.borrow_mut()
    }

    pub fn spi(&self) -> SimSpi {
        SimSpi(self.clone())
    }

    pub fn cs(&self) -> SimCs {
        SimCs(self.clone())
    }

    /// Queue a motion burst
    pub fn push_motion(&self, motion: u8, dx: i16, dy: i16) {
        let [xl, xh] = dx.to_le_bytes();
        let [yl, yh] = dy.to_le_bytes();
        let burst = [motion, 0x3f, xl, xh, yl, yh, 0x40, 0x21, 0x7f, 0x01, 0x00, 0x80];
        self.state().motion.push_back(burst);
    }

    /// Drop all recorded accesses
    pub fn clear_log(&self) {
        self.state().log.clear();
    }
}

pub struct SimSpi(Sim);

impl SpiErrorType for SimSpi {
    type Error = Infallible;
}

impl SpiBus for SimSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut s = self.0.state();
        assert!(s.selected, "read without chip-select");
        for word in words.iter_mut() {
            let phase = s.phase;
            let (addr, count) = match phase {
                Phase::Read { addr, count } => (addr, count),
                phase => panic!("unexpected read in phase {:?}", phase),
            };
            *word = s.read(addr, count);
            s.phase = Phase::Read { addr, count: count + 1 };
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut s = self.0.state();
        assert!(s.selected, "write without chip-select");
        for &word in words {
            let phase = s.phase;
            s.phase = match phase {
                Phase::Address => {
                    let addr = word & 0x7f;
                    if word & 0x80 != 0 {
                        Phase::Write { addr, count: 0 }
                    } else {
                        Phase::Read { addr, count: 0 }
                    }
                }
                Phase::Write { addr, count } if addr == Register::SromLoadBurst.addr() => {
                    s.srom_upload.push(word);
                    Phase::Write { addr, count: count + 1 }
                }
                Phase::Write { addr, count } => {
                    s.write(addr, word);
                    s.log.push(Access::Write(addr, word));
                    Phase::Write { addr, count: count + 1 }
                }
                phase => panic!("unexpected write in phase {:?}", phase),
            };
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write)?;
        self.read(read)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let out = words.to_vec();
        self.write(&out)?;
        self.read(words)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct SimCs(Sim);

impl PinErrorType for SimCs {
    type Error = Infallible;
}

impl OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut s = self.0.state();
        s.selected = true;
        s.phase = Phase::Address;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut s = self.0.state();
        if s.selected {
            s.end_transaction();
        }
        s.selected = false;
        Ok(())
    }
}

/// Delay that only adds up the requested time
#[derive(Clone, Default)]
pub struct SimDelay(pub Rc<Cell<u64>>);

impl SimDelay {
    pub fn total_ns(&self) -> u64 {
        self.0.get()
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + ns as u64);
    }
}

#[derive(Debug, Default)]
pub struct IrqState {
    pub enabled: bool,
    pub trigger: Option<MotionTrigger>,
    pub enables: u32,
    pub disables: u32,
}

#[derive(Clone, Default)]
pub struct FakeIrq(pub Rc<RefCell<IrqState>>);

impl FakeIrq {
    pub fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
}

impl MotionInterrupt for FakeIrq {
    fn configure(&mut self, trigger: MotionTrigger) {
        self.0.borrow_mut().trigger = Some(trigger);
    }

    fn enable(&mut self) {
        let mut s = self.0.borrow_mut();
        s.enabled = true;
        s.enables += 1;
    }

    fn disable(&mut self) {
        let mut s = self.0.borrow_mut();
        s.enabled = false;
        s.disables += 1;
    }

    fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
}

#[derive(Debug, Default)]
pub struct WatchdogState {
    pub timeout: Option<Duration>,
    pub feeds: u32,
    pub rebooted: bool,
}

#[derive(Clone, Default)]
pub struct FakeWatchdog(pub Rc<RefCell<WatchdogState>>);

impl Watchdog for FakeWatchdog {
    fn start(&mut self, timeout: Duration) {
        let mut state = self.0.borrow_mut();
        // Re-arming is the reset path, which never returns
        if state.timeout.is_some() {
            panic!("reset armed {}ms", timeout.as_millis());
        }
        state.timeout = Some(timeout);
    }

    fn feed(&mut self) {
        self.0.borrow_mut().feeds += 1;
    }

    fn caused_reboot(&self) -> bool {
        self.0.borrow().rebooted
    }
}

/// Button input, `true` is a high level
#[derive(Clone)]
pub struct FakePin(pub Rc<Cell<bool>>);

impl FakePin {
    pub fn new(high: bool) -> Self {
        FakePin(Rc::new(Cell::new(high)))
    }

    pub fn set_high(&self, high: bool) {
        self.0.set(high);
    }
}

impl PinErrorType for FakePin {
    type Error = Infallible;
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

pub type SimSensor = Pmw3360<'static, SimSpi, SimCs, SimDelay, FakeIrq>;

/// Driver wired to `sim`, with default sensor config
pub fn sensor(sim: &Sim, irq: &FakeIrq) -> SimSensor {
    sensor_with_config(sim, irq, SensorConfig::default())
}

pub fn sensor_with_config(sim: &Sim, irq: &FakeIrq, config: SensorConfig) -> SimSensor {
    Pmw3360::new(sim.spi(), sim.cs(), SimDelay::default(), irq.clone(), TEST_SROM, config)
}
