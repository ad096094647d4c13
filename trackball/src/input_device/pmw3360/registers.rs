//! PMW3360 register map

#[repr(u8)]
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    ProductId = 0x00,
    RevisionId = 0x01,
    Motion = 0x02,
    DeltaXL = 0x03,
    DeltaXH = 0x04,
    DeltaYL = 0x05,
    DeltaYH = 0x06,
    Squal = 0x07,
    RawDataSum = 0x08,
    MaximumRawData = 0x09,
    MinimumRawData = 0x0a,
    ShutterLower = 0x0b,
    ShutterUpper = 0x0c,
    Control = 0x0d,
    Config1 = 0x0f,
    Config2 = 0x10,
    AngleTune = 0x11,
    FrameCapture = 0x12,
    SromEnable = 0x13,
    RunDownshift = 0x14,
    Rest1RateLower = 0x15,
    Rest1RateUpper = 0x16,
    Rest1Downshift = 0x17,
    Rest2RateLower = 0x18,
    Rest2RateUpper = 0x19,
    Rest2Downshift = 0x1a,
    Rest3RateLower = 0x1b,
    Rest3RateUpper = 0x1c,
    Observation = 0x24,
    DataOutLower = 0x25,
    DataOutUpper = 0x26,
    RawDataDump = 0x29,
    SromId = 0x2a,
    MinSqRun = 0x2b,
    RawDataThreshold = 0x2c,
    Config5 = 0x2f,
    PowerUpReset = 0x3a,
    Shutdown = 0x3b,
    InverseProductId = 0x3f,
    LiftCutoffTune3 = 0x41,
    AngleSnap = 0x42,
    LiftCutoffTune1 = 0x4a,
    MotionBurst = 0x50,
    LiftCutoffTuneTimeout = 0x58,
    LiftCutoffTuneMinLength = 0x5a,
    SromLoadBurst = 0x62,
    LiftConfig = 0x63,
    RawDataBurst = 0x64,
    LiftCutoffTune2 = 0x65,
}

impl Register {
    /// 7-bit register address, write flag cleared
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Address byte for a read transaction
    pub const fn read_addr(self) -> u8 {
        self.addr() & !WRITE_BIT
    }

    /// Address byte for a write transaction
    pub const fn write_addr(self) -> u8 {
        self.addr() | WRITE_BIT
    }
}

pub const WRITE_BIT: u8 = 0x80;

// Motion register bits
pub const MOTION_MOT: u8 = 1 << 7;
pub const MOTION_LIFT: u8 = 1 << 3;
pub const MOTION_OP_1: u8 = 1 << 1;
pub const MOTION_OP_2: u8 = 1 << 2;

// Config2 bits
pub const CONFIG2_REST_EN: u8 = 1 << 5;
pub const CONFIG2_RPT_MOD: u8 = 1 << 2;

pub const POWER_UP_RESET_VAL: u8 = 0x5a;
pub const SROM_ENABLE_INIT: u8 = 0x1d;
pub const SROM_ENABLE_START: u8 = 0x18;
pub const SROM_ENABLE_CRC: u8 = 0x15;
pub const FRAME_CAPTURE_ARM: u8 = 0x83;
pub const FRAME_CAPTURE_START: u8 = 0xc5;
/// Any value starts a motion burst
pub const MOTION_BURST_START: u8 = 0x42;

pub const PRODUCT_ID_PMW3360: u8 = 0x42;
