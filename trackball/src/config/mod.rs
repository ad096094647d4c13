use embassy_time::Duration;

use crate::controls::Control;
use crate::input_device::pmw3360::cpi_to_sense;

/// The config struct for the trackball.
///
/// There are 4 groups of configs:
/// 1. `SensorConfig`: bring-up values for the PMW3360.
/// 2. `ControlsConfig`: scroll conversion, click suppression and report orientation.
/// 3. `DebounceConfig`: digital input sampling.
/// 4. `HealthConfig`: liveness cadence and watchdog timeouts.
#[derive(Clone, Debug, Default)]
pub struct TrackballConfig {
    pub sensor: SensorConfig,
    pub controls: ControlsConfig,
    pub debounce: DebounceConfig,
    pub health: HealthConfig,
}

/// Lift detection height, written to the Lift_Config register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LiftCutoff {
    Mm2,
    Mm3,
}

impl LiftCutoff {
    pub(crate) fn value(self) -> u8 {
        match self {
            LiftCutoff::Mm2 => 0x02,
            LiftCutoff::Mm3 => 0x03,
        }
    }
}

/// How the board's GPIO reports the sensor's MOTION line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionTrigger {
    /// Interrupt on the falling edge of MOTION
    FallingEdge,
    /// Interrupt while MOTION is held low
    LevelLow,
}

/// PMW3360 configuration
#[derive(Clone, Debug)]
pub struct SensorConfig {
    /// Sensitivity code, 0x00 (100 CPI) to 0x77 (12000 CPI)
    pub sensitivity: u8,
    /// Mounting angle tune, applied by the sensor before reporting deltas
    pub angle: i8,
    /// Lift detection height
    pub lift_cutoff: LiftCutoff,
    /// Keep rest modes enabled (wireless design) instead of always-run (wired)
    pub wireless: bool,
    /// Trigger mode of the motion interrupt
    pub trigger: MotionTrigger,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sensitivity: cpi_to_sense(500),
            angle: -30,
            lift_cutoff: LiftCutoff::Mm2,
            wireless: cfg!(feature = "wireless"),
            trigger: MotionTrigger::FallingEdge,
        }
    }
}

/// Config for the mouse event state machine
#[derive(Clone, Debug)]
pub struct ControlsConfig {
    /// Raw counts per emitted scroll step while scroll-lock is held
    pub scroll_reduce_sensitivity: i32,
    /// Releasing scroll-lock after less raw motion than this produces a middle click
    pub min_scroll_suppress_click: u32,
    pub invert_mouse_x: bool,
    pub invert_mouse_y: bool,
    pub invert_scroll_x: bool,
    pub invert_scroll_y: bool,
    /// Logical control assigned to each debounced input line
    pub input_map: [Control; 4],
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            scroll_reduce_sensitivity: 20,
            min_scroll_suppress_click: 10,
            invert_mouse_x: false,
            invert_mouse_y: true,
            invert_scroll_x: false,
            invert_scroll_y: false,
            input_map: [Control::Back, Control::ScrollLock, Control::Left, Control::Right],
        }
    }
}

/// Config for the digital input debouncer
#[derive(Clone, Copy, Debug)]
pub struct DebounceConfig {
    /// A new level has to be held for longer than this before it is committed
    pub window: Duration,
    /// Inputs are pulled-up switches to ground
    pub active_low: bool,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(5),
            active_low: true,
        }
    }
}

/// Config for the health monitor and the watchdog
#[derive(Clone, Copy, Debug)]
pub struct HealthConfig {
    /// Liveness probe cadence
    pub interval: Duration,
    /// Main-loop watchdog timeout, armed once bring-up is done.
    /// Bring-up itself takes ~160ms.
    pub watchdog_timeout: Duration,
    /// Timeout used to force a reset
    pub reset_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            watchdog_timeout: Duration::from_millis(500),
            reset_timeout: Duration::from_millis(1),
        }
    }
}
