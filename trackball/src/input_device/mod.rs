//! Input devices of the trackball
//!
//! The optical sensor is driven through the [`MotionSensor`] trait, the buttons through a
//! [`buttons::ButtonScanner`].

pub mod buttons;
pub mod pmw3360;
pub mod shared;

pub use self::pmw3360::InitError;

/// The trait for motion sensors.
///
/// Motion arrives in interrupt context through [`handle_interrupt`](MotionSensor::handle_interrupt)
/// and is drained from the main loop through [`poll_motion`](MotionSensor::poll_motion).
pub trait MotionSensor {
    /// Run the full bring-up. Can be called again at any time.
    fn initialize(&mut self) -> Result<(), InitError>;

    /// Motion interrupt handler, must not block beyond the sensor's own bus timing
    fn handle_interrupt(&mut self);

    /// Drain accumulated motion, `None` if nothing moved since the last call
    fn poll_motion(&mut self) -> Option<(i32, i32)>;

    /// Liveness probe
    fn is_alive(&mut self) -> bool;

    /// Whether motion capture is active. Diagnostics that end in a failed re-init stop it.
    fn is_running(&self) -> bool;
}
