//! Hardware watchdog: the last-resort recovery path.
//!
//! A sensor that stops answering coherently is never repaired in place. The firmware arms a
//! very short watchdog and spins, so the chip restarts from `main` and the sensor gets a full
//! power-up sequence.

use embassy_time::Duration;

/// Watchdog primitives provided by the board.
pub trait Watchdog {
    /// Arm (or re-arm) the watchdog with the given timeout
    fn start(&mut self, timeout: Duration);
    /// Service the watchdog. Must be called every main-loop iteration once armed.
    fn feed(&mut self);
    /// Whether the last reboot was caused by the watchdog
    fn caused_reboot(&self) -> bool {
        false
    }
}

/// Force a full system reset through the watchdog.
pub fn reset_via_watchdog<W: Watchdog>(watchdog: &mut W, timeout: Duration) -> ! {
    error!("Resetting through watchdog in {}ms", timeout.as_millis());
    watchdog.start(timeout);
    loop {
        core::hint::spin_loop();
    }
}
