//! Sensor handle shared between the board's motion interrupt and the main loop

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use super::MotionSensor;

/// A motion sensor that lives in a `static` so the GPIO interrupt can reach it.
///
/// ```ignore
/// static SENSOR: SharedSensor<MySensor> = SharedSensor::new();
///
/// #[interrupt]
/// fn IO_IRQ_BANK0() {
///     SENSOR.on_motion_interrupt();
/// }
/// ```
///
/// Every access runs inside a critical section, keep the closures passed to
/// [`with`](Self::with) short.
pub struct SharedSensor<S> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<S>>>,
}

impl<S> Default for SharedSensor<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SharedSensor<S> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the sensor, returning the previously installed one
    pub fn install(&self, sensor: S) -> Option<S> {
        self.inner.lock(|cell| cell.borrow_mut().replace(sensor))
    }

    pub fn take(&self) -> Option<S> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    /// Run `f` on the installed sensor. Returns `None` if no sensor is installed or it is
    /// already borrowed.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        self.inner.lock(|cell| {
            let mut sensor = cell.try_borrow_mut().ok()?;
            sensor.as_mut().map(f)
        })
    }
}

impl<S: MotionSensor> SharedSensor<S> {
    /// Entry point for the board's motion interrupt
    pub fn on_motion_interrupt(&self) {
        self.with(|sensor| sensor.handle_interrupt());
    }
}
