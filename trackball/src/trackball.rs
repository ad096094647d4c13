use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;

use crate::config::TrackballConfig;
use crate::controls::{Controls, MouseState};
use crate::driver::watchdog::Watchdog;
use crate::health::{HealthMonitor, HealthStatus};
use crate::input_device::buttons::ButtonScanner;
use crate::input_device::shared::SharedSensor;
use crate::input_device::{InitError, MotionSensor};

/// The trackball main loop: buttons, motion sensor, controls, health monitor and watchdog.
///
/// The sensor lives in a [`SharedSensor`] so the board's motion interrupt can reach it. Call
/// [`start`](Self::start) once, then [`tick`](Self::tick) every main-loop iteration and hand the
/// returned state to the HID layer whenever `changed` is set.
pub struct Trackball<'a, S, P, W, const N: usize>
where
    S: MotionSensor,
    P: InputPin,
    W: Watchdog,
{
    sensor: &'a SharedSensor<S>,
    sensor_enabled: bool,
    buttons: ButtonScanner<P, N>,
    controls: Controls,
    health: HealthMonitor,
    watchdog: W,
    watchdog_timeout: Duration,
}

impl<'a, S, P, W, const N: usize> Trackball<'a, S, P, W, N>
where
    S: MotionSensor,
    P: InputPin,
    W: Watchdog,
{
    pub fn new(sensor: &'a SharedSensor<S>, pins: [P; N], watchdog: W, config: TrackballConfig) -> Self {
        Self {
            sensor,
            sensor_enabled: false,
            buttons: ButtonScanner::new(pins, config.debounce),
            controls: Controls::new(config.controls),
            health: HealthMonitor::new(&config.health),
            watchdog,
            watchdog_timeout: config.health.watchdog_timeout,
        }
    }

    /// Bring up the sensor and arm the main-loop watchdog.
    ///
    /// If the sensor fails to initialize the trackball keeps running without it (buttons only)
    /// and the error is returned for the caller to report. An empty [`SharedSensor`] is
    /// reported as [`InitError::NotInstalled`].
    pub fn start(&mut self) -> Result<(), InitError> {
        if self.watchdog.caused_reboot() {
            warn!("Reset by watchdog");
        }

        let result = self.initialize_sensor();
        if result.is_err() {
            error!("Sensor disabled, running without motion");
        }

        self.watchdog.start(self.watchdog_timeout);
        info!("Trackball started");
        result
    }

    /// Operator-triggered re-initialization of the sensor
    pub fn reinitialize(&mut self) -> Result<(), InitError> {
        self.watchdog.feed();
        let result = self.initialize_sensor();
        self.watchdog.feed();
        result
    }

    fn initialize_sensor(&mut self) -> Result<(), InitError> {
        let result = match self.sensor.with(|s| s.initialize()) {
            Some(result) => result,
            None => {
                error!("No motion sensor installed");
                self.sensor_enabled = false;
                return Err(InitError::NotInstalled);
            }
        };

        self.sensor_enabled = result.is_ok();
        result
    }

    pub fn is_sensor_enabled(&self) -> bool {
        self.sensor_enabled
    }

    /// One main-loop iteration at the current time
    pub fn tick(&mut self) -> MouseState {
        self.tick_at(Instant::now())
    }

    /// One main-loop iteration at `now`
    pub fn tick_at(&mut self, now: Instant) -> MouseState {
        self.watchdog.feed();

        for edge in self.buttons.scan(now) {
            self.controls.on_edge(edge);
        }

        if self.sensor_enabled && !self.sensor.with(|s| s.is_running()).unwrap_or(false) {
            error!("Sensor stopped running, continuing without motion");
            self.sensor_enabled = false;
        }

        let motion = if self.sensor_enabled {
            self.run_health_check(now);
            self.sensor.with(|s| s.poll_motion()).flatten()
        } else {
            None
        };

        self.controls.read(motion)
    }

    /// Probe the sensor if the health interval elapsed. Does not return if the sensor is dead.
    pub fn run_health_check(&mut self, now: Instant) -> HealthStatus {
        let sensor = self.sensor;
        self.health.run_health_check(
            now,
            || sensor.with(|s| s.is_alive()).unwrap_or(false),
            &mut self.watchdog,
        )
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn sensor(&self) -> &'a SharedSensor<S> {
        self.sensor
    }
}
