//! Sensor health monitor
//!
//! Runs the liveness probe at a fixed cadence from the main loop. A failed probe is fatal to the
//! current boot: the only recovery is a full reset through the watchdog.

use embassy_time::{Duration, Instant};

use crate::config::HealthConfig;
use crate::driver::watchdog::{Watchdog, reset_via_watchdog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HealthStatus {
    /// The interval has not elapsed, the probe did not run
    NotDue,
    Alive,
    /// The probe failed. Terminal until reset.
    Dead,
}

pub struct HealthMonitor {
    interval: Duration,
    reset_timeout: Duration,
    last_check: Option<Instant>,
    dead: bool,
}

impl HealthMonitor {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            interval: config.interval,
            reset_timeout: config.reset_timeout,
            last_check: None,
            dead: false,
        }
    }

    /// Run `probe` if the check interval has elapsed since the last check.
    pub fn poll(&mut self, now: Instant, probe: impl FnOnce() -> bool) -> HealthStatus {
        if self.dead {
            return HealthStatus::Dead;
        }

        if self
            .last_check
            .is_some_and(|last| now.saturating_duration_since(last) < self.interval)
        {
            return HealthStatus::NotDue;
        }
        self.last_check = Some(now);

        if probe() {
            HealthStatus::Alive
        } else {
            error!("Sensor liveness check failed");
            self.dead = true;
            HealthStatus::Dead
        }
    }

    /// [`poll`](Self::poll), resetting the system through `watchdog` if the sensor is dead
    pub fn run_health_check<W: Watchdog>(
        &mut self,
        now: Instant,
        probe: impl FnOnce() -> bool,
        watchdog: &mut W,
    ) -> HealthStatus {
        match self.poll(now, probe) {
            HealthStatus::Dead => reset_via_watchdog(watchdog, self.reset_timeout),
            status => status,
        }
    }
}
