//! Digital input scanner for the trackball's buttons

use embassy_time::Instant;
use embedded_hal::digital::InputPin;
use heapless::Vec;

use crate::config::DebounceConfig;
use crate::debounce::default_debouncer::DefaultDebouncer;
use crate::debounce::{ButtonEdge, DebounceState, DebouncerTrait};

/// Samples `N` input lines once per main-loop iteration and reports debounced edges.
pub struct ButtonScanner<P: InputPin, const N: usize> {
    pins: [P; N],
    debouncer: DefaultDebouncer<N>,
    active_low: bool,
}

impl<P: InputPin, const N: usize> ButtonScanner<P, N> {
    pub fn new(pins: [P; N], config: DebounceConfig) -> Self {
        Self {
            pins,
            debouncer: DefaultDebouncer::new(config.window),
            active_low: config.active_low,
        }
    }

    /// Sample every line and return the edges committed by this scan, in line order
    pub fn scan(&mut self, now: Instant) -> Vec<ButtonEdge, N> {
        let mut edges = Vec::new();

        for (line, pin) in self.pins.iter_mut().enumerate() {
            // A failed read counts as no sample for this iteration
            let Ok(high) = pin.is_high() else {
                continue;
            };
            let active = high != self.active_low;

            if self.debouncer.detect_change_with_debounce(line, active, now) == DebounceState::Debounced {
                debug!("Input {} {}", line, if active { "pressed" } else { "released" });
                // At most one edge per line
                let _ = edges.push(ButtonEdge { line, pressed: active });
            }
        }

        edges
    }

    /// Debounced state of `line`
    pub fn is_pressed(&self, line: usize) -> bool {
        self.debouncer.stable_state(line)
    }
}
