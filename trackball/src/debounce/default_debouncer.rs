use embassy_time::{Duration, Instant};

use super::{DebounceState, DebouncerTrait};

/// Tracks the debounce state of a single input line.
#[derive(Copy, Clone, Debug, PartialEq)]
struct ButtonState {
    /// Level seen by the previous sample
    last_sample: bool,
    /// Committed level
    stable: bool,
    /// Time the sampled level last changed
    last_transition: Instant,
}

impl ButtonState {
    const fn new() -> Self {
        Self {
            last_sample: false,
            stable: false,
            last_transition: Instant::from_ticks(0),
        }
    }
}

/// Time-window debouncer: a new level is committed once it has been sampled unchanged for
/// longer than the window.
pub struct DefaultDebouncer<const N: usize> {
    states: [ButtonState; N],
    window: Duration,
}

impl<const N: usize> DefaultDebouncer<N> {
    pub fn new(window: Duration) -> Self {
        DefaultDebouncer {
            states: [ButtonState::new(); N],
            window,
        }
    }
}

impl<const N: usize> DebouncerTrait<N> for DefaultDebouncer<N> {
    fn detect_change_with_debounce(&mut self, line_idx: usize, active: bool, now: Instant) -> DebounceState {
        let state = &mut self.states[line_idx];

        // Any change of the sampled level restarts the window
        if active != state.last_sample {
            state.last_sample = active;
            state.last_transition = now;
        }

        if active == state.stable {
            return DebounceState::Ignored;
        }

        if now.saturating_duration_since(state.last_transition) > self.window {
            state.stable = active;
            DebounceState::Debounced
        } else {
            DebounceState::InProgress
        }
    }

    fn stable_state(&self, line_idx: usize) -> bool {
        self.states[line_idx].stable
    }
}
