use embassy_time::Instant;

pub mod default_debouncer;

pub trait DebouncerTrait<const N: usize> {
    /// Feed one sample of input line `line_idx`, `active` is the logical (pressed) level.
    fn detect_change_with_debounce(&mut self, line_idx: usize, active: bool, now: Instant) -> DebounceState;

    /// Last committed state of input line `line_idx`
    fn stable_state(&self, line_idx: usize) -> bool;
}

/// Debounce state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// A new stable state was committed with this sample
    Debounced,
    /// The sample differs from the stable state, but not for long enough
    InProgress,
    Ignored,
}

/// A committed transition of one input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEdge {
    pub line: usize,
    pub pressed: bool,
}
