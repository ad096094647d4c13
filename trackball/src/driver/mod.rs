//! Board-facing primitives: chip-select, motion interrupt masking and the watchdog.

pub(crate) mod gpio;
pub mod irq;
pub mod watchdog;
