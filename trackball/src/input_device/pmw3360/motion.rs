//! Motion capture: burst report decoding, interrupt counters and the shared motion accumulator.

use super::registers::{MOTION_LIFT, MOTION_MOT, MOTION_OP_1, MOTION_OP_2};
use crate::driver::irq::{IrqMask, MotionInterrupt};

// ============================================================================
// Burst register offsets
// ============================================================================
const BURST_MOTION_FLAGS: usize = 0;
const BURST_OBSERVATION: usize = 1;
const BURST_DELTA_X_L: usize = 2;
const BURST_DELTA_X_H: usize = 3;
const BURST_DELTA_Y_L: usize = 4;
const BURST_DELTA_Y_H: usize = 5;
const BURST_SQUAL: usize = 6;
const BURST_RAW_DATA_SUM: usize = 7;
const BURST_MAXIMUM_RAW_DATA: usize = 8;
const BURST_MINIMUM_RAW_DATA: usize = 9;
const BURST_SHUTTER_UPPER: usize = 10;
const BURST_SHUTTER_LOWER: usize = 11;

/// Length of a full motion burst
pub const MOTION_REPORT_LEN: usize = 12;

/// Decode a 16-bit two's-complement delta split over a low and a high register
pub fn delta_from_raw(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}

/// Sensor power state, from the OP_Mode bits of the motion register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Run,
    Rest1,
    Rest2,
    Rest3,
}

/// One motion burst. Produced once per interrupt and consumed immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionReport {
    pub motion: u8,
    pub observation: u8,
    pub delta_x: i16,
    pub delta_y: i16,
    pub squal: u8,
    pub raw_data_sum: u8,
    pub maximum_raw_data: u8,
    pub minimum_raw_data: u8,
    pub shutter: u16,
}

impl MotionReport {
    pub fn from_burst(raw: &[u8; MOTION_REPORT_LEN]) -> Self {
        Self {
            motion: raw[BURST_MOTION_FLAGS],
            observation: raw[BURST_OBSERVATION],
            delta_x: delta_from_raw(raw[BURST_DELTA_X_L], raw[BURST_DELTA_X_H]),
            delta_y: delta_from_raw(raw[BURST_DELTA_Y_L], raw[BURST_DELTA_Y_H]),
            squal: raw[BURST_SQUAL],
            raw_data_sum: raw[BURST_RAW_DATA_SUM],
            maximum_raw_data: raw[BURST_MAXIMUM_RAW_DATA],
            minimum_raw_data: raw[BURST_MINIMUM_RAW_DATA],
            shutter: u16::from_be_bytes([raw[BURST_SHUTTER_UPPER], raw[BURST_SHUTTER_LOWER]]),
        }
    }

    pub fn has_motion(&self) -> bool {
        self.motion & MOTION_MOT != 0
    }

    pub fn is_lifted(&self) -> bool {
        self.motion & MOTION_LIFT != 0
    }

    pub fn power_state(&self) -> PowerState {
        match (self.motion & MOTION_OP_1 != 0, self.motion & MOTION_OP_2 != 0) {
            (true, true) => PowerState::Rest3,
            (true, false) => PowerState::Rest1,
            (false, true) => PowerState::Rest2,
            (false, false) => PowerState::Run,
        }
    }
}

/// Diagnostic counters updated by the interrupt handler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqCounters {
    pub all: u64,
    pub motion: u64,
    pub no_motion: u64,
    pub on_surface: u64,
    pub lifted: u64,
    pub run: u64,
    pub rest1: u64,
    pub rest2: u64,
    pub rest3: u64,
}

impl IrqCounters {
    pub fn record(&mut self, report: &MotionReport) {
        self.all += 1;

        if report.has_motion() {
            self.motion += 1;
        } else {
            self.no_motion += 1;
        }

        if report.is_lifted() {
            self.lifted += 1;
        } else {
            self.on_surface += 1;
        }

        match report.power_state() {
            PowerState::Run => self.run += 1,
            PowerState::Rest1 => self.rest1 += 1,
            PowerState::Rest2 => self.rest2 += 1,
            PowerState::Rest3 => self.rest3 += 1,
        }
    }
}

/// Motion totals shared between the interrupt handler and the main loop.
///
/// Only [`add`](Self::add) runs in interrupt context. The main loop only ever calls
/// [`drain`](Self::drain), which masks the motion interrupt for the read-and-zero so no delta is
/// lost or counted twice.
#[derive(Debug, Default)]
pub struct MotionAccumulator {
    x: i32,
    y: i32,
    pending: bool,
}

impl MotionAccumulator {
    pub const fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            pending: false,
        }
    }

    /// Interrupt side
    pub fn add(&mut self, dx: i16, dy: i16) {
        self.x = self.x.saturating_add(dx as i32);
        self.y = self.y.saturating_add(dy as i32);
        self.pending = true;
    }

    /// Main-loop side: read and zero the totals with the motion interrupt masked.
    ///
    /// Returns `None` if nothing arrived since the last drain.
    pub fn drain<I: MotionInterrupt>(&mut self, irq: &mut I) -> Option<(i32, i32)> {
        let _mask = IrqMask::new(irq);
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some((core::mem::take(&mut self.x), core::mem::take(&mut self.y)))
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }
}
