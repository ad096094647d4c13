//! Diagnostic paths: raw frame capture, synchronous motion sample dump and the status snapshot.
//!
//! None of these run on the live pointer path. Each one masks the motion interrupt for its whole
//! acquisition.

use core::fmt;

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use super::motion::{IrqCounters, MotionReport};
use super::registers::{FRAME_CAPTURE_ARM, FRAME_CAPTURE_START, Register};
use super::{InitError, Pmw3360, ProtocolEngine, SensorIds, Stage, sense_to_cpi};
use crate::driver::irq::{IrqMask, MotionInterrupt};

/// 36 x 36 pixels, one byte each
pub const FRAME_CAPTURE_LEN: usize = 36 * 36;

/// Default number of motion bursts in a sample dump
pub const DUMP_SAMPLE_COUNT: usize = 1000;

const FRAME_CAPTURE_DELAY_MS: u32 = 20;

/// Diagnostic capture errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    BufferTooSmall { required: usize, provided: usize },
    /// The sensor is not initialized
    NotRunning,
    /// The bring-up after a frame capture failed, motion capture stays disabled
    Reinit(InitError),
    /// The sample sink refused a sample
    Sink,
}

/// Receiver of the samples produced by [`Pmw3360::dump_samples`]
pub trait SampleSink {
    type Error;

    fn record(&mut self, timestamp_us: u64, report: &MotionReport) -> Result<(), Self::Error>;
}

/// Renders samples as CSV, one row per motion burst
pub struct CsvSampleWriter<W: fmt::Write> {
    writer: W,
    header_written: bool,
}

impl<W: fmt::Write> CsvSampleWriter<W> {
    pub const HEADER: &'static str =
        "time,motion,observation,delta_x,delta_y,squal,raw_data_sum,maximum_raw_data,minimum_raw_data,shutter";

    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: fmt::Write> SampleSink for CsvSampleWriter<W> {
    type Error = fmt::Error;

    fn record(&mut self, timestamp_us: u64, r: &MotionReport) -> Result<(), Self::Error> {
        if !self.header_written {
            writeln!(self.writer, "{}", Self::HEADER)?;
            self.header_written = true;
        }
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{},{},{}",
            timestamp_us,
            r.motion,
            r.observation,
            r.delta_x,
            r.delta_y,
            r.squal,
            r.raw_data_sum,
            r.maximum_raw_data,
            r.minimum_raw_data,
            r.shutter
        )
    }
}

/// Snapshot of the sensor state, for the console and the stats dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorStatus {
    pub stage: Stage,
    pub ids: SensorIds,
    pub sensitivity: u8,
    pub angle: i8,
    pub counters: IrqCounters,
    pub bus_errors: u32,
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! row {
            ($name:literal, $($arg:tt)*) => {
                writeln!(f, "{:>19} = {}", $name, format_args!($($arg)*))?
            };
        }

        row!("stage", "{:?}", self.stage);
        row!("product_id", "0x{:02x}", self.ids.product_id);
        row!("inv_product_id", "0x{:02x}", self.ids.inverse_product_id);
        row!("revision_id", "0x{:02x}", self.ids.revision_id);
        row!("srom_id", "0x{:02x}", self.ids.srom_id);
        row!("srom_checksum", "0x{:04x}", self.ids.srom_checksum);
        row!("sensitivity", "0x{:02x} ({} cpi)", self.sensitivity, sense_to_cpi(self.sensitivity));
        row!("angle", "{}", self.angle);
        row!("bus_errors", "{}", self.bus_errors);
        row!("pmw_irq_cnt_all", "{}", self.counters.all);
        row!("pmw_irq_cnt_motion", "{}", self.counters.motion);
        row!("pmw_irq_cnt_no_move", "{}", self.counters.no_motion);
        row!("pmw_irq_cnt_surface", "{}", self.counters.on_surface);
        row!("pmw_irq_cnt_lifted", "{}", self.counters.lifted);
        row!("pmw_irq_cnt_run", "{}", self.counters.run);
        row!("pmw_irq_cnt_rest1", "{}", self.counters.rest1);
        row!("pmw_irq_cnt_rest2", "{}", self.counters.rest2);
        row!("pmw_irq_cnt_rest3", "{}", self.counters.rest3);
        Ok(())
    }
}

impl<'a, SPI, CS, D> ProtocolEngine<'a, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    fn capture_frame(&mut self, frame: &mut [u8]) {
        // Rest mode has to be off during the capture
        self.transport.write_register(Register::Config2, 0x00);

        self.transport.write_register(Register::FrameCapture, FRAME_CAPTURE_ARM);
        self.transport.write_register(Register::FrameCapture, FRAME_CAPTURE_START);
        self.transport.delay_ms(FRAME_CAPTURE_DELAY_MS);

        self.transport.read_burst(Register::RawDataBurst, frame);
    }
}

impl<'a, SPI, CS, D, IRQ> Pmw3360<'a, SPI, CS, D, IRQ>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
    IRQ: MotionInterrupt,
{
    /// Capture one raw 36x36 frame into the first [`FRAME_CAPTURE_LEN`] bytes of `frame`.
    ///
    /// The sensor needs a power-up reset after a frame capture, so the full bring-up is run
    /// again before returning. Motion accumulated before the capture is discarded.
    pub fn capture_frame(&mut self, frame: &mut [u8]) -> Result<(), CaptureError> {
        if frame.len() < FRAME_CAPTURE_LEN {
            return Err(CaptureError::BufferTooSmall {
                required: FRAME_CAPTURE_LEN,
                provided: frame.len(),
            });
        }
        if self.engine.stage != Stage::Running {
            return Err(CaptureError::NotRunning);
        }

        info!("PMW3360: Capturing frame");
        let mask = IrqMask::new(&mut self.irq);
        self.engine.capture_frame(&mut frame[..FRAME_CAPTURE_LEN]);
        self.engine.stage = Stage::Reset;
        // Bring-up enables the interrupt again once it succeeds
        mask.keep_masked();

        self.initialize().map_err(CaptureError::Reinit)
    }

    /// Read `count` motion bursts back to back and hand each one to `sink`.
    ///
    /// Motion read during the dump does not reach the accumulator.
    pub fn dump_samples<S: SampleSink>(&mut self, sink: &mut S, count: usize) -> Result<(), CaptureError> {
        if self.engine.stage != Stage::Running {
            return Err(CaptureError::NotRunning);
        }

        info!("PMW3360: Dumping {} samples", count);
        let _mask = IrqMask::new(&mut self.irq);
        for _ in 0..count {
            let report = self.engine.read_motion_report();
            let now = Instant::now().as_micros();
            if sink.record(now, &report).is_err() {
                warn!("PMW3360: Sample sink failed");
                return Err(CaptureError::Sink);
            }
        }
        Ok(())
    }

    /// Snapshot of stage, ids, configuration and counters. Reads the sensitivity and angle
    /// registers.
    pub fn status(&mut self) -> SensorStatus {
        SensorStatus {
            stage: self.engine.stage,
            ids: self.engine.ids,
            sensitivity: self.sensitivity(),
            angle: self.angle(),
            counters: self.counters,
            bus_errors: self.bus_errors(),
        }
    }
}
