//! Temporal aggregation: PERCLOS, blink counting, chart history

use crate::{DmsConfig, DmsError};
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One recorded point of the PERCLOS history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Whole seconds since the post-calibration origin
    pub time_seconds: f64,
    /// PERCLOS at that moment (0-100)
    pub perclos_percent: f64,
}

/// Outcome of recording one frame's eye state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeUpdate {
    /// Eyes below the aspect-ratio threshold this frame
    pub closed: bool,
    /// Length of the current closed run (0 when open)
    pub closed_frames: u32,
    /// This frame ended a closed run long enough to count as a blink
    pub blink: bool,
}

/// Rolling windows over per-frame eye state
///
/// Windows are measured in frames; only the blink rate converts to seconds,
/// using the measured frame rate supplied by the caller.
#[derive(Debug, Clone)]
pub struct TemporalAggregator {
    /// Closed (true) / open (false) flags
    closed_window: RingBuffer<bool>,
    /// Running count of `true` entries in `closed_window`
    closed_in_window: usize,
    /// Current consecutive closed frames
    closed_run: u32,
    /// Timestamp of the first frame of the current closed run
    closed_run_started_at: Option<f64>,
    /// Frame indices at which blinks ended
    blinks: RingBuffer<u64>,
    blink_window_frames: u64,
    min_blink_frames: u32,
    /// PERCLOS history for charting
    chart: Vec<ChartPoint>,
    chart_interval_frames: u64,
}

impl TemporalAggregator {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        // A blink spans at least one frame, so the window never holds more
        // blinks than frames
        let blink_capacity = usize::try_from(config.blink_window_frames)
            .map_err(|_| DmsError::Config("blink_window_frames does not fit in memory".into()))?;

        Ok(Self {
            closed_window: RingBuffer::new(config.perclos_window_frames)?,
            closed_in_window: 0,
            closed_run: 0,
            closed_run_started_at: None,
            blinks: RingBuffer::new(blink_capacity)?,
            blink_window_frames: config.blink_window_frames,
            min_blink_frames: config.min_blink_frames,
            chart: Vec::new(),
            chart_interval_frames: u64::from(config.chart_interval_frames()?),
        })
    }

    /// Record one frame's eye state
    ///
    /// `frame_index` is the post-calibration frame counter (1 for the first
    /// frame) and `timestamp` the frame time in seconds.
    pub fn record(&mut self, closed: bool, frame_index: u64, timestamp: f64) -> EyeUpdate {
        if closed {
            self.closed_in_window += 1;
        }
        if self.closed_window.push(closed) == Some(true) {
            self.closed_in_window -= 1;
        }

        let mut blink = false;
        if closed {
            self.closed_run += 1;
            self.closed_run_started_at.get_or_insert(timestamp);
        } else {
            if self.closed_run >= self.min_blink_frames {
                self.blinks.push(frame_index);
                blink = true;
                debug!("Blink after {} closed frames at frame {}", self.closed_run, frame_index);
            }
            self.closed_run = 0;
            self.closed_run_started_at = None;
        }

        let window = self.blink_window_frames;
        self.blinks.evict_while(|&f| f.saturating_add(window) <= frame_index);

        EyeUpdate {
            closed,
            closed_frames: self.closed_run,
            blink,
        }
    }

    /// Fraction of closed frames in the window, `None` before any frame
    pub fn perclos(&self) -> Option<f64> {
        if self.closed_window.is_empty() {
            return None;
        }
        Some(self.closed_in_window as f64 / self.closed_window.len() as f64)
    }

    /// Frames in the PERCLOS window
    pub fn window_len(&self) -> usize {
        self.closed_window.len()
    }

    pub fn closed_run_frames(&self) -> u32 {
        self.closed_run
    }

    /// Wall-clock length of the current closed run
    pub fn closed_run_seconds(&self, now: f64) -> f64 {
        self.closed_run_started_at
            .map(|start| (now - start).max(0.0))
            .unwrap_or(0.0)
    }

    /// Blinks inside the blink window
    pub fn blink_count(&self) -> usize {
        self.blinks.len()
    }

    /// Blinks per minute
    ///
    /// The window covers `min(frame_count, blink_window_frames)` frames,
    /// converted to seconds with `measured_fps`. Reports 0 when that span is
    /// zero or the rate is unknown.
    pub fn blink_rate(&self, frame_count: u64, measured_fps: f64) -> f64 {
        let covered_frames = frame_count.min(self.blink_window_frames) as f64;
        let elapsed = covered_frames / measured_fps;
        if !(elapsed > 0.0) || !elapsed.is_finite() {
            return 0.0;
        }
        self.blinks.len() as f64 / elapsed * 60.0
    }

    /// Append a chart point every `chart_interval_frames` frames
    pub fn maybe_snapshot(&mut self, frame_count: u64, elapsed_seconds: f64) -> Option<ChartPoint> {
        if frame_count == 0 || frame_count % self.chart_interval_frames != 0 {
            return None;
        }
        let point = ChartPoint {
            time_seconds: elapsed_seconds.max(0.0).floor(),
            perclos_percent: self.perclos().unwrap_or(0.0) * 100.0,
        };
        debug!("Chart point {:?}", point);
        self.chart.push(point);
        Some(point)
    }

    pub fn chart(&self) -> &[ChartPoint] {
        &self.chart
    }

    /// Clear every window and the chart history
    pub fn reset(&mut self) {
        self.closed_window.clear();
        self.closed_in_window = 0;
        self.closed_run = 0;
        self.closed_run_started_at = None;
        self.blinks.clear();
        self.chart.clear();
    }
}
