//! DMS configuration

use crate::DmsError;
use feature_engine::FeatureConfig;
use serde::{Deserialize, Serialize};

/// Largest rolling window accepted (one hour at 30 fps)
pub const MAX_WINDOW_FRAMES: u64 = 108_000;

/// Convert a whole frame count computed in floating point, rejecting values
/// below one frame or beyond `u32`
fn frame_count(name: &str, frames: f64) -> Result<u32, DmsError> {
    if frames.is_finite() && frames >= 1.0 && frames <= f64::from(u32::MAX) {
        Ok(frames as u32)
    } else {
        Err(DmsError::Config(format!(
            "{name} gives {frames} frames, expected 1..={}",
            u32::MAX
        )))
    }
}

/// How the duration of a continuous eye closure is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureTiming {
    /// Closed frames divided by the average fps since the session origin
    #[default]
    AverageFps,
    /// Timestamp difference since the first closed frame of the run
    WallClock,
}

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye aspect ratio below which the eyes count as closed
    pub ear_threshold: f64,

    /// Continuous closure that raises a drowsiness alarm (seconds)
    pub long_close_seconds: f64,

    /// PERCLOS fraction that raises a fatigue alarm
    pub perclos_threshold: f64,

    /// Closed/open flags kept for PERCLOS (frames)
    pub perclos_window_frames: usize,

    /// Pitch above which the driver is looking down (degrees)
    pub pitch_threshold_deg: f64,

    /// Absolute yaw above which the driver is looking away (degrees)
    pub yaw_threshold_deg: f64,

    /// Warm-up before classification starts (seconds)
    pub calibration_seconds: f64,

    /// Nominal capture rate used to turn durations into frame counts
    pub assumed_fps: f64,

    /// Blink history kept for the blink rate (frames)
    pub blink_window_frames: u64,

    /// Shortest closed run that counts as a blink (frames)
    pub min_blink_frames: u32,

    /// Interval between PERCLOS chart points (seconds)
    pub chart_interval_seconds: f64,

    /// Instantaneous fps below which the pipeline counts as stalled
    pub low_fps_threshold: f64,

    /// Accumulated stall that trips the frame-rate guard (seconds)
    pub max_low_fps_seconds: f64,

    /// Delay between a guard trip and the shutdown request (seconds)
    pub shutdown_grace_seconds: f64,

    /// Closure duration measurement
    pub closure_timing: ClosureTiming,

    /// Landmark feature extraction
    pub features: FeatureConfig,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            long_close_seconds: 1.5,
            perclos_threshold: 0.25,
            perclos_window_frames: 600,
            pitch_threshold_deg: 15.0,
            yaw_threshold_deg: 20.0,
            calibration_seconds: 5.0,
            assumed_fps: 30.0,
            blink_window_frames: 300,
            min_blink_frames: 2,
            chart_interval_seconds: 5.0,
            low_fps_threshold: 5.0,
            max_low_fps_seconds: 3.0,
            shutdown_grace_seconds: 3.0,
            closure_timing: ClosureTiming::AverageFps,
            features: FeatureConfig::default(),
        }
    }
}

impl DmsConfig {
    /// Create strict config (earlier alarms)
    pub fn strict() -> Self {
        Self {
            long_close_seconds: 1.0,
            perclos_threshold: 0.15,
            pitch_threshold_deg: 10.0,
            yaw_threshold_deg: 15.0,
            ..Default::default()
        }
    }

    /// Create lenient config (later alarms)
    pub fn lenient() -> Self {
        Self {
            long_close_seconds: 2.5,
            perclos_threshold: 0.35,
            pitch_threshold_deg: 25.0,
            yaw_threshold_deg: 30.0,
            ..Default::default()
        }
    }

    /// Qualifying frames needed to finish calibration
    pub fn calibration_frames(&self) -> Result<u32, DmsError> {
        let frames = (self.calibration_seconds * self.assumed_fps).ceil();
        frame_count("calibration_seconds", frames)
    }

    /// Frames between chart snapshots
    pub fn chart_interval_frames(&self) -> Result<u32, DmsError> {
        let frames = (self.chart_interval_seconds * self.assumed_fps).round();
        frame_count("chart_interval_seconds", frames)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        fn positive(name: &str, value: f64) -> Result<(), DmsError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(DmsError::Config(format!("{name} must be positive, got {value}")))
            }
        }

        positive("ear_threshold", self.ear_threshold)?;
        positive("long_close_seconds", self.long_close_seconds)?;
        positive("calibration_seconds", self.calibration_seconds)?;
        positive("assumed_fps", self.assumed_fps)?;
        positive("chart_interval_seconds", self.chart_interval_seconds)?;
        positive("low_fps_threshold", self.low_fps_threshold)?;
        positive("max_low_fps_seconds", self.max_low_fps_seconds)?;

        if !(self.perclos_threshold > 0.0 && self.perclos_threshold <= 1.0) {
            return Err(DmsError::Config(format!(
                "perclos_threshold must be in (0, 1], got {}",
                self.perclos_threshold
            )));
        }
        for (name, value) in [
            ("pitch_threshold_deg", self.pitch_threshold_deg),
            ("yaw_threshold_deg", self.yaw_threshold_deg),
        ] {
            if !value.is_finite() {
                return Err(DmsError::Config(format!("{name} must be finite, got {value}")));
            }
        }
        if !(self.shutdown_grace_seconds.is_finite() && self.shutdown_grace_seconds >= 0.0) {
            return Err(DmsError::Config(format!(
                "shutdown_grace_seconds must be non-negative, got {}",
                self.shutdown_grace_seconds
            )));
        }
        for (name, frames) in [
            ("perclos_window_frames", self.perclos_window_frames as u64),
            ("blink_window_frames", self.blink_window_frames),
        ] {
            if frames == 0 || frames > MAX_WINDOW_FRAMES {
                return Err(DmsError::Config(format!(
                    "{name} must be in 1..={MAX_WINDOW_FRAMES}, got {frames}"
                )));
            }
        }
        if self.min_blink_frames == 0 {
            return Err(DmsError::Config("min_blink_frames must be at least 1".into()));
        }
        self.calibration_frames()?;
        self.chart_interval_frames()?;

        self.features.validate()?;
        Ok(())
    }
}
