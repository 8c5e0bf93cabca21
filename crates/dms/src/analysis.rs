//! Frame input, per-frame reports and session snapshots

use crate::aggregator::ChartPoint;
use crate::calibration::CalibrationState;
use crate::state::{AlertLevel, AlertStatus};
use alerting::AlarmEdge;
use feature_engine::{FeatureSample, LandmarkSet};
use serde::{Deserialize, Serialize};

/// One frame from the landmark detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Capture time (seconds, monotonic)
    #[serde(rename = "t")]
    pub timestamp: f64,

    /// First detected face; `None` or empty means no face
    #[serde(default)]
    pub landmarks: Option<LandmarkSet>,
}

impl Frame {
    pub fn new(timestamp: f64, landmarks: LandmarkSet) -> Self {
        Self {
            timestamp,
            landmarks: Some(landmarks),
        }
    }

    pub fn no_face(timestamp: f64) -> Self {
        Self {
            timestamp,
            landmarks: None,
        }
    }

    /// Landmarks if a face was detected
    pub fn face(&self) -> Option<&LandmarkSet> {
        self.landmarks.as_ref().filter(|set| !set.is_empty())
    }
}

/// Result of processing one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Whether the frame was consumed (capture active)
    pub processed: bool,

    pub status: AlertStatus,

    /// Features of the frame, if a face was present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<FeatureSample>,

    /// Instantaneous frame rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,

    /// Duration of the current closed-eye run (seconds)
    pub closed_seconds: f64,

    /// Alarm transition fired on this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_edge: Option<AlarmEdge>,

    /// A protective shutdown was delivered on this frame
    pub shutdown_requested: bool,
}

impl FrameReport {
    /// Report for a frame received while capture is stopped
    pub(crate) fn ignored(status: AlertStatus) -> Self {
        Self {
            processed: false,
            status,
            sample: None,
            fps: None,
            closed_seconds: 0.0,
            alarm_edge: None,
            shutdown_requested: false,
        }
    }

    pub fn level(&self) -> AlertLevel {
        self.status.level
    }
}

/// Read-only session snapshot
///
/// Feature-derived values are `None` when unavailable: no face on the last
/// frame, or calibration still running for the aggregated ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub capture_active: bool,
    pub calibration: CalibrationState,

    /// Seconds since the post-calibration origin
    pub elapsed_seconds: f64,

    /// Alarm activations since the session started
    pub total_alarms: u64,
    pub alarm_active: bool,

    /// Frames since the post-calibration origin
    pub frame_count: u64,

    pub perclos_percent: Option<f64>,
    pub blink_rate_bpm: Option<f64>,
    pub pitch_deg: Option<f64>,
    pub yaw_deg: Option<f64>,
    pub eye_aspect_ratio: Option<f64>,

    /// Current closed-eye run (seconds)
    pub closed_seconds: f64,

    /// Instantaneous frame rate
    pub fps: Option<f64>,
}

/// End-of-session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub metrics: SessionMetrics,
    pub status: AlertStatus,
    pub chart: Vec<ChartPoint>,
    /// Fatigue line drawn over the chart (percent)
    pub perclos_threshold_percent: f64,
}

impl SessionSummary {
    /// Highest PERCLOS seen at a chart point
    pub fn peak_perclos_percent(&self) -> Option<f64> {
        self.chart
            .iter()
            .map(|p| p.perclos_percent)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }

    /// Chart points at or above the fatigue line
    pub fn points_over_threshold(&self) -> usize {
        self.chart
            .iter()
            .filter(|p| p.perclos_percent >= self.perclos_threshold_percent)
            .count()
    }
}
