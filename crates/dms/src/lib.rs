//! Driver Monitoring System (DMS)
//!
//! Real-time driver alertness classification from facial landmarks:
//! - Eye closure (EAR) and PERCLOS drowsiness index
//! - Blink rate
//! - Head pitch/yaw distraction
//! - Calibration warm-up and frame-rate guard
//!
//! Landmark detection, capture and alarm playback live outside this crate;
//! [`DmsSession`] consumes landmarks and emits levels and alarm edges.

pub mod aggregator;
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod guard;
pub mod machine;
pub mod session;
pub mod state;

pub use aggregator::{ChartPoint, EyeUpdate, TemporalAggregator};
pub use analysis::{Frame, FrameReport, SessionMetrics, SessionSummary};
pub use calibration::{CalibrationController, CalibrationPhase, CalibrationState};
pub use config::{ClosureTiming, DmsConfig};
pub use guard::{FrameRateGuard, GuardVerdict};
pub use machine::{AlertInputs, AlertStateMachine, AlertThresholds};
pub use session::{DmsSession, ShutdownListener};
pub use state::{AlertCause, AlertLevel, AlertState, AlertStatus};

pub use alerting::AlarmEdge;

use feature_engine::FeatureError;
use ring_buffer::RingBufferError;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feature configuration error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Rolling window error: {0}")]
    Window(#[from] RingBufferError),
}
