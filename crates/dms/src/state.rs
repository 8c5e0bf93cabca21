//! Alert levels, causes, and driver state snapshots

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete alert level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Safe,
    Warning,
    Danger,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Safe => "safe",
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which branch produced the current level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertCause {
    /// No capture running
    Idle,
    /// Warm-up in progress
    Calibrating { seconds_left: f64 },
    /// Capture running but the detector returned no face
    NoFace,
    /// Frame-rate guard tripped
    StalledPipeline,
    /// Pitch over threshold
    LookingDown { pitch_deg: f64 },
    /// Yaw over threshold
    LookingAway { yaw_deg: f64 },
    /// Continuous closure over threshold
    EyesClosed { seconds: f64 },
    /// Rolling PERCLOS over threshold
    HighPerclos { perclos: f64 },
    /// Nothing fired
    Awake,
}

impl AlertCause {
    pub fn level(&self) -> AlertLevel {
        match self {
            AlertCause::Awake => AlertLevel::Safe,
            AlertCause::Idle | AlertCause::Calibrating { .. } | AlertCause::LookingAway { .. } => {
                AlertLevel::Warning
            }
            AlertCause::NoFace
            | AlertCause::StalledPipeline
            | AlertCause::LookingDown { .. }
            | AlertCause::EyesClosed { .. }
            | AlertCause::HighPerclos { .. } => AlertLevel::Danger,
        }
    }

    /// What this cause asks of the alarm latch
    ///
    /// `None` leaves the latch as it is; only the distraction and fatigue
    /// branches start or stop the alarm.
    pub fn alarm_demand(&self) -> Option<bool> {
        match self {
            AlertCause::LookingDown { .. }
            | AlertCause::LookingAway { .. }
            | AlertCause::EyesClosed { .. }
            | AlertCause::HighPerclos { .. } => Some(true),
            AlertCause::Awake => Some(false),
            AlertCause::Idle
            | AlertCause::Calibrating { .. }
            | AlertCause::NoFace
            | AlertCause::StalledPipeline => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AlertCause::Idle => "Monitoring idle".to_string(),
            AlertCause::Calibrating { seconds_left } => {
                format!("Calibrating, blink naturally ({seconds_left:.1}s left)")
            }
            AlertCause::NoFace => "Face not found, align your face with the camera".to_string(),
            AlertCause::StalledPipeline => {
                "Severe frame stall, capture will stop to protect the device".to_string()
            }
            AlertCause::LookingDown { pitch_deg } => format!("Looking down, pitch {pitch_deg:.1}°"),
            AlertCause::LookingAway { yaw_deg } => format!("Looking away, yaw {yaw_deg:.1}°"),
            AlertCause::EyesClosed { seconds } => format!("Eyes closed for {seconds:.1}s"),
            AlertCause::HighPerclos { perclos } => {
                format!("Extreme fatigue, PERCLOS {:.1}%", perclos * 100.0)
            }
            AlertCause::Awake => "Driver alert".to_string(),
        }
    }
}

/// Latest classification with its display message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStatus {
    pub level: AlertLevel,
    pub cause: AlertCause,
    pub message: String,
}

impl From<AlertCause> for AlertStatus {
    fn from(cause: AlertCause) -> Self {
        Self {
            level: cause.level(),
            message: cause.message(),
            cause,
        }
    }
}

impl Default for AlertStatus {
    /// Pre-calibration default
    fn default() -> Self {
        AlertCause::Idle.into()
    }
}

/// Alert level plus alarm activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub level: AlertLevel,
    pub is_alarm_active: bool,
}
