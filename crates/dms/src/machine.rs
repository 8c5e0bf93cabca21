//! Alert state machine: priority ordering of distraction and fatigue checks

use crate::guard::GuardVerdict;
use crate::state::AlertCause;
use crate::DmsConfig;
use feature_engine::FeatureSample;

/// Everything the classifier looks at for one calibrated frame
#[derive(Debug, Clone, Copy)]
pub struct AlertInputs<'a> {
    pub sample: &'a FeatureSample,
    /// Eyes below the aspect-ratio threshold on this frame
    pub eyes_closed: bool,
    /// Duration of the current closed run (seconds)
    pub closed_seconds: f64,
    /// Rolling PERCLOS fraction
    pub perclos: f64,
    pub guard: GuardVerdict,
}

/// Threshold set for [`AlertStateMachine::evaluate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub pitch_deg: f64,
    pub yaw_deg: f64,
    pub long_close_seconds: f64,
    pub perclos: f64,
}

impl From<&DmsConfig> for AlertThresholds {
    fn from(config: &DmsConfig) -> Self {
        Self {
            pitch_deg: config.pitch_threshold_deg,
            yaw_deg: config.yaw_threshold_deg,
            long_close_seconds: config.long_close_seconds,
            perclos: config.perclos_threshold,
        }
    }
}

/// First-match-wins classifier
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    thresholds: AlertThresholds,
}

impl AlertStateMachine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Resolve the cause for one frame
    ///
    /// Order: stalled pipeline, looking down, looking away, prolonged
    /// closure, high PERCLOS, awake.
    pub fn evaluate(&self, inputs: &AlertInputs<'_>) -> AlertCause {
        let t = &self.thresholds;
        let sample = inputs.sample;

        if inputs.guard == GuardVerdict::Tripped {
            return AlertCause::StalledPipeline;
        }
        if sample.pitch_deg > t.pitch_deg {
            return AlertCause::LookingDown {
                pitch_deg: sample.pitch_deg,
            };
        }
        if sample.yaw_deg.abs() > t.yaw_deg {
            return AlertCause::LookingAway {
                yaw_deg: sample.yaw_deg,
            };
        }
        if inputs.eyes_closed && inputs.closed_seconds >= t.long_close_seconds {
            return AlertCause::EyesClosed {
                seconds: inputs.closed_seconds,
            };
        }
        if inputs.perclos >= t.perclos {
            return AlertCause::HighPerclos {
                perclos: inputs.perclos,
            };
        }
        AlertCause::Awake
    }
}
