//! Calibration warm-up controller

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Calibration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CalibrationPhase {
    NotStarted,
    Calibrating { frames_remaining: u32 },
    Complete,
}

/// Published calibration progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub frames_remaining: u32,
    pub is_complete: bool,
}

/// Counts qualifying frames down to the end of the warm-up
#[derive(Debug, Clone)]
pub struct CalibrationController {
    total_frames: u32,
    phase: CalibrationPhase,
}

impl CalibrationController {
    pub fn new(total_frames: u32) -> Self {
        Self {
            total_frames,
            phase: CalibrationPhase::NotStarted,
        }
    }

    /// Begin (or restart) the warm-up
    pub fn start(&mut self) {
        debug!("Calibration started: {} frames", self.total_frames);
        self.phase = CalibrationPhase::Calibrating {
            frames_remaining: self.total_frames,
        };
    }

    pub fn reset(&mut self) {
        self.phase = CalibrationPhase::NotStarted;
    }

    /// Count one frame with a valid detection
    ///
    /// Returns `true` only on the frame that completes calibration.
    pub fn on_qualifying_frame(&mut self) -> bool {
        let CalibrationPhase::Calibrating { frames_remaining } = self.phase else {
            return false;
        };

        let frames_remaining = frames_remaining.saturating_sub(1);
        if frames_remaining == 0 {
            info!("Calibration complete after {} frames", self.total_frames);
            self.phase = CalibrationPhase::Complete;
            true
        } else {
            self.phase = CalibrationPhase::Calibrating { frames_remaining };
            false
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == CalibrationPhase::Complete
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Calibrating { .. })
    }

    pub fn frames_remaining(&self) -> u32 {
        match self.phase {
            CalibrationPhase::NotStarted => self.total_frames,
            CalibrationPhase::Calibrating { frames_remaining } => frames_remaining,
            CalibrationPhase::Complete => 0,
        }
    }

    /// Remaining warm-up at the nominal frame rate
    pub fn seconds_left(&self, assumed_fps: f64) -> f64 {
        (self.frames_remaining() as f64 / assumed_fps).max(0.0)
    }

    pub fn state(&self) -> CalibrationState {
        CalibrationState {
            frames_remaining: self.frames_remaining(),
            is_complete: self.is_complete(),
        }
    }
}
