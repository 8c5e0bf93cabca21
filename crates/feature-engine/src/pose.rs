//! Head pose approximation from facial landmarks
//!
//! [`ViewportPoseEstimator`] is not a calibrated 3-D pose solve. It maps six
//! landmarks into pixel space using the current viewport size and reads pitch
//! and yaw off simple angle relations, so its output depends on the viewport
//! resolution and aspect ratio. The gain factors were tuned by hand against a
//! 1280x720 capture and live in [`PoseGains`] so they can be retuned.

use crate::landmarks::{mesh, Landmark, LandmarkSet};
use crate::FeatureError;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Head rotation in degrees
///
/// Positive pitch means looking down; the sign of yaw follows the
/// mouth-versus-eyes horizontal offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub pitch_deg: f64,
    pub yaw_deg: f64,
}

/// Estimates head pose from one landmark set
///
/// Implementations must be total: degenerate input yields a neutral pose.
pub trait HeadPoseEstimator: Send {
    fn estimate(&self, landmarks: &LandmarkSet) -> HeadPose;

    fn name(&self) -> &str;
}

/// Pixel dimensions used to de-normalize landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self, FeatureError> {
        let viewport = Self { width, height };
        viewport.validate()?;
        Ok(viewport)
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(FeatureError::InvalidViewport {
                width: self.width,
                height: self.height,
            })
        }
    }

    fn to_pixel(self, p: &Landmark) -> Landmark {
        // Depth shares the horizontal scale
        Landmark::new(p.x * self.width, p.y * self.height, p.z * self.width)
    }
}

/// Empirical gain factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseGains {
    /// Applied to the nose/chin pitch angle
    pub pitch: f64,
    /// Applied to the raw yaw angle
    pub yaw_angle: f64,
    /// Applied after `yaw_angle`
    pub yaw: f64,
    /// Multiplier on the eye-corner width used as the pitch reference
    pub pitch_reference: f64,
}

impl Default for PoseGains {
    fn default() -> Self {
        Self {
            pitch: 1.2,
            yaw_angle: 2.0,
            yaw: 1.5,
            pitch_reference: 1.5,
        }
    }
}

impl PoseGains {
    pub fn validate(&self) -> Result<(), FeatureError> {
        for (name, value) in [
            ("pitch", self.pitch),
            ("yaw_angle", self.yaw_angle),
            ("yaw", self.yaw),
            ("pitch_reference", self.pitch_reference),
        ] {
            if !value.is_finite() {
                return Err(FeatureError::InvalidGain { name, value });
            }
        }
        Ok(())
    }
}

/// Landmark indices feeding the pose estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseLandmarks {
    pub nose_tip: usize,
    pub chin: usize,
    pub left_eye_outer: usize,
    pub right_eye_outer: usize,
    pub mouth_left: usize,
    pub mouth_right: usize,
}

impl Default for PoseLandmarks {
    fn default() -> Self {
        Self {
            nose_tip: mesh::NOSE_TIP,
            chin: mesh::CHIN,
            left_eye_outer: mesh::LEFT_EYE_OUTER,
            right_eye_outer: mesh::RIGHT_EYE_OUTER,
            mouth_left: mesh::MOUTH_LEFT,
            mouth_right: mesh::MOUTH_RIGHT,
        }
    }
}

/// Pose estimator configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub viewport: Viewport,
    pub gains: PoseGains,
    pub landmarks: PoseLandmarks,
}

impl PoseConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        self.viewport.validate()?;
        self.gains.validate()
    }
}

/// Viewport-scaled pitch/yaw heuristic
#[derive(Debug, Clone, Default)]
pub struct ViewportPoseEstimator {
    config: PoseConfig,
}

impl ViewportPoseEstimator {
    pub fn new(config: PoseConfig) -> Result<Self, FeatureError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Follow a capture or display resize
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), FeatureError> {
        viewport.validate()?;
        self.config.viewport = viewport;
        Ok(())
    }

    pub fn config(&self) -> &PoseConfig {
        &self.config
    }

    fn pitch(&self, nose: &Landmark, chin: &Landmark, eye_l: &Landmark, eye_r: &Landmark) -> f64 {
        let reference = (eye_l.x - eye_r.x).abs() * self.config.gains.pitch_reference;
        if !(reference > 0.0) {
            return 0.0;
        }
        // Image y grows downward, so flip the sign to make "looking down" positive
        -(nose.y - chin.y).atan2(nose.z - chin.z).to_degrees()
    }

    fn yaw(&self, eye_l: &Landmark, eye_r: &Landmark, mouth_l: &Landmark, mouth_r: &Landmark) -> f64 {
        let eye_mid_x = (eye_l.x + eye_r.x) / 2.0;
        let mouth_mid_x = (mouth_l.x + mouth_r.x) / 2.0;
        let face_width = eye_l.distance_2d(eye_r);
        if !(face_width > 0.0) {
            return 0.0;
        }
        (mouth_mid_x - eye_mid_x).atan2(face_width).to_degrees() * self.config.gains.yaw_angle
    }
}

impl HeadPoseEstimator for ViewportPoseEstimator {
    fn estimate(&self, landmarks: &LandmarkSet) -> HeadPose {
        let idx = &self.config.landmarks;
        let points = [
            idx.nose_tip,
            idx.chin,
            idx.left_eye_outer,
            idx.right_eye_outer,
            idx.mouth_left,
            idx.mouth_right,
        ]
        .map(|i| landmarks.get(i).map(|p| self.config.viewport.to_pixel(p)));

        let [Some(nose), Some(chin), Some(eye_l), Some(eye_r), Some(mouth_l), Some(mouth_r)] = points
        else {
            trace!("Pose landmarks missing ({} points), using neutral pose", landmarks.len());
            return HeadPose::default();
        };

        let gains = &self.config.gains;
        let pitch = self.pitch(&nose, &chin, &eye_l, &eye_r) * gains.pitch;
        let yaw = self.yaw(&eye_l, &eye_r, &mouth_l, &mouth_r) * gains.yaw;

        HeadPose {
            pitch_deg: if pitch.is_finite() { pitch } else { 0.0 },
            yaw_deg: if yaw.is_finite() { yaw } else { 0.0 },
        }
    }

    fn name(&self) -> &str {
        "viewport-heuristic"
    }
}
