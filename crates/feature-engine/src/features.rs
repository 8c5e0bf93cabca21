//! Per-frame feature sample assembly

use crate::eye::face_aspect_ratio;
use crate::landmarks::{mesh, EyeIndices, LandmarkSet};
use crate::pose::{HeadPose, HeadPoseEstimator, PoseConfig, ViewportPoseEstimator};
use crate::FeatureError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Features derived from one landmark set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSample {
    /// Mean eye aspect ratio of both eyes
    pub eye_aspect_ratio: f64,
    /// Head pitch in degrees (positive = looking down)
    pub pitch_deg: f64,
    /// Head yaw in degrees
    pub yaw_deg: f64,
    /// Frame timestamp (seconds)
    pub timestamp: f64,
}

impl FeatureSample {
    pub fn pose(&self) -> HeadPose {
        HeadPose {
            pitch_deg: self.pitch_deg,
            yaw_deg: self.yaw_deg,
        }
    }
}

/// Eye contour indices for both eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    pub left: EyeIndices,
    pub right: EyeIndices,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            left: mesh::LEFT_EYE,
            right: mesh::RIGHT_EYE,
        }
    }
}

/// Feature extraction configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub eyes: EyeConfig,
    pub pose: PoseConfig,
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        self.pose.validate()
    }
}

/// Feature extractor that turns landmarks into a [`FeatureSample`]
pub struct FeatureExtractor {
    eyes: EyeConfig,
    estimator: Box<dyn HeadPoseEstimator>,
}

impl FeatureExtractor {
    /// Create an extractor using the viewport pose heuristic
    pub fn new(config: &FeatureConfig) -> Result<Self, FeatureError> {
        let estimator = ViewportPoseEstimator::new(config.pose)?;
        Ok(Self::with_estimator(config.eyes, Box::new(estimator)))
    }

    /// Create an extractor with a custom pose estimator
    pub fn with_estimator(eyes: EyeConfig, estimator: Box<dyn HeadPoseEstimator>) -> Self {
        debug!("Feature extractor using pose estimator '{}'", estimator.name());
        Self { eyes, estimator }
    }

    /// Extract features from one frame
    pub fn extract(&self, landmarks: &LandmarkSet, timestamp: f64) -> FeatureSample {
        let eye_aspect_ratio = face_aspect_ratio(landmarks, &self.eyes.left, &self.eyes.right);
        let pose = self.estimator.estimate(landmarks);

        FeatureSample {
            eye_aspect_ratio,
            pitch_deg: pose.pitch_deg,
            yaw_deg: pose.yaw_deg,
            timestamp,
        }
    }

    pub fn estimator_name(&self) -> &str {
        self.estimator.name()
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("eyes", &self.eyes)
            .field("estimator", &self.estimator.name())
            .finish()
    }
}
