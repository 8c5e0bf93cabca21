//! Feature Engineering Engine
//!
//! Turns one frame of facial landmarks into the scalar features the driver
//! monitoring core works with:
//! - Eye aspect ratio (per eye and face mean)
//! - Head pitch and yaw (viewport-scaled approximation)

mod eye;
mod features;
pub mod landmarks;
mod pose;

pub use eye::{eye_aspect_ratio, face_aspect_ratio};
pub use features::{EyeConfig, FeatureConfig, FeatureExtractor, FeatureSample};
pub use landmarks::{EyeIndices, Landmark, LandmarkSet};
pub use pose::{
    HeadPose, HeadPoseEstimator, PoseConfig, PoseGains, PoseLandmarks, Viewport,
    ViewportPoseEstimator,
};

use thiserror::Error;

/// Feature extraction configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Viewport dimensions must be finite and positive
    #[error("Invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    /// Gain factors must be finite
    #[error("Invalid pose gain {name}: {value}")]
    InvalidGain { name: &'static str, value: f64 },
}
