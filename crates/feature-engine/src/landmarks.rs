//! Facial landmark types and face-mesh topology indices

use serde::{Deserialize, Serialize};

/// Six eye-contour indices: outer corner, upper-outer, upper-inner,
/// inner corner, lower-inner, lower-outer
pub type EyeIndices = [usize; 6];

/// Face-mesh landmark indices used by the feature extractor
pub mod mesh {
    use super::EyeIndices;

    /// Points in the base face mesh
    pub const MESH_POINTS: usize = 468;
    /// Points when iris refinement is enabled
    pub const REFINED_MESH_POINTS: usize = 478;

    pub const LEFT_EYE: EyeIndices = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE: EyeIndices = [362, 385, 387, 263, 373, 380];

    pub const NOSE_TIP: usize = 1;
    pub const CHIN: usize = 152;
    pub const LEFT_EYE_OUTER: usize = 226;
    pub const RIGHT_EYE_OUTER: usize = 446;
    pub const MOUTH_LEFT: usize = 61;
    pub const MOUTH_RIGHT: usize = 291;
}

/// Normalized landmark point (x, y in [0, 1], z relative depth)
///
/// Serialized as a `[x, y, z]` triple, the layout detectors emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar (x, y) distance; depth is ignored
    pub fn distance_2d(&self, other: &Landmark) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Multiply every coordinate by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl From<[f64; 3]> for Landmark {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Landmark> for [f64; 3] {
    fn from(p: Landmark) -> Self {
        [p.x, p.y, p.z]
    }
}

/// All landmarks produced by the detector for one face in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Landmark at `index`, `None` if the detector returned fewer points
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Overwrite a single point, growing the set with zero points if needed
    pub fn set(&mut self, index: usize, point: Landmark) {
        if index >= self.points.len() {
            self.points.resize(index + 1, Landmark::default());
        }
        self.points[index] = point;
    }

    /// Uniformly scale every point
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.points.iter().map(|p| p.scaled(factor)).collect())
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}
