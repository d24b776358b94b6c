use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Contains (x,y) of the circle center and its radius, in pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "r")]
    pub radius: f32,
}

impl Observation {
    #[inline]
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }
}

/// Per label, per frame, the observations of every object in that frame.
/// Object `j` of one frame is the same physical object as object `j` of any
/// other frame.
pub type Detections = HashMap<String, Vec<Vec<Observation>>>;

pub trait Detector {
    fn detect(&mut self, images: &[PathBuf], labels: &[&str]) -> Result<Detections, Error>;
}

pub trait ImageMetadata {
    fn dimensions(&self, image: &Path) -> Result<(u32, u32), Error>;
}
