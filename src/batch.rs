use std::path::PathBuf;

use crate::backend::PhysicsBackend;
use crate::config::SimulationConfig;
use crate::detection::{Detections, Detector, ImageMetadata};
use crate::error::Error;
use crate::estimate::estimate_all;
use crate::simulation::Simulation;
use crate::track::Track;

/// Tracks of `label`, checked against the number of input frames.
pub fn collect_tracks(
    detections: &Detections,
    label: &str,
    num_frames: usize,
) -> Result<Vec<Track>, Error> {
    let frames = detections
        .get(label)
        .ok_or_else(|| Error::Detector(format!("no detections for label {:?}", label)))?;

    if frames.len() < num_frames {
        return Err(Error::MissingFrame {
            frame: frames.len(),
            object: 0,
        });
    }

    if frames.len() > num_frames {
        return Err(Error::Detector(format!(
            "{} frames of {:?} for {} images",
            frames.len(),
            label,
            num_frames
        )));
    }

    Track::from_frames(frames)
}

/// Runs the whole batch: detection, per-track fitting and body seeding.
///
/// Any failure aborts before the first body is created.
pub fn prepare<D, M, B>(
    detector: &mut D,
    metadata: &M,
    images: &[PathBuf],
    label: &str,
    backend: B,
    mut config: SimulationConfig,
) -> Result<Simulation<B>, Error>
where
    D: Detector,
    M: ImageMetadata,
    B: PhysicsBackend,
{
    let first = images
        .first()
        .ok_or_else(|| Error::Detector("no input frames".into()))?;

    let detections = detector.detect(images, &[label])?;
    let tracks = collect_tracks(&detections, label, images.len())?;
    log::info!("{} {:?} tracks over {} frames", tracks.len(), label, images.len());

    let estimates = estimate_all(&tracks)?;

    config.viewport = metadata.dimensions(first)?;

    Simulation::init(backend, config, &estimates)
}
