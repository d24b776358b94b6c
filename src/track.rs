use ndarray::prelude::*;

use crate::detection::Observation;
use crate::error::Error;
use crate::math;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    // frame index
    pub t: f32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: usize,
    samples: Vec<Sample>,
}

impl Track {
    pub fn new(id: usize, samples: Vec<Sample>) -> Self {
        Self { id, samples }
    }

    /// Builds one track per object from frame-major detector output.
    ///
    /// The object count is taken from the first frame; every later frame must
    /// contain at least that many observations.
    pub fn from_frames(frames: &[Vec<Observation>]) -> Result<Vec<Track>, Error> {
        let first = match frames.first() {
            Some(first) => first,
            None => return Ok(Vec::new()),
        };

        (0..first.len())
            .map(|object| -> Result<Track, Error> {
                let samples = frames
                    .iter()
                    .enumerate()
                    .map(|(frame, observations)| -> Result<Sample, Error> {
                        let obs = observations
                            .get(object)
                            .ok_or(Error::MissingFrame { frame, object })?;

                        Ok(Sample {
                            t: frame as f32,
                            x: obs.x,
                            y: obs.y,
                            radius: obs.radius,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Track::new(object, samples))
            })
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Arithmetic mean of the per-frame radii. Bad detector radii are not
    /// filtered out.
    pub fn mean_radius(&self) -> f32 {
        math::mean(self.samples.iter().map(|s| s.radius))
    }

    /// Row 0 holds x, row 1 holds y.
    pub fn axes(&self) -> Array2<f32> {
        let mut out = Array2::zeros((2, self.samples.len()));

        for (idx, s) in self.samples.iter().enumerate() {
            out[[0, idx]] = s.x;
            out[[1, idx]] = s.y;
        }

        out
    }

    /// Frame indices repeated for both axes, aligned with [`Track::axes`].
    pub fn time_sequence(&self) -> Array2<f32> {
        Array2::from_shape_fn((2, self.samples.len()), |(_, idx)| self.samples[idx].t)
    }
}

/// Per-track, per-axis series ready for fitting.
///
/// `desired_output[i].row(j)` is the observed series of axis `j` of track
/// `i`, and `time_sequence[i].row(j)` holds the aligned frame indices.
#[derive(Debug, Clone, Default)]
pub struct RowData {
    pub desired_output: Vec<Array2<f32>>,
    pub time_sequence: Vec<Array2<f32>>,
}

impl RowData {
    #[inline]
    pub fn len(&self) -> usize {
        self.desired_output.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.desired_output.is_empty()
    }
}

pub fn row_data(tracks: &[Track]) -> RowData {
    let mut data = RowData::default();

    for track in tracks {
        data.desired_output.push(track.axes());
        data.time_sequence.push(track.time_sequence());
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> Vec<Vec<Observation>> {
        vec![
            vec![Observation::new(0.0, 5.0, 2.0), Observation::new(100.0, 50.0, 8.0)],
            vec![Observation::new(10.0, 6.0, 4.0), Observation::new(90.0, 50.0, 8.0)],
            vec![Observation::new(40.0, 7.0, 6.0), Observation::new(80.0, 50.0, 8.0)],
        ]
    }

    #[test]
    fn test_from_frames_transposes() {
        let tracks = Track::from_frames(&frames()).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].len(), 3);
        assert_eq!(tracks[1].id, 1);

        let xs: Vec<f32> = tracks[0].iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![0.0, 10.0, 40.0]);

        let ts: Vec<f32> = tracks[1].iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_from_frames_missing_object() {
        let mut frames = frames();
        frames[2].pop();

        assert!(matches!(
            Track::from_frames(&frames),
            Err(Error::MissingFrame { frame: 2, object: 1 })
        ));
    }

    #[test]
    fn test_mean_radius_passes_nan_through() {
        let tracks = Track::from_frames(&frames()).unwrap();
        assert_eq!(tracks[0].mean_radius(), 4.0);

        let nan = Track::new(
            0,
            vec![Sample { t: 0.0, x: 0.0, y: 0.0, radius: f32::NAN }],
        );
        assert!(nan.mean_radius().is_nan());
    }

    #[test]
    fn test_row_data_shape() {
        let tracks = Track::from_frames(&frames()).unwrap();
        let data = row_data(&tracks);

        assert_eq!(data.len(), 2);
        assert_eq!(data.desired_output[0].shape(), &[2, 3]);
        assert_eq!(data.desired_output[0].row(1).to_vec(), vec![5.0, 6.0, 7.0]);
        assert_eq!(data.time_sequence[1].row(0).to_vec(), vec![0.0, 1.0, 2.0]);
        assert_eq!(data.time_sequence[1].row(1).to_vec(), vec![0.0, 1.0, 2.0]);
    }
}
