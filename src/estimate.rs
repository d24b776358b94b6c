use nalgebra as na;
use ndarray::prelude::*;

use crate::error::Error;
use crate::fit::{fit_quadratic, AxisFit};
use crate::track::{row_data, Track};

/// Both axis fits must score above this before fitted motion is used.
pub const TRUST_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    Trusted {
        velocity: na::Vector2<f32>,
        acceleration: na::Vector2<f32>,
    },
    Untrusted,
}

impl Confidence {
    pub fn gate(fit_x: &AxisFit<f64>, fit_y: &AxisFit<f64>) -> Self {
        if fit_x.r_squared > TRUST_THRESHOLD && fit_y.r_squared > TRUST_THRESHOLD {
            Confidence::Trusted {
                velocity: na::Vector2::new(fit_x.velocity() as f32, fit_y.velocity() as f32),
                acceleration: na::Vector2::new(
                    fit_x.acceleration() as f32,
                    fit_y.acceleration() as f32,
                ),
            }
        } else {
            Confidence::Untrusted
        }
    }
}

/// Initial kinematics of one tracked object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEstimate {
    pub track: usize,
    pub position0: na::Point2<f32>,
    pub radius: f32,
    // (x, y)
    pub r_squared: (f64, f64),
    pub confidence: Confidence,
}

impl MotionEstimate {
    #[inline]
    pub fn is_trusted(&self) -> bool {
        matches!(self.confidence, Confidence::Trusted { .. })
    }

    #[inline]
    pub fn velocity0(&self) -> na::Vector2<f32> {
        match self.confidence {
            Confidence::Trusted { velocity, .. } => velocity,
            Confidence::Untrusted => na::Vector2::zeros(),
        }
    }

    #[inline]
    pub fn acceleration0(&self) -> na::Vector2<f32> {
        match self.confidence {
            Confidence::Trusted { acceleration, .. } => acceleration,
            Confidence::Untrusted => na::Vector2::zeros(),
        }
    }
}

fn fit_axis(
    times: ArrayView1<'_, f32>,
    values: ArrayView1<'_, f32>,
) -> Result<AxisFit<f64>, Error> {
    let t: Vec<f64> = times.iter().map(|&t| t as f64).collect();
    let y: Vec<f64> = values.iter().map(|&y| y as f64).collect();

    fit_quadratic(&t, &y)
}

/// Estimates kinematics from `(2, n)` arrays as produced by [`row_data`].
pub fn estimate_axes(
    track: usize,
    times: ArrayView2<'_, f32>,
    values: ArrayView2<'_, f32>,
    radius: f32,
) -> Result<MotionEstimate, Error> {
    if times.shape() != values.shape() || values.nrows() != 2 {
        return Err(Error::MismatchedSamples {
            times: times.len(),
            values: values.len(),
        });
    }

    let fit_x = fit_axis(times.row(0), values.row(0))?;
    let fit_y = fit_axis(times.row(1), values.row(1))?;

    log::debug!(
        "track {}: x = {:.6}t² + {:.6}t + {:.6} (r² {:.4}), y = {:.6}t² + {:.6}t + {:.6} (r² {:.4})",
        track,
        fit_x.a,
        fit_x.b,
        fit_x.c,
        fit_x.r_squared,
        fit_y.a,
        fit_y.b,
        fit_y.c,
        fit_y.r_squared,
    );

    let confidence = Confidence::gate(&fit_x, &fit_y);
    if confidence == Confidence::Untrusted {
        log::info!(
            "track {}: fit below r² {} (x {:.4}, y {:.4}), starting at rest",
            track,
            TRUST_THRESHOLD,
            fit_x.r_squared,
            fit_y.r_squared
        );
    }

    Ok(MotionEstimate {
        track,
        position0: na::Point2::new(values[[0, 0]], values[[1, 0]]),
        radius,
        r_squared: (fit_x.r_squared, fit_y.r_squared),
        confidence,
    })
}

pub fn estimate_track(track: &Track) -> Result<MotionEstimate, Error> {
    estimate_axes(
        track.id,
        track.time_sequence().view(),
        track.axes().view(),
        track.mean_radius(),
    )
}

/// Estimates every track, aborting on the first failure so no partial batch
/// reaches the simulation.
pub fn estimate_all(tracks: &[Track]) -> Result<Vec<MotionEstimate>, Error> {
    let data = row_data(tracks);

    tracks
        .iter()
        .zip(data.time_sequence.iter().zip(data.desired_output.iter()))
        .map(|(track, (times, values))| {
            estimate_axes(track.id, times.view(), values.view(), track.mean_radius())
                .map_err(|err| err.in_track(track.id))
        })
        .collect()
}
