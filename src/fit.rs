use crate::error::Error;
use crate::math::{quadratic_ls, r_squared};
use num_traits::Float;
use nalgebra as na;

pub const MIN_SAMPLES: usize = 3;

/// Quadratic `y(t) = a·t² + b·t + c` fitted to one axis of one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFit<F> {
    pub a: F,
    pub b: F,
    pub c: F,
    pub r_squared: F,
}

impl<F: na::RealField + Float> AxisFit<F> {
    #[inline]
    pub fn value(&self, t: F) -> F {
        self.a * t * t + self.b * t + self.c
    }

    #[inline]
    pub fn derivative(&self, t: F) -> F {
        (self.a + self.a) * t + self.b
    }

    /// Rate of change at `t = 0`.
    #[inline]
    pub fn velocity(&self) -> F {
        self.b
    }

    #[inline]
    pub fn acceleration(&self) -> F {
        self.a + self.a
    }
}

pub fn fit_quadratic<F: na::RealField + Float>(t: &[F], y: &[F]) -> Result<AxisFit<F>, Error> {
    if t.len() != y.len() {
        return Err(Error::MismatchedSamples {
            times: t.len(),
            values: y.len(),
        });
    }

    if t.len() < MIN_SAMPLES {
        return Err(Error::InsufficientSamples {
            got: t.len(),
            required: MIN_SAMPLES,
        });
    }

    let t = na::DVector::from_column_slice(t);
    let y = na::DVector::from_column_slice(y);

    let params = quadratic_ls(&t, &y).ok_or(Error::SingularFit)?;
    let (a, b, c) = (params[0], params[1], params[2]);

    let fitted = t.map(|t| a * t * t + b * t + c);
    let r_squared = r_squared(&y, &fitted)?;

    Ok(AxisFit { a, b, c, r_squared })
}
