use bspline::BSpline;
use nalgebra as na;

use crate::error::Error;

const MAX_DEGREE: usize = 3;

/// Chord-length parameters in `[0, 1]`, uniform when every point coincides.
fn chord_params(points: &[na::Point2<f32>]) -> Vec<f64> {
    let mut params = Vec::with_capacity(points.len());
    let mut total = 0.0;

    params.push(0.0);
    for pair in points.windows(2) {
        total += na::distance(&pair[0], &pair[1]) as f64;
        params.push(total);
    }

    if total > 0.0 {
        params.iter_mut().for_each(|p| *p /= total);
    } else {
        let last = (points.len() - 1) as f64;
        params
            .iter_mut()
            .enumerate()
            .for_each(|(idx, p)| *p = idx as f64 / last);
    }

    params
}

/// Clamped knot vector with interior knots averaged over `degree` parameters.
fn clamped_knots(params: &[f64], degree: usize) -> Vec<f64> {
    let n = params.len();
    let mut knots = Vec::with_capacity(n + degree + 1);

    knots.extend(std::iter::repeat(0.0).take(degree + 1));
    for j in 1..n - degree {
        let sum: f64 = params[j..j + degree].iter().sum();
        knots.push(sum / degree as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(degree + 1));

    knots
}

/// Builds a clamped B-spline through every point. Returns the spline together
/// with the parameter at which it passes through each point.
fn interpolate(
    points: &[na::Point2<f32>],
) -> Result<(BSpline<na::Vector2<f32>, f32>, Vec<f64>), Error> {
    let n = points.len();
    if n < 2 {
        return Err(Error::InsufficientSamples { got: n, required: 2 });
    }

    let degree = MAX_DEGREE.min(n - 1);
    let params = chord_params(points);
    let knots = clamped_knots(&params, degree);

    // column j holds basis function j evaluated at every parameter
    let mut basis = na::DMatrix::<f64>::zeros(n, n);
    for j in 0..n {
        let mut unit = vec![0.0; n];
        unit[j] = 1.0;

        let bj = BSpline::new(degree, unit, knots.clone());
        for (k, &u) in params.iter().enumerate() {
            basis[(k, j)] = bj.point(u);
        }
    }

    let rhs = na::DMatrix::from_fn(n, 2, |k, axis| points[k][axis] as f64);
    let solved = basis.lu().solve(&rhs).ok_or(Error::SingularFit)?;
    if solved.iter().any(|v| !v.is_finite()) {
        return Err(Error::SingularFit);
    }

    let control: Vec<na::Vector2<f32>> = (0..n)
        .map(|j| na::Vector2::new(solved[(j, 0)] as f32, solved[(j, 1)] as f32))
        .collect();
    let knots: Vec<f32> = knots.iter().map(|&k| k as f32).collect();

    Ok((BSpline::new(degree, control, knots), params))
}

/// Samples `num_points` points uniformly over the knot domain of a cubic
/// (or lower degree, for fewer points) B-spline through every control point.
pub fn sample_curve(
    points: &[na::Point2<f32>],
    num_points: usize,
) -> Result<Vec<na::Point2<f32>>, Error> {
    if num_points < 2 {
        return Err(Error::InsufficientSamples {
            got: num_points,
            required: 2,
        });
    }

    let (spline, _) = interpolate(points)?;
    let (lo, hi) = spline.knot_domain();
    let step = (hi - lo) / (num_points - 1) as f32;

    Ok((0..num_points)
        .map(|k| na::Point2::from(spline.point((lo + step * k as f32).min(hi))))
        .collect())
}
