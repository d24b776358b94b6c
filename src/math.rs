use crate::error::Error;
use num_traits::Float;
use nalgebra as na;

/// Solves `y = a·x² + b·x + c` for `(a, b, c)` in the least squares sense.
///
/// Works on the design matrix `[x², x, 1]` directly rather than on the normal
/// equations, which squares the condition number. Returns `None` when the
/// columns are linearly dependent (fewer than three distinct `x`).
pub fn quadratic_ls<T: na::RealField + Float>(
    x: &na::DVector<T>,
    y: &na::DVector<T>,
) -> Option<na::Vector3<T>> {
    let n = x.len();
    if n < 3 || y.len() != n {
        return None;
    }

    let design = na::DMatrix::from_fn(n, 3, |r, c| match c {
        0 => x[r] * x[r],
        1 => x[r],
        _ => T::one(),
    });

    let qr_result = design.qr();
    let r = qr_result.r();

    let scale = r
        .diagonal()
        .iter()
        .fold(T::zero(), |acc, d| Float::max(acc, Float::abs(*d)));
    let tolerance = scale * <T as Float>::epsilon() * na::convert::<f64, T>(n as f64 * 16.0);

    if r.diagonal().iter().any(|d| Float::abs(*d) <= tolerance) {
        return None;
    }

    let qty = qr_result.q().transpose() * y;
    let beta_hat = r.solve_upper_triangular(&qty)?;

    Some(na::Vector3::new(beta_hat[0], beta_hat[1], beta_hat[2]))
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// Constant observations have no variance to explain: they score `1.0` when
/// the fit reproduces them, otherwise `DegenerateVariance`.
pub fn r_squared<T: na::RealField + Float>(
    y: &na::DVector<T>,
    fitted: &na::DVector<T>,
) -> Result<T, Error> {
    let n = y.len();
    if fitted.len() != n {
        return Err(Error::MismatchedSamples {
            times: fitted.len(),
            values: n,
        });
    }

    let mean = y.mean();
    let ss_res = y.zip_map(fitted, |y, f| (y - f) * (y - f)).sum();
    let ss_tot = y.map(|y| (y - mean) * (y - mean)).sum();

    let tolerance = y.norm_squared() * <T as Float>::epsilon() * na::convert::<f64, T>(n as f64);

    if ss_tot <= tolerance {
        return if ss_res <= tolerance {
            Ok(T::one())
        } else {
            Err(Error::DegenerateVariance {
                ss_res: ss_res.to_f64().unwrap_or(f64::NAN),
            })
        };
    }

    Ok(T::one() - ss_res / ss_tot)
}

/// Even-odd rule test of `p` against a closed outline.
pub fn point_in_polygon(p: na::Point2<f32>, poly: &[na::Point2<f32>]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut p1 = poly[0];
    let mut xints = 0.0;

    for i in 1..=n {
        let p2 = poly[i % n];

        if p.y > f32::min(p1.y, p2.y) && p.y <= f32::max(p1.y, p2.y) && p.x <= f32::max(p1.x, p2.x)
        {
            if (p1.y - p2.y).abs() > f32::EPSILON {
                xints = (p.y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;
            }

            if (p1.x - p2.x).abs() < f32::EPSILON || p.x <= xints {
                inside = !inside;
            }
        }

        p1 = p2;
    }

    inside
}

/// Closest point to `p` on the segment `a`-`b`.
pub fn closest_on_segment(
    p: na::Point2<f32>,
    a: na::Point2<f32>,
    b: na::Point2<f32>,
) -> na::Point2<f32> {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    if len_sq < f32::EPSILON {
        return a;
    }

    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);

    a + ab * t
}

#[inline]
pub fn mean(values: impl IntoIterator<Item = f32>) -> f32 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}
