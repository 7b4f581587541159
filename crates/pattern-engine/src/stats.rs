//! Numeric kernels shared by the matcher, detector and predictor.
//!
//! Anything that can go degenerate (empty input, zero variance, a singular
//! fit) returns a [`PatternResult`]. Callers decide the fallback.

use crate::error::{PatternError, PatternResult};

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> PatternResult<f64> {
    if values.is_empty() {
        return Err(PatternError::InsufficientSamples { needed: 1, got: 0 });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by `n`).
pub fn variance(values: &[f64]) -> PatternResult<f64> {
    let m = mean(values)?;
    Ok(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> PatternResult<f64> {
    variance(values).map(f64::sqrt)
}

/// Subtract the mean and divide by the standard deviation.
///
/// A constant input is only mean-centred, so the result is all zeros rather
/// than NaN.
pub fn z_normalize(values: &[f64]) -> Vec<f64> {
    let (Ok(m), Ok(s)) = (mean(values), std_dev(values)) else {
        return Vec::new();
    };
    if s > 0.0 {
        values.iter().map(|v| (v - m) / s).collect()
    } else {
        values.iter().map(|v| v - m).collect()
    }
}

/// Successive differences `x[i+1] - x[i]`.
pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Pearson correlation coefficient, clamped to `[-1, 1]`.
///
/// Fails with `InsufficientSamples` below two points and with
/// `DegenerateComputation` when either side has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> PatternResult<f64> {
    if a.len() != b.len() {
        return Err(PatternError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.len() < 2 {
        return Err(PatternError::InsufficientSamples {
            needed: 2,
            got: a.len(),
        });
    }
    let ma = mean(a)?;
    let mb = mean(b)?;
    let (mut cov, mut va, mut vb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    let denom = (va * vb).sqrt();
    if denom <= 0.0 || !denom.is_finite() {
        return Err(PatternError::DegenerateComputation {
            operation: "pearson",
            detail: "zero variance input".into(),
        });
    }
    let r = cov / denom;
    if !r.is_finite() {
        return Err(PatternError::DegenerateComputation {
            operation: "pearson",
            detail: format!("non-finite coefficient {r}"),
        });
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Euclidean distance between two equal-length vectors.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> PatternResult<f64> {
    if a.len() != b.len() {
        return Err(PatternError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// Least-squares slope of `values` against their indices `0..n`.
pub fn linear_slope(values: &[f64]) -> PatternResult<f64> {
    let n = values.len();
    if n < 2 {
        return Err(PatternError::InsufficientSamples { needed: 2, got: n });
    }
    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = mean(values)?;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    if sxx <= 0.0 {
        return Err(PatternError::DegenerateComputation {
            operation: "linear_slope",
            detail: "singular design matrix".into(),
        });
    }
    let slope = sxy / sxx;
    if !slope.is_finite() {
        return Err(PatternError::DegenerateComputation {
            operation: "linear_slope",
            detail: format!("non-finite slope {slope}"),
        });
    }
    Ok(slope)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn mean_and_std() {
        let values = [0.4, 0.6, 0.4, 0.6];
        assert!((mean(&values).unwrap() - 0.5).abs() < EPS);
        assert!((std_dev(&values).unwrap() - 0.1).abs() < EPS);
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn z_normalize_constant_input_is_zero() {
        let z = z_normalize(&[0.3, 0.3, 0.3]);
        assert_eq!(z, vec![0.0, 0.0, 0.0]);
        assert!(z_normalize(&[]).is_empty());
    }

    #[test]
    fn z_normalize_has_unit_spread() {
        let z = z_normalize(&[1.0, 2.0, 3.0, 4.0]);
        assert!(mean(&z).unwrap().abs() < EPS);
        assert!((std_dev(&z).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let a = [1.0, 2.0, 3.0];
        assert!((pearson(&a, &[2.0, 4.0, 6.0]).unwrap() - 1.0).abs() < EPS);
        assert!((pearson(&a, &[3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < EPS);
    }

    #[test]
    fn pearson_degenerate_cases() {
        assert!(matches!(
            pearson(&[1.0, 1.0], &[1.0, 2.0]),
            Err(PatternError::DegenerateComputation { .. })
        ));
        assert!(matches!(
            pearson(&[1.0], &[2.0]),
            Err(PatternError::InsufficientSamples { .. })
        ));
        assert!(matches!(
            pearson(&[1.0, 2.0], &[1.0]),
            Err(PatternError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn differences_and_distance() {
        assert_eq!(first_differences(&[1.0, 3.0, 2.0]), vec![2.0, -1.0]);
        assert!(first_differences(&[1.0]).is_empty());
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap() - 5.0).abs() < EPS);
    }

    #[test]
    fn slope_of_line() {
        let values: Vec<f64> = (0..10).map(|i| 0.2 + 0.05 * i as f64).collect();
        assert!((linear_slope(&values).unwrap() - 0.05).abs() < 1e-9);
        assert!(linear_slope(&[0.4]).is_err());
        assert!(linear_slope(&[0.4, f64::NAN]).is_err());
    }
}
