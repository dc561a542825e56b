//! Deterministic search grids.

use crate::error::AppError;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(AppError::invalid(
            "grid range",
            format!("min={min}, max={max} (must be finite and max>min)"),
        ));
    }
    if steps < 2 {
        return Err(AppError::invalid("grid steps", "must be >= 2"));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push(min + step * i as f64);
    }
    // Pin the last point so rounding never overshoots the bound.
    out[steps - 1] = max;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_space_includes_endpoints() {
        let v = lin_space(0.1, 10.0, 5).unwrap();
        assert_eq!(v.len(), 5);
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert_eq!(v[4], 10.0);
        assert!((v[1] - v[0] - 2.475).abs() < 1e-12);
    }

    #[test]
    fn lin_space_rejects_bad_range() {
        assert!(lin_space(1.0, 1.0, 4).is_err());
        assert!(lin_space(0.0, 1.0, 1).is_err());
    }
}
