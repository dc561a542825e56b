//! Standard normal helpers used by the credit-risk encoders.
//!
//! Numerical notes:
//! - `erf` uses the Abramowitz & Stegun 7.1.26 rational approximation
//!   (absolute error below `1.5e-7`), which is far tighter than the
//!   linear angle fit it feeds.
//! - Tails beyond `|x| > 8` are clamped to exactly 0 / 1.

use std::f64::consts::{PI, SQRT_2};

/// Error function approximation (A&S 7.1.26).
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal CDF `Φ(x)`.
pub fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Normal density with mean `mu` and *variance* `variance`.
pub fn normal_pdf(x: f64, mu: f64, variance: f64) -> f64 {
    let d = x - mu;
    (-(d * d) / (2.0 * variance)).exp() / (2.0 * PI * variance).sqrt()
}
