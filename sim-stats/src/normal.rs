//! The standard normal distribution, as far as the independence diagnostics
//! need it.

use special::Error as _;
use std::f64::consts::SQRT_2;

/// P(Z <= z) for a standard normal Z.
pub fn cdf(z: f64) -> f64 {
    0.5 * (-z / SQRT_2).compl_error()
}

/// P(Z > z) for a standard normal Z.
///
/// Computed directly from the complementary error function so that the
/// upper tail keeps its precision for large `z`.
pub fn compl_cdf(z: f64) -> f64 {
    0.5 * (z / SQRT_2).compl_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn known_values() {
        assert_abs_diff_eq!(cdf(0.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(cdf(1.959963984540054), 0.975, epsilon = 1e-9);
        assert_abs_diff_eq!(cdf(-1.0), 0.15865525393145707, epsilon = 1e-9);
        assert_abs_diff_eq!(compl_cdf(1.6448536269514722), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn tails_add_up() {
        for z in [-3.0, -0.5, 0.25, 2.0] {
            assert_abs_diff_eq!(cdf(z) + compl_cdf(z), 1.0, epsilon = 1e-12);
        }
        assert!(compl_cdf(6.0) > 0.0);
    }
}
