use special::Beta;

/// The inverse CDF of Student's t-distribution.
///
/// `p` is the cumulative probability, and `dof` (aka. "ν") is the degrees
/// of freedom (a parameter of the distribution).  Returns NaN when `p` lies
/// outside [0, 1] or `dof` is not positive.
pub fn inv_cdf(p: f64, dof: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) || !(dof > 0.0) {
        return f64::NAN;
    }
    if p == 0.5 {
        return 0.0;
    }
    let x = 2. * p.min(1. - p);
    let a = 0.5 * dof;
    let b = 0.5;
    let y = x.inv_inc_beta(a, b, a.ln_beta(b));
    let y = (dof * (1. - y) / y).sqrt();
    if p > 0.5 {
        y
    } else {
        -y
    }
}

/// The critical value `t` such that a Student-t variable with `dof` degrees
/// of freedom lies in `[-t, t]` with probability `level`.
///
/// `level` is two-sided; it's converted into the one-sided quantile
/// `1 - (1 - level) / 2`.
pub fn critical_value(level: f64, dof: f64) -> f64 {
    let alpha = 1. - level;
    inv_cdf(1. - alpha / 2., dof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn t_table() {
        // Spot checks against the t-table from
        // https://en.wikipedia.org/wiki/Student's_t-distribution

        macro_rules! assert_rel_eq {
            ($p:expr, $dof:expr, $exp:expr) => {
                assert_relative_eq!(inv_cdf($p, $dof), $exp, max_relative = 0.001);
            };
        }

        assert_rel_eq!(0.95, 1.0, 6.314);
        assert_rel_eq!(0.975, 1.0, 12.71);
        assert_rel_eq!(0.995, 1.0, 63.66);

        assert_rel_eq!(0.9, 003.0, 1.638);
        assert_rel_eq!(0.975, 003.0, 3.182);

        assert_rel_eq!(0.95, 005.0, 2.015);
        assert_rel_eq!(0.975, 005.0, 2.571);
        assert_rel_eq!(0.995, 005.0, 4.032);

        assert_rel_eq!(0.975, 010.0, 2.228);
        assert_rel_eq!(0.99, 010.0, 2.764);

        assert_rel_eq!(0.975, 019.0, 2.093);
        assert_rel_eq!(0.975, 030.0, 2.042);
        assert_rel_eq!(0.95, 060.0, 1.671);
        assert_rel_eq!(0.975, 120.0, 1.980);
    }

    #[test]
    fn symmetric() {
        assert_relative_eq!(inv_cdf(0.025, 7.0), -inv_cdf(0.975, 7.0));
        assert_eq!(inv_cdf(0.5, 7.0), 0.0);
    }

    #[test]
    fn two_sided() {
        assert_relative_eq!(critical_value(0.95, 9.0), 2.262, max_relative = 0.001);
        assert_relative_eq!(critical_value(0.99, 4.0), 4.604, max_relative = 0.001);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(inv_cdf(0.975, 0.0).is_nan());
        assert!(inv_cdf(1.5, 3.0).is_nan());
        assert!(critical_value(0.95, f64::NAN).is_nan());
    }
}
