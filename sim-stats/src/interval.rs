use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed range of reals, `[lower, upper]`.
///
/// Estimators report confidence bounds as intervals.  When there isn't
/// enough data to compute a bound, they hand back an interval whose ends
/// are NaN; such an interval contains nothing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    lower: f64,
    upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Result<Interval, Error> {
        if lower.is_nan() || upper.is_nan() {
            return Err(Error::InvalidArgument(format!(
                "interval bounds must be numbers, got [{}, {}]",
                lower, upper
            )));
        }
        if lower > upper {
            return Err(Error::InvalidArgument(format!(
                "interval lower bound {} exceeds upper bound {}",
                lower, upper
            )));
        }
        Ok(Interval { lower, upper })
    }

    /// A symmetric interval around `center`.  A NaN `center` or
    /// `half_width` gives the NaN interval rather than an error.
    pub(crate) fn around(center: f64, half_width: f64) -> Interval {
        Interval {
            lower: center - half_width,
            upper: center + half_width,
        }
    }

    pub(crate) fn nan() -> Interval {
        Interval {
            lower: f64::NAN,
            upper: f64::NAN,
        }
    }

    pub fn lower(self) -> f64 {
        self.lower
    }

    pub fn upper(self) -> f64 {
        self.upper
    }

    pub fn width(self) -> f64 {
        self.upper - self.lower
    }

    pub fn half_width(self) -> f64 {
        self.width() / 2.
    }

    pub fn midpoint(self) -> f64 {
        self.lower + self.half_width()
    }

    pub fn is_nan(self) -> bool {
        self.lower.is_nan() || self.upper.is_nan()
    }

    /// Both ends are inclusive.
    pub fn contains(self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }

    pub fn contains_interval(self, other: Interval) -> bool {
        self.contains(other.lower) && self.contains(other.upper)
    }

    pub fn overlaps(self, other: Interval) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
