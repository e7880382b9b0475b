use crate::collector::*;
use crate::{student_t, Error, StatisticAccessor};
use log::*;

/// A single-pass accumulator of the first four central moments, and
/// everything that can be derived from them.
///
/// Each observation updates the state in constant time; nothing is ever
/// recomputed from the raw data (which isn't kept unless asked for).  The
/// variance, skewness and kurtosis are the bias-corrected sample
/// estimators.
///
/// Observations may carry weights.  The weights feed the weighted sums and
/// [`weighted_average`](StatisticAccessor::weighted_average); the moments
/// themselves treat every observation alike.
#[derive(Clone, Debug, PartialEq)]
pub struct Statistic {
    identity: Identity,
    state: CollectorState,
    level: f64,
    rule: CollectionRule,
    min: f64,
    max: f64,
    last_value: f64,
    last_weight: f64,
    sum_of_weights: f64,
    weighted_sum: f64,
    weighted_sum_of_squares: f64,
    /// [count, mean, and the 2nd, 3rd and 4th central moments]
    ///
    /// The central moments are averages over the sample, ie. population
    /// moments; the bias corrections happen in the accessors.
    moments: [f64; 5],
    first_value: f64,
    /// Σ x_i·x_{i+1}
    sum_of_cross_products: f64,
    /// Σ i·x_i
    obs_weighted_running_sum: f64,
}

impl Statistic {
    pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

    pub fn new() -> Statistic {
        Statistic::new_in(IdGenerator::global(), None)
    }

    pub fn named(name: impl AsRef<str>) -> Statistic {
        Statistic::new_in(IdGenerator::global(), Some(name.as_ref()))
    }

    /// A statistic whose id comes from `ids`.
    pub fn new_in(ids: &IdGenerator, name: Option<&str>) -> Statistic {
        Statistic {
            identity: Identity::new(ids, "Statistic", name),
            state: CollectorState::new(),
            level: Self::DEFAULT_CONFIDENCE_LEVEL,
            rule: CollectionRule::None,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            last_value: f64::NAN,
            last_weight: f64::NAN,
            sum_of_weights: 0.,
            weighted_sum: 0.,
            weighted_sum_of_squares: 0.,
            moments: [0.; 5],
            first_value: f64::NAN,
            sum_of_cross_products: 0.,
            obs_weighted_running_sum: 0.,
        }
    }

    /// A statistic which has already collected `values`.
    pub fn from_values(name: Option<&str>, values: &[f64]) -> Statistic {
        let mut stat = Statistic::new_in(IdGenerator::global(), name);
        stat.collect_slice(values);
        stat
    }

    pub fn with_confidence_level(mut self, level: f64) -> Result<Statistic, Error> {
        self.set_confidence_level(level)?;
        Ok(self)
    }

    pub fn with_rule(mut self, rule: CollectionRule) -> Statistic {
        self.rule = rule;
        self
    }

    /// `level` must lie strictly between 0 and 1.
    pub fn set_confidence_level(&mut self, level: f64) -> Result<(), Error> {
        check_confidence_level(level)?;
        self.level = level;
        Ok(())
    }

    pub fn set_rule(&mut self, rule: CollectionRule) {
        self.rule = rule;
    }

    pub fn rule(&self) -> CollectionRule {
        self.rule
    }

    pub fn id(&self) -> u64 {
        self.identity.id
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.identity.name = name.into();
    }

    /// The first observation collected, NaN while empty.
    pub fn first_value(&self) -> f64 {
        self.first_value
    }

    /// Σ i·x_i over the observations, with i counting from 1.  This is
    /// the ingredient of the standardized-time-series area.
    pub fn obs_weighted_running_sum(&self) -> f64 {
        self.obs_weighted_running_sum
    }

    pub fn sum_of_cross_products(&self) -> f64 {
        self.sum_of_cross_products
    }

    fn observe(&mut self, x: f64, weight: f64) {
        let n1 = self.moments[0];
        let n = n1 + 1.;

        self.sum_of_weights += weight;
        self.weighted_sum += x * weight;
        self.weighted_sum_of_squares += x * x * weight;
        self.obs_weighted_running_sum += n * x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        if n1 == 0. {
            self.first_value = x;
        } else {
            self.sum_of_cross_products += x * self.last_value;
        }

        // One-pass update of the central moments.  The higher moments are
        // updated first since each one needs the old values of the lower.
        let delta = (self.moments[1] - x) / n; // how far the mean moves (negated)
        let d2 = delta * delta;
        let d3 = delta * d2;
        let r = n1 / n;
        self.moments[4] = r
            * (self.moments[4]
                + 4. * delta * self.moments[3]
                + 6. * d2 * self.moments[2]
                + (1. + n1 * n1 * n1) * d2 * d2);
        self.moments[3] =
            r * (self.moments[3] + 3. * delta * self.moments[2] + (1. - n1 * n1) * d3);
        self.moments[2] = r * (self.moments[2] + n * d2);
        self.moments[1] -= delta;
        self.moments[0] = n;

        self.last_value = x;
        self.last_weight = weight;
    }
}

pub(crate) fn check_confidence_level(level: f64) -> Result<(), Error> {
    if level > 0. && level < 1. {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "confidence level must be in (0, 1), got {}",
            level
        )))
    }
}

/// The mean of a completed batch: weighted, unless the weights don't sum
/// to something positive, in which case every observation counts alike.
pub(crate) fn batch_mean(batch: &Statistic) -> f64 {
    if batch.sum_of_weights() > 0. {
        batch.weighted_average()
    } else {
        batch.average()
    }
}

/// The Student-t half-width with `dof` degrees of freedom, or NaN.
pub(crate) fn t_half_width(level: f64, dof: f64, standard_error: f64) -> f64 {
    if !(level > 0. && level < 1.) || !(dof >= 1.) {
        return f64::NAN;
    }
    student_t::critical_value(level, dof) * standard_error
}

impl Default for Statistic {
    fn default() -> Statistic {
        Statistic::new()
    }
}

impl Collector for Statistic {
    fn collect_weighted(&mut self, x: f64, weight: f64) -> bool {
        match self.state.admit(x, weight) {
            Admission::Rejected => return false,
            Admission::Missing => return true,
            Admission::Accepted => (),
        }
        self.observe(x, weight);
        if self.rule.is_met_by(&*self) {
            info!(
                "{}: {:?} satisfied after {} observations",
                self.identity.name,
                self.rule,
                self.count()
            );
            self.state.turn_off();
        }
        true
    }

    fn reset(&mut self) {
        self.state.reset();
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.last_value = f64::NAN;
        self.last_weight = f64::NAN;
        self.sum_of_weights = 0.;
        self.weighted_sum = 0.;
        self.weighted_sum_of_squares = 0.;
        self.moments = [0.; 5];
        self.first_value = f64::NAN;
        self.sum_of_cross_products = 0.;
        self.obs_weighted_running_sum = 0.;
    }

    fn collector_state(&self) -> &CollectorState {
        &self.state
    }

    fn collector_state_mut(&mut self) -> &mut CollectorState {
        &mut self.state
    }
}

impl StatisticAccessor for Statistic {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn count(&self) -> f64 {
        self.moments[0]
    }

    fn average(&self) -> f64 {
        if self.count() < 1. {
            f64::NAN
        } else {
            self.moments[1]
        }
    }

    fn variance(&self) -> f64 {
        let n = self.count();
        if n < 2. {
            f64::NAN
        } else {
            self.moments[2] * n / (n - 1.)
        }
    }

    fn min(&self) -> f64 {
        self.min
    }

    fn max(&self) -> f64 {
        self.max
    }

    fn sum(&self) -> f64 {
        self.moments[1] * self.moments[0]
    }

    fn weighted_sum(&self) -> f64 {
        self.weighted_sum
    }

    fn sum_of_weights(&self) -> f64 {
        self.sum_of_weights
    }

    fn weighted_sum_of_squares(&self) -> f64 {
        self.weighted_sum_of_squares
    }

    fn deviation_sum_of_squares(&self) -> f64 {
        self.moments[2] * self.moments[0]
    }

    fn last_value(&self) -> f64 {
        self.last_value
    }

    fn last_weight(&self) -> f64 {
        self.last_weight
    }

    fn skewness(&self) -> f64 {
        let n = self.count();
        if n < 3. {
            return f64::NAN;
        }
        let s = self.standard_deviation();
        n * n * self.moments[3] / ((n - 1.) * (n - 2.) * s * s * s)
    }

    /// The excess kurtosis,
    /// `(n(n+1)n·m4 - 3(n-1)³v²) / ((n-1)(n-2)(n-3)v²)`.
    fn kurtosis(&self) -> f64 {
        let n = self.count();
        if n < 4. {
            return f64::NAN;
        }
        let n1 = n - 1.;
        let v = self.variance();
        let numerator = n * (n + 1.) * n * self.moments[4] - 3. * n1 * n1 * n1 * v * v;
        let denominator = n1 * (n - 2.) * (n - 3.) * v * v;
        numerator / denominator
    }

    /// Σ (x_i - x̄)(x_{i+1} - x̄) / n, expanded so that it only needs the
    /// running sums.
    fn lag1_covariance(&self) -> f64 {
        let n = self.count();
        if n <= 2. {
            return f64::NAN;
        }
        let mean = self.moments[1];
        (self.sum_of_cross_products - (n + 1.) * mean * mean
            + mean * (self.first_value + self.last_value))
            / n
    }

    fn lag1_correlation(&self) -> f64 {
        if self.count() <= 2. {
            return f64::NAN;
        }
        self.lag1_covariance() / self.moments[2]
    }

    /// Asymptotically standard normal when the observations are
    /// independent; large values point to positive serial correlation.
    fn von_neumann_lag1_statistic(&self) -> f64 {
        let n = self.count();
        if n <= 2. {
            return f64::NAN;
        }
        let mean = self.moments[1];
        let r1 = self.lag1_correlation();
        let t = (self.first_value - mean).powi(2) + (self.last_value - mean).powi(2);
        ((n * n - 1.) / (n - 2.)).sqrt() * (r1 + t / (2. * n * self.moments[2]))
    }

    fn number_missing(&self) -> f64 {
        self.state.number_missing()
    }

    fn confidence_level(&self) -> f64 {
        self.level
    }

    fn half_width_at(&self, level: f64) -> f64 {
        let n = self.count();
        if n < 2. {
            return f64::NAN;
        }
        t_half_width(level, n - 1., self.standard_error())
    }
}

impl Extend<f64> for Statistic {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for x in iter {
            if !self.collect(x) {
                break;
            }
        }
    }
}

impl FromIterator<f64> for Statistic {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Statistic {
        let mut stat = Statistic::new();
        stat.extend(iter);
        stat
    }
}
