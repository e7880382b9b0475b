use crate::collector::*;
use crate::statistic::{batch_mean, check_confidence_level, t_half_width};
use crate::{Error, Statistic, StatisticAccessor};
use log::*;

/// Estimates the variance of the mean with the standardized time series
/// area method.
///
/// The stream is cut into batches of a fixed size `b`.  For each batch the
/// centred, index-weighted sum
///
/// ```text
/// a = Σ i·x_i - (b + 1)/2 · Σ x_i       (i = 1..b)
/// ```
///
/// is squared and accumulated; `12·Σa² / (b³ - b)` then estimates the
/// asymptotic variance constant of the process, summed over batches.  Unlike
/// batch means, this remains valid when consecutive batch means are
/// correlated.
///
/// The average and the other [`StatisticAccessor`] statistics describe the
/// completed batch means; only the standard error and the half-width come
/// from the area estimator.  The half-width uses `num_batches` degrees of
/// freedom.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardizedTimeSeriesStatistic {
    identity: Identity,
    state: CollectorState,
    rule: CollectionRule,
    batch_size: usize,
    keep_batches: bool,
    /// every accepted observation, regardless of batch
    unbatched: Statistic,
    within: Statistic,
    across: Statistic,
    sum_of_squared_areas: f64,
    num_batches: f64,
    batches: Vec<Statistic>,
}

impl StandardizedTimeSeriesStatistic {
    pub const DEFAULT_BATCH_SIZE: usize = 16;

    /// `batch_size` must be at least 2.
    pub fn new(batch_size: usize) -> Result<StandardizedTimeSeriesStatistic, Error> {
        StandardizedTimeSeriesStatistic::new_in(IdGenerator::global(), None, batch_size)
    }

    pub fn named(
        name: impl AsRef<str>,
        batch_size: usize,
    ) -> Result<StandardizedTimeSeriesStatistic, Error> {
        StandardizedTimeSeriesStatistic::new_in(IdGenerator::global(), Some(name.as_ref()), batch_size)
    }

    pub fn new_in(
        ids: &IdGenerator,
        name: Option<&str>,
        batch_size: usize,
    ) -> Result<StandardizedTimeSeriesStatistic, Error> {
        if batch_size < 2 {
            return Err(Error::InvalidArgument(format!(
                "batch size must be at least 2, got {}",
                batch_size
            )));
        }
        Ok(StandardizedTimeSeriesStatistic::build(ids, name, batch_size))
    }

    fn build(
        ids: &IdGenerator,
        name: Option<&str>,
        batch_size: usize,
    ) -> StandardizedTimeSeriesStatistic {
        let identity = Identity::new(ids, "StandardizedTimeSeriesStatistic", name);
        let unbatched = Statistic::new_in(ids, Some(&format!("{}:unbatched", identity.name)));
        let within = Statistic::new_in(ids, Some(&format!("{}:within", identity.name)));
        let across = Statistic::new_in(ids, Some(&format!("{}:across", identity.name)));
        StandardizedTimeSeriesStatistic {
            identity,
            state: CollectorState::new(),
            rule: CollectionRule::None,
            batch_size,
            keep_batches: false,
            unbatched,
            within,
            across,
            sum_of_squared_areas: 0.,
            num_batches: 0.,
            batches: vec![],
        }
    }

    /// An estimator which has already collected `values`.
    pub fn from_values(
        name: Option<&str>,
        batch_size: usize,
        values: &[f64],
    ) -> Result<StandardizedTimeSeriesStatistic, Error> {
        let mut stat =
            StandardizedTimeSeriesStatistic::new_in(IdGenerator::global(), name, batch_size)?;
        stat.collect_slice(values);
        Ok(stat)
    }

    /// Hold on to the full statistics of every completed batch.
    pub fn with_keep_batches(mut self, keep: bool) -> StandardizedTimeSeriesStatistic {
        self.keep_batches = keep;
        self
    }

    pub fn with_confidence_level(
        mut self,
        level: f64,
    ) -> Result<StandardizedTimeSeriesStatistic, Error> {
        self.set_confidence_level(level)?;
        Ok(self)
    }

    /// The rule is checked each time a batch completes.
    pub fn with_rule(mut self, rule: CollectionRule) -> StandardizedTimeSeriesStatistic {
        self.rule = rule;
        self
    }

    pub fn set_confidence_level(&mut self, level: f64) -> Result<(), Error> {
        check_confidence_level(level)?;
        self.across.set_confidence_level(level)
    }

    pub fn set_rule(&mut self, rule: CollectionRule) {
        self.rule = rule;
    }

    pub fn id(&self) -> u64 {
        self.identity.id
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> f64 {
        self.num_batches
    }

    pub fn sum_of_squared_areas(&self) -> f64 {
        self.sum_of_squared_areas
    }

    /// `12·Σa² / (b³ - b)`; NaN until a batch completes.
    pub fn area_constant(&self) -> f64 {
        if self.num_batches < 1. {
            return f64::NAN;
        }
        let b = self.batch_size as f64;
        12. * self.sum_of_squared_areas / (b * b * b - b)
    }

    /// Every accepted observation, batched or not.
    pub fn unbatched(&self) -> &Statistic {
        &self.unbatched
    }

    pub fn across_batch(&self) -> &Statistic {
        &self.across
    }

    pub fn within_batch(&self) -> &Statistic {
        &self.within
    }

    /// The completed batches, if `keep_batches` was set.
    pub fn batch_statistics(&self) -> Option<&[Statistic]> {
        if self.keep_batches {
            Some(&self.batches)
        } else {
            None
        }
    }

    fn complete_batch(&mut self) {
        let b = self.batch_size as f64;
        let c = (b + 1.) / 2.;
        let area = self.within.obs_weighted_running_sum() - c * self.within.weighted_sum();
        self.sum_of_squared_areas += area * area;
        self.across.collect(batch_mean(&self.within));
        self.num_batches += 1.;
        trace!(
            "{}: batch {} complete, area {}",
            self.identity.name,
            self.num_batches,
            area
        );
        if self.keep_batches {
            self.batches.push(self.within.clone());
        }
        self.within.reset();

        if self.rule.is_met_by(&*self) {
            info!(
                "{}: {:?} satisfied after {} batches",
                self.identity.name, self.rule, self.num_batches
            );
            self.state.turn_off();
        }
    }
}

impl Collector for StandardizedTimeSeriesStatistic {
    fn collect_weighted(&mut self, x: f64, weight: f64) -> bool {
        match self.state.admit(x, weight) {
            Admission::Rejected => return false,
            Admission::Missing => return true,
            Admission::Accepted => (),
        }
        self.unbatched.collect_weighted(x, weight);
        self.within.collect_weighted(x, weight);
        if self.within.count() >= self.batch_size as f64 {
            self.complete_batch();
        }
        true
    }

    fn reset(&mut self) {
        self.state.reset();
        self.unbatched.reset();
        self.within.reset();
        self.across.reset();
        self.sum_of_squared_areas = 0.;
        self.num_batches = 0.;
        self.batches.clear();
    }

    fn collector_state(&self) -> &CollectorState {
        &self.state
    }

    fn collector_state_mut(&mut self) -> &mut CollectorState {
        &mut self.state
    }
}

impl StatisticAccessor for StandardizedTimeSeriesStatistic {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn number_missing(&self) -> f64 {
        self.state.number_missing()
    }

    /// `sqrt(A / (b·k²))` where `A` is the area constant and `k` the
    /// number of batches.
    fn standard_error(&self) -> f64 {
        let k = self.num_batches;
        (self.area_constant() / (self.batch_size as f64 * k * k)).sqrt()
    }

    fn half_width_at(&self, level: f64) -> f64 {
        t_half_width(level, self.num_batches, self.standard_error())
    }

    forward_to!(across:
        count,
        average,
        variance,
        min,
        max,
        sum,
        weighted_sum,
        sum_of_weights,
        weighted_sum_of_squares,
        deviation_sum_of_squares,
        last_value,
        last_weight,
        kurtosis,
        skewness,
        lag1_covariance,
        lag1_correlation,
        von_neumann_lag1_statistic,
        confidence_level,
    );
}

impl Extend<f64> for StandardizedTimeSeriesStatistic {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for x in iter {
            if !self.collect(x) {
                break;
            }
        }
    }
}

impl Default for StandardizedTimeSeriesStatistic {
    fn default() -> StandardizedTimeSeriesStatistic {
        let ids = IdGenerator::global();
        StandardizedTimeSeriesStatistic::build(ids, None, Self::DEFAULT_BATCH_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BatchConfig, BatchStatistic};
    use approx::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn batch_size_is_validated() {
        assert!(matches!(
            StandardizedTimeSeriesStatistic::new(1),
            Err(Error::InvalidArgument(_))
        ));
        assert!(StandardizedTimeSeriesStatistic::new(2).is_ok());
        assert_eq!(
            StandardizedTimeSeriesStatistic::default().batch_size(),
            StandardizedTimeSeriesStatistic::DEFAULT_BATCH_SIZE
        );
    }

    #[test]
    fn areas_by_hand() {
        let mut stat = StandardizedTimeSeriesStatistic::new(2).unwrap();
        stat.collect_slice(&[1., 3., 2., 2.]);
        // (1·1 + 2·3) - 1.5·4 = 1, then (1·2 + 2·2) - 1.5·4 = 0
        assert_eq!(stat.sum_of_squared_areas(), 1.);
        assert_eq!(stat.num_batches(), 2.);
        assert_eq!(stat.area_constant(), 2.);
        assert_eq!(stat.average(), 2.);
        assert_eq!(stat.standard_error(), 0.5);
        // t with 2 degrees of freedom, not 1
        assert_relative_eq!(stat.half_width(), 4.303 * 0.5, max_relative = 1e-3);
        assert_eq!(stat.unbatched().count(), 4.);
    }

    #[test]
    fn nan_until_first_batch() {
        let mut stat = StandardizedTimeSeriesStatistic::new(3).unwrap();
        stat.collect_slice(&[1., 2.]);
        assert!(stat.area_constant().is_nan());
        assert!(stat.standard_error().is_nan());
        assert!(stat.half_width().is_nan());
        assert!(stat.average().is_nan());
        assert!(stat.confidence_interval().is_nan());
        assert_eq!(stat.unbatched().average(), 1.5);
    }

    #[test]
    fn estimates_the_variance_constant() {
        // For i.i.d. uniforms the constant is just the variance, 1/12
        let mut rng = StdRng::seed_from_u64(23);
        let mut stat = StandardizedTimeSeriesStatistic::new(32).unwrap();
        for _ in 0..(32 * 500) {
            stat.collect(rng.gen::<f64>());
        }
        assert_eq!(stat.num_batches(), 500.);
        let sigma2 = stat.area_constant() / stat.num_batches();
        assert_relative_eq!(sigma2, 1. / 12., max_relative = 0.25);
        assert_relative_eq!(stat.average(), 0.5, epsilon = 0.02);
    }

    #[test]
    fn agrees_with_batch_means_on_correlated_data() {
        let mut rng = StdRng::seed_from_u64(29);
        let mut area = StandardizedTimeSeriesStatistic::new(1024).unwrap();
        let mut batches = BatchStatistic::new(BatchConfig::new(20, 1024, 2).unwrap());
        let mut x = 0.;
        for _ in 0..(1024 * 40) {
            x = 0.7 * x + rng.gen::<f64>() - 0.5;
            area.collect(x);
            batches.collect(x);
        }
        let ratio = area.standard_error() / batches.standard_error();
        assert!(ratio > 0.5 && ratio < 2.0, "ratio {}", ratio);
    }

    #[test]
    fn keeps_batches_on_request() {
        let mut stat = StandardizedTimeSeriesStatistic::new(2).unwrap();
        stat.collect_slice(&[1., 2., 3.]);
        assert!(stat.batch_statistics().is_none());

        let mut stat = StandardizedTimeSeriesStatistic::new(2)
            .unwrap()
            .with_keep_batches(true);
        stat.collect_slice(&[1., 2., 3., 4., 5.]);
        let kept = stat.batch_statistics().unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].average(), 3.5);
        assert_eq!(stat.within_batch().count(), 1.);
    }

    #[test]
    fn reset_and_missing() {
        let mut stat = StandardizedTimeSeriesStatistic::new(2)
            .unwrap()
            .with_keep_batches(true);
        stat.collect_slice(&[1., f64::NAN, 3., 2., 2.]);
        assert_eq!(stat.number_missing(), 1.);
        let before = stat.statistics().map(f64::to_bits);
        stat.reset();
        stat.reset();
        assert_eq!(stat.num_batches(), 0.);
        assert_eq!(stat.sum_of_squared_areas(), 0.);
        assert_eq!(stat.batch_statistics().unwrap().len(), 0);
        assert_eq!(stat.number_missing(), 0.);
        stat.collect_slice(&[1., f64::NAN, 3., 2., 2.]);
        assert_eq!(stat.statistics().map(f64::to_bits), before);
    }

    #[test]
    fn zero_weight_batches_still_count() {
        let mut stat = StandardizedTimeSeriesStatistic::new(2).unwrap();
        stat.collect_weighted(1., 0.);
        stat.collect_weighted(3., 0.);
        stat.collect_weighted(2., 1.);
        stat.collect_weighted(2., 1.);
        assert_eq!(stat.num_batches(), 2.);
        assert_eq!(stat.count(), stat.num_batches());
        assert_eq!(stat.number_missing(), 0.);
        assert_eq!(stat.average(), 2.);
    }

    #[test]
    fn from_values() {
        let stat = StandardizedTimeSeriesStatistic::from_values(Some("w"), 2, &[1., 3., 2., 2.])
            .unwrap();
        assert_eq!(stat.name(), "w");
        assert_eq!(stat.num_batches(), 2.);
        assert_eq!(stat.area_constant(), 2.);
        assert!(StandardizedTimeSeriesStatistic::from_values(None, 1, &[1.]).is_err());
    }

    #[test]
    fn rule_checked_per_batch() {
        let rule = CollectionRule::half_width_target(0.05).unwrap();
        let mut stat = StandardizedTimeSeriesStatistic::new(8)
            .unwrap()
            .with_rule(rule);
        let mut rng = StdRng::seed_from_u64(31);
        let mut n = 0;
        while stat.collect(rng.gen::<f64>()) {
            n += 1;
            assert!(n < 1_000_000);
        }
        assert!(stat.half_width() <= 0.05);
        assert_eq!(stat.within_batch().count(), 0.);
    }
}
