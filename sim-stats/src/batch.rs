use crate::collector::*;
use crate::statistic::{batch_mean, check_confidence_level};
use crate::{Error, Statistic, StatisticAccessor};
use log::*;
use serde::{Deserialize, Serialize};

/// How a [`BatchStatistic`] sizes and merges its batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    min_batches: usize,
    min_batch_size: usize,
    max_batch_multiple: usize,
}

impl BatchConfig {
    pub const DEFAULT_MIN_BATCHES: usize = 20;
    pub const DEFAULT_MIN_BATCH_SIZE: usize = 16;
    pub const DEFAULT_MAX_BATCH_MULTIPLE: usize = 2;

    /// Every parameter must be at least 2.
    pub fn new(
        min_batches: usize,
        min_batch_size: usize,
        max_batch_multiple: usize,
    ) -> Result<BatchConfig, Error> {
        for (what, x) in [
            ("minimum number of batches", min_batches),
            ("minimum batch size", min_batch_size),
            ("maximum batch multiple", max_batch_multiple),
        ] {
            if x < 2 {
                return Err(Error::InvalidArgument(format!(
                    "{} must be at least 2, got {}",
                    what, x
                )));
            }
        }
        if min_batches.checked_mul(max_batch_multiple).is_none() {
            return Err(Error::InvalidArgument(format!(
                "{} batches times a multiple of {} overflows",
                min_batches, max_batch_multiple
            )));
        }
        Ok(BatchConfig {
            min_batches,
            min_batch_size,
            max_batch_multiple,
        })
    }

    pub fn min_batches(self) -> usize {
        self.min_batches
    }

    pub fn min_batch_size(self) -> usize {
        self.min_batch_size
    }

    pub fn max_batch_multiple(self) -> usize {
        self.max_batch_multiple
    }

    /// Reaching this many batches triggers a rebatch.
    pub fn max_batches(self) -> usize {
        self.min_batches * self.max_batch_multiple
    }
}

impl Default for BatchConfig {
    fn default() -> BatchConfig {
        BatchConfig {
            min_batches: Self::DEFAULT_MIN_BATCHES,
            min_batch_size: Self::DEFAULT_MIN_BATCH_SIZE,
            max_batch_multiple: Self::DEFAULT_MAX_BATCH_MULTIPLE,
        }
    }
}

/// The method of batch means, with automatic rebatching.
///
/// Raw observations are grouped into consecutive batches and the batch
/// means, rather than the observations, are the sample: they are much
/// closer to independent than serially-correlated simulation output.  The
/// statistics (average, variance, half-width, lag-1 diagnostics...) all
/// describe the batch means.
///
/// Once `max_batches` batches are complete, every `max_batch_multiple`
/// neighbours are merged, leaving `min_batches` batches, and the batch size
/// grows by the same multiple.  The memory used is therefore bounded by
/// `max_batches` however long the stream runs.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchStatistic {
    identity: Identity,
    state: CollectorState,
    config: BatchConfig,
    rule: CollectionRule,
    current_batch_size: usize,
    /// the completed batch means; never longer than `config.max_batches()`
    batch_means: Vec<f64>,
    num_rebatches: usize,
    num_observations: f64,
    within: Statistic,
    across: Statistic,
}

impl BatchStatistic {
    pub fn new(config: BatchConfig) -> BatchStatistic {
        BatchStatistic::new_in(IdGenerator::global(), None, config)
    }

    pub fn named(name: impl AsRef<str>, config: BatchConfig) -> BatchStatistic {
        BatchStatistic::new_in(IdGenerator::global(), Some(name.as_ref()), config)
    }

    pub fn new_in(ids: &IdGenerator, name: Option<&str>, config: BatchConfig) -> BatchStatistic {
        let identity = Identity::new(ids, "BatchStatistic", name);
        let within = Statistic::new_in(ids, Some(&format!("{}:within", identity.name)));
        let across = Statistic::new_in(ids, Some(&format!("{}:across", identity.name)));
        BatchStatistic {
            identity,
            state: CollectorState::new(),
            config,
            rule: CollectionRule::None,
            current_batch_size: config.min_batch_size(),
            batch_means: Vec::with_capacity(config.max_batches()),
            num_rebatches: 0,
            num_observations: 0.,
            within,
            across,
        }
    }

    /// A batch statistic which has already collected `values`.
    pub fn from_values(name: Option<&str>, config: BatchConfig, values: &[f64]) -> BatchStatistic {
        let mut stat = BatchStatistic::new_in(IdGenerator::global(), name, config);
        stat.collect_slice(values);
        stat
    }

    pub fn with_confidence_level(mut self, level: f64) -> Result<BatchStatistic, Error> {
        self.set_confidence_level(level)?;
        Ok(self)
    }

    /// The rule is checked each time a batch completes.
    pub fn with_rule(mut self, rule: CollectionRule) -> BatchStatistic {
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

    pub fn config(&self) -> BatchConfig {
        self.config
    }

    pub fn min_batches(&self) -> usize {
        self.config.min_batches()
    }

    pub fn min_batch_size(&self) -> usize {
        self.config.min_batch_size()
    }

    pub fn max_batch_multiple(&self) -> usize {
        self.config.max_batch_multiple()
    }

    pub fn max_batches(&self) -> usize {
        self.config.max_batches()
    }

    pub fn current_batch_size(&self) -> usize {
        self.current_batch_size
    }

    /// The number of completed batches.
    pub fn num_batches(&self) -> usize {
        self.batch_means.len()
    }

    pub fn num_rebatches(&self) -> usize {
        self.num_rebatches
    }

    /// Every accepted raw observation, including those in the unfinished
    /// batch.
    pub fn num_observations(&self) -> f64 {
        self.num_observations
    }

    /// A copy of the completed batch means, oldest first.
    pub fn batch_means(&self) -> Vec<f64> {
        self.batch_means.clone()
    }

    /// The statistics of the batch means.
    pub fn across_batch(&self) -> &Statistic {
        &self.across
    }

    /// The statistics of the unfinished batch.
    pub fn within_batch(&self) -> &Statistic {
        &self.within
    }

    /// Regroup the current batch means into `k` batches of
    /// `num_batches / k` consecutive means each (the leftover means at the
    /// end are dropped) and summarise the new means.  `self` is untouched.
    pub fn rebatch_to_number_of_batches(&self, k: usize) -> Result<Statistic, Error> {
        let n = self.num_batches();
        if k == 0 || k > n {
            return Err(Error::InvalidArgument(format!(
                "can't regroup {} batch means into {} batches",
                n, k
            )));
        }
        let size = n / k;
        let mut stat = Statistic::named(format!("{}:rebatched({})", self.identity.name, k));
        stat.set_confidence_level(self.confidence_level())?;
        for group in self.batch_means.chunks_exact(size).take(k) {
            stat.collect(group.iter().sum::<f64>() / size as f64);
        }
        Ok(stat)
    }

    fn complete_batch(&mut self) {
        let mean = batch_mean(&self.within);
        self.batch_means.push(mean);
        self.across.collect(mean);
        self.within.reset();
        trace!(
            "{}: batch {} complete, mean {}",
            self.identity.name,
            self.batch_means.len(),
            mean
        );

        if self.batch_means.len() == self.config.max_batches() {
            self.rebatch();
        }

        if self.rule.is_met_by(&*self) {
            info!(
                "{}: {:?} satisfied after {} batches of {}",
                self.identity.name,
                self.rule,
                self.num_batches(),
                self.current_batch_size
            );
            self.state.turn_off();
        }
    }

    /// Merge each run of `max_batch_multiple` batch means, in place.
    fn rebatch(&mut self) {
        let multiple = self.config.max_batch_multiple();
        self.current_batch_size *= multiple;
        self.across.reset();
        for i in 0..self.config.min_batches() {
            let group = &self.batch_means[i * multiple..(i + 1) * multiple];
            let mean = group.iter().sum::<f64>() / multiple as f64;
            self.batch_means[i] = mean;
            self.across.collect(mean);
        }
        self.batch_means.truncate(self.config.min_batches());
        self.num_rebatches += 1;
        debug!(
            "{}: rebatch {}: now {} batches of size {}",
            self.identity.name,
            self.num_rebatches,
            self.batch_means.len(),
            self.current_batch_size
        );
    }
}

impl Default for BatchStatistic {
    fn default() -> BatchStatistic {
        BatchStatistic::new(BatchConfig::default())
    }
}

impl Collector for BatchStatistic {
    fn collect_weighted(&mut self, x: f64, weight: f64) -> bool {
        match self.state.admit(x, weight) {
            Admission::Rejected => return false,
            Admission::Missing => return true,
            Admission::Accepted => (),
        }
        self.num_observations += 1.;
        self.within.collect_weighted(x, weight);
        if self.within.count() >= self.current_batch_size as f64 {
            self.complete_batch();
        }
        true
    }

    fn reset(&mut self) {
        self.state.reset();
        self.current_batch_size = self.config.min_batch_size();
        self.batch_means.clear();
        self.num_rebatches = 0;
        self.num_observations = 0.;
        self.within.reset();
        self.across.reset();
    }

    fn collector_state(&self) -> &CollectorState {
        &self.state
    }

    fn collector_state_mut(&mut self) -> &mut CollectorState {
        &mut self.state
    }
}

impl StatisticAccessor for BatchStatistic {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn number_missing(&self) -> f64 {
        self.state.number_missing()
    }

    fn half_width_at(&self, level: f64) -> f64 {
        self.across.half_width_at(level)
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

impl Extend<f64> for BatchStatistic {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for x in iter {
            if !self.collect(x) {
                break;
            }
        }
    }
}
