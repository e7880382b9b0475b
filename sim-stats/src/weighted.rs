use crate::accessor::{csv_line, csv_number};
use crate::collector::*;
use serde::{Deserialize, Serialize};

/// Weighted first and second moments, and the extremes.
///
/// For quantities where the mean is all that matters, such as a queue
/// length weighted by how long it held each value.  There are no higher
/// moments and no confidence interval.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedStatistic {
    identity: Identity,
    state: CollectorState,
    count: f64,
    sum_of_weights: f64,
    weighted_sum: f64,
    weighted_sum_of_squares: f64,
    min: f64,
    max: f64,
    last_value: f64,
    last_weight: f64,
}

impl WeightedStatistic {
    pub fn new() -> WeightedStatistic {
        WeightedStatistic::new_in(IdGenerator::global(), None)
    }

    pub fn named(name: impl AsRef<str>) -> WeightedStatistic {
        WeightedStatistic::new_in(IdGenerator::global(), Some(name.as_ref()))
    }

    pub fn new_in(ids: &IdGenerator, name: Option<&str>) -> WeightedStatistic {
        WeightedStatistic {
            identity: Identity::new(ids, "WeightedStatistic", name),
            state: CollectorState::new(),
            count: 0.,
            sum_of_weights: 0.,
            weighted_sum: 0.,
            weighted_sum_of_squares: 0.,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            last_value: f64::NAN,
            last_weight: f64::NAN,
        }
    }

    pub fn id(&self) -> u64 {
        self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.identity.name = name.into();
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    /// `weighted_sum / sum_of_weights`, or NaN if the weights don't sum to
    /// something positive.
    pub fn average(&self) -> f64 {
        if self.sum_of_weights <= 0. {
            f64::NAN
        } else {
            self.weighted_sum / self.sum_of_weights
        }
    }

    /// +∞ while empty
    pub fn min(&self) -> f64 {
        self.min
    }

    /// -∞ while empty
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn weighted_sum(&self) -> f64 {
        self.weighted_sum
    }

    pub fn sum_of_weights(&self) -> f64 {
        self.sum_of_weights
    }

    pub fn weighted_sum_of_squares(&self) -> f64 {
        self.weighted_sum_of_squares
    }

    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    pub fn last_weight(&self) -> f64 {
        self.last_weight
    }

    pub fn number_missing(&self) -> f64 {
        self.state.number_missing()
    }

    pub fn statistics(&self) -> [f64; 7] {
        self.summary().values()
    }

    pub fn summary(&self) -> WeightedSummary {
        WeightedSummary {
            name: self.name().to_string(),
            count: self.count(),
            average: self.average(),
            min: self.min(),
            max: self.max(),
            weighted_sum: self.weighted_sum(),
            sum_of_weights: self.sum_of_weights(),
            weighted_sum_of_squares: self.weighted_sum_of_squares(),
        }
    }

    pub fn csv_row(&self) -> String {
        self.summary().csv_row()
    }
}

impl Default for WeightedStatistic {
    fn default() -> WeightedStatistic {
        WeightedStatistic::new()
    }
}

impl Collector for WeightedStatistic {
    fn collect_weighted(&mut self, x: f64, weight: f64) -> bool {
        match self.state.admit(x, weight) {
            Admission::Rejected => return false,
            Admission::Missing => return true,
            Admission::Accepted => (),
        }
        self.count += 1.;
        self.sum_of_weights += weight;
        self.weighted_sum += x * weight;
        self.weighted_sum_of_squares += x * x * weight;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        self.last_value = x;
        self.last_weight = weight;
        true
    }

    fn reset(&mut self) {
        self.state.reset();
        self.count = 0.;
        self.sum_of_weights = 0.;
        self.weighted_sum = 0.;
        self.weighted_sum_of_squares = 0.;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.last_value = f64::NAN;
        self.last_weight = f64::NAN;
    }

    fn collector_state(&self) -> &CollectorState {
        &self.state
    }

    fn collector_state_mut(&mut self) -> &mut CollectorState {
        &mut self.state
    }
}

impl FromIterator<f64> for WeightedStatistic {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> WeightedStatistic {
        let mut stat = WeightedStatistic::new();
        stat.extend(iter);
        stat
    }
}

impl Extend<f64> for WeightedStatistic {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for x in iter {
            if !self.collect(x) {
                break;
            }
        }
    }
}

/// The reduced statistics of a [`WeightedStatistic`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedSummary {
    pub name: String,
    pub count: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub weighted_sum: f64,
    pub sum_of_weights: f64,
    pub weighted_sum_of_squares: f64,
}

impl WeightedSummary {
    pub const HEADERS: [&'static str; 7] = [
        "Count",
        "Average",
        "Minimum",
        "Maximum",
        "Weighted Sum",
        "Sum of Weights",
        "Weighted Sum of Squares",
    ];

    pub fn values(&self) -> [f64; 7] {
        [
            self.count,
            self.average,
            self.min,
            self.max,
            self.weighted_sum,
            self.sum_of_weights,
            self.weighted_sum_of_squares,
        ]
    }

    pub fn csv_header() -> String {
        csv_line("Name", Self::HEADERS.iter().map(|h| h.to_string()))
    }

    pub fn csv_row(&self) -> String {
        csv_line(&self.name, self.values().iter().map(|&x| csv_number(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Statistic, StatisticAccessor};
    use approx::*;

    #[test]
    fn time_weighted_queue_length() {
        // length 0 for 2 time units, 3 for 1, 1 for 5
        let mut q = WeightedStatistic::named("queue");
        q.collect_weighted(0., 2.);
        q.collect_weighted(3., 1.);
        q.collect_weighted(1., 5.);
        assert_eq!(q.count(), 3.);
        assert_eq!(q.sum_of_weights(), 8.);
        assert_eq!(q.weighted_sum(), 8.);
        assert_eq!(q.average(), 1.);
        assert_eq!(q.weighted_sum_of_squares(), 14.);
        assert_eq!(q.min(), 0.);
        assert_eq!(q.max(), 3.);
        assert_eq!(q.last_value(), 1.);
        assert_eq!(q.last_weight(), 5.);
    }

    #[test]
    fn empty_and_zero_weight() {
        let mut stat = WeightedStatistic::new();
        assert!(stat.average().is_nan());
        assert_eq!(stat.min(), f64::INFINITY);
        assert_eq!(stat.max(), f64::NEG_INFINITY);
        stat.collect_weighted(4., 0.);
        assert_eq!(stat.count(), 1.);
        assert!(stat.average().is_nan());
        assert_eq!(stat.max(), 4.);
    }

    #[test]
    fn agrees_with_full_statistic() {
        let xs = [3.5, -1., 2., 8., 0.25];
        let ws = [1., 0.5, 2., 3., 1.5];
        let mut light = WeightedStatistic::new();
        let mut full = Statistic::new();
        assert!(light.collect_weighted_slice(&xs, &ws).unwrap());
        assert!(full.collect_weighted_slice(&xs, &ws).unwrap());
        assert_relative_eq!(light.average(), full.weighted_average(), max_relative = 1e-12);
        assert_eq!(light.weighted_sum_of_squares(), full.weighted_sum_of_squares());
        assert_eq!(light.min(), full.min());
        assert_eq!(light.max(), full.max());
    }

    #[test]
    fn missing_off_and_reset() {
        let mut stat: WeightedStatistic = [1., f64::NAN, 3.].into_iter().collect();
        assert_eq!(stat.count(), 2.);
        assert_eq!(stat.number_missing(), 1.);
        assert!(stat.collect_weighted(1., f64::INFINITY));
        assert_eq!(stat.number_missing(), 2.);

        stat.turn_off();
        assert!(!stat.collect(5.));
        assert!(!stat.collect(f64::NAN));
        assert_eq!(stat.number_missing(), 2.);

        stat.reset();
        assert!(stat.is_turned_on());
        assert_eq!(stat.count(), 0.);
        assert_eq!(stat.number_missing(), 0.);
        assert!(stat.last_value().is_nan());
    }

    #[test]
    fn reduced_vector_and_csv() {
        let mut stat = WeightedStatistic::named("util");
        stat.collect_weighted(1., 3.);
        stat.collect_weighted(0., 1.);
        assert_eq!(stat.statistics(), [2., 0.75, 0., 1., 3., 4., 3.]);
        assert_eq!(
            WeightedSummary::csv_header(),
            "Name,Count,Average,Minimum,Maximum,Weighted Sum,Sum of Weights,Weighted Sum of Squares"
        );
        assert_eq!(stat.csv_row(), "util,2,0.75,0,1,3,4,3");
        assert_eq!(WeightedStatistic::named("x").csv_row(), "x,0,,,,0,0,0");
    }
}
