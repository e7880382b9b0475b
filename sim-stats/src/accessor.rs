use crate::{normal, Interval};
use serde::{Deserialize, Serialize};

/// Read access to the summary statistics of an estimator.
///
/// Every method is a pure function of the estimator's current state.  A
/// statistic which needs more observations than have been collected is
/// NaN; check with `is_nan()` rather than expecting an error.
pub trait StatisticAccessor {
    fn name(&self) -> &str;
    fn count(&self) -> f64;
    fn average(&self) -> f64;
    fn variance(&self) -> f64;
    fn min(&self) -> f64;
    fn max(&self) -> f64;
    fn sum(&self) -> f64;
    fn weighted_sum(&self) -> f64;
    fn sum_of_weights(&self) -> f64;
    fn weighted_sum_of_squares(&self) -> f64;
    fn deviation_sum_of_squares(&self) -> f64;
    fn last_value(&self) -> f64;
    fn last_weight(&self) -> f64;
    fn kurtosis(&self) -> f64;
    fn skewness(&self) -> f64;
    fn lag1_covariance(&self) -> f64;
    fn lag1_correlation(&self) -> f64;
    fn von_neumann_lag1_statistic(&self) -> f64;
    fn number_missing(&self) -> f64;

    /// The confidence level used by `half_width` and `confidence_interval`.
    fn confidence_level(&self) -> f64;

    /// The half-width of a `level` confidence interval for the mean.
    fn half_width_at(&self, level: f64) -> f64;

    fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    fn standard_error(&self) -> f64 {
        self.standard_deviation() / self.count().sqrt()
    }

    fn half_width(&self) -> f64 {
        self.half_width_at(self.confidence_level())
    }

    fn weighted_average(&self) -> f64 {
        if self.sum_of_weights() <= 0. {
            f64::NAN
        } else {
            self.weighted_sum() / self.sum_of_weights()
        }
    }

    /// `[average - hw, average + hw]`; the NaN interval while empty.
    fn confidence_interval_at(&self, level: f64) -> Interval {
        if self.count() < 1. {
            Interval::nan()
        } else {
            Interval::around(self.average(), self.half_width_at(level))
        }
    }

    fn confidence_interval(&self) -> Interval {
        self.confidence_interval_at(self.confidence_level())
    }

    /// The asymptotic p-value of the Von Neumann test for independence:
    /// small values suggest positive serial correlation.
    fn von_neumann_p_value(&self) -> f64 {
        let stat = self.von_neumann_lag1_statistic();
        if stat.is_nan() {
            f64::NAN
        } else {
            normal::compl_cdf(stat)
        }
    }

    /// The statistics in the order of [`Summary::HEADERS`].
    fn statistics(&self) -> [f64; 23] {
        self.summary().values()
    }

    fn summary(&self) -> Summary {
        Summary {
            name: self.name().to_string(),
            count: self.count(),
            average: self.average(),
            standard_deviation: self.standard_deviation(),
            standard_error: self.standard_error(),
            half_width: self.half_width(),
            confidence_level: self.confidence_level(),
            min: self.min(),
            max: self.max(),
            sum: self.sum(),
            variance: self.variance(),
            weighted_average: self.weighted_average(),
            weighted_sum: self.weighted_sum(),
            sum_of_weights: self.sum_of_weights(),
            weighted_sum_of_squares: self.weighted_sum_of_squares(),
            deviation_sum_of_squares: self.deviation_sum_of_squares(),
            last_value: self.last_value(),
            last_weight: self.last_weight(),
            kurtosis: self.kurtosis(),
            skewness: self.skewness(),
            lag1_covariance: self.lag1_covariance(),
            lag1_correlation: self.lag1_correlation(),
            von_neumann_lag1_statistic: self.von_neumann_lag1_statistic(),
            number_missing: self.number_missing(),
        }
    }

    /// One CSV line: the name, then the statistics.
    fn csv_row(&self) -> String {
        self.summary().csv_row()
    }
}

/// A snapshot of everything a [`StatisticAccessor`] can report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub name: String,
    pub count: f64,
    pub average: f64,
    pub standard_deviation: f64,
    pub standard_error: f64,
    pub half_width: f64,
    pub confidence_level: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub variance: f64,
    pub weighted_average: f64,
    pub weighted_sum: f64,
    pub sum_of_weights: f64,
    pub weighted_sum_of_squares: f64,
    pub deviation_sum_of_squares: f64,
    pub last_value: f64,
    pub last_weight: f64,
    pub kurtosis: f64,
    pub skewness: f64,
    pub lag1_covariance: f64,
    pub lag1_correlation: f64,
    pub von_neumann_lag1_statistic: f64,
    pub number_missing: f64,
}

impl Summary {
    pub const HEADERS: [&'static str; 23] = [
        "Count",
        "Average",
        "Standard Deviation",
        "Standard Error",
        "Half-width",
        "Confidence Level",
        "Minimum",
        "Maximum",
        "Sum",
        "Variance",
        "Weighted Average",
        "Weighted Sum",
        "Sum of Weights",
        "Weighted Sum of Squares",
        "Deviation Sum of Squares",
        "Last Value",
        "Last Weight",
        "Kurtosis",
        "Skewness",
        "Lag 1 Covariance",
        "Lag 1 Correlation",
        "Von Neumann Lag 1 Test Statistic",
        "Number Missing",
    ];

    pub fn values(&self) -> [f64; 23] {
        [
            self.count,
            self.average,
            self.standard_deviation,
            self.standard_error,
            self.half_width,
            self.confidence_level,
            self.min,
            self.max,
            self.sum,
            self.variance,
            self.weighted_average,
            self.weighted_sum,
            self.sum_of_weights,
            self.weighted_sum_of_squares,
            self.deviation_sum_of_squares,
            self.last_value,
            self.last_weight,
            self.kurtosis,
            self.skewness,
            self.lag1_covariance,
            self.lag1_correlation,
            self.von_neumann_lag1_statistic,
            self.number_missing,
        ]
    }

    /// The header line matching `csv_row`.
    pub fn csv_header() -> String {
        csv_line("Name", Self::HEADERS.iter().map(|h| h.to_string()))
    }

    /// Non-finite statistics are written as empty fields.
    pub fn csv_row(&self) -> String {
        csv_line(&self.name, self.values().iter().map(|&x| csv_number(x)))
    }
}

pub(crate) fn csv_line(name: &str, fields: impl Iterator<Item = String>) -> String {
    let mut line = csv_quote(name);
    for field in fields {
        line.push(',');
        line.push_str(&field);
    }
    line
}

pub(crate) fn csv_number(x: f64) -> String {
    if x.is_finite() {
        x.to_string()
    } else {
        String::new()
    }
}

fn csv_quote(field: &str) -> String {
    if field.contains(|c: char| c == ',' || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
