/*! Single-pass output analysis for discrete-event simulations.

A simulation produces a stream of observations - waiting times, queue
lengths, the output of each replication - and the experimenter wants to know
what the stream averages to, and how sure they can be about it.  The
estimators in this crate digest such a stream one value at a time, in
constant memory, and can be asked for their statistics at any point.

* [`Statistic`] keeps the first four central moments, so it knows the
  mean, variance, skewness and kurtosis of everything it has seen, plus a
  Student-t confidence interval and lag-1 diagnostics for serial
  correlation.
* [`BatchStatistic`] groups a serially-correlated stream into batches and
  treats the batch means as the sample, merging batches as the stream grows
  so that memory stays bounded.
* [`StandardizedTimeSeriesStatistic`] estimates the same variance with
  the standardized-time-series area method, which doesn't need the batch
  means to be independent.
* [`WeightedStatistic`] is the cheap option: weighted first and second
  moments and nothing else.

## Example

```
use sim_stats::*;

let mut stat = Statistic::named("time in system");
for x in [9.0, 11.0, 10.0, 12.0, 8.0] {
    stat.collect(x);
}
assert_eq!(stat.count(), 5.);
assert_eq!(stat.average(), 10.);
assert!((stat.variance() - 2.5).abs() < 1e-12);

// 95% confidence interval for the mean
let ci = stat.confidence_interval();
assert!(ci.contains(10.));
assert!((ci.half_width() - 1.963).abs() < 1e-3);

// Not enough data is not an error; you just get NaN
let empty = Statistic::new();
assert!(empty.variance().is_nan());
```

A serially-correlated stream is better summarised through its batch means:

```
use sim_stats::*;

let config = BatchConfig::new(4, 2, 2).unwrap();
let mut batches = BatchStatistic::new(config);
for i in 0..16 {
    batches.collect(i as f64);
}
// Eight batches of two were merged into four batches of four
assert_eq!(batches.num_batches(), 4);
assert_eq!(batches.current_batch_size(), 4);
assert_eq!(batches.num_rebatches(), 1);
assert_eq!(batches.average(), 7.5);
```

Observations which aren't finite are tallied and otherwise ignored, and
`collect` returns `false` once an estimator has been turned off, either by
hand or by a [`CollectionRule`].  None of the estimators are thread-safe;
the simulation driving them is expected to feed one observation at a time.
*/

/// Implement the listed [`StatisticAccessor`] methods by asking `$field`.
macro_rules! forward_to {
    ($field:ident: $($method:ident),* $(,)?) => {
        $(
            fn $method(&self) -> f64 {
                self.$field.$method()
            }
        )*
    };
}

mod accessor;
mod area;
mod batch;
mod collector;
mod interval;
pub mod normal;
mod statistic;
pub mod student_t;
mod weighted;

pub use accessor::*;
pub use area::*;
pub use batch::*;
pub use collector::*;
pub use interval::*;
pub use statistic::*;
pub use weighted::*;

/// Construction parameters or arguments the estimators can't work with.
///
/// Running short of data is not an error: statistics that need more
/// observations than have been seen are NaN.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
