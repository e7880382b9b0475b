mod label;
mod pretty;
mod report;
mod summarize;

use bpaf::Bpaf;
use report::Format;

/// Reads simulation output as CSV on stdin and reports means, variances and
/// confidence intervals for every column.
///
/// The first column labels the series each row belongs to; every other
/// column is a stream of observations, summarised separately per label.
#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
pub struct Options {
    /// Confidence level of the reported intervals
    #[bpaf(argument("LEVEL"), fallback(0.95), display_fallback)]
    pub level: f64,
    /// Output format: table, csv or json
    #[bpaf(argument("FORMAT"), fallback(Format::Table), display_fallback)]
    pub format: Format,
    /// Stop reading once every half-width is at most H
    #[bpaf(argument("H"))]
    pub half_width: Option<f64>,
    /// Stop reading once every half-width is at most P times its average
    #[bpaf(argument("P"))]
    pub relative_precision: Option<f64>,
    /// Use this column as the weight of the other columns' observations
    #[bpaf(argument("NAME"))]
    pub weight_column: Option<String>,
    #[bpaf(external(estimator))]
    pub estimator: Estimator,
}

#[derive(Debug, Clone, Bpaf)]
pub enum Estimator {
    /// Treat each column as an independent sample: moments, a Student-t
    /// interval and lag-1 diagnostics
    #[bpaf(command)]
    Moments,
    /// Group serially-correlated observations into batches and analyse the
    /// batch means
    #[bpaf(command("batch-means"))]
    BatchMeans {
        /// Fewest batches left after merging
        #[bpaf(argument("N"), fallback(20), display_fallback)]
        min_batches: usize,
        /// Observations per batch before any merging
        #[bpaf(argument("N"), fallback(16), display_fallback)]
        min_batch_size: usize,
        /// How many batches are merged into one
        #[bpaf(argument("N"), fallback(2), display_fallback)]
        max_batch_multiple: usize,
    },
    /// Estimate the variance of the mean with the standardized time series
    /// area method
    #[bpaf(command)]
    Area {
        /// Observations per batch
        #[bpaf(argument("N"), fallback(16), display_fallback)]
        batch_size: usize,
        /// Report the statistics of every completed batch (JSON only)
        keep_batches: bool,
    },
    /// Weighted mean and extremes only
    #[bpaf(command)]
    Weighted,
}

fn main() {
    env_logger::init();
    let opts = options().run();
    let result = summarize::summarize(&opts, std::io::stdin().lock())
        .and_then(|state| report::write(opts.format, &state, std::io::stdout().lock()));
    match result {
        Ok(()) => (),
        // Ignore EPIPE
        Err(e) if is_broken_pipe(&e) => (),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn is_broken_pipe(e: &anyhow::Error) -> bool {
    let io_err = match e.downcast_ref::<csv::Error>() {
        Some(e) => match e.kind() {
            csv::ErrorKind::Io(e) => Some(e),
            _ => None,
        },
        None => e.downcast_ref::<std::io::Error>(),
    };
    io_err.map_or(false, |e| e.kind() == std::io::ErrorKind::BrokenPipe)
}

#[cfg(test)]
impl Options {
    pub fn for_estimator(estimator: Estimator) -> Options {
        Options {
            level: 0.95,
            format: Format::Table,
            half_width: None,
            relative_precision: None,
            weight_column: None,
            estimator,
        }
    }
}
