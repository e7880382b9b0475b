use crate::label::*;
use crate::report::Report;
use crate::{Estimator, Options};
use anyhow::{anyhow, bail, Result};
use log::*;
use sim_stats::{
    BatchConfig, BatchStatistic, CollectionRule, Collector, StandardizedTimeSeriesStatistic,
    Statistic, StatisticAccessor, Summary, WeightedStatistic, WeightedSummary,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Read;

/// How to build the estimator for each (label, column) pair.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub level: f64,
    rule: CollectionRule,
    estimator: Estimator,
}

impl Blueprint {
    pub fn new(opts: &Options) -> Result<Blueprint> {
        let rule = match (opts.half_width, opts.relative_precision) {
            (Some(_), Some(_)) => bail!("--half-width and --relative-precision can't be combined"),
            (Some(h), None) => CollectionRule::half_width_target(h)?,
            (None, Some(p)) => CollectionRule::relative_precision_target(p)?,
            (None, None) => CollectionRule::None,
        };
        let blueprint = Blueprint {
            level: opts.level,
            rule,
            estimator: opts.estimator.clone(),
        };
        // Catch bad settings before reading any input
        blueprint.build("-".to_string())?;
        Ok(blueprint)
    }

    pub fn has_rule(&self) -> bool {
        self.rule != CollectionRule::None
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self.estimator {
            Estimator::Weighted => &WeightedSummary::HEADERS,
            _ => &Summary::HEADERS,
        }
    }

    pub fn build(&self, name: String) -> Result<Tracker> {
        let tracker = match self.estimator {
            Estimator::Moments => Tracker::Moments(
                Statistic::named(name)
                    .with_confidence_level(self.level)?
                    .with_rule(self.rule),
            ),
            Estimator::BatchMeans {
                min_batches,
                min_batch_size,
                max_batch_multiple,
            } => {
                let config = BatchConfig::new(min_batches, min_batch_size, max_batch_multiple)?;
                Tracker::BatchMeans(
                    BatchStatistic::named(name, config)
                        .with_confidence_level(self.level)?
                        .with_rule(self.rule),
                )
            }
            Estimator::Area {
                batch_size,
                keep_batches,
            } => Tracker::Area(
                StandardizedTimeSeriesStatistic::named(name, batch_size)?
                    .with_keep_batches(keep_batches)
                    .with_confidence_level(self.level)?
                    .with_rule(self.rule),
            ),
            Estimator::Weighted => {
                if self.has_rule() {
                    bail!("The weighted estimator has no confidence interval to stop on");
                }
                Tracker::Weighted(WeightedStatistic::named(name))
            }
        };
        Ok(tracker)
    }
}

/// One estimator, of whichever kind was asked for.
#[derive(Debug, Clone)]
pub enum Tracker {
    Moments(Statistic),
    BatchMeans(BatchStatistic),
    Area(StandardizedTimeSeriesStatistic),
    Weighted(WeightedStatistic),
}

impl Tracker {
    pub fn collect_weighted(&mut self, x: f64, weight: f64) -> bool {
        match self {
            Tracker::Moments(s) => s.collect_weighted(x, weight),
            Tracker::BatchMeans(s) => s.collect_weighted(x, weight),
            Tracker::Area(s) => s.collect_weighted(x, weight),
            Tracker::Weighted(s) => s.collect_weighted(x, weight),
        }
    }

    pub fn is_turned_off(&self) -> bool {
        match self {
            Tracker::Moments(s) => s.is_turned_off(),
            Tracker::BatchMeans(s) => s.is_turned_off(),
            Tracker::Area(s) => s.is_turned_off(),
            Tracker::Weighted(s) => s.is_turned_off(),
        }
    }

    pub fn report(&self) -> Report {
        match self {
            Tracker::Moments(s) => Report::Full(s.summary()),
            Tracker::BatchMeans(s) => Report::Full(s.summary()),
            Tracker::Area(s) => match s.batch_statistics() {
                Some(batches) => Report::Area {
                    summary: s.summary(),
                    batches: batches.iter().map(|b| b.summary()).collect(),
                },
                None => Report::Full(s.summary()),
            },
            Tracker::Weighted(s) => Report::Weighted(s.summary()),
        }
    }
}

pub struct State {
    pub blueprint: Blueprint,
    /// The value columns, in input order
    pub columns: Vec<String>,
    pub series: BTreeMap<Label, Vec<Tracker>>,
}

impl State {
    pub fn new(blueprint: Blueprint, columns: Vec<String>) -> State {
        State {
            blueprint,
            columns,
            series: BTreeMap::new(),
        }
    }

    pub fn update(
        &mut self,
        label: Label,
        values: impl Iterator<Item = f64>,
        weight: f64,
    ) -> Result<()> {
        let trackers = match self.series.entry(label) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let trackers = self
                    .columns
                    .iter()
                    .map(|column| self.blueprint.build(e.key().estimator_name(column)))
                    .collect::<Result<Vec<_>>>()?;
                e.insert(trackers)
            }
        };
        for (tracker, x) in trackers.iter_mut().zip(values) {
            tracker.collect_weighted(x, weight);
        }
        Ok(())
    }

    /// True once there's at least one estimator and they've all stopped.
    pub fn all_halted(&self) -> bool {
        !self.series.is_empty() && self.series.values().flatten().all(Tracker::is_turned_off)
    }

    #[cfg(test)]
    pub fn get(&self, label: &str, column: &str) -> Option<&Tracker> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.series.get(&Label::from(label))?.get(idx)
    }

    /// Every estimator with its label and column, sorted by label.
    pub fn rows(&self) -> impl Iterator<Item = (&Label, &str, &Tracker)> + '_ {
        self.series.iter().flat_map(move |(label, trackers)| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(trackers)
                .map(move |(column, tracker)| (label, column, tracker))
        })
    }
}

fn parse_cell(cell: &str, column: &str, line: u64) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() {
        return f64::NAN;
    }
    match cell.parse() {
        Ok(x) => x,
        Err(_) => {
            warn!(
                "line {}: couldn't parse {:?} in column \"{}\"; counting it as missing",
                line, cell, column
            );
            f64::NAN
        }
    }
}

/// Feed every row of the CSV `input` to the estimators.
///
/// Reading stops early if a collection rule was given and every estimator
/// has satisfied it.
pub fn summarize(opts: &Options, input: impl Read) -> Result<State> {
    let blueprint = Blueprint::new(opts)?;
    let mut rdr = csv::Reader::from_reader(input);
    let mut headers = rdr.headers()?.into_iter();
    let label_col = headers
        .next()
        .ok_or_else(|| anyhow!("The input has no columns"))?
        .to_string();
    info!("Assuming \"{}\" column is the series label", label_col);
    let columns = headers.map(|x| x.to_string()).collect::<Vec<_>>();
    let weight_idx = match &opts.weight_column {
        Some(name) => Some(
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| anyhow!("There's no column called \"{}\"", name))?,
        ),
        None => None,
    };
    let value_idxs = (0..columns.len())
        .filter(|&i| Some(i) != weight_idx)
        .collect::<Vec<_>>();
    let mut state = State::new(
        blueprint,
        value_idxs.iter().map(|&i| columns[i].clone()).collect(),
    );

    let mut n_rows = 0;
    for row in rdr.into_records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line());
        let mut row = row.iter();
        let label = Label::from(row.next().unwrap_or_default());
        let cells = row.collect::<Vec<_>>();
        let cell = |i: usize| parse_cell(cells.get(i).copied().unwrap_or(""), &columns[i], line);

        let weight = weight_idx.map_or(1., cell);
        state.update(label, value_idxs.iter().map(|&i| cell(i)), weight)?;
        n_rows += 1;

        if state.blueprint.has_rule() && state.all_halted() {
            info!("Every estimator has reached its target after {} rows", n_rows);
            break;
        }
    }
    debug!("Read {} rows into {} series", n_rows, state.series.len());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    fn run(opts: &Options, input: &str) -> State {
        summarize(opts, input.as_bytes()).unwrap()
    }

    fn full(state: &State, label: &str, column: &str) -> Summary {
        match state.get(label, column).unwrap().report() {
            Report::Full(s) | Report::Area { summary: s, .. } => s,
            Report::Weighted(_) => panic!("expected a full summary"),
        }
    }

    #[test]
    fn one_estimator_per_label_and_column() {
        let opts = Options::for_estimator(Estimator::Moments);
        let state = run(&opts, "scenario,wait,queue\na,1,10\nb,5,50\na,3,30\n");
        assert_eq!(state.columns, vec!["wait", "queue"]);
        assert_eq!(state.series.len(), 2);
        let a_wait = full(&state, "a", "wait");
        assert_eq!(a_wait.name, "a:wait");
        assert_eq!(a_wait.count, 2.);
        assert_eq!(a_wait.average, 2.);
        assert_eq!(full(&state, "a", "queue").average, 20.);
        assert_eq!(full(&state, "b", "wait").count, 1.);
        assert!(state.get("c", "wait").is_none());
    }

    #[test]
    fn unparsable_cells_are_missing() {
        let opts = Options::for_estimator(Estimator::Moments);
        let state = run(&opts, "s,x\na,1\na,oops\na,\na, 3 \n");
        let s = full(&state, "a", "x");
        assert_eq!(s.count, 2.);
        assert_eq!(s.number_missing, 2.);
        assert_eq!(s.average, 2.);
    }

    #[test]
    fn weight_column() {
        let mut opts = Options::for_estimator(Estimator::Weighted);
        opts.weight_column = Some("dt".to_string());
        let state = run(&opts, "s,x,dt\na,0,2\na,3,1\na,1,5\n");
        assert_eq!(state.columns, vec!["x"]);
        match state.get("a", "x").unwrap().report() {
            Report::Weighted(s) => {
                assert_eq!(s.sum_of_weights, 8.);
                assert_eq!(s.average, 1.);
            }
            _ => panic!("expected a weighted summary"),
        }

        opts.weight_column = Some("time".to_string());
        assert!(summarize(&opts, "s,x,dt\na,0,2\n".as_bytes()).is_err());
    }

    #[test]
    fn stops_once_every_target_is_met() {
        let mut opts = Options::for_estimator(Estimator::Moments);
        opts.half_width = Some(0.5);
        let input = "s,x\n".to_string() + &"a,1\n".repeat(10);
        let state = run(&opts, &input);
        let s = full(&state, "a", "x");
        // zero variance meets any target as soon as there's a half-width
        assert_eq!(s.count, 2.);
        assert!(state.all_halted());

        opts.half_width = None;
        let state = run(&opts, &input);
        assert_eq!(full(&state, "a", "x").count, 10.);
        assert!(!state.all_halted());
    }

    #[test]
    fn bad_settings_fail_early() {
        let mut opts = Options::for_estimator(Estimator::Moments);
        opts.level = 1.5;
        assert!(summarize(&opts, "".as_bytes()).is_err());

        let mut opts = Options::for_estimator(Estimator::Weighted);
        opts.relative_precision = Some(0.1);
        assert!(summarize(&opts, "".as_bytes()).is_err());

        let mut opts = Options::for_estimator(Estimator::Moments);
        opts.half_width = Some(1.);
        opts.relative_precision = Some(0.1);
        assert!(summarize(&opts, "".as_bytes()).is_err());

        let opts = Options::for_estimator(Estimator::Area {
            batch_size: 1,
            keep_batches: false,
        });
        assert!(summarize(&opts, "".as_bytes()).is_err());

        let opts = Options::for_estimator(Estimator::BatchMeans {
            min_batches: 20,
            min_batch_size: 0,
            max_batch_multiple: 2,
        });
        assert!(summarize(&opts, "".as_bytes()).is_err());
    }

    #[test]
    fn batch_means() {
        let opts = Options::for_estimator(Estimator::BatchMeans {
            min_batches: 2,
            min_batch_size: 2,
            max_batch_multiple: 2,
        });
        let input = (0..8).fold("s,x\n".to_string(), |acc, i| acc + &format!("a,{}\n", i));
        let state = run(&opts, &input);
        let s = full(&state, "a", "x");
        // four batches of two merge into two batches of four
        assert_eq!(s.count, 2.);
        assert_relative_eq!(s.average, 3.5);
        match state.get("a", "x").unwrap() {
            Tracker::BatchMeans(b) => assert_eq!(b.batch_means(), vec![1.5, 5.5]),
            _ => panic!("expected batch means"),
        }
    }
}
