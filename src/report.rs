use crate::pretty;
use crate::summarize::State;
use anyhow::{bail, Result};
use serde::Serialize;
use sim_stats::{Summary, WeightedSummary};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Csv,
    Json,
}

impl FromStr for Format {
    type Err = anyhow::Error;
    fn from_str(x: &str) -> Result<Format> {
        match x {
            "table" => Ok(Format::Table),
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            _ => bail!("Unknown format \"{}\": try table, csv or json", x),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Format::Table => "table",
            Format::Csv => "csv",
            Format::Json => "json",
        })
    }
}

/// What gets written out for one estimator.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Full(Summary),
    /// An area estimator which kept its batches
    Area {
        #[serde(flatten)]
        summary: Summary,
        batches: Vec<Summary>,
    },
    Weighted(WeightedSummary),
}

impl Report {
    /// In the order of the matching `HEADERS`.
    pub fn values(&self) -> Vec<f64> {
        match self {
            Report::Full(s) | Report::Area { summary: s, .. } => s.values().to_vec(),
            Report::Weighted(s) => s.values().to_vec(),
        }
    }
}

pub fn write(format: Format, state: &State, out: impl Write) -> Result<()> {
    match format {
        Format::Table => pretty::write_table(state, out),
        Format::Csv => write_csv(state, out),
        Format::Json => write_json(state, out),
    }
}

fn csv_cell(x: f64) -> String {
    if x.is_finite() {
        x.to_string()
    } else {
        String::new()
    }
}

fn write_csv(state: &State, out: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header = vec!["Label", "Column"];
    header.extend(state.blueprint.headers());
    wtr.write_record(&header)?;
    for (label, column, tracker) in state.rows() {
        let mut record = vec![label.to_string(), column.to_string()];
        record.extend(tracker.report().values().into_iter().map(csv_cell));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `{label: {column: report}}` on a single line.  Non-finite statistics
/// become `null`.
fn write_json(state: &State, mut out: impl Write) -> Result<()> {
    let mut all = BTreeMap::<&str, BTreeMap<&str, Report>>::new();
    for (label, column, tracker) in state.rows() {
        all.entry(label.0.as_str())
            .or_default()
            .insert(column, tracker.report());
    }
    let s = serde_json::to_string(&all)?;
    writeln!(out, "{}", s)?;
    Ok(())
}
