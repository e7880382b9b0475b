use crate::report::Report;
use crate::summarize::State;
use anyhow::Result;
use std::fmt;
use std::io::Write;

/// Four decimal places, or a dash for statistics there wasn't enough data
/// for.
pub struct PrettyNum(pub f64);

impl fmt::Display for PrettyNum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_nan() {
            f.write_str("-")
        } else {
            write!(f, "{:.4}", self.0)
        }
    }
}

/// "95" for 0.95, "97.5" for 0.975
fn percent(level: f64) -> String {
    let s = format!("{:.3}", level * 100.);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// An aligned table with the headline statistics of every estimator.
pub fn write_table(state: &State, out: impl Write) -> Result<()> {
    let mut out = tabwriter::TabWriter::new(out);
    let hw = format!("±{}%", percent(state.blueprint.level));
    let mut header_done = false;
    for (label, column, tracker) in state.rows() {
        match tracker.report() {
            Report::Full(s) | Report::Area { summary: s, .. } => {
                if !header_done {
                    writeln!(
                        out,
                        "label\tcolumn\tcount\taverage\t{}\tstd dev\tmin\tmax\tlag-1 corr\tmissing",
                        hw
                    )?;
                    header_done = true;
                }
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    label,
                    column,
                    s.count,
                    PrettyNum(s.average),
                    PrettyNum(s.half_width),
                    PrettyNum(s.standard_deviation),
                    PrettyNum(s.min),
                    PrettyNum(s.max),
                    PrettyNum(s.lag1_correlation),
                    s.number_missing,
                )?;
            }
            Report::Weighted(s) => {
                if !header_done {
                    writeln!(out, "label\tcolumn\tcount\taverage\tmin\tmax\tsum of weights")?;
                    header_done = true;
                }
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    label,
                    column,
                    s.count,
                    PrettyNum(s.average),
                    PrettyNum(s.min),
                    PrettyNum(s.max),
                    PrettyNum(s.sum_of_weights),
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
