//! Result persistence and human-readable summary
//!
//! The result file carries exactly one line per picture, written as results
//! arrive. Line order reflects completion order, not backlog order, and is
//! non-deterministic across runs; each line is flushed as it is written so
//! already-completed pictures survive an aborted run.

use crate::problem::MatchResult;
use crate::stats::RunStats;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// One output line per result, in arrival order.
pub struct ResultWriter {
    out: BufWriter<File>,
}

impl ResultWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    /// Append one result line and flush it.
    pub fn write_result(&mut self, result: &MatchResult) -> Result<()> {
        writeln!(self.out, "{}", format_result_line(result))
            .context("Failed to write result line")?;
        self.out.flush().context("Failed to flush result line")?;
        Ok(())
    }

    /// Flush and close the sink.
    pub fn finish(mut self) -> Result<()> {
        self.out.flush().context("Failed to flush output file")?;
        Ok(())
    }
}

/// Render one result in the output-file format.
pub fn format_result_line(result: &MatchResult) -> String {
    match result.location {
        Some(loc) => format!(
            "Picture {} found Object {} in Position({},{})",
            result.picture_id, loc.object_id, loc.row, loc.col
        ),
        None => format!("Picture {} No Objects were found", result.picture_id),
    }
}

/// Print the end-of-run summary to the console.
pub fn print_run_summary(stats: &RunStats, duration: Duration, workers: usize) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    println!("Elapsed Time: {:.3}s", duration.as_secs_f64());
    println!();

    println!("Pictures:");
    println!("  Total:     {}", stats.total());
    println!("  Matched:   {}", stats.matched());
    println!("  Unmatched: {}", stats.unmatched());
    println!();

    println!("Workers: {}", workers);
    for (node, count) in stats.per_worker() {
        println!("  {}: {} pictures", node, count);
    }
    println!();

    println!("Search Latency (per picture):");
    let hist = stats.search_latency_us();
    if !hist.is_empty() {
        println!("  Min:    {}µs", hist.min());
        println!("  Mean:   {:.1}µs", hist.mean());
        println!("  Max:    {}µs", hist.max());
        println!();
        println!("  Percentiles:");
        for &p in &[50.0, 90.0, 95.0, 99.0, 99.9] {
            println!("    p{:5.2}: {}µs", p, hist.value_at_percentile(p));
        }
    } else {
        println!("  No latency data collected");
    }

    println!();
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::MatchLocation;
    use tempfile::tempdir;

    #[test]
    fn test_format_found_line() {
        let result = MatchResult {
            picture_id: 5,
            location: Some(MatchLocation {
                object_id: 2,
                row: 0,
                col: 0,
            }),
        };
        assert_eq!(
            format_result_line(&result),
            "Picture 5 found Object 2 in Position(0,0)"
        );
    }

    #[test]
    fn test_format_no_match_line() {
        let result = MatchResult::no_match(12);
        assert_eq!(format_result_line(&result), "Picture 12 No Objects were found");
    }

    #[test]
    fn test_writer_emits_one_line_per_result_in_arrival_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.txt");

        let mut writer = ResultWriter::create(&path).unwrap();
        writer
            .write_result(&MatchResult {
                picture_id: 2,
                location: Some(MatchLocation {
                    object_id: 7,
                    row: 1,
                    col: 3,
                }),
            })
            .unwrap();
        writer.write_result(&MatchResult::no_match(1)).unwrap();
        writer.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Picture 2 found Object 7 in Position(1,3)",
                "Picture 1 No Objects were found",
            ]
        );
    }
}
