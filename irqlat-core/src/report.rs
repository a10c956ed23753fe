// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Series output: the `<min>,<max>` result log, the interrupt accounting
//! excerpt, and the console summary.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{IrqLatError, IrqLatResult};
use crate::stats::LatencyStats;

/// Append-only log with one `<min>,<max>` line per series.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    file: File,
}

impl ResultLog {
    /// Open (creating if needed) the log for appending.
    pub fn open(path: impl AsRef<Path>) -> IrqLatResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| IrqLatError::ResourceUnavailable {
                resource: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), "Opened result log");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one series line and flush it.
    pub fn append(&mut self, stats: &LatencyStats) -> IrqLatResult<()> {
        writeln!(self.file, "{}", format_log_line(stats))
            .and_then(|_| self.file.flush())
            .map_err(|e| IrqLatError::Io {
                context: "appending to result log",
                source: e,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `<min>,<max>` without the trailing newline.
pub fn format_log_line(stats: &LatencyStats) -> String {
    format!("{},{}", stats.min_us, stats.max_us)
}

/// Parse a result log line back into `(min, max)`.
pub fn parse_log_line(line: &str) -> Option<(u64, u64)> {
    let (min, max) = line.trim_end().split_once(',')?;
    Some((min.parse().ok()?, max.parse().ok()?))
}

/// Reader for the kernel interrupt accounting file (`/proc/interrupts`),
/// filtered to the rows of one interrupt.
#[derive(Debug)]
pub struct InterruptAccounting {
    reader: BufReader<File>,
    prefix: String,
}

impl InterruptAccounting {
    pub fn open(path: impl AsRef<Path>, prefix: impl Into<String>) -> IrqLatResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| IrqLatError::ResourceUnavailable {
            resource: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            reader: BufReader::new(file),
            prefix: prefix.into(),
        })
    }

    /// Read every row whose first field starts with the prefix, then rewind
    /// so the next call sees fresh counters.
    pub fn matching_lines(&mut self) -> IrqLatResult<Vec<String>> {
        let mut lines = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).map_err(|e| IrqLatError::Io {
                context: "reading interrupt accounting file",
                source: e,
            })?;
            if read == 0 {
                break;
            }
            if line.trim_start().starts_with(&self.prefix) {
                lines.push(line.trim_end().to_string());
            }
        }

        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| IrqLatError::Io {
                context: "rewinding interrupt accounting file",
                source: e,
            })?;

        Ok(lines)
    }
}

/// One series as reported on the console and in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
    /// Zero-based series number.
    pub series: usize,
    pub stats: LatencyStats,
    /// False if a stop request cut the series short.
    pub completed: bool,
    pub accounting: Vec<String>,
}

impl SeriesReport {
    /// Human-readable summary block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let s = &self.stats;
        let _ = writeln!(out, "Minimum Latency:    {}us", s.min_us);
        let _ = writeln!(out, "Maximum Latency:    {}us", s.max_us);
        let _ = writeln!(out, "Average Latency:    {:.6}us", s.mean_us);
        let _ = writeln!(out, "Standard Deviation: {:.6}us", s.std_dev_us);
        let _ = writeln!(out, "Number of samples: {}", s.count);
        for line in &self.accounting {
            let _ = writeln!(out, "{}", line);
        }
        out
    }

    pub fn to_json(&self) -> IrqLatResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| IrqLatError::Encode {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> LatencyStats {
        LatencyStats::from_intervals(&[10, 12, 11, 50, 9]).unwrap()
    }

    #[test]
    fn test_log_line_format() {
        assert_eq!(format_log_line(&stats()), "9,50");
    }

    #[test]
    fn test_log_line_round_trip() {
        let line = format!("{}\n", format_log_line(&stats()));
        assert_eq!(parse_log_line(&line), Some((9, 50)));
        assert_eq!(parse_log_line("garbage"), None);
    }

    #[test]
    fn test_render_lists_all_fields() {
        let report = SeriesReport {
            series: 0,
            stats: stats(),
            completed: true,
            accounting: vec![" 164:   5   GIC-0  61 Edge  gpio-interrupt".to_string()],
        };
        let text = report.render();
        assert!(text.contains("Minimum Latency:    9us"));
        assert!(text.contains("Maximum Latency:    50us"));
        assert!(text.contains("Average Latency:    18.400000us"));
        assert!(text.contains("Number of samples: 5"));
        assert!(text.contains("gpio-interrupt"));
    }

    #[test]
    fn test_open_failures_name_the_file() {
        let err = ResultLog::open("/nonexistent-irqlat-dir/latency.csv")
            .err()
            .unwrap();
        assert!(matches!(err, IrqLatError::ResourceUnavailable { .. }));
        assert!(err.to_string().contains("/nonexistent-irqlat-dir/latency.csv"));

        let err = InterruptAccounting::open("/nonexistent-irqlat-dir/interrupts", "164")
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent-irqlat-dir/interrupts"));
    }

    #[test]
    fn test_json_output() {
        let report = SeriesReport {
            series: 2,
            stats: stats(),
            completed: true,
            accounting: Vec::new(),
        };
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["series"], 2);
        assert_eq!(value["stats"]["min_us"], 9);
    }
}
