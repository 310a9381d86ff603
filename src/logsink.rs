//! Log sink -- timestamped append-only task logs, mirrored to the console.
//!
//! Every recorded line survives even when the wrapped subprocess dies: the
//! file is opened in append mode and flushed after each line. Ordering is
//! guaranteed within one process only; concurrent writers interleave at line
//! granularity.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How many trailing lines are retained for the run-result excerpt.
const TAIL_LINES: usize = 20;

pub struct LogSink {
    path: PathBuf,
    file: File,
    tail: VecDeque<String>,
    /// Mirror recorded lines to stdout (disabled in some tests).
    echo: bool,
}

impl LogSink {
    /// Open (or create) the log file in append mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            tail: VecDeque::with_capacity(TAIL_LINES),
            echo: true,
        })
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `"[timestamp] line"` to the file and relay the raw line to
    /// stdout. Flushes before returning so the line is durable even if the
    /// process dies right after.
    pub fn record(&mut self, line: &str) -> Result<()> {
        let stamped = format!("[{}] {}\n", Utc::now().to_rfc3339(), line);
        self.file
            .write_all(stamped.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        self.file.flush()?;

        if self.echo {
            println!("{line}");
        }

        if self.tail.len() == TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
        Ok(())
    }

    /// The last few recorded lines, newline-joined.
    pub fn excerpt(&self) -> String {
        let lines: Vec<&str> = self.tail.iter().map(String::as_str).collect();
        lines.join("\n")
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        // Best effort; each record() already flushed.
        let _ = self.file.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_timestamped_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.log");
        let mut sink = LogSink::open(&path).unwrap().echo(false);
        sink.record("starting scrape").unwrap();
        sink.record("done").unwrap();
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("starting scrape"));
        assert!(lines[1].ends_with("done"));
    }

    #[test]
    fn test_reopen_appends_not_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decision.log");
        {
            let mut sink = LogSink::open(&path).unwrap().echo(false);
            sink.record("first run").unwrap();
        }
        {
            let mut sink = LogSink::open(&path).unwrap().echo(false);
            sink.record("second run").unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_excerpt_keeps_only_tail() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = LogSink::open(&dir.path().join("x.log")).unwrap().echo(false);
        for i in 0..(TAIL_LINES + 5) {
            sink.record(&format!("line {i}")).unwrap();
        }
        let excerpt = sink.excerpt();
        assert!(!excerpt.contains("line 0"));
        assert!(excerpt.contains(&format!("line {}", TAIL_LINES + 4)));
        assert_eq!(excerpt.lines().count(), TAIL_LINES);
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nested/backfill.log");
        let mut sink = LogSink::open(&path).unwrap().echo(false);
        sink.record("hello").unwrap();
        assert!(path.is_file());
    }
}
