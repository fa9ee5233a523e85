//! Access-log file reader.

use std::collections::VecDeque;
use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::analytics::aggregator::{aggregate, TrafficStats};
use crate::analytics::parser::{parse_line, AccessLogEntry};
use crate::observability::metrics;

/// Read up to `limit` of the most recent parseable entries, newest first.
///
/// A missing file reads as empty. Lines that fail to parse (including
/// truncated trailing writes) are skipped.
pub async fn read_access_log(path: &Path, limit: usize) -> io::Result<Vec<AccessLogEntry>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Access log not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut recent = VecDeque::with_capacity(limit.min(4096));
    let mut parsed = 0u64;
    let mut skipped = 0u64;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Some(entry) => {
                if recent.len() == limit {
                    recent.pop_front();
                }
                recent.push_back(entry);
                parsed += 1;
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(path = %path.display(), parsed, skipped, "Skipped malformed access log lines");
    }
    metrics::record_log_lines(parsed, skipped);

    Ok(recent.into_iter().rev().collect())
}

/// Read the log and aggregate the trailing window.
pub async fn traffic_stats(path: &Path, window_minutes: u32, limit: usize) -> io::Result<TrafficStats> {
    let entries = read_access_log(path, limit).await?;
    Ok(aggregate(&entries, window_minutes))
}
