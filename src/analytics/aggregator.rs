//! Windowed traffic statistics.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::analytics::parser::AccessLogEntry;

/// Length of the top-paths / top-IPs lists.
pub const TOP_LIMIT: usize = 10;

/// Summary of the entries inside one trailing window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficStats {
    pub requests_per_minute: f64,
    pub avg_response_time_ms: f64,
    pub status_code_counts: BTreeMap<u16, u64>,
    pub top_paths: Vec<PathCount>,
    pub top_ips: Vec<IpCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: u64,
}

/// Aggregate entries newer than `window_minutes` ago.
pub fn aggregate(entries: &[AccessLogEntry], window_minutes: u32) -> TrafficStats {
    aggregate_at(entries, window_minutes, Utc::now())
}

/// Aggregate against an explicit `now`.
///
/// A zero-length window, or a window with no entries, yields zero rates
/// and empty lists.
pub fn aggregate_at(entries: &[AccessLogEntry], window_minutes: u32, now: DateTime<Utc>) -> TrafficStats {
    if window_minutes == 0 {
        return TrafficStats::default();
    }

    let cutoff = now - Duration::minutes(i64::from(window_minutes));
    let recent: Vec<&AccessLogEntry> = entries.iter().filter(|e| e.timestamp > cutoff).collect();
    if recent.is_empty() {
        return TrafficStats::default();
    }

    let total_time: f64 = recent.iter().map(|e| e.response_time_ms).sum();

    let mut status_code_counts = BTreeMap::new();
    for entry in &recent {
        *status_code_counts.entry(entry.status_code).or_insert(0) += 1;
    }

    let top_paths = top_n(recent.iter().map(|e| e.path.as_str()), TOP_LIMIT)
        .into_iter()
        .map(|(path, count)| PathCount { path, count })
        .collect();
    let top_ips = top_n(recent.iter().map(|e| e.client_ip.as_str()), TOP_LIMIT)
        .into_iter()
        .map(|(ip, count)| IpCount { ip, count })
        .collect();

    TrafficStats {
        requests_per_minute: recent.len() as f64 / f64::from(window_minutes),
        avg_response_time_ms: total_time / recent.len() as f64,
        status_code_counts,
        top_paths,
        top_ips,
    }
}

/// Count keys, sort by count descending, keep the first `limit`.
///
/// Counts accumulate in first-seen order and the sort is stable, so equal
/// counts keep the order in which their keys first appeared.
fn top_n<'a>(keys: impl Iterator<Item = &'a str>, limit: usize) -> Vec<(String, u64)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u64)> = Vec::new();

    for key in keys {
        match slots.entry(key) {
            Entry::Occupied(slot) => counts[*slot.get()].1 += 1,
            Entry::Vacant(slot) => {
                slot.insert(counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts.into_iter().map(|(key, count)| (key.to_string(), count)).collect()
}
