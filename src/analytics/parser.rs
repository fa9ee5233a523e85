//! Access-log line parser.
//!
//! Expected layout (combined format plus a trailing request time):
//!
//! ```text
//! 203.0.113.5 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "curl/7.68.0" 0.012
//! ```
//!
//! The protocol inside the request quote and the zone offset inside the
//! brackets are optional. Timestamps without an offset are taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(\S+) \S+ \S+ \[([^\]]+)\] "(\S+) (\S+)(?: [^"]*)?" (\d{3}) (?:\d+|-) "([^"]*)" "([^"]*)" (\d+(?:\.\d+)?)$"#,
    )
    .expect("access log pattern is valid")
});

const ZONED_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";
const NAIVE_FORMAT: &str = "%d/%b/%Y:%H:%M:%S";

/// One parsed access-log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    /// Trailing request-time field, as written by the server.
    pub response_time_ms: f64,
    pub user_agent: String,
}

/// Parse one log line. Returns `None` for anything that does not match the layout.
pub fn parse_line(line: &str) -> Option<AccessLogEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let caps = LINE_PATTERN.captures(line)?;

    Some(AccessLogEntry {
        timestamp: parse_timestamp(&caps[2])?,
        client_ip: caps[1].to_string(),
        method: caps[3].to_string(),
        path: caps[4].to_string(),
        status_code: caps[5].parse().ok()?,
        response_time_ms: caps[8].parse().ok()?,
        user_agent: caps[7].to_string(),
    })
}

/// Normalize the bracketed log timestamp to UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(zoned) = DateTime::parse_from_str(raw, ZONED_FORMAT) {
        return Some(zoned.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_documented_layout() {
        let line = r#"203.0.113.5 - - [10/Oct/2023:13:55:36] "GET /index.html" 200 512 "-" "curl/7.68.0" 0.012"#;
        let entry = parse_line(line).unwrap();
        assert_eq!(entry.client_ip, "203.0.113.5");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/index.html");
        assert_eq!(entry.status_code, 200);
        assert_eq!(entry.response_time_ms, 0.012);
        assert_eq!(entry.user_agent, "curl/7.68.0");
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2023, 10, 10, 13, 55, 36).unwrap());
    }

    #[test]
    fn test_parse_nginx_combined_with_zone_and_protocol() {
        let line = "198.51.100.7 - alice [10/Oct/2023:15:55:36 +0200] \"POST /api/items?id=3 HTTP/1.1\" 201 0 \"https://ref.test/\" \"Mozilla/5.0 (X11; Linux)\" 1.250\r\n";
        let entry = parse_line(line).unwrap();
        assert_eq!(entry.method, "POST");
        assert_eq!(entry.path, "/api/items?id=3");
        assert_eq!(entry.status_code, 201);
        assert_eq!(entry.user_agent, "Mozilla/5.0 (X11; Linux)");
        assert_eq!(entry.response_time_ms, 1.25);
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2023, 10, 10, 13, 55, 36).unwrap());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let truncated = r#"203.0.113.5 - - [10/Oct/2023:13:55:36] "GET /index.html" 200 512 "-" "curl"#;
        let reordered = r#"[10/Oct/2023:13:55:36] 203.0.113.5 - - "GET /" 200 512 "-" "curl" 0.1"#;
        let bad_date = r#"203.0.113.5 - - [99/Foo/2023:13:55:36] "GET /" 200 512 "-" "curl" 0.1"#;
        let no_time = r#"203.0.113.5 - - [10/Oct/2023:13:55:36] "GET /" 200 512 "-" "curl""#;

        for line in [truncated, reordered, bad_date, no_time, "", "garbage"] {
            assert!(parse_line(line).is_none(), "line {line:?}");
        }
    }
}
