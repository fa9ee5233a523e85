//! Access-log analytics subsystem.
//!
//! # Data Flow
//! ```text
//! access.log (append-only, written by the server)
//!     → reader.rs (stream lines, keep the most recent N)
//!     → parser.rs (one line → AccessLogEntry, or skip)
//!     → aggregator.rs (trailing window → TrafficStats)
//! ```
//!
//! # Design Decisions
//! - Malformed, truncated or non-UTF-8 lines are skipped, never fatal
//! - Entries live only for the duration of one call; nothing is cached
//! - Top-N lists break ties by first appearance, tracked explicitly

pub mod aggregator;
pub mod parser;
pub mod reader;

pub use aggregator::{aggregate, aggregate_at, IpCount, PathCount, TrafficStats};
pub use parser::{parse_line, AccessLogEntry};
pub use reader::{read_access_log, traffic_stats};
