//! Virtual-host configuration model and text codec.
//!
//! # Data Flow
//! ```text
//! site file text
//!     → scanner.rs (tokens → directive tree, tolerant of stray braces)
//!     → codec.rs::parse (server_name/listen/root, location blocks, SSL)
//!     → ConfigurationUnit (model.rs)
//!
//! ConfigurationUnit
//!     → codec.rs::render (canonical directive order)
//!     → site file text
//! ```
//!
//! # Design Decisions
//! - Parsing never fails hard: a file without `server_name` or `listen` is skipped
//! - Only a narrow directive subset is understood; everything else is ignored
//! - `enabled` and `storage_class` are derived by the store, never read from text
//! - SSL directives are parsed but never rendered

pub mod codec;
pub mod model;
pub mod scanner;

pub use codec::{parse, render};
pub use model::{ConfigurationUnit, LocationRule, SslInfo, StorageClass};
