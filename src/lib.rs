//! nginx site management, access-log analytics and live server metrics.

pub mod admin;
pub mod analytics;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod realtime;
pub mod site;
pub mod store;

pub use config::ConsoleConfig;
pub use lifecycle::Shutdown;
pub use realtime::MetricsHub;
pub use store::ConfigStore;
