//! Live operational metrics.
//!
//! # Data Flow
//! ```text
//! probes.rs (status page, process table, /proc/net/dev)
//!     → sampler.rs (one MetricsSample per tick, failed probes → 0)
//!     → hub.rs (single owned timer, fan-out to subscribers)
//!     → subscriber callbacks / channels (e.g. WebSocket sessions)
//! ```
//!
//! # State Machine (hub)
//! ```text
//! Idle   --first subscribe-->   Active (timer task spawned)
//! Active --last unsubscribe-->  Idle   (timer task aborted)
//! ```
//!
//! # Design Decisions
//! - The timer runs iff the subscriber set is non-empty
//! - Samples are immutable and shared via `Arc`
//! - One subscriber's failure never blocks delivery to the others

pub mod hub;
pub mod probes;
pub mod sample;
pub mod sampler;

pub use hub::{DeliveryError, HubState, MetricsHub, Subscription};
pub use sample::MetricsSample;
pub use sampler::MetricsSampler;
