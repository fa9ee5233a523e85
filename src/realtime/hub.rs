//! Subscription registry and sampling timer.
//!
//! # Responsibilities
//! - Register / remove subscribers (the only mutation entry points)
//! - Own at most one sampling timer, running iff subscribers exist
//! - Fan each sample out to subscribers in registration order
//!
//! # Design Decisions
//! - Registry and timer handle live behind one mutex; add/remove and
//!   timer start/stop happen atomically together
//! - The timer task holds a `Weak` hub reference and an epoch; a stale
//!   task (aborted but not yet unwound) can never deliver
//! - Callbacks run outside the lock, so a callback may drop its own
//!   subscription without deadlocking
//! - A panicking or failing callback is logged and skipped

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::observability::metrics;
use crate::realtime::sample::MetricsSample;
use crate::realtime::sampler::MetricsSampler;

/// Why a subscriber did not accept a sample.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber channel closed")]
    Closed,
    #[error("subscriber channel full")]
    Full,
}

/// Hub lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HubState {
    /// No subscribers, no timer.
    Idle,
    /// At least one subscriber, timer running.
    Active,
}

type Callback = dyn Fn(&Arc<MetricsSample>) -> Result<(), DeliveryError> + Send + Sync;

struct Subscriber {
    id: u64,
    registered: AtomicBool,
    callback: Box<Callback>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    epoch: u64,
    subscribers: Vec<Arc<Subscriber>>,
    timer: Option<JoinHandle<()>>,
}

struct HubInner {
    sampler: MetricsSampler,
    interval: Duration,
    registry: Mutex<Registry>,
}

/// Fans live metrics out to subscribers, sampling only while someone listens.
#[derive(Clone)]
pub struct MetricsHub {
    inner: Arc<HubInner>,
}

impl MetricsHub {
    pub fn new(sampler: MetricsSampler, interval: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                sampler,
                interval,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Register a callback. The first subscriber starts the sampling timer.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<MetricsSample>) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let mut registry = self.inner.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push(Arc::new(Subscriber {
            id,
            registered: AtomicBool::new(true),
            callback: Box::new(callback),
        }));

        if registry.timer.is_none() {
            registry.epoch += 1;
            registry.timer = Some(spawn_timer(
                Arc::downgrade(&self.inner),
                self.inner.interval,
                registry.epoch,
            ));
            tracing::info!(interval_ms = self.inner.interval.as_millis() as u64, "Metrics sampling started");
        }

        metrics::record_hub_subscribers(registry.subscribers.len());
        tracing::debug!(subscriber = id, total = registry.subscribers.len(), "Metrics subscriber added");

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Register a bounded channel as a subscriber.
    ///
    /// Delivery uses `try_send`, so a slow reader loses samples instead of
    /// stalling the others.
    pub fn subscribe_channel(&self, capacity: usize) -> (Subscription, mpsc::Receiver<Arc<MetricsSample>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let subscription = self.subscribe(move |sample| {
            tx.try_send(Arc::clone(sample)).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::Full,
                TrySendError::Closed(_) => DeliveryError::Closed,
            })
        });
        (subscription, rx)
    }

    /// Remove a subscription. Equivalent to dropping it.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    pub fn state(&self) -> HubState {
        if self.inner.registry.lock().timer.is_some() {
            HubState::Active
        } else {
            HubState::Idle
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().subscribers.len()
    }
}

impl HubInner {
    fn remove(&self, id: u64) {
        let mut registry = self.registry.lock();
        let Some(pos) = registry.subscribers.iter().position(|s| s.id == id) else {
            return;
        };

        let removed = registry.subscribers.remove(pos);
        removed.registered.store(false, Ordering::Release);
        metrics::record_hub_subscribers(registry.subscribers.len());
        tracing::debug!(subscriber = id, total = registry.subscribers.len(), "Metrics subscriber removed");

        if registry.subscribers.is_empty() {
            if let Some(timer) = registry.timer.take() {
                timer.abort();
                tracing::info!("Metrics sampling stopped");
            }
        }
    }

    fn broadcast(&self, epoch: u64, sample: &Arc<MetricsSample>) {
        let subscribers = {
            let registry = self.registry.lock();
            if registry.epoch != epoch || registry.timer.is_none() {
                return;
            }
            registry.subscribers.clone()
        };

        for subscriber in &subscribers {
            if !subscriber.registered.load(Ordering::Acquire) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(sample))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(subscriber = subscriber.id, error = %e, "Metrics delivery failed");
                }
                Err(_) => {
                    tracing::warn!(subscriber = subscriber.id, "Metrics subscriber panicked during delivery");
                }
            }
        }
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        if let Some(timer) = self.registry.get_mut().timer.take() {
            timer.abort();
        }
    }
}

fn spawn_timer(hub: Weak<HubInner>, period: Duration, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(inner) = hub.upgrade() else {
                break;
            };
            let sample = Arc::new(inner.sampler.sample().await);
            inner.broadcast(epoch, &sample);
        }
    })
}

/// Token returned by [`MetricsHub::subscribe`]; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Explicitly unsubscribe.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
