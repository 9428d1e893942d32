//! Alert batching and channel dispatch.
//!
//! The processor drains the store's alert queue on every evaluation, applies
//! a sliding-window frequency threshold, and fans the drained batch out to
//! the configured channels. Dispatch is best-effort and channel-isolated:
//! each send runs in its own task with an independent timeout, and a failed
//! or slow channel never affects the others or the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::config::AlertingConfig;
use crate::event::SecurityEvent;
use crate::store::EventStore;

/// Per-channel delivery timeout.
pub const CHANNEL_TIMEOUT: Duration = Duration::from_secs(5);

/// An alert sender (email, Slack, webhook, ...). Implementations live
/// outside this crate; the contract is that `send` reports failure through
/// its `Result` and never panics into the processor.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Stable name used to match against `AlertingConfig::channels`.
    fn name(&self) -> &str;

    /// Deliver one drained batch.
    async fn send(&self, batch: &[SecurityEvent]) -> Result<()>;
}

/// Built-in channel that emits alert batches through `tracing`.
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, batch: &[SecurityEvent]) -> Result<()> {
        for event in batch {
            warn!(
                id = %event.id,
                kind = %event.kind,
                severity = %event.severity,
                "security alert"
            );
        }
        Ok(())
    }
}

/// Drains the alert queue and dispatches batches when thresholds are met.
pub struct AlertProcessor {
    config: AlertingConfig,
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl AlertProcessor {
    pub fn new(config: AlertingConfig, channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        Self { config, channels }
    }

    /// Run one alert evaluation cycle against the store.
    ///
    /// The queue is drained unconditionally, even with alerting disabled, to
    /// bound its growth. When alerting is enabled and the number of stored
    /// events at or above the severity floor inside the sliding window meets
    /// the frequency threshold, the drained batch is dispatched once to
    /// every configured channel. Never blocks on delivery.
    pub fn evaluate(&self, store: &EventStore) {
        let batch = store.drain_alert_queue();
        if !self.config.enabled || batch.is_empty() {
            return;
        }

        let since = Utc::now() - self.config.thresholds.window();
        let recent = store.count_at_or_above(self.config.thresholds.severity, since);
        if recent < self.config.thresholds.frequency as usize {
            debug!(
                recent,
                frequency = self.config.thresholds.frequency,
                "alert frequency threshold not met"
            );
            return;
        }

        self.dispatch(batch);
    }

    /// Fan a batch out to every configured channel, one task per channel.
    fn dispatch(&self, batch: Vec<SecurityEvent>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // Accepted best-effort: without a runtime there is nothing to
                // deliver on, and alerts are dropped rather than retried.
                warn!(count = batch.len(), "no async runtime, dropping alert batch");
                return;
            }
        };

        let batch = Arc::new(batch);
        for channel in self.configured_channels() {
            let batch = Arc::clone(&batch);
            handle.spawn(async move {
                deliver(channel.as_ref(), &batch).await;
            });
        }
    }

    /// Registered channels whose name appears in the configuration.
    fn configured_channels(&self) -> Vec<Arc<dyn AlertChannel>> {
        self.channels
            .iter()
            .filter(|c| self.config.channels.iter().any(|name| name == c.name()))
            .cloned()
            .collect()
    }
}

/// Deliver one batch to one channel, bounded by [`CHANNEL_TIMEOUT`].
/// Failures and timeouts are logged, never propagated.
pub async fn deliver(channel: &dyn AlertChannel, batch: &[SecurityEvent]) {
    match tokio::time::timeout(CHANNEL_TIMEOUT, channel.send(batch)).await {
        Ok(Ok(())) => {
            debug!(
                channel = channel.name(),
                count = batch.len(),
                "alert batch delivered"
            );
        }
        Ok(Err(e)) => {
            warn!(channel = channel.name(), error = %e, "alert delivery failed");
        }
        Err(_) => {
            warn!(channel = channel.name(), "alert delivery timed out");
        }
    }
}
