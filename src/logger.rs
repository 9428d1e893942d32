//! Audit logging façade.
//!
//! [`AuditLogger`] owns the pipeline: config gating, severity resolution,
//! enrichment, optional anonymization, threat detection, store write, and
//! alert evaluation. `log` is synchronous, infallible, and never blocks on
//! alert delivery; construction is the only step that can fail.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::alert::{AlertChannel, AlertProcessor};
use crate::anonymize;
use crate::config::AuditConfig;
use crate::event::{
    ActorContext, EventDraft, EventKind, EventResult, Metadata, MetadataValue, SecurityEvent,
    Severity,
};
use crate::report;
use crate::store::{EventFilter, EventStore, StoreStats};
use crate::threat;

/// Metadata keys whose text values are truncated during enrichment.
const TRUNCATED_KEYS: &[&str] = &["payload", "request_body"];

/// Maximum length kept for truncated metadata values.
const TRUNCATE_LEN: usize = 200;

/// Metadata key recording an unrecognized dynamic event label.
const UNRECOGNIZED_KIND_KEY: &str = "unrecognized_event_type";

/// Length of the 24-hour compliance reporting window.
const REPORT_WINDOW_HOURS: i64 = 24;

/// Dev-trace sink receiving every enriched event after it is stored.
/// Implementations must return quickly and must not panic; the pipeline
/// does not guard against a misbehaving sink beyond calling it last.
pub trait TraceSink: Send + Sync {
    fn trace(&self, event: &SecurityEvent);
}

/// Default sink that drops every trace.
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn trace(&self, _event: &SecurityEvent) {}
}

/// Sink that forwards enriched events to `tracing` at debug level.
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn trace(&self, event: &SecurityEvent) {
        debug!(
            id = %event.id,
            kind = %event.kind,
            severity = %event.severity,
            correlation_id = %event.correlation_id,
            "audit event recorded"
        );
    }
}

/// The audit logging façade. One instance per subsystem; components that
/// need direct store access share the `Arc` returned by [`Self::store`].
pub struct AuditLogger {
    config: AuditConfig,
    store: Arc<EventStore>,
    alerts: AlertProcessor,
    sink: Box<dyn TraceSink>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

impl AuditLogger {
    /// Build a logger from validated configuration and the registered alert
    /// senders. Fails on invalid thresholds or on a configured channel name
    /// with no matching sender; these are the only fatal errors the
    /// subsystem produces.
    pub fn new(config: AuditConfig, channels: Vec<Arc<dyn AlertChannel>>) -> Result<Self> {
        config.validate()?;
        for name in &config.alerting.channels {
            if !channels.iter().any(|c| c.name() == name) {
                bail!("unknown alert channel '{name}'");
            }
        }

        let store = Arc::new(EventStore::with_capacity(config.max_events));
        let alerts = AlertProcessor::new(config.alerting.clone(), channels);

        Ok(Self {
            config,
            store,
            alerts,
            sink: Box::new(NoopSink),
        })
    }

    /// Replace the dev-trace sink (no-op by default).
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The shared store. Passing this reference around is the only way
    /// other components observe the same event log.
    pub fn store(&self) -> Arc<EventStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Record one security event.
    ///
    /// Consumes the draft, so the caller's data is never mutated in place.
    /// Drafts below the configured log level (after severity resolution)
    /// are dropped silently; everything else is enriched, scored, stored,
    /// and fed to alert evaluation. Never fails, never blocks on dispatch.
    pub fn log(&self, draft: EventDraft) {
        if !self.config.enabled {
            return;
        }

        let (kind, draft) = resolve_kind(draft);
        let severity = draft
            .severity
            .unwrap_or_else(|| kind.default_severity());
        if severity < self.config.log_level {
            return;
        }

        let mut event = self.enrich(kind, severity, draft);
        if self.config.anonymization {
            anonymize::anonymize_actor(&mut event.actor);
        }
        event.threat = threat::detect(&event, &self.store);

        self.store.add(event.clone());
        self.alerts.evaluate(&self.store);
        self.sink.trace(&event);
    }

    /// Record an event arriving from a dynamically-typed boundary. A label
    /// outside the closed kind set is coerced to a MEDIUM-severity
    /// suspicious-activity event with the raw label preserved in metadata —
    /// never silently dropped.
    pub fn log_labeled(&self, label: &str, mut draft: EventDraft) {
        draft.kind = EventKind::from_str(label);
        if draft.kind.is_none() {
            draft
                .metadata
                .insert(UNRECOGNIZED_KIND_KEY.to_string(), label.into());
        }
        self.log(draft);
    }

    /// Record an authentication outcome.
    pub fn log_auth(&self, success: bool, user_id: impl Into<String>, metadata: Metadata) {
        let user_id = user_id.into();
        let (kind, result, message) = if success {
            (
                EventKind::AuthSuccess,
                EventResult::Success,
                format!("authentication succeeded for {user_id}"),
            )
        } else {
            (
                EventKind::AuthFailure,
                EventResult::Failure,
                format!("authentication failed for {user_id}"),
            )
        };

        self.log(EventDraft {
            actor: ActorContext {
                user_id: Some(user_id),
                ..Default::default()
            },
            result,
            metadata,
            ..EventDraft::new(kind, message)
        });
    }

    /// Record an access-control decision.
    pub fn log_access(
        &self,
        granted: bool,
        resource: impl Into<String>,
        action: impl Into<String>,
        user_id: impl Into<String>,
        reason: Option<String>,
    ) {
        let resource = resource.into();
        let action = action.into();
        let (kind, result, message) = if granted {
            (
                EventKind::AccessGranted,
                EventResult::Success,
                format!("access granted: {action} on {resource}"),
            )
        } else {
            (
                EventKind::AccessDenied,
                EventResult::Failure,
                format!("access denied: {action} on {resource}"),
            )
        };

        let mut metadata = Metadata::new();
        if let Some(reason) = reason {
            metadata.insert("reason".to_string(), reason.into());
        }

        self.log(EventDraft {
            actor: ActorContext {
                user_id: Some(user_id.into()),
                ..Default::default()
            },
            resource: Some(resource),
            action: Some(action),
            result,
            metadata,
            ..EventDraft::new(kind, message)
        });
    }

    /// Record a detected attack attempt.
    pub fn log_attack(&self, kind: EventKind, details: Metadata) {
        self.log(EventDraft {
            result: EventResult::Failure,
            metadata: details,
            ..EventDraft::new(kind, format!("attack attempt: {kind}"))
        });
    }

    /// Query stored events.
    pub fn events(&self, filter: &EventFilter) -> Vec<SecurityEvent> {
        self.store.events(filter)
    }

    /// Aggregate statistics over the stored events.
    pub fn statistics(&self) -> StoreStats {
        self.store.statistics()
    }

    /// Render the compliance report over the current store contents and the
    /// trailing 24-hour window.
    pub fn generate_compliance_report(&self) -> String {
        let stats = self.store.statistics();
        let since = Utc::now() - Duration::hours(REPORT_WINDOW_HOURS);
        let window = self.store.events(&EventFilter {
            from: Some(since),
            ..Default::default()
        });
        report::generate(&self.config, &stats, &window)
    }

    /// Build the stored event from a draft: id, timestamp, correlation id,
    /// and sensitive-key truncation.
    fn enrich(&self, kind: EventKind, severity: Severity, draft: EventDraft) -> SecurityEvent {
        let mut metadata = draft.metadata;
        for key in TRUNCATED_KEYS {
            if let Some(MetadataValue::Text(text)) = metadata.get_mut(*key) {
                if text.chars().count() > TRUNCATE_LEN {
                    *text = text.chars().take(TRUNCATE_LEN).collect();
                }
            }
        }

        SecurityEvent {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            severity,
            actor: draft.actor,
            resource: draft.resource,
            action: draft.action,
            result: draft.result,
            message: draft.message,
            metadata,
            stack_trace: draft.stack_trace,
            correlation_id: draft
                .correlation_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            threat: None,
        }
    }
}

/// Resolve the draft's kind. Drafts without one (unrecognized dynamic
/// labels) are coerced to a MEDIUM-severity suspicious-activity event
/// unless the caller set an explicit severity override.
fn resolve_kind(mut draft: EventDraft) -> (EventKind, EventDraft) {
    match draft.kind {
        Some(kind) => (kind, draft),
        None => {
            if draft.severity.is_none() {
                draft.severity = Some(Severity::Medium);
            }
            (EventKind::SuspiciousActivity, draft)
        }
    }
}
