//! # audit-sentinel
//!
//! Security audit event logging and threat detection.
//!
//! This crate captures structured security events (authentication outcomes,
//! access decisions, attack attempts, data operations, configuration changes),
//! scores each against lightweight threat heuristics, keeps a bounded
//! queryable in-memory event log, dispatches alert batches when severity and
//! frequency thresholds are crossed, and renders compliance summaries.
//!
//! The entry point is [`AuditLogger`]: construct one from an [`AuditConfig`]
//! and a set of [`alert::AlertChannel`] senders, then feed it
//! [`EventDraft`]s via [`AuditLogger::log`] or the convenience wrappers.

pub mod alert;
pub mod anonymize;
pub mod config;
pub mod event;
pub mod logger;
pub mod report;
pub mod store;
pub mod threat;

pub use config::{AlertThresholds, AlertingConfig, AuditConfig, StorageBackend};
pub use event::{
    ActorContext, EventDraft, EventKind, EventResult, Metadata, MetadataValue, SecurityEvent,
    Severity, ThreatCategory, ThreatIndicator,
};
pub use logger::{AuditLogger, NoopSink, TraceSink, TracingSink};
pub use store::{EventFilter, EventStore, StoreStats};
