//! End-to-end pipeline tests: logging through detection, storage, alert
//! evaluation, and report generation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use audit_sentinel::alert::AlertChannel;
use audit_sentinel::{
    AuditConfig, AuditLogger, EventDraft, EventFilter, EventKind, Metadata, SecurityEvent, Severity,
};

struct CountingChannel {
    name: String,
    dispatches: AtomicUsize,
}

impl CountingChannel {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            dispatches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AlertChannel for CountingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _batch: &[SecurityEvent]) -> Result<()> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn basic_logger() -> AuditLogger {
    AuditLogger::new(AuditConfig::default(), Vec::new()).unwrap()
}

/// Six AUTH_FAILURE events for one user inside the window; the sixth must
/// carry the repeated-failures indicator.
#[test]
fn six_auth_failures_flag_repeated_attempts() {
    let logger = basic_logger();
    for _ in 0..6 {
        logger.log_auth(false, "u1", Metadata::new());
    }

    let events = logger.events(&EventFilter::default());
    assert_eq!(events.len(), 6);

    let fifth = &events[4];
    assert!(fifth.threat.is_none(), "fifth failure must not be flagged");

    let sixth = &events[5];
    let threat = sixth.threat.as_ref().expect("sixth failure flagged");
    assert!(threat
        .indicators
        .contains(&"Multiple failed attempts".to_string()));
    assert!(threat.score >= 20);
}

/// A SQL injection attempt with a script payload scores the cap.
#[test]
fn sql_injection_with_script_payload_maxes_score() {
    let logger = basic_logger();
    let mut metadata = Metadata::new();
    metadata.insert("payload".into(), "'; DROP TABLE users; -- script".into());
    logger.log_attack(EventKind::SqlInjectionAttempt, metadata);

    let events = logger.events(&EventFilter::default());
    assert_eq!(events[0].severity, Severity::Critical);

    let threat = events[0].threat.as_ref().unwrap();
    assert_eq!(threat.score, 100);
    for indicator in [
        "Attack attempt detected",
        "Critical security event",
        "Potential script injection",
    ] {
        assert!(
            threat.indicators.contains(&indicator.to_string()),
            "missing indicator {indicator}"
        );
    }
}

/// With frequency 3 in a 5-minute window, two HIGH events stay silent and
/// the third triggers exactly one dispatch per configured channel.
#[tokio::test]
async fn third_high_event_triggers_single_dispatch_per_channel() {
    let email = CountingChannel::new("email");
    let slack = CountingChannel::new("slack");

    let mut config = AuditConfig::default();
    config.alerting.enabled = true;
    config.alerting.channels = vec!["email".to_string(), "slack".to_string()];
    config.alerting.thresholds.severity = Severity::High;
    config.alerting.thresholds.frequency = 3;
    config.alerting.thresholds.time_window_secs = 300;

    let logger = AuditLogger::new(
        config,
        vec![
            email.clone() as Arc<dyn AlertChannel>,
            slack.clone() as Arc<dyn AlertChannel>,
        ],
    )
    .unwrap();

    logger.log(EventDraft::new(EventKind::DataDeletion, "one"));
    logger.log(EventDraft::new(EventKind::PermissionViolation, "two"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(email.dispatches.load(Ordering::SeqCst), 0);
    assert_eq!(slack.dispatches.load(Ordering::SeqCst), 0);

    logger.log(EventDraft::new(EventKind::EncryptionError, "three"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(email.dispatches.load(Ordering::SeqCst), 1);
    assert_eq!(slack.dispatches.load(Ordering::SeqCst), 1);
}

/// Statistics report exact per-severity counts and the HIGH+ events as
/// recent threats.
#[test]
fn statistics_count_by_severity_and_recent_threats() {
    let logger = basic_logger();
    logger.log(EventDraft::new(EventKind::VulnerabilityDetected, "crit"));
    logger.log(EventDraft::new(EventKind::DataDeletion, "high-1"));
    logger.log(EventDraft::new(EventKind::PermissionViolation, "high-2"));
    // Distinct users so the repeated-failure rule stays quiet.
    logger.log_auth(false, "m1", Metadata::new());
    logger.log_auth(false, "m2", Metadata::new());
    logger.log_auth(false, "m3", Metadata::new());

    let stats = logger.statistics();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.by_severity[&Severity::Critical], 1);
    assert_eq!(stats.by_severity[&Severity::High], 2);
    assert_eq!(stats.by_severity[&Severity::Medium], 3);
    assert_eq!(stats.by_severity[&Severity::Low], 0);
    assert_eq!(stats.by_severity[&Severity::Info], 0);

    assert_eq!(stats.recent_threats.len(), 3);
    assert!(stats
        .recent_threats
        .iter()
        .all(|e| e.severity >= Severity::High));
}

#[test]
fn ring_buffer_keeps_most_recent_events() {
    let logger = AuditLogger::new(
        AuditConfig {
            max_events: 100,
            ..Default::default()
        },
        Vec::new(),
    )
    .unwrap();

    for i in 0..250 {
        logger.log(EventDraft::new(EventKind::DataRead, format!("event-{i}")));
    }

    let events = logger.events(&EventFilter::default());
    assert_eq!(events.len(), 100);
    assert_eq!(events[0].message, "event-150");
    assert_eq!(events[99].message, "event-249");
}

#[test]
fn compliance_report_covers_every_section() {
    let logger = basic_logger();
    logger.log_attack(EventKind::XssAttempt, Metadata::new());
    logger.log_auth(true, "alice", Metadata::new());

    let report = logger.generate_compliance_report();
    assert!(report.contains("SECURITY AUDIT COMPLIANCE REPORT"));
    assert!(report.contains("Total events stored:     2"));
    assert!(report.contains("Critical events (24h):   1 [FAIL]"));
    assert!(report.contains("Severity distribution"));
    assert!(report.contains("XSS_ATTEMPT"));
    assert!(report.contains("Compliance checklist"));
    assert!(report.contains("[x] Audit logging enabled"));
}

#[test]
fn filtered_queries_through_the_facade() {
    let logger = basic_logger();
    logger.log_auth(false, "alice", Metadata::new());
    logger.log_auth(false, "bob", Metadata::new());
    logger.log_attack(EventKind::CsrfAttempt, Metadata::new());

    let high_plus = logger.events(&EventFilter {
        min_severity: Some(Severity::High),
        ..Default::default()
    });
    assert_eq!(high_plus.len(), 1);
    assert_eq!(high_plus[0].kind, EventKind::CsrfAttempt);

    let alice = logger.events(&EventFilter {
        user_id: Some("alice".to_string()),
        ..Default::default()
    });
    assert_eq!(alice.len(), 1);
}

#[tokio::test]
async fn alert_queue_drained_even_with_alerting_disabled() {
    let logger = basic_logger(); // alerting disabled by default
    logger.log(EventDraft::new(EventKind::DataDeletion, "high"));

    // The evaluation inside `log` already drained the queue.
    assert!(logger.store().drain_alert_queue().is_empty());
}
