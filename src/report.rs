//! Compliance report rendering.
//!
//! A pure formatting step over store statistics and a pre-assembled
//! reporting window. No clock reads and no side effects: identical inputs
//! produce byte-identical output.

use std::fmt::Write;

use crate::config::AuditConfig;
use crate::event::{SecurityEvent, Severity};
use crate::store::StoreStats;

/// Width of the proportional severity bars.
const BAR_WIDTH: usize = 20;

/// How many event kinds the frequency table shows.
const TOP_KINDS: usize = 5;

/// How many recent HIGH+ events the report lists.
const RECENT_LIMIT: usize = 3;

/// Render the compliance report.
///
/// `window` is the slice of events inside the reporting window (the façade
/// passes the trailing 24 hours); `stats` covers the whole store.
pub fn generate(config: &AuditConfig, stats: &StoreStats, window: &[SecurityEvent]) -> String {
    let critical_in_window = window
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .count();

    let mut out = String::new();

    let _ = writeln!(out, "SECURITY AUDIT COMPLIANCE REPORT");
    let _ = writeln!(out, "================================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Total events stored:     {}", stats.total);
    let _ = writeln!(out, "Events in last 24h:      {}", window.len());
    let _ = writeln!(
        out,
        "Critical events (24h):   {} [{}]",
        critical_in_window,
        pass_fail(critical_in_window == 0)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Severity distribution");
    let _ = writeln!(out, "---------------------");
    let max_bucket = stats.by_severity.values().copied().max().unwrap_or(0);
    // Highest tier first.
    for severity in Severity::ALL.iter().rev() {
        let count = stats.by_severity.get(severity).copied().unwrap_or(0);
        let percent = if stats.total > 0 {
            count as f64 * 100.0 / stats.total as f64
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "{:<8} {:>6}  {:>5.1}%  |{}|",
            severity.as_str(),
            count,
            percent,
            bar(count, max_bucket)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Top event types");
    let _ = writeln!(out, "---------------");
    let mut kinds: Vec<(&String, &u64)> = stats.by_kind.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    if kinds.is_empty() {
        let _ = writeln!(out, "(no events)");
    }
    for (name, count) in kinds.into_iter().take(TOP_KINDS) {
        let _ = writeln!(out, "{count:>6}  {name}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Recent high-severity events");
    let _ = writeln!(out, "---------------------------");
    if stats.recent_threats.is_empty() {
        let _ = writeln!(out, "(none)");
    }
    for event in stats.recent_threats.iter().take(RECENT_LIMIT) {
        let _ = writeln!(
            out,
            "{}  {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.kind
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Compliance checklist");
    let _ = writeln!(out, "--------------------");
    checklist_line(&mut out, "Audit logging enabled", config.enabled);
    checklist_line(
        &mut out,
        "Retention period configured",
        config.retention_days > 0,
    );
    checklist_line(
        &mut out,
        "No critical events in window",
        critical_in_window == 0,
    );
    checklist_line(&mut out, "Threat detection active", config.enabled);
    checklist_line(
        &mut out,
        "Alerting configured",
        config.alerting.enabled && !config.alerting.channels.is_empty(),
    );

    out
}

fn pass_fail(pass: bool) -> &'static str {
    if pass {
        "PASS"
    } else {
        "FAIL"
    }
}

fn checklist_line(out: &mut String, label: &str, pass: bool) {
    let mark = if pass { 'x' } else { ' ' };
    let _ = writeln!(out, "[{mark}] {label}");
}

/// Bar proportional to the largest bucket, [`BAR_WIDTH`] characters wide.
fn bar(count: u64, max: u64) -> String {
    let filled = if max == 0 {
        0
    } else {
        ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize
    };
    let mut bar = "#".repeat(filled.min(BAR_WIDTH));
    bar.push_str(&" ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ActorContext, EventKind, EventResult};
    use crate::store::EventStore;
    use chrono::Utc;

    fn make_event(kind: EventKind) -> SecurityEvent {
        SecurityEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            severity: kind.default_severity(),
            actor: ActorContext::default(),
            resource: None,
            action: None,
            result: EventResult::Success,
            message: "test".to_string(),
            metadata: Default::default(),
            stack_trace: None,
            correlation_id: "c".to_string(),
            threat: None,
        }
    }

    fn stats_for(events: &[SecurityEvent]) -> StoreStats {
        let store = EventStore::new();
        for e in events {
            store.add(e.clone());
        }
        store.statistics()
    }

    #[test]
    fn critical_flag_fails_iff_critical_in_window() {
        let config = AuditConfig::default();

        let clean = vec![make_event(EventKind::AuthFailure)];
        let report = generate(&config, &stats_for(&clean), &clean);
        assert!(report.contains("Critical events (24h):   0 [PASS]"));

        let dirty = vec![make_event(EventKind::XssAttempt)];
        let report = generate(&config, &stats_for(&dirty), &dirty);
        assert!(report.contains("Critical events (24h):   1 [FAIL]"));
        assert!(report.contains("[ ] No critical events in window"));
    }

    #[test]
    fn severity_table_lists_every_tier() {
        let events = vec![make_event(EventKind::AuthSuccess)];
        let report = generate(&AuditConfig::default(), &stats_for(&events), &events);
        for tier in ["CRITICAL", "HIGH", "MEDIUM", "LOW", "INFO"] {
            assert!(report.contains(tier), "missing tier {tier}");
        }
    }

    #[test]
    fn top_kinds_sorted_by_frequency() {
        let mut events = Vec::new();
        for _ in 0..3 {
            events.push(make_event(EventKind::AuthFailure));
        }
        events.push(make_event(EventKind::DataRead));

        let report = generate(&AuditConfig::default(), &stats_for(&events), &events);
        let failure_pos = report.find("AUTH_FAILURE").unwrap();
        let read_pos = report.find("DATA_READ").unwrap();
        assert!(failure_pos < read_pos);
    }

    #[test]
    fn recent_threats_capped_at_three() {
        let events: Vec<SecurityEvent> = (0..5)
            .map(|_| make_event(EventKind::DataDeletion))
            .collect();
        let report = generate(&AuditConfig::default(), &stats_for(&events), &events);
        assert_eq!(report.matches("DATA_DELETION").count(), 3 + 1); // 3 listed + top-types row
    }

    #[test]
    fn checklist_reflects_configuration() {
        let mut config = AuditConfig::default();
        config.alerting.enabled = true;
        config.alerting.channels = vec!["email".to_string()];

        let report = generate(&config, &stats_for(&[]), &[]);
        assert!(report.contains("[x] Audit logging enabled"));
        assert!(report.contains("[x] Retention period configured"));
        assert!(report.contains("[x] Alerting configured"));

        config.alerting.channels.clear();
        let report = generate(&config, &stats_for(&[]), &[]);
        assert!(report.contains("[ ] Alerting configured"));
    }

    #[test]
    fn identical_inputs_render_identically() {
        let events = vec![
            make_event(EventKind::AuthFailure),
            make_event(EventKind::XssAttempt),
        ];
        let stats = stats_for(&events);
        let config = AuditConfig::default();
        assert_eq!(
            generate(&config, &stats, &events),
            generate(&config, &stats, &events)
        );
    }

    #[test]
    fn empty_store_renders_placeholders() {
        let report = generate(&AuditConfig::default(), &stats_for(&[]), &[]);
        assert!(report.contains("Total events stored:     0"));
        assert!(report.contains("(no events)"));
        assert!(report.contains("(none)"));
    }
}
