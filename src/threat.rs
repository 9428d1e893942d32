//! Heuristic threat scoring.
//!
//! Stateless, additive rules over a single event plus a consistent-read
//! historical query against the store. Each rule contributes once; the sum
//! is capped at 100 and a zero sum yields no indicator at all.

use std::sync::LazyLock;

use chrono::{Duration, Utc};
use regex::Regex;

use crate::event::{
    EventResult, MetadataValue, SecurityEvent, ThreatCategory, ThreatIndicator,
};
use crate::store::EventStore;

pub const ATTACK_ATTEMPT: &str = "Attack attempt detected";
pub const CRITICAL_EVENT: &str = "Critical security event";
pub const SCRIPT_INJECTION: &str = "Potential script injection";
pub const PATH_TRAVERSAL: &str = "Path traversal pattern";
pub const REPEATED_FAILURES: &str = "Multiple failed attempts";

const ATTACK_ATTEMPT_POINTS: u32 = 50;
const CRITICAL_EVENT_POINTS: u32 = 40;
const SCRIPT_INJECTION_POINTS: u32 = 30;
const PATH_TRAVERSAL_POINTS: u32 = 30;
const REPEATED_FAILURES_POINTS: u32 = 20;
const SCORE_CAP: u32 = 100;

/// More than this many failures for one user inside the window fires the
/// repeated-failures rule. The event being scored counts toward the total
/// when its own result is FAILURE, so the sixth consecutive failure fires.
const FAILURE_THRESHOLD: usize = 5;
const FAILURE_WINDOW_MINUTES: i64 = 5;

static SCRIPT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<script|javascript:|on[a-z]+\s*=|\bscript\b").expect("static pattern")
});

static TRAVERSAL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.\./|\.\.\\|%2e%2e").expect("static pattern"));

/// Score an event against the detection rules.
///
/// Returns `None` when no rule fires: an indicator is never a zero-score
/// object. The store query degrades gracefully — an event with no user id
/// simply skips the repeated-failures rule.
pub fn detect(event: &SecurityEvent, store: &EventStore) -> Option<ThreatIndicator> {
    let mut score: u32 = 0;
    let mut indicators: Vec<String> = Vec::new();

    if event.kind.is_attack_attempt() {
        score += ATTACK_ATTEMPT_POINTS;
        indicators.push(ATTACK_ATTEMPT.to_string());
    }

    if event.severity == crate::event::Severity::Critical {
        score += CRITICAL_EVENT_POINTS;
        indicators.push(CRITICAL_EVENT.to_string());
    }

    if let Some(payload) = event.metadata.get("payload").and_then(MetadataValue::as_text) {
        if SCRIPT_MARKER.is_match(payload) {
            score += SCRIPT_INJECTION_POINTS;
            indicators.push(SCRIPT_INJECTION.to_string());
        }
        if TRAVERSAL_MARKER.is_match(payload) {
            score += PATH_TRAVERSAL_POINTS;
            indicators.push(PATH_TRAVERSAL.to_string());
        }
    }

    if let Some(user_id) = event.actor.user_id.as_deref() {
        let since = Utc::now() - Duration::minutes(FAILURE_WINDOW_MINUTES);
        let mut failures = store.recent_failure_count(user_id, since);
        if event.result == EventResult::Failure {
            failures += 1;
        }
        if failures > FAILURE_THRESHOLD {
            score += REPEATED_FAILURES_POINTS;
            indicators.push(REPEATED_FAILURES.to_string());
        }
    }

    if score == 0 {
        return None;
    }

    let score = score.min(SCORE_CAP) as u8;
    Some(ThreatIndicator {
        score,
        category: ThreatCategory::from_score(score),
        recommendations: recommendations_for(&indicators),
        indicators,
    })
}

/// Map fired indicators to mitigations, deduplicated, in trigger order.
fn recommendations_for(indicators: &[String]) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();
    let mut push = |recs: &mut Vec<String>, text: &str| {
        if !recs.iter().any(|r| r == text) {
            recs.push(text.to_string());
        }
    };

    for indicator in indicators {
        match indicator.as_str() {
            ATTACK_ATTEMPT => {
                push(&mut recommendations, "Block source IP address");
                push(&mut recommendations, "Increase monitoring for this actor");
            }
            SCRIPT_INJECTION | PATH_TRAVERSAL => {
                push(&mut recommendations, "Review input validation");
                push(&mut recommendations, "Enable WAF rules");
            }
            REPEATED_FAILURES => {
                push(&mut recommendations, "Consider account lockout");
                push(&mut recommendations, "Implement CAPTCHA");
            }
            _ => {}
        }
    }

    recommendations
}
