//! Core event types: severity ordering, the closed event taxonomy, actor
//! context, metadata values, and the stored [`SecurityEvent`] record.
//!
//! Everything here is plain data. Severity resolution, enrichment, and
//! threat scoring live in the [`logger`](crate::logger) and
//! [`threat`](crate::threat) modules.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered criticality tier attached to every event.
///
/// The derive order gives `Info < Low < Medium < High < Critical`, so
/// "minimum severity" checks are plain comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All tiers, lowest first. Used to prefill statistics buckets.
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the operation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventResult {
    Success,
    Failure,
    Error,
}

impl Default for EventResult {
    fn default() -> Self {
        EventResult::Success
    }
}

/// The closed set of security event types.
///
/// Each kind carries a default severity via [`EventKind::default_severity`];
/// callers may override it per event through [`EventDraft::severity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    // Authentication
    AuthSuccess,
    AuthFailure,
    Logout,
    SessionExpired,
    PasswordChanged,
    MfaEnabled,
    MfaDisabled,
    // Access control
    AccessGranted,
    AccessDenied,
    PermissionViolation,
    // Attack attempts
    SqlInjectionAttempt,
    XssAttempt,
    CsrfAttempt,
    PathTraversalAttempt,
    SessionHijackAttempt,
    BruteForceAttempt,
    // Detection
    VulnerabilityDetected,
    SuspiciousActivity,
    RateLimitExceeded,
    // Data operations
    DataRead,
    DataCreated,
    DataUpdated,
    DataDeletion,
    DataExported,
    // Crypto and configuration
    EncryptionError,
    ConfigChanged,
    ApiKeyCreated,
    ApiKeyRevoked,
    WebhookCreated,
    WebhookDeleted,
}

impl EventKind {
    /// Every kind in declaration order.
    pub const ALL: [EventKind; 30] = [
        EventKind::AuthSuccess,
        EventKind::AuthFailure,
        EventKind::Logout,
        EventKind::SessionExpired,
        EventKind::PasswordChanged,
        EventKind::MfaEnabled,
        EventKind::MfaDisabled,
        EventKind::AccessGranted,
        EventKind::AccessDenied,
        EventKind::PermissionViolation,
        EventKind::SqlInjectionAttempt,
        EventKind::XssAttempt,
        EventKind::CsrfAttempt,
        EventKind::PathTraversalAttempt,
        EventKind::SessionHijackAttempt,
        EventKind::BruteForceAttempt,
        EventKind::VulnerabilityDetected,
        EventKind::SuspiciousActivity,
        EventKind::RateLimitExceeded,
        EventKind::DataRead,
        EventKind::DataCreated,
        EventKind::DataUpdated,
        EventKind::DataDeletion,
        EventKind::DataExported,
        EventKind::EncryptionError,
        EventKind::ConfigChanged,
        EventKind::ApiKeyCreated,
        EventKind::ApiKeyRevoked,
        EventKind::WebhookCreated,
        EventKind::WebhookDeleted,
    ];

    /// Default severity for this kind when the caller supplies no override.
    pub fn default_severity(&self) -> Severity {
        match self {
            EventKind::SqlInjectionAttempt
            | EventKind::XssAttempt
            | EventKind::CsrfAttempt
            | EventKind::PathTraversalAttempt
            | EventKind::SessionHijackAttempt
            | EventKind::VulnerabilityDetected => Severity::Critical,

            EventKind::PermissionViolation
            | EventKind::SuspiciousActivity
            | EventKind::DataDeletion
            | EventKind::EncryptionError
            | EventKind::BruteForceAttempt => Severity::High,

            EventKind::AuthFailure
            | EventKind::PasswordChanged
            | EventKind::MfaDisabled
            | EventKind::AccessDenied
            | EventKind::RateLimitExceeded
            | EventKind::DataExported
            | EventKind::ConfigChanged
            | EventKind::ApiKeyCreated
            | EventKind::ApiKeyRevoked => Severity::Medium,

            EventKind::SessionExpired
            | EventKind::DataCreated
            | EventKind::DataUpdated
            | EventKind::WebhookCreated
            | EventKind::WebhookDeleted => Severity::Low,

            EventKind::AuthSuccess
            | EventKind::Logout
            | EventKind::MfaEnabled
            | EventKind::AccessGranted
            | EventKind::DataRead => Severity::Info,
        }
    }

    /// Whether this kind is one of the `*_ATTEMPT` attack variants.
    pub fn is_attack_attempt(&self) -> bool {
        matches!(
            self,
            EventKind::SqlInjectionAttempt
                | EventKind::XssAttempt
                | EventKind::CsrfAttempt
                | EventKind::PathTraversalAttempt
                | EventKind::SessionHijackAttempt
                | EventKind::BruteForceAttempt
        )
    }

    /// Wire name, matching the serde representation (e.g. `"AUTH_FAILURE"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AuthSuccess => "AUTH_SUCCESS",
            EventKind::AuthFailure => "AUTH_FAILURE",
            EventKind::Logout => "LOGOUT",
            EventKind::SessionExpired => "SESSION_EXPIRED",
            EventKind::PasswordChanged => "PASSWORD_CHANGED",
            EventKind::MfaEnabled => "MFA_ENABLED",
            EventKind::MfaDisabled => "MFA_DISABLED",
            EventKind::AccessGranted => "ACCESS_GRANTED",
            EventKind::AccessDenied => "ACCESS_DENIED",
            EventKind::PermissionViolation => "PERMISSION_VIOLATION",
            EventKind::SqlInjectionAttempt => "SQL_INJECTION_ATTEMPT",
            EventKind::XssAttempt => "XSS_ATTEMPT",
            EventKind::CsrfAttempt => "CSRF_ATTEMPT",
            EventKind::PathTraversalAttempt => "PATH_TRAVERSAL_ATTEMPT",
            EventKind::SessionHijackAttempt => "SESSION_HIJACK_ATTEMPT",
            EventKind::BruteForceAttempt => "BRUTE_FORCE_ATTEMPT",
            EventKind::VulnerabilityDetected => "VULNERABILITY_DETECTED",
            EventKind::SuspiciousActivity => "SUSPICIOUS_ACTIVITY",
            EventKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            EventKind::DataRead => "DATA_READ",
            EventKind::DataCreated => "DATA_CREATED",
            EventKind::DataUpdated => "DATA_UPDATED",
            EventKind::DataDeletion => "DATA_DELETION",
            EventKind::DataExported => "DATA_EXPORTED",
            EventKind::EncryptionError => "ENCRYPTION_ERROR",
            EventKind::ConfigChanged => "CONFIG_CHANGED",
            EventKind::ApiKeyCreated => "API_KEY_CREATED",
            EventKind::ApiKeyRevoked => "API_KEY_REVOKED",
            EventKind::WebhookCreated => "WEBHOOK_CREATED",
            EventKind::WebhookDeleted => "WEBHOOK_DELETED",
        }
    }

    /// Parse a wire name. Returns `None` for anything outside the closed set;
    /// dynamically-typed callers go through
    /// [`AuditLogger::log_labeled`](crate::logger::AuditLogger::log_labeled)
    /// which coerces unknown labels instead of dropping them.
    pub fn from_str(name: &str) -> Option<EventKind> {
        EventKind::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata value: string, number, boolean, or a nested mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Integer(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// Ordered string-keyed metadata mapping.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Actor context supplied by the request/middleware layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Risk banding derived from a threat score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatCategory {
    HighRisk,
    MediumRisk,
    LowRisk,
}

impl ThreatCategory {
    /// `HIGH_RISK` at 70+, `MEDIUM_RISK` at 40+, `LOW_RISK` below.
    pub fn from_score(score: u8) -> ThreatCategory {
        if score >= 70 {
            ThreatCategory::HighRisk
        } else if score >= 40 {
            ThreatCategory::MediumRisk
        } else {
            ThreatCategory::LowRisk
        }
    }
}

/// Computed risk annotation attached to events that trip at least one
/// detection rule. Never constructed with a zero score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIndicator {
    /// Additive rule score, capped at 100.
    pub score: u8,
    pub category: ThreatCategory,
    /// Names of the rules that fired, in trigger order, no duplicates.
    pub indicators: Vec<String>,
    /// Mitigations derived from the fired rules, deduplicated.
    pub recommendations: Vec<String>,
}

/// A single stored audit event. Immutable once in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Always resolved before storage, never a placeholder.
    pub severity: Severity,
    #[serde(default)]
    pub actor: ActorContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub result: EventResult,
    pub message: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// Present on every event after enrichment.
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat: Option<ThreatIndicator>,
}

/// Caller-supplied partial event, consumed by
/// [`AuditLogger::log`](crate::logger::AuditLogger::log). The logger owns
/// enrichment: id, timestamp, correlation id, truncation, anonymization.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub kind: Option<EventKind>,
    /// Explicit severity override; taxonomy default applies when `None`.
    pub severity: Option<Severity>,
    pub actor: ActorContext,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub result: EventResult,
    pub message: String,
    pub metadata: Metadata,
    pub stack_trace: Option<String>,
    /// Reused when supplied, generated otherwise.
    pub correlation_id: Option<String>,
}

impl EventDraft {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: message.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_is_total() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn attack_attempts_default_to_critical_or_high() {
        for kind in EventKind::ALL.iter().filter(|k| k.is_attack_attempt()) {
            assert!(
                kind.default_severity() >= Severity::High,
                "{kind} should default to at least HIGH"
            );
        }
    }

    #[test]
    fn taxonomy_matches_known_anchors() {
        assert_eq!(
            EventKind::SqlInjectionAttempt.default_severity(),
            Severity::Critical
        );
        assert_eq!(EventKind::AuthFailure.default_severity(), Severity::Medium);
        assert_eq!(EventKind::AuthSuccess.default_severity(), Severity::Info);
        assert_eq!(EventKind::DataDeletion.default_severity(), Severity::High);
        assert_eq!(EventKind::WebhookCreated.default_severity(), Severity::Low);
    }

    #[test]
    fn kind_wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_str(kind.as_str()), Some(kind));
            // serde representation must agree with as_str
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(EventKind::from_str("NOT_A_REAL_KIND"), None);
    }

    #[test]
    fn threat_category_banding() {
        assert_eq!(ThreatCategory::from_score(100), ThreatCategory::HighRisk);
        assert_eq!(ThreatCategory::from_score(70), ThreatCategory::HighRisk);
        assert_eq!(ThreatCategory::from_score(69), ThreatCategory::MediumRisk);
        assert_eq!(ThreatCategory::from_score(40), ThreatCategory::MediumRisk);
        assert_eq!(ThreatCategory::from_score(39), ThreatCategory::LowRisk);
        assert_eq!(ThreatCategory::from_score(1), ThreatCategory::LowRisk);
    }

    #[test]
    fn metadata_value_untagged_serde() {
        let mut meta = Metadata::new();
        meta.insert("path".into(), "/etc/passwd".into());
        meta.insert("attempts".into(), MetadataValue::Integer(3));
        meta.insert("blocked".into(), MetadataValue::Bool(true));

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"attempts\":3"));
        assert!(json.contains("\"blocked\":true"));

        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
