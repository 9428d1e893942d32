//! Audit subsystem configuration and TOML parsing.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::event::Severity;

/// Storage backend selector. Only `memory` is implemented by this crate;
/// `database` and `file` are pass-through hooks for external backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Database,
    File,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Memory
    }
}

/// Top-level audit logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Master switch; a disabled logger turns every `log` call into a no-op.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum severity persisted to the store.
    #[serde(default)]
    pub log_level: Severity,

    #[serde(default)]
    pub storage: StorageBackend,

    /// Retention period in days. Informational: purge is handled by an
    /// external collaborator, not by this crate.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Hook for an external at-rest encryption collaborator. Distinct from
    /// `anonymization`, which is implemented here.
    #[serde(default)]
    pub encryption: bool,

    /// Deterministic one-way anonymization of user id and IP address.
    #[serde(default)]
    pub anonymization: bool,

    /// Ring buffer capacity for the in-memory store.
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    #[serde(default)]
    pub alerting: AlertingConfig,
}

/// Alert batching and dispatch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertingConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Names of the channels to dispatch to. Every name must have a
    /// registered sender at logger construction time.
    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default)]
    pub thresholds: AlertThresholds,
}

/// Thresholds controlling when a drained alert batch is dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Severity floor for the sliding-window frequency count.
    #[serde(default = "default_alert_severity")]
    pub severity: Severity,

    /// Minimum number of events at or above the floor inside the window.
    #[serde(default = "default_alert_frequency")]
    pub frequency: u32,

    /// Sliding window length, in seconds, ending at evaluation time.
    #[serde(default = "default_time_window_secs")]
    pub time_window_secs: u64,
}

impl AlertThresholds {
    /// Window length as a `chrono::Duration` for timestamp arithmetic.
    pub fn window(&self) -> Duration {
        Duration::seconds(self.time_window_secs as i64)
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            severity: default_alert_severity(),
            frequency: default_alert_frequency(),
            time_window_secs: default_time_window_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    90
}

fn default_max_events() -> usize {
    10_000
}

fn default_alert_severity() -> Severity {
    Severity::High
}

fn default_alert_frequency() -> u32 {
    5
}

fn default_time_window_secs() -> u64 {
    300
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: Severity::Info,
            storage: StorageBackend::default(),
            retention_days: default_retention_days(),
            encryption: false,
            anonymization: false,
            max_events: default_max_events(),
            alerting: AlertingConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading audit config {}", path.display()))?;
        let config: AuditConfig = toml::from_str(&contents)
            .with_context(|| format!("parsing audit config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate construction-time invariants. Configuration errors are the
    /// only fatal errors this crate produces.
    pub fn validate(&self) -> Result<()> {
        if self.max_events == 0 {
            bail!("max_events must be at least 1");
        }
        if self.alerting.enabled {
            if self.alerting.thresholds.frequency == 0 {
                bail!("alerting frequency threshold must be at least 1");
            }
            if self.alerting.thresholds.time_window_secs == 0 {
                bail!("alerting time window must be at least 1 second");
            }
            // Events below log_level are never stored, so an alert floor
            // below it could never accumulate toward the frequency count.
            if self.alerting.thresholds.severity < self.log_level {
                bail!(
                    "alert severity floor {} is below log level {}",
                    self.alerting.thresholds.severity,
                    self.log_level
                );
            }
        }
        Ok(())
    }
}
