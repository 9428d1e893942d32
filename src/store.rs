//! Bounded in-memory event store.
//!
//! A ring buffer of [`SecurityEvent`]s with FIFO eviction, filtered queries,
//! aggregate statistics, and a transient alert queue holding HIGH+ events
//! since the last drain. A single mutex guards both structures so `add` and
//! the drain are mutually atomic; the guard is only ever held across memory
//! operations, never across I/O.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventKind, EventResult, SecurityEvent, Severity};

/// Default ring buffer capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// How many HIGH+ events `statistics` reports as recent threats.
const RECENT_THREATS: usize = 10;

/// Filter for querying stored events. All criteria are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only include events of this kind.
    pub kind: Option<EventKind>,
    /// Only include events at or above this severity.
    pub min_severity: Option<Severity>,
    /// Only include events whose actor has this user id.
    pub user_id: Option<String>,
    /// Only include events at or after this time.
    pub from: Option<DateTime<Utc>>,
    /// Only include events at or before this time.
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return, keeping the most recent matches
    /// and preserving insertion order. 0 means no limit.
    pub limit: usize,
}

/// Aggregate statistics over the stored events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of events currently stored.
    pub total: usize,
    /// Per-severity counts. Every tier is present, zero or not.
    pub by_severity: BTreeMap<Severity, u64>,
    /// Per-kind counts, keyed by wire name. Only non-zero kinds appear.
    pub by_kind: HashMap<String, u64>,
    /// The most recent HIGH+ events, newest first, at most ten.
    pub recent_threats: Vec<SecurityEvent>,
}

struct Inner {
    events: VecDeque<SecurityEvent>,
    alert_queue: Vec<SecurityEvent>,
}

/// Concurrency-safe bounded event log with an atomically drainable alert
/// queue. Shared across components by cloning an `Arc<EventStore>`; there is
/// no process-wide global.
pub struct EventStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                alert_queue: Vec::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Lock the inner state, absorbing poisoning: a panicking writer leaves
    /// only well-formed data behind, so continuing is always safe here.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append an event, evicting the oldest when at capacity. HIGH+ events
    /// are also queued for the alert processor.
    pub fn add(&self, event: SecurityEvent) {
        let mut inner = self.lock();
        if inner.events.len() >= self.capacity {
            inner.events.pop_front();
        }
        if event.severity >= Severity::High {
            inner.alert_queue.push(event.clone());
        }
        inner.events.push_back(event);
    }

    /// Query stored events. Results preserve insertion order; the limit is
    /// applied last and keeps the most recent matches.
    pub fn events(&self, filter: &EventFilter) -> Vec<SecurityEvent> {
        let inner = self.lock();
        let mut matches: Vec<SecurityEvent> = inner
            .events
            .iter()
            .filter(|e| {
                if let Some(kind) = filter.kind {
                    if e.kind != kind {
                        return false;
                    }
                }
                if let Some(min) = filter.min_severity {
                    if e.severity < min {
                        return false;
                    }
                }
                if let Some(ref user) = filter.user_id {
                    match &e.actor.user_id {
                        Some(u) if u == user => {}
                        _ => return false,
                    }
                }
                if let Some(ref from) = filter.from {
                    if e.timestamp < *from {
                        return false;
                    }
                }
                if let Some(ref to) = filter.to {
                    if e.timestamp > *to {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        if filter.limit > 0 && matches.len() > filter.limit {
            let excess = matches.len() - filter.limit;
            matches.drain(..excess);
        }

        matches
    }

    /// Return and clear the alert queue in one atomic step. A second drain
    /// without an intervening HIGH+ `add` returns an empty batch.
    pub fn drain_alert_queue(&self) -> Vec<SecurityEvent> {
        let mut inner = self.lock();
        std::mem::take(&mut inner.alert_queue)
    }

    /// Number of FAILURE-result events for `user_id` at or after `since`.
    ///
    /// Consistent-read helper for the threat detector; runs under the same
    /// guard as `add` so it cannot race concurrent inserts.
    pub fn recent_failure_count(&self, user_id: &str, since: DateTime<Utc>) -> usize {
        let inner = self.lock();
        inner
            .events
            .iter()
            .filter(|e| {
                e.result == EventResult::Failure
                    && e.timestamp >= since
                    && e.actor.user_id.as_deref() == Some(user_id)
            })
            .count()
    }

    /// Number of events at or above `floor` at or after `since`. Used by the
    /// alert processor's sliding-window frequency check.
    pub fn count_at_or_above(&self, floor: Severity, since: DateTime<Utc>) -> usize {
        let inner = self.lock();
        inner
            .events
            .iter()
            .filter(|e| e.severity >= floor && e.timestamp >= since)
            .count()
    }

    /// Aggregate statistics over everything currently stored.
    pub fn statistics(&self) -> StoreStats {
        let inner = self.lock();

        let mut by_severity: BTreeMap<Severity, u64> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_kind: HashMap<String, u64> = HashMap::new();

        for e in &inner.events {
            *by_severity.entry(e.severity).or_insert(0) += 1;
            *by_kind.entry(e.kind.as_str().to_string()).or_insert(0) += 1;
        }

        let recent_threats: Vec<SecurityEvent> = inner
            .events
            .iter()
            .rev()
            .filter(|e| e.severity >= Severity::High)
            .take(RECENT_THREATS)
            .cloned()
            .collect();

        StoreStats {
            total: inner.events.len(),
            by_severity,
            by_kind,
            recent_threats,
        }
    }

    /// Empty both the ring buffer and the alert queue.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.events.clear();
        inner.alert_queue.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }
}
