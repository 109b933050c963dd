//! Per-marker alert cool-down.
//!
//! # Responsibility
//! - Own the active-notification map (`marker id -> last alerted at`).
//! - Suppress repeat alerts for a marker until its cool-down elapses.
//!
//! # Invariants
//! - `should_notify` checks and records under one lock, so two concurrent
//!   callers can never both pass for the same marker inside one window.
//! - Entries live until cleared; they are never expired implicitly.

use crate::model::marker::MarkerId;
use crate::notify::clock::{Clock, SystemClock};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cool-down gate shared by every evaluation on one device.
pub struct NotificationDeduplicator {
    cooldown_ms: u64,
    clock: Arc<dyn Clock>,
    last_alerted: Mutex<HashMap<MarkerId, i64>>,
}

impl NotificationDeduplicator {
    /// Creates a gate backed by the system clock.
    pub fn new(cooldown_ms: u64) -> Self {
        Self::with_clock(cooldown_ms, Arc::new(SystemClock))
    }

    /// Creates a gate backed by a caller-provided clock.
    pub fn with_clock(cooldown_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldown_ms,
            clock,
            last_alerted: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Empty gate with a new cool-down, sharing this gate's clock.
    pub fn with_cooldown(&self, cooldown_ms: u64) -> Self {
        Self::with_clock(cooldown_ms, Arc::clone(&self.clock))
    }

    /// Returns `true` and stamps the record when `marker_id` may alert now.
    ///
    /// # Contract
    /// - No record, or at least `cooldown_ms` elapsed since the record: pass.
    /// - Otherwise: `false`, record unchanged.
    pub fn should_notify(&self, marker_id: MarkerId) -> bool {
        let now = self.clock.now_ms();
        let mut records = self.records();
        if let Some(&last) = records.get(&marker_id) {
            let elapsed = now.saturating_sub(last);
            if elapsed < 0 || (elapsed as u64) < self.cooldown_ms {
                debug!(
                    "event=alert_suppressed module=dedup marker_id={} elapsed_ms={}",
                    marker_id, elapsed
                );
                return false;
            }
        }
        records.insert(marker_id, now);
        true
    }

    /// Unconditionally stamps `marker_id` with the current time.
    pub fn record_notified(&self, marker_id: MarkerId) {
        let now = self.clock.now_ms();
        self.records().insert(marker_id, now);
    }

    /// Last alert time for `marker_id`, if any.
    pub fn last_notified_at(&self, marker_id: MarkerId) -> Option<i64> {
        self.records().get(&marker_id).copied()
    }

    /// Forgets one marker; its next `should_notify` passes immediately.
    pub fn clear(&self, marker_id: MarkerId) {
        self.records().remove(&marker_id);
    }

    /// Forgets every marker.
    pub fn clear_all(&self) {
        self.records().clear();
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    // The map is consistent after every single statement, so a panic in
    // another holder cannot leave it half-written.
    fn records(&self) -> MutexGuard<'_, HashMap<MarkerId, i64>> {
        self.last_alerted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
