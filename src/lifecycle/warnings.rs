//! Debounce table for deletion warnings

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// When a deletion warning was last shown for a mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionWarningRecord {
    pub directory_id: String,
    pub last_warned_at: DateTime<Utc>,
}

/// Per-mod record of the last deletion warning
///
/// Owned by a single lifecycle cache; all access goes through its lock.
#[derive(Debug, Clone)]
pub struct DeletionWarnings {
    records: HashMap<String, DateTime<Utc>>,
    debounce: Duration,
    retention: Duration,
}

impl DeletionWarnings {
    pub fn new(debounce: Duration, retention: Duration) -> Self {
        Self {
            records: HashMap::new(),
            debounce,
            retention,
        }
    }

    /// Whether a warning for `directory_id` may be shown at `now`.
    ///
    /// Records the warning when it is allowed. A timestamp earlier than the
    /// recorded one counts as inside the window.
    pub fn should_warn(&mut self, directory_id: &str, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.records.get(directory_id) {
            if !elapsed_exceeds(*last, now, self.debounce) {
                return false;
            }
        }
        self.records.insert(directory_id.to_string(), now);
        true
    }

    /// Drop records older than the retention period
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        let retention = self.retention;
        self.records
            .retain(|_, last| !elapsed_exceeds(*last, now, retention));
        before - self.records.len()
    }

    pub fn records(&self) -> Vec<DeletionWarningRecord> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|(id, at)| DeletionWarningRecord {
                directory_id: id.clone(),
                last_warned_at: *at,
            })
            .collect();
        records.sort_by(|a, b| a.directory_id.cmp(&b.directory_id));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn elapsed_exceeds(since: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    match (now - since).to_std() {
        Ok(elapsed) => elapsed > window,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn table() -> DeletionWarnings {
        DeletionWarnings::new(Duration::from_secs(5), Duration::from_secs(600))
    }

    #[test]
    fn test_repeat_within_window_is_suppressed() {
        let mut warnings = table();
        assert!(warnings.should_warn("X", at(0)));
        assert!(!warnings.should_warn("X", at(2)));
        assert!(!warnings.should_warn("X", at(5)));
        assert!(warnings.should_warn("X", at(6)));
        // Other mods are tracked independently
        assert!(warnings.should_warn("Y", at(6)));
    }

    #[test]
    fn test_clock_going_backwards_is_suppressed() {
        let mut warnings = table();
        assert!(warnings.should_warn("X", at(10)));
        assert!(!warnings.should_warn("X", at(3)));
    }

    #[test]
    fn test_prune_evicts_old_records() {
        let mut warnings = table();
        warnings.should_warn("old", at(0));
        warnings.should_warn("recent", at(500));

        assert_eq!(warnings.prune(at(601)), 1);
        let records = warnings.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].directory_id, "recent");
        assert_eq!(records[0].last_warned_at, at(500));
    }
}
