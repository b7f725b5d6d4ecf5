//! The "you were logged out for inactivity" notice.
//!
//! A forced logout redirects to the login page, and the login page needs
//! to know *why* it is being shown. The controller writes two keys into
//! tab-scoped storage before redirecting; the login view reads them once,
//! shows the notice, and deletes them.
//!
//! | Key                  | Value                                   |
//! |----------------------|-----------------------------------------|
//! | `sessionTimedOut`    | `"true"`                                |
//! | `sessionTimedOutAt`  | RFC 3339 UTC timestamp, millisecond precision |

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::lock;

pub const TIMED_OUT_KEY: &str = "sessionTimedOut";
pub const TIMED_OUT_AT_KEY: &str = "sessionTimedOutAt";

/// Tab-scoped key/value storage: survives a redirect within the tab,
/// never shared across tabs.
pub trait SignalStorage: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// In-process [`SignalStorage`]. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        lock(&self.items).insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        lock(&self.items).remove(key);
    }
}

/// A persisted timeout notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutSignal {
    /// When the forced logout happened. `None` if the timestamp key is
    /// missing or unparseable; the notice itself is still valid.
    pub timed_out_at: Option<DateTime<Utc>>,
}

impl TimeoutSignal {
    /// Persists the notice, overwriting any previous one.
    pub fn write(storage: &dyn SignalStorage, at: DateTime<Utc>) {
        storage.set_item(TIMED_OUT_KEY, "true");
        storage.set_item(TIMED_OUT_AT_KEY, &at.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    /// Reads the notice without consuming it.
    pub fn peek(storage: &dyn SignalStorage) -> Option<Self> {
        if storage.get_item(TIMED_OUT_KEY).as_deref() != Some("true") {
            return None;
        }
        let timed_out_at = storage
            .get_item(TIMED_OUT_AT_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));
        Some(Self { timed_out_at })
    }

    /// Reads the notice and deletes it, so it is shown exactly once.
    pub fn take(storage: &dyn SignalStorage) -> Option<Self> {
        let signal = Self::peek(storage);
        Self::clear(storage);
        signal
    }

    /// Deletes both keys. Returns whether a notice was present.
    pub fn clear(storage: &dyn SignalStorage) -> bool {
        let present = storage.get_item(TIMED_OUT_KEY).is_some();
        storage.remove_item(TIMED_OUT_KEY);
        storage.remove_item(TIMED_OUT_AT_KEY);
        present
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 16, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_write_uses_iso_timestamp_with_millis() {
        let storage = MemoryStorage::new();
        TimeoutSignal::write(&storage, at());

        assert_eq!(storage.get_item(TIMED_OUT_KEY).as_deref(), Some("true"));
        assert_eq!(
            storage.get_item(TIMED_OUT_AT_KEY).as_deref(),
            Some("2025-07-16T10:00:00.000Z")
        );
    }

    #[test]
    fn test_take_returns_signal_once() {
        let storage = MemoryStorage::new();
        TimeoutSignal::write(&storage, at());

        let signal = TimeoutSignal::take(&storage).expect("signal written");
        assert_eq!(signal.timed_out_at, Some(at()));
        assert!(storage.is_empty());
        assert_eq!(TimeoutSignal::take(&storage), None);
    }

    #[test]
    fn test_peek_tolerates_missing_timestamp() {
        let storage = MemoryStorage::new();
        storage.set_item(TIMED_OUT_KEY, "true");

        let signal = TimeoutSignal::peek(&storage).expect("flag present");
        assert_eq!(signal.timed_out_at, None);
        assert_eq!(storage.len(), 1, "peek does not consume");
    }

    #[test]
    fn test_clear_reports_presence() {
        let storage = MemoryStorage::new();
        assert!(!TimeoutSignal::clear(&storage));
        TimeoutSignal::write(&storage, at());
        assert!(TimeoutSignal::clear(&storage));
        assert!(storage.is_empty());
    }
}
