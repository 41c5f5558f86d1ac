//! In-memory storage implementations
//!
//! The session store is ephemeral by definition and has no durable
//! counterpart; the ledger and preference implementations exist for tests.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::RwLock;

use super::{DedupLedger, PreferenceStore, SessionStore};
use crate::models::{MessageId, Preferences, SummaryResult};

#[derive(Default)]
struct SessionData {
    summaries: Option<Vec<SummaryResult>>,
    badge: Option<usize>,
}

/// In-memory implementation of [`SessionStore`]
#[derive(Default)]
pub struct InMemorySessionStore {
    data: RwLock<SessionData>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn summaries(&self) -> Result<Option<Vec<SummaryResult>>> {
        Ok(self.data.read().unwrap().summaries.clone())
    }

    fn set_summaries(&self, summaries: Vec<SummaryResult>) -> Result<()> {
        self.data.write().unwrap().summaries = Some(summaries);
        Ok(())
    }

    fn badge(&self) -> Result<Option<usize>> {
        Ok(self.data.read().unwrap().badge)
    }

    fn set_badge(&self, count: Option<usize>) -> Result<()> {
        self.data.write().unwrap().badge = count;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut data = self.data.write().unwrap();
        data.summaries = None;
        data.badge = None;
        Ok(())
    }
}

/// Insertion-ordered set of recorded message IDs
#[derive(Default)]
struct LedgerData {
    order: Vec<MessageId>,
    seen: HashSet<String>,
}

/// In-memory implementation of [`DedupLedger`]
#[derive(Default)]
pub struct InMemoryLedger {
    data: RwLock<LedgerData>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupLedger for InMemoryLedger {
    fn filter_new(&self, ids: &[MessageId]) -> Result<Vec<MessageId>> {
        let data = self.data.read().unwrap();
        Ok(ids
            .iter()
            .filter(|id| !data.seen.contains(id.as_str()))
            .cloned()
            .collect())
    }

    fn record(&self, ids: &[MessageId]) -> Result<()> {
        let mut data = self.data.write().unwrap();
        for id in ids {
            if data.seen.insert(id.as_str().to_string()) {
                data.order.push(id.clone());
            }
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.data.read().unwrap().order.len())
    }

    fn reset(&self) -> Result<()> {
        let mut data = self.data.write().unwrap();
        data.order.clear();
        data.seen.clear();
        Ok(())
    }
}

/// In-memory implementation of [`PreferenceStore`]
pub struct InMemoryPreferenceStore {
    prefs: RwLock<Preferences>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self {
            prefs: RwLock::new(Preferences::default()),
        }
    }
}

impl Default for InMemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn preferences(&self) -> Result<Preferences> {
        Ok(*self.prefs.read().unwrap())
    }

    fn set_preferences(&self, prefs: Preferences) -> Result<()> {
        *self.prefs.write().unwrap() = prefs;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<MessageId> {
        names.iter().map(|n| MessageId::new(*n)).collect()
    }

    #[test]
    fn test_filter_new_is_set_difference_preserving_order() {
        let ledger = InMemoryLedger::new();
        ledger.record(&ids(&["m2", "m4"])).unwrap();

        let fresh = ledger
            .filter_new(&ids(&["m1", "m2", "m3", "m4", "m5"]))
            .unwrap();
        assert_eq!(fresh, ids(&["m1", "m3", "m5"]));
    }

    #[test]
    fn test_record_is_idempotent() {
        let ledger = InMemoryLedger::new();
        ledger.record(&ids(&["m1", "m2"])).unwrap();
        ledger.record(&ids(&["m1", "m2"])).unwrap();
        assert_eq!(ledger.len().unwrap(), 2);
    }

    #[test]
    fn test_reset_empties_ledger() {
        let ledger = InMemoryLedger::new();
        ledger.record(&ids(&["m1"])).unwrap();
        ledger.reset().unwrap();
        assert_eq!(ledger.len().unwrap(), 0);
        assert_eq!(ledger.filter_new(&ids(&["m1"])).unwrap(), ids(&["m1"]));
    }

    #[test]
    fn test_session_clear_wipes_list_and_badge() {
        let session = InMemorySessionStore::new();
        session.set_summaries(Vec::new()).unwrap();
        session.set_badge(Some(3)).unwrap();

        session.clear().unwrap();
        assert!(session.summaries().unwrap().is_none());
        assert!(session.badge().unwrap().is_none());
    }

    #[test]
    fn test_session_distinguishes_empty_from_absent() {
        let session = InMemorySessionStore::new();
        assert!(session.summaries().unwrap().is_none());

        session.set_summaries(Vec::new()).unwrap();
        assert_eq!(session.summaries().unwrap(), Some(Vec::new()));
    }
}
