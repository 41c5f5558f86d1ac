//! Storage trait definitions

use anyhow::Result;

use crate::models::{MessageId, Preferences, SummaryResult};

/// Ephemeral per-session summary state consumed by presentation layers.
///
/// `summaries()` distinguishes "never fetched / needs login" (`None`) from
/// "a cycle completed with nothing to show" (`Some` of an empty list).
pub trait SessionStore: Send + Sync {
    /// Current summary list, newest-first
    fn summaries(&self) -> Result<Option<Vec<SummaryResult>>>;

    /// Replace the summary list
    fn set_summaries(&self, summaries: Vec<SummaryResult>) -> Result<()>;

    /// Externally visible summary counter (`None` = cleared)
    fn badge(&self) -> Result<Option<usize>>;

    /// Update the visible counter
    fn set_badge(&self, count: Option<usize>) -> Result<()>;

    /// Wipe the summary list and the badge (pipeline error or logout)
    fn clear(&self) -> Result<()>;
}

/// Durable record of message IDs already summarised.
///
/// Append-only in normal operation; an ID present in the ledger is never
/// re-submitted for summarisation in a later cycle.
pub trait DedupLedger: Send + Sync {
    /// Subset of `ids` not already recorded, preserving input order
    fn filter_new(&self, ids: &[MessageId]) -> Result<Vec<MessageId>>;

    /// Append newly summarised IDs; recording a present ID is a no-op
    fn record(&self, ids: &[MessageId]) -> Result<()>;

    /// Number of recorded IDs
    fn len(&self) -> Result<usize>;

    /// Clear the entire ledger (logout only)
    fn reset(&self) -> Result<()>;
}

/// Durable user preferences, read at the start of every cycle
pub trait PreferenceStore: Send + Sync {
    fn preferences(&self) -> Result<Preferences>;

    fn set_preferences(&self, prefs: Preferences) -> Result<()>;
}
