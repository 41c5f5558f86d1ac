//! State stores for the pipeline's three storage scopes
//!
//! - Session scope: the current summary list and badge counter (ephemeral)
//! - Durable scope: the dedup ledger and user preferences (SQLite)
//!
//! The orchestrator only ever talks to the trait interfaces.

mod memory;
mod sqlite;
mod traits;

pub use memory::{InMemoryLedger, InMemoryPreferenceStore, InMemorySessionStore};
pub use sqlite::SqliteStateStore;
pub use traits::{DedupLedger, PreferenceStore, SessionStore};
