//! Summarizer crate - coordination core of the Briefbox mail assistant
//!
//! This crate provides the background pipeline that turns unread mail into
//! summaries and reply drafts:
//! - Credential acquisition and invalidation (silent and interactive)
//! - Mail provider client with payload normalization and body decoding
//! - Durable dedup ledger so messages are summarised at most once
//! - Batch client for the remote summarisation backend
//! - A cycle orchestrator tying the stages together, with a periodic
//!   scheduler and a best-effort event surface for presentation layers
//!
//! This crate has zero UI dependencies; popup and page-overlay frontends
//! consume the state stores and the event bus.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use auth::{Authenticator, OauthCredentials, TokenProvider};
pub use backend::SummarizeClient;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use gmail::{GmailClient, decode_transport_base64, normalize_detail};
pub use models::{AccessToken, EmailDetail, MessageId, Preferences, SummaryResult};
pub use pipeline::{
    CycleOutcome, CycleStats, EventBus, Orchestrator, PipelineEvent, Scheduler, Trigger,
    cooldown_elapsed,
};
pub use storage::{
    DedupLedger, InMemoryLedger, InMemoryPreferenceStore, InMemorySessionStore, PreferenceStore,
    SessionStore, SqliteStateStore,
};
