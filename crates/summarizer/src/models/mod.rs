//! Domain models for the summarisation pipeline

mod message;
mod summary;

pub use message::{AccessToken, EmailDetail, MessageId};
pub use summary::{Preferences, SummaryResult};
