//! Message-side models: identifiers, credentials, fetched email content

use serde::{Deserialize, Serialize};

/// Unique identifier for a mail item (Gmail message ID)
///
/// Stable across fetch cycles; used as the dedup key and as the join key
/// between the fetch and summarize stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque bearer credential for the mail provider
///
/// The provider manages expiry; the pipeline only ever acquires a token,
/// uses it for one cycle, and invalidates it on a 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

/// Decoded content of one email, produced once per message per cycle
///
/// Immutable after creation and never persisted standalone; it exists only
/// to be batched into a summarisation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDetail {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    /// Decoded plain-text body
    pub body: String,
}

impl EmailDetail {
    /// Fallbacks used when the provider payload is missing a field
    pub const NO_SUBJECT: &'static str = "No Subject";
    pub const UNKNOWN_SENDER: &'static str = "Unknown Sender";
    pub const NO_BODY: &'static str = "No Body";
}
