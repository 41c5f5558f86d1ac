//! Summary results and user preferences

use super::MessageId;
use serde::{Deserialize, Serialize};

/// A backend summary merged back onto the email that produced it
///
/// `message_id`, `subject` and `sender` come from the originating
/// [`EmailDetail`](super::EmailDetail); `summary` and `reply_draft` come
/// from the backend response at the same batch position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    #[serde(rename = "messageId")]
    pub message_id: MessageId,
    pub subject: String,
    pub sender: String,
    pub summary: String,
    pub reply_draft: String,
}

/// Durable user preferences, read at the start of every fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Page size requested from the mail provider's unread search
    pub max_emails: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { max_emails: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_emails() {
        assert_eq!(Preferences::default().max_emails, 5);
    }

    #[test]
    fn test_summary_result_wire_field_names() {
        let result = SummaryResult {
            message_id: MessageId::new("m1"),
            subject: "Hi".into(),
            sender: "a@b.com".into(),
            summary: "short".into(),
            reply_draft: "thanks".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["messageId"], "m1");
        assert_eq!(json["reply_draft"], "thanks");
    }
}
