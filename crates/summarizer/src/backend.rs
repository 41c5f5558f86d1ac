//! Summarisation backend client
//!
//! Submits one batch of email content per request and merges the response
//! back onto the originating batch by position.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{EmailDetail, SummaryResult};

/// One email as sent to the backend
#[derive(Debug, Serialize)]
struct BatchItem<'a> {
    #[serde(rename = "messageId")]
    message_id: &'a str,
    subject: &'a str,
    sender: &'a str,
    body: &'a str,
}

/// One entry of the backend response, positionally aligned with the batch
#[derive(Debug, Deserialize)]
struct SummaryEntry {
    summary: String,
    reply_draft: String,
}

/// Client for the remote summarisation service
pub struct SummarizeClient {
    endpoint: String,
}

impl SummarizeClient {
    /// Default backend endpoint (local development server)
    const DEFAULT_ENDPOINT: &'static str = "http://127.0.0.1:8000/summarize";

    pub fn new() -> Self {
        Self::with_endpoint(Self::DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Summarize a non-empty batch in one request.
    ///
    /// The response must contain exactly one entry per batch item, in
    /// order; anything else is rejected before any merge happens.
    pub fn summarize(&self, batch: &[EmailDetail]) -> Result<Vec<SummaryResult>, PipelineError> {
        // The orchestrator short-circuits empty batches; an empty request
        // here would make the positional merge vacuously "succeed".
        debug_assert!(!batch.is_empty(), "empty batch must not reach the backend");

        info!(
            "Submitting {} email(s) to the summarisation backend",
            batch.len()
        );

        let payload: Vec<BatchItem> = batch
            .iter()
            .map(|d| BatchItem {
                message_id: d.id.as_str(),
                subject: &d.subject,
                sender: &d.sender,
                body: &d.body,
            })
            .collect();

        let mut response = ureq::post(&self.endpoint)
            .send_json(&payload)
            .map_err(PipelineError::from_backend)?;

        let entries: Vec<SummaryEntry> = response
            .body_mut()
            .read_json()
            .map_err(|e| PipelineError::Network(format!("bad backend response: {e}")))?;

        merge_batch(batch, entries)
    }
}

impl Default for SummarizeClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge backend entries onto the batch that produced them.
///
/// `entries[i]` belongs to `batch[i]`; a length mismatch means the backend
/// omitted or reordered entries and the whole batch is rejected.
fn merge_batch(
    batch: &[EmailDetail],
    entries: Vec<SummaryEntry>,
) -> Result<Vec<SummaryResult>, PipelineError> {
    if entries.len() != batch.len() {
        return Err(PipelineError::BatchMismatch {
            expected: batch.len(),
            actual: entries.len(),
        });
    }

    Ok(batch
        .iter()
        .zip(entries)
        .map(|(detail, entry)| SummaryResult {
            message_id: detail.id.clone(),
            subject: detail.subject.clone(),
            sender: detail.sender.clone(),
            summary: entry.summary,
            reply_draft: entry.reply_draft,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;

    fn make_detail(id: &str) -> EmailDetail {
        EmailDetail {
            id: MessageId::new(id),
            subject: format!("Subject {id}"),
            sender: format!("{id}@example.com"),
            body: format!("Body {id}"),
        }
    }

    fn make_entry(n: usize) -> SummaryEntry {
        SummaryEntry {
            summary: format!("summary {n}"),
            reply_draft: format!("reply {n}"),
        }
    }

    #[test]
    fn test_merge_is_positional() {
        let batch = vec![make_detail("m1"), make_detail("m2"), make_detail("m3")];
        let entries = vec![make_entry(0), make_entry(1), make_entry(2)];

        let merged = merge_batch(&batch, entries).unwrap();
        assert_eq!(merged.len(), 3);
        for (i, result) in merged.iter().enumerate() {
            assert_eq!(result.message_id, batch[i].id);
            assert_eq!(result.subject, batch[i].subject);
            assert_eq!(result.sender, batch[i].sender);
            assert_eq!(result.summary, format!("summary {i}"));
            assert_eq!(result.reply_draft, format!("reply {i}"));
        }
    }

    #[test]
    fn test_short_response_is_rejected() {
        let batch = vec![make_detail("m1"), make_detail("m2"), make_detail("m3")];
        let entries = vec![make_entry(0), make_entry(1)];

        let err = merge_batch(&batch, entries).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::BatchMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_long_response_is_rejected() {
        let batch = vec![make_detail("m1")];
        let entries = vec![make_entry(0), make_entry(1)];

        let err = merge_batch(&batch, entries).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::BatchMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }
}
