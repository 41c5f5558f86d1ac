//! Mail provider HTTP client
//!
//! Fetches unread message IDs and full message content. Uses synchronous
//! HTTP (ureq); detail fetches for one batch run on the rayon pool.

use log::{debug, info};
use rayon::prelude::*;
use std::sync::Arc;

use super::api::{GmailMessage, ListMessagesResponse};
use super::normalize::normalize_detail;
use crate::auth::TokenProvider;
use crate::error::PipelineError;
use crate::models::{AccessToken, EmailDetail, MessageId};

/// Client for the mail provider's message-retrieval API
pub struct GmailClient {
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GmailClient {
    /// Mail provider API base URL
    const BASE_URL: &'static str = "https://www.googleapis.com/gmail/v1";

    /// Search filter for unread mail
    const UNREAD_QUERY: &'static str = "is:unread";

    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_base_url(tokens, Self::BASE_URL)
    }

    /// Create a client against a non-default endpoint (used by tests)
    pub fn with_base_url(tokens: Arc<dyn TokenProvider>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tokens,
        }
    }

    /// List unread message IDs, capped at `limit`.
    ///
    /// A 401 invalidates the token before the error is returned, so the
    /// next cycle re-acquires instead of reusing a dead credential.
    pub fn list_unread(
        &self,
        token: &AccessToken,
        limit: u32,
    ) -> Result<Vec<MessageId>, PipelineError> {
        let url = format!(
            "{}/users/me/messages?q={}&maxResults={}",
            self.base_url,
            urlencoding::encode(Self::UNREAD_QUERY),
            limit
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", token.secret()))
            .call()
            .map_err(|e| self.provider_error(token, e))?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| PipelineError::Network(format!("bad list response: {e}")))?;

        let ids: Vec<MessageId> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::new(m.id))
            .collect();
        debug!("Provider reported {} unread message(s)", ids.len());
        Ok(ids)
    }

    /// Fetch and normalize the full content of one message
    pub fn fetch_detail(
        &self,
        token: &AccessToken,
        id: &MessageId,
    ) -> Result<EmailDetail, PipelineError> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            self.base_url,
            id.as_str()
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", token.secret()))
            .call()
            .map_err(|e| self.provider_error(token, e))?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .map_err(|e| PipelineError::Network(format!("bad message response: {e}")))?;

        Ok(normalize_detail(id.clone(), &message))
    }

    /// Fetch details for a batch of IDs concurrently.
    ///
    /// Output order matches input order. Fail-fast: a single failure fails
    /// the whole batch; there is no per-item retry or partial result.
    pub fn fetch_details(
        &self,
        token: &AccessToken,
        ids: &[MessageId],
    ) -> Result<Vec<EmailDetail>, PipelineError> {
        info!("Fetching details for {} message(s)", ids.len());
        ids.par_iter()
            .map(|id| self.fetch_detail(token, id))
            .collect()
    }

    /// Map a ureq failure to a pipeline error, invalidating the token on
    /// a provider-reported 401.
    fn provider_error(&self, token: &AccessToken, err: ureq::Error) -> PipelineError {
        if matches!(err, ureq::Error::StatusCode(401)) {
            info!("Provider rejected the access token; invalidating cached credential");
            self.tokens.invalidate(token);
        }
        PipelineError::from_provider(err)
    }
}
