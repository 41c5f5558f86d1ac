//! Credential acquisition and invalidation
//!
//! Implements the OAuth2 authorization code flow with a local HTTP server
//! for the interactive path, and cached-token/refresh lookup for silent
//! background cycles. Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;

use crate::error::PipelineError;
use crate::models::AccessToken;

/// Source of access tokens for the mail provider
///
/// Injected into the fetcher and orchestrator so that tests can substitute
/// a stub; the production implementation is [`Authenticator`].
pub trait TokenProvider: Send + Sync {
    /// Acquire an access token.
    ///
    /// With `interactive = false` this never prompts: if no usable cached
    /// credential exists it returns `Ok(None)` immediately. With
    /// `interactive = true` a missing credential triggers the user-facing
    /// authorization flow; a declined prompt is `Err(AuthCancelled)`.
    fn acquire(&self, interactive: bool) -> Result<Option<AccessToken>, PipelineError>;

    /// Drop the cached entry for this token so the next cycle re-acquires.
    ///
    /// Called by the fetcher after a provider-reported 401.
    fn invalidate(&self, token: &AccessToken);

    /// Best-effort remote revocation plus local cache clear.
    ///
    /// Remote failures are logged and swallowed; logout always completes
    /// locally.
    fn revoke_and_clear(&self) -> Result<(), PipelineError>;
}

/// OAuth client credentials for the mail provider
#[derive(Debug, Clone)]
pub struct OauthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct CredentialFile {
    client_id: String,
    client_secret: String,
}

impl OauthCredentials {
    const CREDENTIALS_FILE: &'static str = "oauth-credentials.json";

    /// Load credentials from ~/.config/briefbox/oauth-credentials.json,
    /// falling back to BRIEFBOX_CLIENT_ID / BRIEFBOX_CLIENT_SECRET.
    pub fn load() -> Result<Self> {
        if config::config_exists(Self::CREDENTIALS_FILE) {
            let file: CredentialFile = config::load_json(Self::CREDENTIALS_FILE)?;
            return Ok(Self {
                client_id: file.client_id,
                client_secret: file.client_secret,
            });
        }
        Self::from_env()
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("BRIEFBOX_CLIENT_ID")
            .context("BRIEFBOX_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("BRIEFBOX_CLIENT_SECRET")
            .context("BRIEFBOX_CLIENT_SECRET environment variable not set")?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

/// Cached token data persisted between runs
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}

/// Token response from the provider's token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Production [`TokenProvider`] backed by the provider's OAuth2 endpoints
pub struct Authenticator {
    credentials: OauthCredentials,
    token_path: PathBuf,
}

impl Authenticator {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    const REVOKE_URL: &'static str = "https://oauth2.googleapis.com/revoke";

    /// Readonly scope is enough: the pipeline never mutates the mailbox
    const SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.readonly";

    /// Port range to try for the local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    const TOKEN_FILE: &'static str = "token-cache.json";

    pub fn new(credentials: OauthCredentials) -> Result<Self> {
        let token_path = config::config_path(Self::TOKEN_FILE)
            .context("Could not determine config directory")?;
        Ok(Self {
            credentials,
            token_path,
        })
    }

    fn load_token(&self) -> Result<StoredToken> {
        let content = std::fs::read_to_string(&self.token_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_token(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.token_path, serde_json::to_string_pretty(token)?)?;
        Ok(())
    }

    fn store_response(&self, token: &TokenResponse, prior_refresh: Option<String>) -> Result<()> {
        self.save_token(&StoredToken {
            access_token: Some(token.access_token.clone()),
            refresh_token: token.refresh_token.clone().or(prior_refresh),
            expires_at: token
                .expires_in
                .map(|d| chrono::Utc::now().timestamp() + d as i64),
        })
    }

    /// Return the cached access token if it is still valid, refreshing it
    /// when a refresh token is available. Never prompts.
    fn acquire_silent(&self) -> Option<AccessToken> {
        let token = self.load_token().ok()?;

        if let Some(access) = &token.access_token
            && token_usable(token.expires_at, chrono::Utc::now().timestamp())
        {
            return Some(AccessToken::new(access.clone()));
        }

        let refresh = token.refresh_token.clone()?;
        match self.refresh_access_token(&refresh) {
            Ok(new_token) => {
                if let Err(err) = self.store_response(&new_token, Some(refresh)) {
                    warn!("Failed to persist refreshed token: {err}");
                }
                Some(AccessToken::new(new_token.access_token))
            }
            Err(err) => {
                warn!("Token refresh failed: {err}");
                None
            }
        }
    }

    /// Run the full authorization code flow: open the consent page in a
    /// browser, wait for the redirect on a local port, exchange the code.
    fn acquire_interactive(&self) -> Result<AccessToken, PipelineError> {
        let (listener, port) = self.start_local_server().map_err(PipelineError::Storage)?;
        let redirect_uri = format!("http://localhost:{}", port);

        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(Self::SCOPE),
        );

        info!("Opening browser for mail provider authorization");
        if let Err(e) = open::that(&auth_url) {
            warn!("Failed to open browser: {e}. Visit the URL manually: {auth_url}");
        }

        let code = self.wait_for_callback(listener)?;

        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .map_err(|e| PipelineError::Network(e.to_string()))?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| PipelineError::Network(format!("bad token response: {e}")))?;

        self.store_response(&token, None)
            .map_err(PipelineError::Storage)?;
        info!("Authorization complete");
        Ok(AccessToken::new(token.access_token))
    }

    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Wait for the OAuth redirect and extract the authorization code
    fn wait_for_callback(&self, listener: TcpListener) -> Result<String, PipelineError> {
        let (mut stream, _) = listener
            .accept()
            .map_err(|e| PipelineError::Network(format!("callback accept failed: {e}")))?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .map_err(|e| PipelineError::Network(format!("callback read failed: {e}")))?;

        let outcome = parse_callback_request(&request_line);

        let (status, body) = if outcome.is_ok() {
            ("200 OK", "Authorization successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authorization failed. You can close this window.")
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        outcome
    }

    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")
    }
}

impl TokenProvider for Authenticator {
    fn acquire(&self, interactive: bool) -> Result<Option<AccessToken>, PipelineError> {
        if let Some(token) = self.acquire_silent() {
            return Ok(Some(token));
        }
        if !interactive {
            return Ok(None);
        }
        self.acquire_interactive().map(Some)
    }

    fn invalidate(&self, token: &AccessToken) {
        // Keep the refresh token so the next silent acquisition can still
        // succeed; only the rejected access token is dropped.
        match self.load_token() {
            Ok(mut stored) => {
                if stored.access_token.as_deref() == Some(token.secret()) {
                    stored.access_token = None;
                    stored.expires_at = None;
                    if let Err(err) = self.save_token(&stored) {
                        warn!("Failed to persist token invalidation: {err}");
                    }
                }
            }
            Err(err) => warn!("Token invalidation found no cache to update: {err}"),
        }
    }

    fn revoke_and_clear(&self) -> Result<(), PipelineError> {
        // Fire-and-forget remote revocation; the provider may already have
        // expired the token, so any failure here is non-fatal.
        if let Ok(stored) = self.load_token() {
            let candidate = stored.refresh_token.or(stored.access_token);
            if let Some(token) = candidate {
                match ureq::post(Self::REVOKE_URL).send_form([("token", token.as_str())]) {
                    Ok(_) => info!("Remote token revocation succeeded"),
                    Err(err) => warn!("Remote token revocation failed: {err}"),
                }
            }
        }

        config::remove(Self::TOKEN_FILE).map_err(PipelineError::Storage)?;
        info!("Local token cache cleared");
        Ok(())
    }
}

/// A cached access token is only trusted with a recorded, unexpired
/// expiry (5 minute buffer). A token without one is refreshed instead.
fn token_usable(expires_at: Option<i64>, now: i64) -> bool {
    matches!(expires_at, Some(at) if at > now + 300)
}

/// Parse the OAuth callback request line into an authorization code.
///
/// A redirect carrying `error=access_denied` (the user clicked cancel on
/// the consent page) maps to [`PipelineError::AuthCancelled`].
fn parse_callback_request(request_line: &str) -> Result<String, PipelineError> {
    let query = request_line
        .split_whitespace()
        .nth(1)
        .and_then(|path| path.split('?').nth(1));

    let find_param = |name: &str| {
        query.and_then(|q| {
            q.split('&').find_map(|param| {
                let mut parts = param.split('=');
                if parts.next() == Some(name) {
                    parts.next().map(|s| s.to_string())
                } else {
                    None
                }
            })
        })
    };

    if let Some(code) = find_param("code") {
        return Ok(code);
    }

    match find_param("error").as_deref() {
        Some("access_denied") => Err(PipelineError::AuthCancelled),
        Some(other) => Err(PipelineError::Network(format!("OAuth error: {other}"))),
        None => Err(PipelineError::Network(
            "no authorization code received".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usable_requires_recorded_expiry() {
        let now = 1_000_000;
        assert!(token_usable(Some(now + 600), now));
        // Inside the 5 minute buffer
        assert!(!token_usable(Some(now + 100), now));
        assert!(!token_usable(Some(now - 10), now));
        // No expiry recorded: refresh rather than trust
        assert!(!token_usable(None, now));
    }

    #[test]
    fn test_parse_callback_with_code() {
        let code = parse_callback_request("GET /?code=abc123&scope=mail HTTP/1.1").unwrap();
        assert_eq!(code, "abc123");
    }

    #[test]
    fn test_parse_callback_user_declined() {
        let err = parse_callback_request("GET /?error=access_denied HTTP/1.1").unwrap_err();
        assert!(matches!(err, PipelineError::AuthCancelled));
    }

    #[test]
    fn test_parse_callback_other_error() {
        let err = parse_callback_request("GET /?error=server_error HTTP/1.1").unwrap_err();
        assert!(matches!(err, PipelineError::Network(_)));
    }

    #[test]
    fn test_parse_callback_missing_query() {
        let err = parse_callback_request("GET / HTTP/1.1").unwrap_err();
        assert!(matches!(err, PipelineError::Network(_)));
    }
}
