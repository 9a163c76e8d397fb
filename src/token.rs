//! Credential sources for the live-update endpoint.
//!
//! DESIGN
//! ======
//! The client asks its `TokenSource` for an access token once per connection
//! attempt and never re-checks mid-session. A missing token is not an error:
//! the attempt proceeds against the bare endpoint.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("ticket request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ticket endpoint returned status {0}")]
    Status(u16),
    #[error("invalid session token header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Supplies the access token appended to the endpoint URL.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Never yields a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

#[async_trait]
impl TokenSource for NoToken {
    async fn access_token(&self) -> Option<String> {
        None
    }
}

/// Always yields the same token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Shared slot holding the signed-in user's access token.
///
/// Clones share the slot: the auth layer keeps one clone and updates it on
/// sign-in and sign-out, the live-update client reads another.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl TokenSource for CredentialStore {
    async fn access_token(&self) -> Option<String> {
        self.current()
    }
}

/// Fetches a one-time ticket from an HTTP endpoint before every attempt.
///
/// The endpoint is `POST`ed with an optional bearer session token and must
/// answer `{"ticket": "..."}`.
#[derive(Debug, Clone)]
pub struct TicketEndpoint {
    http: reqwest::Client,
    url: String,
    session_token: Option<String>,
}

#[derive(Deserialize)]
struct TicketResponse {
    ticket: String,
}

impl TicketEndpoint {
    #[must_use]
    pub fn new(url: impl Into<String>, session_token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into(), session_token }
    }

    /// Request a fresh ticket.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the endpoint answers with a
    /// non-success status, or the body has no `ticket` string.
    pub async fn fetch_ticket(&self) -> Result<String, TokenError> {
        let mut request = self.http.post(&self.url);
        if let Some(session_token) = &self.session_token {
            request = request.header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {session_token}"))?);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Status(status.as_u16()));
        }
        let body: TicketResponse = response.json().await?;
        Ok(body.ticket)
    }
}

#[async_trait]
impl TokenSource for TicketEndpoint {
    async fn access_token(&self) -> Option<String> {
        match self.fetch_ticket().await {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                warn!(error = %e, url = %self.url, "live-update ticket unavailable; connecting without token");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
