//! Typed error hierarchy for the issue maker.
//!
//! Three top-level enums cover the three outbound concerns:
//! - `AuthError` — session token signing and verification
//! - `GitHubError` — GitHub OAuth and REST API calls
//! - `LlmError` — completion calls against the LLM API
//!
//! HTTP status mapping happens at the boundary in `server::api::ApiError`.

use thiserror::Error;

/// Errors from the session token manager.
///
/// Callers treat every variant the same way: the request is not authenticated.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingToken,

    #[error("Session token signature is invalid")]
    InvalidSignature,

    #[error("Session token is malformed: {0}")]
    Malformed(String),

    #[error("Session token has expired")]
    Expired,

    #[error("Failed to sign session token: {0}")]
    Signing(String),
}

/// Errors from the GitHub API client.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub {endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("No access token received from GitHub")]
    MissingAccessToken,

    #[error("Failed to decode GitHub response: {0}")]
    Decode(String),
}

impl GitHubError {
    /// Upstream HTTP status, when GitHub answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Status { status, .. } => Some(*status),
            GitHubError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors from the LLM completion client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    MissingApiKey,

    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}")]
    Status { status: u16, body: String },

    #[error("LLM returned an empty completion")]
    EmptyResponse,

    #[error("LLM response could not be read: {0}")]
    InvalidResponse(String),
}
