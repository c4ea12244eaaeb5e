use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Query, State},
    http::{
        HeaderMap, StatusCode,
        header::{COOKIE, LOCATION, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::AuthError;
use crate::github::{GitHubClient, NewIssue, is_valid_repository_slug};
use crate::llm::{IssueBatch, IssueGenerator};
use crate::session::{SESSION_COOKIE, SessionClaims, SessionManager};

const MARKDOWN_ECHO_CHARS: usize = 200;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub sessions: SessionManager,
    pub github: GitHubClient,
    pub generator: IssueGenerator,
    /// Add `Secure` to the session cookie.
    pub secure_cookies: bool,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateIssueRequest {
    pub repository: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Deserialize)]
pub struct GenerateIssuesRequest {
    #[serde(default)]
    pub markdown_content: String,
}

#[derive(Serialize)]
pub struct GenerateIssuesResponse {
    pub issues: IssueBatch,
    pub markdown_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized("Not authenticated".into()),
            other => {
                tracing::debug!(error = %other, "Rejected session token");
                ApiError::Unauthorized("Invalid token".into())
            }
        }
    }
}

// ── Session extraction ────────────────────────────────────────────────

/// A verified session, taken from the `access_token` cookie.
pub struct AuthSession(pub SessionClaims);

impl FromRequestParts<SharedState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = state.sessions.verify(&token)?;
        Ok(AuthSession(claims))
    }
}

/// Find the session cookie among all `Cookie` headers.
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/health", get(health_check))
        .route("/api/auth/callback", get(auth_callback))
        .route("/api/auth/me", get(current_user))
        .route("/api/auth/logout", post(logout))
        .route("/api/github/repositories", get(list_repositories))
        .route("/api/github/create-issue", post(create_issue))
        .route("/api/llm/generate-issues", post(generate_issues))
        .route("/api/llm/sample-markdown", get(sample_markdown))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn get_config(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({"github_client_id": state.github.client_id()}))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "ok", "message": "Server is running"}))
}

async fn auth_callback(
    State(state): State<SharedState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        tracing::info!(error = %error, "OAuth provider returned an error");
        return found(format!("/?error={}", urlencoding::encode(&error)));
    }
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return found("/?error=no_code".to_string());
    };

    match login(&state, &code).await {
        Ok(token) => {
            let cookie = session_cookie(
                &token,
                state.sessions.ttl().num_seconds(),
                state.secure_cookies,
            );
            (
                StatusCode::FOUND,
                [(LOCATION, "/".to_string()), (SET_COOKIE, cookie)],
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "GitHub login failed");
            found("/?error=auth_failed".to_string())
        }
    }
}

/// Exchange the OAuth code and sign a session for the resulting user.
async fn login(state: &AppState, code: &str) -> anyhow::Result<String> {
    let github_token = state.github.exchange_code(code).await?;
    let profile = state.github.fetch_user(&github_token).await?;
    let token = state.sessions.issue(&profile, &github_token)?;
    tracing::info!(
        login = profile.get("login").and_then(|l| l.as_str()).unwrap_or("unknown"),
        "User signed in"
    );
    Ok(token)
}

async fn current_user(AuthSession(claims): AuthSession) -> impl IntoResponse {
    Json(claims.github_data)
}

async fn logout(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, session_cookie("", 0, state.secure_cookies))],
        Json(json!({"message": "Logged out successfully"})),
    )
}

async fn list_repositories(
    State(state): State<SharedState>,
    AuthSession(claims): AuthSession,
) -> Result<impl IntoResponse, ApiError> {
    let repos = state
        .github
        .list_repositories(&claims.github_access_token)
        .await
        .map_err(|e| {
            tracing::warn!(
                error = %e,
                upstream_status = ?e.status(),
                user = %claims.sub,
                "Listing repositories failed"
            );
            ApiError::BadRequest("Failed to get repositories".into())
        })?;
    Ok(Json(repos))
}

async fn create_issue(
    State(state): State<SharedState>,
    AuthSession(claims): AuthSession,
    Json(req): Json<CreateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_repository_slug(&req.repository) {
        return Err(ApiError::BadRequest(format!(
            "Invalid repository '{}'",
            req.repository
        )));
    }
    let issue = NewIssue {
        title: req.title,
        body: req.body,
        labels: req.labels,
    };
    let created = state
        .github
        .create_issue(&claims.github_access_token, &req.repository, &issue)
        .await
        .map_err(|e| {
            tracing::warn!(
                error = %e,
                upstream_status = ?e.status(),
                repository = %req.repository,
                user = %claims.sub,
                "Creating issue failed"
            );
            ApiError::BadRequest("Failed to create issue".into())
        })?;
    tracing::info!(repository = %req.repository, number = created.number, "Created issue");
    Ok(Json(created))
}

async fn generate_issues(
    State(state): State<SharedState>,
    AuthSession(claims): AuthSession,
    Json(req): Json<GenerateIssuesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(
        user = %claims.sub,
        content_len = req.markdown_content.chars().count(),
        "Received markdown for issue generation"
    );
    let markdown_used = echo_markdown(state.generator.markdown_used(&req.markdown_content));
    let outcome = state.generator.generate(&req.markdown_content).await;
    let fallback_reason = outcome.fallback_reason().map(|r| r.as_str().to_string());

    Ok(Json(GenerateIssuesResponse {
        issues: outcome.into_issues(),
        markdown_used,
        fallback_reason,
    }))
}

async fn sample_markdown(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({"markdown": state.generator.profile().sample_markdown}))
}

/// First 200 characters of `markdown`, with `...` when cut.
fn echo_markdown(markdown: &str) -> String {
    if markdown.chars().count() > MARKDOWN_ECHO_CHARS {
        let head: String = markdown.chars().take(MARKDOWN_ECHO_CHARS).collect();
        format!("{}...", head)
    } else {
        markdown.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
