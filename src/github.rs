use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GitHubError;

const USER_AGENT_VALUE: &str = "issue-maker";
const REPOS_PER_PAGE: &str = "50";

/// Response from GitHub's OAuth token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// One entry of `GET /user/emails`.
#[derive(Debug, Deserialize)]
pub struct EmailEntry {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
}

/// A GitHub repository. Fields we read are typed; the rest is passed through
/// to the client untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub full_name: String,
    pub name: String,
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Payload for `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// An issue as returned by GitHub after creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub number: i64,
    pub title: String,
    pub html_url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Check that `slug` looks like `owner/repo` before it is spliced into a URL.
pub fn is_valid_repository_slug(slug: &str) -> bool {
    let mut parts = slug.split('/');
    let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let valid_segment = |s: &str| {
        !s.is_empty()
            && s != "."
            && s != ".."
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    valid_segment(owner) && valid_segment(repo)
}

/// Thin client over the GitHub OAuth and REST endpoints the service proxies.
///
/// One instance is built at startup and shared; the inner `reqwest::Client`
/// pools connections across requests.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("oauth_base", &self.oauth_base)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    pub fn new(
        api_base: &str,
        oauth_base: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            oauth_base: oauth_base.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exchange an OAuth authorization `code` for a user access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GitHubError> {
        let resp = self
            .http
            .post(format!("{}/login/oauth/access_token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await?;
        let resp = expect_status(resp, "token exchange", StatusCode::OK).await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(access_token),
            _ => {
                tracing::warn!(
                    error = token.error.as_deref().unwrap_or("none"),
                    description = token.error_description.as_deref().unwrap_or(""),
                    "GitHub token exchange returned no access token"
                );
                Err(GitHubError::MissingAccessToken)
            }
        }
    }

    /// Fetch the authenticated user's profile.
    ///
    /// When the profile has no public email, the primary address from
    /// `/user/emails` is filled in. Failures of that second call are logged
    /// and otherwise ignored.
    pub async fn fetch_user(&self, token: &str) -> Result<Value, GitHubError> {
        let resp = self
            .http
            .get(format!("{}/user", self.api_base))
            .bearer_auth(token)
            .send()
            .await?;
        let resp = expect_status(resp, "user", StatusCode::OK).await?;
        let mut user: Value = resp
            .json()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))?;

        let has_email = user
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|e| !e.is_empty());
        if !has_email
            && let Some(email) = self.primary_email(token).await
            && let Some(profile) = user.as_object_mut()
        {
            profile.insert("email".to_string(), Value::String(email));
        }
        Ok(user)
    }

    async fn primary_email(&self, token: &str) -> Option<String> {
        let resp = match self
            .http
            .get(format!("{}/user/emails", self.api_base))
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "GitHub email lookup failed");
                return None;
            }
        };
        if resp.status() != StatusCode::OK {
            tracing::warn!(
                status = resp.status().as_u16(),
                "GitHub email lookup returned an error status"
            );
            return None;
        }
        let emails: Vec<EmailEntry> = match resp.json().await {
            Ok(emails) => emails,
            Err(e) => {
                tracing::warn!(error = %e, "GitHub email lookup returned an unreadable body");
                return None;
            }
        };
        let primary = emails.into_iter().find(|e| e.primary).map(|e| e.email);
        if primary.is_none() {
            tracing::debug!("GitHub account has no primary email");
        }
        primary
    }

    /// List repositories owned by the user, most recently updated first.
    pub async fn list_repositories(&self, token: &str) -> Result<Vec<GitHubRepo>, GitHubError> {
        let resp = self
            .http
            .get(format!("{}/user/repos", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("sort", "updated"),
                ("per_page", REPOS_PER_PAGE),
                ("type", "owner"),
            ])
            .send()
            .await?;
        let resp = expect_status(resp, "repositories", StatusCode::OK).await?;
        resp.json::<Vec<GitHubRepo>>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// Open an issue on `repository` (`owner/repo`).
    pub async fn create_issue(
        &self,
        token: &str,
        repository: &str,
        issue: &NewIssue,
    ) -> Result<CreatedIssue, GitHubError> {
        let resp = self
            .http
            .post(format!("{}/repos/{}/issues", self.api_base, repository))
            .bearer_auth(token)
            .json(issue)
            .send()
            .await?;
        let resp = expect_status(resp, "create issue", StatusCode::CREATED).await?;
        resp.json::<CreatedIssue>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }
}

async fn expect_status(
    resp: reqwest::Response,
    endpoint: &'static str,
    expected: StatusCode,
) -> Result<reqwest::Response, GitHubError> {
    let status = resp.status();
    if status == expected {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(
        endpoint,
        status = status.as_u16(),
        body = %body.chars().take(500).collect::<String>(),
        "GitHub returned an unexpected status"
    );
    Err(GitHubError::Status {
        endpoint,
        status: status.as_u16(),
        body,
    })
}
