use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::client::{CompletionRequest, LlmClient};
use super::models::IssueBatch;
use super::profile::GenerationProfile;
use super::validator::validate_issues_response;

/// Why the static fallback batch was returned instead of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The completion was not parseable JSON.
    InvalidJson,
    /// The JSON parsed but no entry survived validation.
    NoValidIssues,
    /// Prompt construction or the LLM call failed.
    Exception(String),
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::InvalidJson => "invalid json",
            FallbackReason::NoValidIssues => "no valid issues",
            FallbackReason::Exception(_) => "exception",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Exception(detail) => write!(f, "exception: {}", detail),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Result of one generation request. Both variants carry a non-empty batch.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success { issues: IssueBatch },
    Fallback { reason: FallbackReason, issues: IssueBatch },
}

impl GenerationOutcome {
    pub fn issues(&self) -> &IssueBatch {
        match self {
            GenerationOutcome::Success { issues } | GenerationOutcome::Fallback { issues, .. } => {
                issues
            }
        }
    }

    pub fn into_issues(self) -> IssueBatch {
        match self {
            GenerationOutcome::Success { issues } | GenerationOutcome::Fallback { issues, .. } => {
                issues
            }
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            GenerationOutcome::Success { .. } => None,
            GenerationOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason().is_some()
    }
}

/// Turns a markdown requirements document into issue suggestions.
///
/// One LLM call per request, no retries: every failure resolves to the
/// profile's fallback batch.
#[derive(Clone)]
pub struct IssueGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    profile: GenerationProfile,
}

impl IssueGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: &str, profile: GenerationProfile) -> Self {
        Self {
            client,
            model: model.to_string(),
            profile,
        }
    }

    pub fn profile(&self) -> &GenerationProfile {
        &self.profile
    }

    /// The document that will actually be sent: `markdown`, or the sample
    /// when it is blank.
    pub fn markdown_used<'a>(&'a self, markdown: &'a str) -> &'a str {
        if markdown.trim().is_empty() {
            &self.profile.sample_markdown
        } else {
            markdown
        }
    }

    pub async fn generate(&self, markdown: &str) -> GenerationOutcome {
        let generation_id = Uuid::new_v4();
        let markdown = self.markdown_used(markdown);
        tracing::info!(
            %generation_id,
            profile = self.profile.name,
            markdown_len = markdown.chars().count(),
            excerpt = %excerpt(markdown, 300),
            "Generating issues from markdown"
        );

        let prompt = match self.profile.build_prompt(markdown) {
            Ok(prompt) => prompt,
            Err(e) => return self.fallback(generation_id, FallbackReason::Exception(e)),
        };

        let request = CompletionRequest {
            model: self.model.clone(),
            prompt,
            max_tokens: self.profile.max_tokens,
            temperature: self.profile.temperature,
            json_mode: true,
        };
        let text = match self.client.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                return self.fallback(generation_id, FallbackReason::Exception(e.to_string()));
            }
        };
        tracing::debug!(%generation_id, response_len = text.len(), "LLM responded");

        let parsed: Value = match serde_json::from_str(extract_json_object(&text)) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    %generation_id,
                    error = %e,
                    line = e.line(),
                    column = e.column(),
                    excerpt = %excerpt(&text, 500),
                    "LLM response is not valid JSON"
                );
                return self.fallback(generation_id, FallbackReason::InvalidJson);
            }
        };

        let issues = validate_issues_response(&parsed);
        if issues.is_empty() {
            return self.fallback(generation_id, FallbackReason::NoValidIssues);
        }
        tracing::info!(%generation_id, count = issues.len(), "Generated issues");
        GenerationOutcome::Success { issues }
    }

    fn fallback(&self, generation_id: Uuid, reason: FallbackReason) -> GenerationOutcome {
        tracing::warn!(
            %generation_id,
            reason = %reason,
            count = self.profile.fallback_issues.len(),
            "Returning fallback issues"
        );
        GenerationOutcome::Fallback {
            reason,
            issues: self.profile.fallback_issues.clone(),
        }
    }
}

/// Strip prose or code fences around the outermost JSON object, if any.
fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
