use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use issue_maker::config::LlmSettings;
use issue_maker::llm::{GenerationProfile, IssueGenerator, OpenAiClient, OpenAiConfig};

pub async fn cmd_generate(file: Option<&Path>) -> Result<()> {
    let settings = LlmSettings::from_env()?;
    let markdown = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => String::new(),
    };

    let client = OpenAiClient::new(OpenAiConfig::from(&settings))
        .context("Failed to build LLM client")?;
    let generator = IssueGenerator::new(
        Arc::new(client),
        &settings.model,
        GenerationProfile::for_kind(settings.profile),
    );

    let outcome = generator.generate(&markdown).await;
    let mut output = json!({ "issues": outcome.issues() });
    if let Some(reason) = outcome.fallback_reason() {
        output["fallback_reason"] = json!(reason.as_str());
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
