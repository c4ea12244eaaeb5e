//! Issue generation: markdown in, validated issue suggestions out.
//!
//! - `client`: the `LlmClient` seam and the OpenAI-compatible implementation
//! - `profile`: prompt template, sample document and fallback batch per preset
//! - `validator`: normalizes untrusted model output into `IssueCandidate`s
//! - `generator`: one LLM round trip resolved to a `GenerationOutcome`

pub mod client;
pub mod generator;
pub mod models;
pub mod profile;
pub mod validator;

pub use client::{CompletionRequest, LlmClient, OpenAiClient, OpenAiConfig};
pub use generator::{FallbackReason, GenerationOutcome, IssueGenerator};
pub use models::{IssueBatch, IssueCandidate};
pub use profile::GenerationProfile;
