//! Minimal Gemini client: one `generateContent` call with a response schema.
//!
//! The key travels in the `x-goog-api-key` header and is never logged.

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::DrillError;
use crate::util::extract_api_error;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl Gemini {
  pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
    Self { client, base_url: base_url.into() }
  }

  /// `{base}/models/{model}:generateContent`, with the model id kept to one path segment.
  fn endpoint(&self, model: &str) -> Result<reqwest::Url, DrillError> {
    let mut url = reqwest::Url::parse(&self.base_url)
      .map_err(|e| DrillError::Configuration(format!("Invalid Gemini base URL: {e}")))?;
    url.path_segments_mut()
      .map_err(|_| DrillError::Configuration(format!("Invalid Gemini base URL: {}", self.base_url)))?
      .pop_if_empty()
      .push("models")
      .push(&format!("{model}:generateContent"));
    Ok(url)
  }

  /// Ask for JSON conforming to `schema`; returns the raw text payload.
  #[instrument(level = "info", skip(self, api_key, system, user, schema), fields(model = %model, user_len = user.len()))]
  pub async fn generate_json(
    &self,
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
    schema: Value,
  ) -> Result<String, DrillError> {
    let url = self.endpoint(model)?;
    let req = GenerateContentRequest {
      system_instruction: Content { role: None, parts: vec![Part { text: system.into() }] },
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: user.into() }] }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: schema,
      },
    };

    let res = self.client.post(url)
      .header(USER_AGENT, "phrasedrill-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, api_key)
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(DrillError::upstream(format!("Gemini HTTP {}: {}", status, msg)));
    }

    let body: GenerateContentResponse = res.json().await
      .map_err(|e| DrillError::malformed("Gemini response", e))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    extract_text(body)
  }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: GenerateContentResponse) -> Result<String, DrillError> {
  let Some(candidate) = body.candidates.into_iter().next() else {
    let reason = body.prompt_feedback
      .and_then(|f| f.block_reason)
      .map(|r| format!(" (blocked: {r})"))
      .unwrap_or_default();
    return Err(DrillError::upstream(format!("Gemini returned no candidates{reason}")));
  };
  let text: String = candidate.content
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
    .unwrap_or_default();
  let text = text.trim();
  if text.is_empty() {
    let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
    return Err(DrillError::upstream(format!("Gemini returned an empty payload (finish reason: {reason})")));
  }
  Ok(text.to_string())
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  system_instruction: Content,
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  parts: Vec<Part>,
}
#[derive(Serialize)]
struct Part { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<CandidateContent>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback { #[serde(default)] block_reason: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}
