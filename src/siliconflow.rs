//! Minimal SiliconFlow client (OpenAI-compatible).
//!
//! We only call chat.completions (plain text, JSON is requested in the prompt)
//! and the model catalog. Calls are instrumented and log model names and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::ModelDescriptor;
use crate::error::DrillError;
use crate::util::extract_api_error;

#[derive(Clone)]
pub struct SiliconFlow {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl SiliconFlow {
  pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
    Self { client, base_url: base_url.into() }
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), path)
  }

  /// Chat completion with a system and a user message; returns the raw content.
  #[instrument(level = "info", skip(self, api_key, system, user), fields(model = %model, user_len = user.len()))]
  pub async fn chat_plain(
    &self,
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, DrillError> {
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
    };

    let res = self.client.post(self.url("chat/completions"))
      .header(USER_AGENT, "phrasedrill-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body)
        .unwrap_or_else(|| if body.trim().is_empty() { "Unknown error occurred".into() } else { body });
      return Err(DrillError::upstream(format!("SiliconFlow HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| DrillError::malformed("SiliconFlow response", e))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "SiliconFlow usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| DrillError::upstream("SiliconFlow response has no choices[0].message.content"))?;

    debug!(content_len = text.len(), "SiliconFlow content received");
    Ok(text)
  }

  /// Model catalog, in the order the service returns it.
  #[instrument(level = "info", skip(self, api_key))]
  pub async fn list_models(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, DrillError> {
    let res = self.client.get(self.url("models"))
      .header(USER_AGENT, "phrasedrill-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", api_key))
      .send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or_else(|| "Invalid API Key or network issue.".into());
      return Err(DrillError::upstream(format!("Failed to fetch models: {} - {}", status, msg)));
    }

    let body: Value = res.json().await
      .map_err(|e| DrillError::malformed("model catalog response", e))?;
    let models = parse_catalog(&body)?;
    info!(count = models.len(), "SiliconFlow model catalog fetched");
    Ok(models)
  }
}

/// `{"data": [{"id": ..}, ..]}` -> descriptors, order kept, no dedup.
pub fn parse_catalog(body: &Value) -> Result<Vec<ModelDescriptor>, DrillError> {
  let entries = body.get("data").and_then(Value::as_array).ok_or_else(|| {
    DrillError::upstream("Unexpected response format from SiliconFlow API when fetching models.")
  })?;
  entries
    .iter()
    .enumerate()
    .map(|(i, e)| {
      e.get("id")
        .and_then(Value::as_str)
        .map(ModelDescriptor::from_id)
        .ok_or_else(|| DrillError::upstream(format!("Model catalog entry {i} has no string id.")))
    })
    .collect()
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { #[serde(default)] content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}
