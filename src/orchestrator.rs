//! Exercise generation across both providers.
//!
//! Flow:
//! 1) Validate caller input locally (no network on failure).
//! 2) Build the shared instruction text from `schema`.
//! 3) Dispatch to the provider's transport (Gemini gets a JSON schema,
//!    SiliconFlow gets the schema restated in prose).
//! 4) Normalize: strip fences (SiliconFlow only), parse into `GeneratedExercises`.
//!
//! No retries, no caching and no partial results.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{AppConfig, Prompts, ProviderConfig};
use crate::domain::{GeneratedExercises, ModelDescriptor, Provider, QuestionCounts};
use crate::error::DrillError;
use crate::gemini::Gemini;
use crate::schema::{build_instruction, build_instruction_with_schema, response_schema};
use crate::siliconflow::SiliconFlow;
use crate::util::{strip_code_fence, trunc_for_log};

/// SiliconFlow sampling temperature.
pub const DYNAMIC_TEMPERATURE: f32 = 0.5;

#[derive(Clone)]
pub struct ExerciseGenerator {
  pub gemini: Gemini,
  pub siliconflow: SiliconFlow,
  pub gemini_model: String,
  pub prompts: Prompts,
}

impl ExerciseGenerator {
  /// Build both transports on one shared HTTP client with connect/request timeouts.
  pub fn new(providers: &ProviderConfig, prompts: Prompts) -> Result<Self, DrillError> {
    let client = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(providers.connect_timeout_secs))
      .timeout(Duration::from_secs(providers.request_timeout_secs))
      .build()
      .map_err(|e| DrillError::Configuration(format!("Failed to build HTTP client: {e}")))?;

    Ok(Self {
      gemini: Gemini::new(client.clone(), providers.gemini_base_url.clone()),
      siliconflow: SiliconFlow::new(client, providers.siliconflow_base_url.clone()),
      gemini_model: providers.gemini_model.clone(),
      prompts,
    })
  }

  pub fn from_config(cfg: &AppConfig) -> Result<Self, DrillError> {
    Self::new(&cfg.providers, cfg.prompts.clone())
  }

  /// Generate a full exercise set. See module docs for the flow.
  #[instrument(
    level = "info",
    skip(self, provider, credential, model, topic, counts),
    fields(%provider, topic_len = topic.len(), requested = counts.total())
  )]
  pub async fn generate(
    &self,
    provider: Provider,
    credential: &str,
    model: Option<&str>,
    topic: &str,
    counts: QuestionCounts,
  ) -> Result<GeneratedExercises, DrillError> {
    let model = check_request(provider, credential, model, topic, &counts)?;
    let topic = topic.trim();
    let start = Instant::now();

    let result = match provider {
      Provider::Primary => {
        let model = model.unwrap_or(self.gemini_model.as_str());
        let user = build_instruction(&self.prompts, topic, &counts);
        self.gemini
          .generate_json(credential.trim(), model, &self.prompts.gemini_system, &user, response_schema())
          .await
          .and_then(|text| parse_exercises(&text))
      }
      Provider::Dynamic => {
        let model = model.ok_or_else(missing_model)?;
        let user = build_instruction_with_schema(&self.prompts, topic, &counts);
        self.siliconflow
          .chat_plain(credential.trim(), model, &self.prompts.siliconflow_system, &user, DYNAMIC_TEMPERATURE)
          .await
          .and_then(|text| parse_exercises(strip_code_fence(&text)))
      }
    }
    .map_err(|e| match e {
      DrillError::Upstream(msg) => DrillError::Upstream(format!("Failed to generate exercises. {msg}")),
      other => other,
    });
    let elapsed = start.elapsed();

    match &result {
      Ok(ex) => {
        info!(?elapsed, "Exercises generated");
        for issue in ex.conformance_issues(&counts) {
          warn!(%provider, %issue, "Provider output deviates from request");
        }
      }
      Err(e) => error!(?elapsed, error = %e, "Exercise generation failed"),
    }
    result
  }

  /// SiliconFlow model catalog for `credential`.
  #[instrument(level = "info", skip_all)]
  pub async fn list_models(&self, credential: &str) -> Result<Vec<ModelDescriptor>, DrillError> {
    let credential = credential.trim();
    if credential.is_empty() {
      return Err(missing_credential(Provider::Dynamic));
    }
    self.siliconflow.list_models(credential).await
  }
}

fn missing_credential(provider: Provider) -> DrillError {
  DrillError::Configuration(format!("Please provide an API key for {}.", provider.display_name()))
}

fn missing_model() -> DrillError {
  DrillError::Configuration("Please select a SiliconFlow model. If the list is empty, check your API key.".into())
}

/// Local checks, in order: topic, counts, credential, model.
/// Returns the trimmed model, `None` when unset.
fn check_request<'a>(
  provider: Provider,
  credential: &str,
  model: Option<&'a str>,
  topic: &str,
  counts: &QuestionCounts,
) -> Result<Option<&'a str>, DrillError> {
  if topic.trim().is_empty() {
    return Err(DrillError::Validation("Please specify the content you want to practice.".into()));
  }
  counts.validate()?;
  if credential.trim().is_empty() {
    return Err(missing_credential(provider));
  }
  let model = model.map(str::trim).filter(|m| !m.is_empty());
  if provider == Provider::Dynamic && model.is_none() {
    return Err(missing_model());
  }
  Ok(model)
}

/// Parse a provider payload into the exercise shape.
pub fn parse_exercises(text: &str) -> Result<GeneratedExercises, DrillError> {
  serde_json::from_str::<GeneratedExercises>(text.trim()).map_err(|e| {
    warn!(payload = %trunc_for_log(text, 200), "Unparseable exercise payload");
    DrillError::upstream(format!("JSON parse error: {e}"))
  })
}

/// Race `fut` against `token`; a cancelled call is dropped mid-flight.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, DrillError>
where
  F: Future<Output = Result<T, DrillError>>,
{
  tokio::select! {
    biased;
    _ = token.cancelled() => Err(DrillError::Cancelled),
    r = fut => r,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_topic_is_validation_even_without_credential() {
    let err = check_request(Provider::Dynamic, "", None, "  \n", &QuestionCounts::default()).unwrap_err();
    assert_eq!(err.kind(), "validation");
  }

  #[test]
  fn counts_are_checked_before_credentials() {
    let mut counts = QuestionCounts::zero();
    counts.translation = 9;
    let err = check_request(Provider::Primary, "", None, "so that", &counts).unwrap_err();
    assert_eq!(err.kind(), "validation");
  }

  #[test]
  fn blank_credential_is_configuration() {
    let err = check_request(Provider::Primary, "   ", None, "so that", &QuestionCounts::default()).unwrap_err();
    assert_eq!(err, DrillError::Configuration("Please provide an API key for Google Gemini.".into()));
  }

  #[test]
  fn dynamic_requires_model_primary_does_not() {
    let counts = QuestionCounts::default();
    let err = check_request(Provider::Dynamic, "k", Some(" "), "so that", &counts).unwrap_err();
    assert_eq!(err.kind(), "configuration");
    assert_eq!(check_request(Provider::Primary, "k", None, "so that", &counts).unwrap(), None);
    assert_eq!(check_request(Provider::Dynamic, "k", Some(" m1 "), "so that", &counts).unwrap(), Some("m1"));
  }

  #[test]
  fn parse_failure_is_upstream() {
    let err = parse_exercises("Sure! Here are your exercises:").unwrap_err();
    assert_eq!(err.kind(), "upstream");
    assert!(err.to_string().contains("JSON parse error"));
  }

  #[tokio::test]
  async fn cancelled_token_wins_over_pending_call() {
    let token = CancellationToken::new();
    token.cancel();
    let r: Result<(), DrillError> = cancellable(&token, std::future::pending()).await;
    assert_eq!(r, Err(DrillError::Cancelled));
  }

  #[tokio::test]
  async fn live_token_passes_result_through() {
    let token = CancellationToken::new();
    let r = cancellable(&token, async { Ok::<_, DrillError>(7) }).await;
    assert_eq!(r, Ok(7));
  }
}
