//! Per-connection selection state for the WebSocket form.
//!
//! A session holds the provider, one credential per provider, the fetched
//! SiliconFlow catalog and the selected model. Network work happens outside
//! (see `routes::ws`); the session hands out jobs tagged with an epoch or a
//! request id and only applies results that are still current.

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{ApiKey, GeneratedExercises, ModelDescriptor, Provider, QuestionCounts};
use crate::error::DrillError;
use crate::protocol::ServerWsMessage;

/// Catalog fetch to run for the current SiliconFlow credential.
#[derive(Debug)]
pub struct CatalogJob {
  pub epoch: u64,
  pub api_key: ApiKey,
  pub token: CancellationToken,
}

/// Generation to run with the session's selection at the time of the request.
#[derive(Debug)]
pub struct GenerationJob {
  pub request_id: String,
  pub provider: Provider,
  pub api_key: ApiKey,
  pub model: Option<String>,
  pub topic: String,
  pub counts: QuestionCounts,
  pub token: CancellationToken,
}

/// Results flowing back into the session loop.
#[derive(Debug)]
pub enum SessionEvent {
  Catalog { epoch: u64, result: Result<Vec<ModelDescriptor>, DrillError> },
  Generated { request_id: String, result: Result<GeneratedExercises, DrillError> },
}

#[derive(Debug)]
pub struct Session {
  provider: Provider,
  gemini_key: ApiKey,
  siliconflow_key: ApiKey,
  models: Vec<ModelDescriptor>,
  selected_model: Option<String>,
  catalog_epoch: u64,
  catalog_token: Option<CancellationToken>,
  generation: Option<(String, CancellationToken)>,
}

impl Default for Session {
  fn default() -> Self {
    Self {
      provider: Provider::Primary,
      gemini_key: ApiKey::default(),
      siliconflow_key: ApiKey::default(),
      models: vec![],
      selected_model: None,
      catalog_epoch: 0,
      catalog_token: None,
      generation: None,
    }
  }
}

impl Session {
  pub fn provider(&self) -> Provider { self.provider }
  pub fn models(&self) -> &[ModelDescriptor] { &self.models }
  pub fn selected_model(&self) -> Option<&str> { self.selected_model.as_deref() }

  /// Switch provider. Entering SiliconFlow with a key refreshes the catalog;
  /// leaving it clears the catalog.
  pub fn set_provider(&mut self, provider: Provider) -> Option<CatalogJob> {
    if provider == self.provider {
      return None;
    }
    self.cancel_generation();
    self.provider = provider;
    self.refresh_catalog()
  }

  /// Replace a credential. A SiliconFlow key change always restarts the catalog.
  pub fn set_credential(&mut self, provider: Provider, api_key: ApiKey) -> Option<CatalogJob> {
    if provider == self.provider {
      self.cancel_generation();
    }
    match provider {
      Provider::Primary => {
        self.gemini_key = api_key;
        None
      }
      Provider::Dynamic => {
        self.siliconflow_key = api_key;
        self.refresh_catalog()
      }
    }
  }

  /// Pick one model out of the fetched catalog.
  pub fn select_model(&mut self, model: &str) -> Result<(), DrillError> {
    if !self.models.iter().any(|m| m.id == model) {
      return Err(DrillError::Configuration(format!("Unknown SiliconFlow model: {model}")));
    }
    self.cancel_generation();
    self.selected_model = Some(model.to_string());
    Ok(())
  }

  /// Start a generation with the current selection, superseding any in flight.
  /// Input is validated by the generator, not here.
  pub fn start_generation(&mut self, topic: String, counts: QuestionCounts) -> GenerationJob {
    self.cancel_generation();
    let request_id = Uuid::new_v4().to_string();
    let token = CancellationToken::new();
    self.generation = Some((request_id.clone(), token.clone()));
    let (api_key, model) = match self.provider {
      Provider::Primary => (self.gemini_key.clone(), None),
      Provider::Dynamic => (self.siliconflow_key.clone(), self.selected_model.clone()),
    };
    GenerationJob { request_id, provider: self.provider, api_key, model, topic, counts, token }
  }

  /// Cancel the in-flight generation, if any. Returns its request id.
  pub fn cancel_generation(&mut self) -> Option<String> {
    let (id, token) = self.generation.take()?;
    token.cancel();
    debug!(target: "phrasedrill", request_id = %id, "Generation cancelled");
    Some(id)
  }

  /// Cancel everything outstanding (connection closing).
  pub fn shutdown(&mut self) {
    self.cancel_generation();
    if let Some(t) = self.catalog_token.take() {
      t.cancel();
    }
  }

  /// Apply a finished job. Stale results are dropped.
  pub fn apply(&mut self, event: SessionEvent) -> Option<ServerWsMessage> {
    match event {
      SessionEvent::Catalog { epoch, result } => {
        if epoch != self.catalog_epoch {
          debug!(target: "phrasedrill", epoch, current = self.catalog_epoch, "Dropping stale model catalog");
          return None;
        }
        self.catalog_token = None;
        match result {
          Ok(models) => {
            self.selected_model = models.first().map(|m| m.id.clone());
            self.models = models;
            Some(ServerWsMessage::Models { models: self.models.clone(), selected: self.selected_model.clone() })
          }
          Err(DrillError::Cancelled) => None,
          Err(e) => Some(ServerWsMessage::error(&e, None)),
        }
      }
      SessionEvent::Generated { request_id, result } => {
        let current = matches!(&self.generation, Some((id, _)) if *id == request_id);
        if !current {
          return Some(ServerWsMessage::Cancelled { request_id });
        }
        self.generation = None;
        match result {
          Ok(exercises) => Some(ServerWsMessage::Exercises { request_id, exercises }),
          Err(DrillError::Cancelled) => Some(ServerWsMessage::Cancelled { request_id }),
          Err(e) => Some(ServerWsMessage::error(&e, Some(request_id))),
        }
      }
    }
  }

  /// Invalidate the current catalog and, if SiliconFlow is active with a key,
  /// hand out a fetch for the new epoch.
  fn refresh_catalog(&mut self) -> Option<CatalogJob> {
    if let Some(t) = self.catalog_token.take() {
      t.cancel();
    }
    self.catalog_epoch += 1;
    self.models.clear();
    self.selected_model = None;

    if self.provider != Provider::Dynamic || self.siliconflow_key.is_blank() {
      return None;
    }
    let token = CancellationToken::new();
    self.catalog_token = Some(token.clone());
    Some(CatalogJob { epoch: self.catalog_epoch, api_key: self.siliconflow_key.clone(), token })
  }
}
