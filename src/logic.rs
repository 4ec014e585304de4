//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Running a generation with a request id attached to its logs
//!   - Fetching the SiliconFlow model catalog
//!   - Executing session jobs (catalog/generation) as cancellable tasks

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

use crate::domain::{ApiKey, GeneratedExercises, ModelDescriptor, Provider, QuestionCounts};
use crate::error::DrillError;
use crate::orchestrator::cancellable;
use crate::session::{CatalogJob, GenerationJob, SessionEvent};
use crate::state::AppState;

#[instrument(level = "info", skip_all, fields(%request_id, %provider))]
pub async fn do_generate(
  state: &AppState,
  request_id: &str,
  provider: Provider,
  api_key: &ApiKey,
  model: Option<&str>,
  topic: &str,
  counts: QuestionCounts,
) -> Result<GeneratedExercises, DrillError> {
  let result = state.generator.generate(provider, api_key.expose(), model, topic, counts).await;
  match &result {
    Ok(ex) => info!(target: "exercise", %request_id, total = ex.total(), "Exercise set served"),
    Err(e) => warn!(target: "exercise", %request_id, kind = e.kind(), "Exercise request failed"),
  }
  result
}

#[instrument(level = "info", skip_all)]
pub async fn do_list_models(state: &AppState, api_key: &ApiKey) -> Result<Vec<ModelDescriptor>, DrillError> {
  state.generator.list_models(api_key.expose()).await
}

/// Run a catalog fetch in the background; the result goes back to the session loop.
pub fn spawn_catalog(state: Arc<AppState>, tx: UnboundedSender<SessionEvent>, job: CatalogJob) {
  tokio::spawn(async move {
    let result = cancellable(&job.token, do_list_models(&state, &job.api_key)).await;
    // receiver gone means the socket closed
    let _ = tx.send(SessionEvent::Catalog { epoch: job.epoch, result });
  });
}

/// Run a generation in the background; the result goes back to the session loop.
pub fn spawn_generation(state: Arc<AppState>, tx: UnboundedSender<SessionEvent>, job: GenerationJob) {
  tokio::spawn(async move {
    let fut = do_generate(
      &state,
      &job.request_id,
      job.provider,
      &job.api_key,
      job.model.as_deref(),
      &job.topic,
      job.counts,
    );
    let result = cancellable(&job.token, fut).await;
    let _ = tx.send(SessionEvent::Generated { request_id: job.request_id.clone(), result });
  });
}
