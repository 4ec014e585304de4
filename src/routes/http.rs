//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; logs never include credentials.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::GeneratedExercises;
use crate::error::DrillError;
use crate::logic::{do_generate, do_list_models};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info")]
pub async fn http_get_categories() -> impl IntoResponse { Json(categories_out()) }

#[instrument(level = "info", skip(state, body), fields(provider = %body.provider, topic_len = body.topic.len()))]
pub async fn http_post_exercises(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<GeneratedExercises>, DrillError> {
  let request_id = Uuid::new_v4().to_string();
  let ex = do_generate(
    &state,
    &request_id,
    body.provider,
    &body.api_key,
    body.model.as_deref(),
    &body.topic,
    body.counts,
  ).await?;
  Ok(Json(ex))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_models(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ModelsIn>,
) -> Result<Json<ModelsOut>, DrillError> {
  let models = do_list_models(&state, &body.api_key).await?;
  info!(target: "phrasedrill", count = models.len(), "HTTP model catalog served");
  Ok(Json(ModelsOut { models }))
}
