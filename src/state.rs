//! Application state: loaded configuration and the exercise generator.
//!
//! Nothing here is per-user: credentials and selections live in requests or
//! in a WebSocket `Session`, never in shared state.

use tracing::{info, instrument};

use crate::config::{load_app_config_from_env, AppConfig};
use crate::error::DrillError;
use crate::orchestrator::ExerciseGenerator;

#[derive(Clone)]
pub struct AppState {
    pub generator: ExerciseGenerator,
    pub config: AppConfig,
}

impl AppState {
    /// Build state from env: load TOML config (or defaults), build the HTTP clients.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, DrillError> {
        let config = load_app_config_from_env().unwrap_or_default();
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Result<Self, DrillError> {
        let generator = ExerciseGenerator::from_config(&config)?;
        info!(
            target: "phrasedrill",
            gemini_base_url = %config.providers.gemini_base_url,
            gemini_model = %config.providers.gemini_model,
            siliconflow_base_url = %config.providers.siliconflow_base_url,
            request_timeout_secs = config.providers.request_timeout_secs,
            "Exercise generator ready"
        );
        Ok(Self { generator, config })
    }
}
