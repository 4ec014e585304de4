//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ApiKey, ExerciseCategory, GeneratedExercises, ModelDescriptor, Provider, QuestionCounts};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SetProvider {
        provider: Provider,
    },
    SetCredential {
        provider: Provider,
        #[serde(rename = "apiKey")]
        api_key: ApiKey,
    },
    SelectModel {
        model: String,
    },
    Generate {
        #[serde(alias = "grammarPoint")]
        topic: String,
        #[serde(default)]
        counts: QuestionCounts,
    },
    CancelGenerate,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    ModelsLoading,
    Models {
        models: Vec<ModelDescriptor>,
        selected: Option<String>,
    },
    Generating {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    Exercises {
        #[serde(rename = "requestId")]
        request_id: String,
        exercises: GeneratedExercises,
    },
    Cancelled {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    Error {
        kind: &'static str,
        message: String,
        #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerWsMessage {
    pub fn error(err: &crate::error::DrillError, request_id: Option<String>) -> Self {
        ServerWsMessage::Error { kind: err.kind(), message: err.to_string(), request_id }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub provider: Provider,
    #[serde(rename = "apiKey", default)]
    pub api_key: ApiKey,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(alias = "grammarPoint")]
    pub topic: String,
    #[serde(default)]
    pub counts: QuestionCounts,
}

#[derive(Debug, Deserialize)]
pub struct ModelsIn {
    #[serde(rename = "apiKey", default)]
    pub api_key: ApiKey,
}
#[derive(Debug, Serialize)]
pub struct ModelsOut {
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOut {
    pub key: &'static str,
    pub label: &'static str,
    pub multiple_choice: bool,
    pub default_count: u8,
    pub max_count: u8,
}

/// Category table for the form, in display order.
pub fn categories_out() -> Vec<CategoryOut> {
    let defaults = QuestionCounts::default();
    ExerciseCategory::ALL
        .iter()
        .map(|c| CategoryOut {
            key: c.key(),
            label: c.label(),
            multiple_choice: c.is_multiple_choice(),
            default_count: defaults.get(*c),
            max_count: crate::domain::MAX_COUNT_PER_CATEGORY,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
