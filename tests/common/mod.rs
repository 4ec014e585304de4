#![allow(dead_code)]

use std::sync::Arc;

use phrasedrill_backend::config::{AppConfig, ProviderConfig};
use phrasedrill_backend::orchestrator::ExerciseGenerator;
use phrasedrill_backend::state::AppState;
use serde_json::{json, Value};

pub const GEMINI_PATH: &str = "/models/gemini-2.5-flash:generateContent";

/// Config with both providers pointed at one mock server.
pub fn config_for(server: &mockito::Server) -> AppConfig {
    AppConfig {
        providers: ProviderConfig {
            gemini_base_url: server.url(),
            siliconflow_base_url: server.url(),
            request_timeout_secs: 5,
            ..ProviderConfig::default()
        },
        ..AppConfig::default()
    }
}

pub fn generator_for(server: &mockito::Server) -> ExerciseGenerator {
    ExerciseGenerator::from_config(&config_for(server)).expect("generator")
}

pub fn state_for(server: &mockito::Server) -> Arc<AppState> {
    Arc::new(AppState::with_config(config_for(server)).expect("state"))
}

/// A conforming payload with one item in `mcGrammar` and `translation`.
pub fn sample_exercises() -> Value {
    json!({
        "sentenceRewrite": [],
        "mcGrammar": [{
            "question": "Which sentences use 'to the degree that' correctly?",
            "options": [
                "A) He worked hard to the degree that he fell ill.",
                "B) To the degree that of rain, we stayed.",
                "C) Costs rose to the degree that projects stalled.",
                "D) She is tall to the degree.",
                "E) It mattered to the degree that nobody spoke.",
                "F) To degree that he left.",
                "G) The noise grew to the degree that sleep was impossible."
            ],
            "answer": ["A", "C", "E", "G"],
            "explanation": "B, D and F break the clause structure."
        }],
        "mcContext": [],
        "translation": [{
            "question": "他紧张到说不出话来。",
            "context": "程度",
            "answer": "He was nervous to the degree that he could not speak.",
            "explanation": "Degree leading to a consequence."
        }],
        "logicalAnalysis": []
    })
}

pub fn empty_exercises() -> Value {
    json!({
        "sentenceRewrite": [],
        "mcGrammar": [],
        "mcContext": [],
        "translation": [],
        "logicalAnalysis": []
    })
}

pub fn gemini_body(text: &str) -> String {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] }, "finishReason": "STOP" }] })
        .to_string()
}

pub fn chat_body(content: &str) -> String {
    json!({ "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }] }).to_string()
}
