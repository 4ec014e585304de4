//! PhraseDrill backend library: exercise generation over Gemini / SiliconFlow
//! plus the axum surface that exposes it.

pub mod config;
pub mod domain;
pub mod error;
pub mod gemini;
pub mod logic;
pub mod orchestrator;
pub mod protocol;
pub mod routes;
pub mod schema;
pub mod session;
pub mod siliconflow;
pub mod state;
pub mod telemetry;
pub mod util;
