//! WebSocket upgrade + session loop. Each client message is parsed as JSON and
//! applied to the connection's `Session`; network work runs in spawned tasks
//! whose results come back over a channel, so the loop never blocks on a call.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, error, instrument, debug};

use crate::domain::Provider;
use crate::logic::{spawn_catalog, spawn_generation};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::{Session, SessionEvent};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "phrasedrill", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "phrasedrill", "WebSocket connected");
  let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
  let mut session = Session::default();

  loop {
    let reply = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match parse_client_ws(&txt) {
          Ok(msg) => {
            debug!(target: "phrasedrill", "WS received: {:?}", &msg);
            handle_client_ws(msg, &mut session, &state, &tx)
          }
          Err(reply) => Some(reply),
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          None
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Err(e)) => {
          error!(target: "phrasedrill", error = %e, "WS receive error");
          break;
        }
        Some(Ok(_)) => None,
      },
      Some(event) = rx.recv() => session.apply(event),
    };

    let Some(reply_msg) = reply else { continue };
    let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "kind": "upstream", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "phrasedrill", error = %e, "WS send error");
      break;
    }
  }

  session.shutdown();
  info!(target: "phrasedrill", "WebSocket disconnected");
}

fn parse_client_ws(txt: &str) -> Result<ClientWsMessage, ServerWsMessage> {
  serde_json::from_str::<ClientWsMessage>(txt).map_err(|e| ServerWsMessage::Error {
    kind: "validation",
    message: format!("Invalid JSON: {}", e),
    request_id: None,
  })
}

/// Current catalog and selection, as sent after any change to either.
fn models_reply(session: &Session) -> ServerWsMessage {
  ServerWsMessage::Models {
    models: session.models().to_vec(),
    selected: session.selected_model().map(str::to_string),
  }
}

/// Apply one client message; returns the immediate reply, if any.
fn handle_client_ws(
  msg: ClientWsMessage,
  session: &mut Session,
  state: &Arc<AppState>,
  tx: &UnboundedSender<SessionEvent>,
) -> Option<ServerWsMessage> {
  match msg {
    ClientWsMessage::Ping => Some(ServerWsMessage::Pong),

    ClientWsMessage::SetProvider { provider } => match session.set_provider(provider) {
      Some(job) => {
        spawn_catalog(state.clone(), tx.clone(), job);
        Some(ServerWsMessage::ModelsLoading)
      }
      // catalog cleared or unchanged: report what the form should show
      None => Some(models_reply(session)),
    },

    ClientWsMessage::SetCredential { provider, api_key } => {
      match session.set_credential(provider, api_key) {
        Some(job) => {
          spawn_catalog(state.clone(), tx.clone(), job);
          Some(ServerWsMessage::ModelsLoading)
        }
        // catalog was cleared (or never applied): tell the form
        None if provider == Provider::Dynamic => Some(models_reply(session)),
        None => None,
      }
    }

    ClientWsMessage::SelectModel { model } => match session.select_model(&model) {
      Ok(()) => Some(models_reply(session)),
      Err(e) => Some(ServerWsMessage::error(&e, None)),
    },

    ClientWsMessage::Generate { topic, counts } => {
      let job = session.start_generation(topic, counts);
      let request_id = job.request_id.clone();
      info!(target: "exercise", %request_id, provider = %job.provider, "WS generate started");
      spawn_generation(state.clone(), tx.clone(), job);
      Some(ServerWsMessage::Generating { request_id })
    }

    // the task reports `cancelled` when it unwinds
    ClientWsMessage::CancelGenerate => {
      session.cancel_generation();
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  use serde_json::json;
  use tokio::sync::mpsc::UnboundedReceiver;

  use crate::config::{AppConfig, ProviderConfig};
  use crate::domain::{ApiKey, QuestionCounts};

  fn state_for(server: &mockito::Server) -> Arc<AppState> {
    let config = AppConfig {
      providers: ProviderConfig {
        gemini_base_url: server.url(),
        siliconflow_base_url: server.url(),
        request_timeout_secs: 5,
        ..ProviderConfig::default()
      },
      ..AppConfig::default()
    };
    Arc::new(AppState::with_config(config).unwrap())
  }

  async fn next_event(rx: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap()
  }

  fn empty_exercises_body() -> String {
    let text = json!({
      "sentenceRewrite": [], "mcGrammar": [], "mcContext": [], "translation": [], "logicalAnalysis": []
    })
    .to_string();
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }).to_string()
  }

  #[test]
  fn invalid_json_is_a_validation_error() {
    match parse_client_ws("{not json") {
      Err(ServerWsMessage::Error { kind, message, request_id }) => {
        assert_eq!(kind, "validation");
        assert!(message.starts_with("Invalid JSON"));
        assert_eq!(request_id, None);
      }
      other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(parse_client_ws(r#"{"type":"ping"}"#), Ok(ClientWsMessage::Ping)));
  }

  #[tokio::test]
  async fn catalog_flow_over_the_event_channel() {
    let mut server = mockito::Server::new_async().await;
    let m = server.mock("GET", "/models")
      .match_header("authorization", "Bearer sk-1")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"data":[{"id":"m1"},{"id":"m2"}]}"#)
      .expect(1)
      .create_async().await;
    let state = state_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::default();

    // no key yet: an empty catalog, no fetch
    let reply = handle_client_ws(ClientWsMessage::SetProvider { provider: Provider::Dynamic }, &mut session, &state, &tx);
    assert!(matches!(reply, Some(ServerWsMessage::Models { ref models, selected: None }) if models.is_empty()));

    let reply = handle_client_ws(
      ClientWsMessage::SetCredential { provider: Provider::Dynamic, api_key: ApiKey::new("sk-1") },
      &mut session, &state, &tx,
    );
    assert!(matches!(reply, Some(ServerWsMessage::ModelsLoading)));

    let reply = session.apply(next_event(&mut rx).await);
    match reply {
      Some(ServerWsMessage::Models { models, selected }) => {
        assert_eq!(models.len(), 2);
        assert_eq!(selected.as_deref(), Some("m1"));
      }
      other => panic!("unexpected: {other:?}"),
    }
    m.assert_async().await;

    // leaving SiliconFlow clears the catalog and says so
    let reply = handle_client_ws(ClientWsMessage::SetProvider { provider: Provider::Primary }, &mut session, &state, &tx);
    assert!(matches!(reply, Some(ServerWsMessage::Models { ref models, selected: None }) if models.is_empty()));
  }

  #[tokio::test]
  async fn blank_dynamic_credential_replies_with_empty_models() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut session = Session::default();
    handle_client_ws(ClientWsMessage::SetProvider { provider: Provider::Dynamic }, &mut session, &state, &tx);

    let reply = handle_client_ws(
      ClientWsMessage::SetCredential { provider: Provider::Dynamic, api_key: ApiKey::new("  ") },
      &mut session, &state, &tx,
    );
    assert!(matches!(reply, Some(ServerWsMessage::Models { ref models, selected: None }) if models.is_empty()));
  }

  #[tokio::test]
  async fn generate_replies_generating_then_exercises() {
    let mut server = mockito::Server::new_async().await;
    let m = server.mock("POST", "/models/gemini-2.5-flash:generateContent")
      .match_header("x-goog-api-key", "g-1")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(empty_exercises_body())
      .expect(1)
      .create_async().await;
    let state = state_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::default();

    let reply = handle_client_ws(
      ClientWsMessage::SetCredential { provider: Provider::Primary, api_key: ApiKey::new("g-1") },
      &mut session, &state, &tx,
    );
    assert!(reply.is_none());

    let reply = handle_client_ws(
      ClientWsMessage::Generate { topic: "so that".into(), counts: QuestionCounts::zero() },
      &mut session, &state, &tx,
    );
    let request_id = match reply {
      Some(ServerWsMessage::Generating { request_id }) => request_id,
      other => panic!("unexpected: {other:?}"),
    };

    match session.apply(next_event(&mut rx).await) {
      Some(ServerWsMessage::Exercises { request_id: id, exercises }) => {
        assert_eq!(id, request_id);
        assert_eq!(exercises.total(), 0);
      }
      other => panic!("unexpected: {other:?}"),
    }
    m.assert_async().await;
  }

  #[tokio::test]
  async fn cancel_generate_reports_cancelled_with_request_id() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::default();
    handle_client_ws(
      ClientWsMessage::SetCredential { provider: Provider::Primary, api_key: ApiKey::new("g-1") },
      &mut session, &state, &tx,
    );

    let reply = handle_client_ws(
      ClientWsMessage::Generate { topic: "so that".into(), counts: QuestionCounts::default() },
      &mut session, &state, &tx,
    );
    let request_id = match reply {
      Some(ServerWsMessage::Generating { request_id }) => request_id,
      other => panic!("unexpected: {other:?}"),
    };
    assert!(handle_client_ws(ClientWsMessage::CancelGenerate, &mut session, &state, &tx).is_none());

    match session.apply(next_event(&mut rx).await) {
      Some(ServerWsMessage::Cancelled { request_id: id }) => assert_eq!(id, request_id),
      other => panic!("unexpected: {other:?}"),
    }
  }
}
