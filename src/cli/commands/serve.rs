//! Chat web UI and JSON API.
//!
//! Sessions live in memory. Each message runs the agent on that message
//! alone; the reply and the full transcript are returned for rendering.

use crate::agent::{Agent, AgentStep, RunStatus};
use crate::chat::{SessionStore, Turn};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::ScoutError;
use crate::orchestrator::Orchestrator;
use crate::tools::ToolKind;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    agent: Agent,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            sessions: SessionStore::new(),
        }
    }

    /// Replace the session store.
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }
}

/// Run the chat web server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let operation = Operation::FullAgent;
    let credentials = match preflight::check(operation, &settings) {
        Ok(Some(credentials)) => credentials,
        Ok(None) => anyhow::bail!("missing credentials"),
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'scout doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let sessions =
        SessionStore::with_idle_timeout(Duration::from_secs(settings.server.session_idle_secs));

    let orchestrator = Orchestrator::new(settings, &credentials, operation.tool_set())?;
    let state = Arc::new(AppState::new(orchestrator.agent()?).with_sessions(sessions));

    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Scout Chat Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Chat UI", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Tools", "GET  /api/tools");
    Output::kv("New session", "POST /api/sessions");
    Output::kv("Transcript", "GET  /api/sessions/{id}");
    Output::kv("Send message", "POST /api/sessions/{id}/messages");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/messages", post(send_message))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct ToolInfo {
    name: &'static str,
    label: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct ToolsResponse {
    model: String,
    tools: Vec<ToolInfo>,
}

#[derive(Serialize, Deserialize)]
struct SessionCreated {
    session_id: Uuid,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    turns: Vec<Turn>,
}

#[derive(Deserialize)]
struct MessageRequest {
    content: String,
}

#[derive(Serialize)]
struct MessageResponse {
    answer: String,
    status: RunStatus,
    steps: Vec<AgentStep>,
    turns: Vec<Turn>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn session_error(e: ScoutError) -> Response {
    match e {
        ScoutError::SessionNotFound(_) => error_response(StatusCode::NOT_FOUND, e),
        ScoutError::SessionBusy(_) => error_response(StatusCode::CONFLICT, e),
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other),
    }
}

fn parse_session_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| session_error(ScoutError::SessionNotFound(raw.to_string())))
}

/// Releases the session if the request ends before an answer is recorded.
struct TurnGuard<'a> {
    sessions: &'a SessionStore,
    id: Uuid,
    armed: bool,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.sessions.abandon_turn(self.id);
        }
    }
}

// === Handlers ===

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(&state.agent))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ToolsResponse {
        model: state.agent.model_name().to_string(),
        tools: state
            .agent
            .tools()
            .enabled()
            .iter()
            .map(|kind| ToolInfo {
                name: kind.name(),
                label: kind.label(),
                description: kind.description(),
            })
            .collect(),
    })
}

async fn create_session(State(state): State<Arc<AppState>>) -> Response {
    match state.sessions.create() {
        Ok(session_id) => (StatusCode::CREATED, Json(SessionCreated { session_id })).into_response(),
        Err(e) => session_error(e),
    }
}

async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.sessions.transcript(id) {
        Ok(transcript) => Json(SessionResponse {
            session_id: id,
            turns: transcript.turns().to_vec(),
        })
        .into_response(),
        Err(e) => session_error(e),
    }
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let content = req.content.trim();
    if content.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Message content must not be empty");
    }

    if let Err(e) = state.sessions.begin_turn(id, content) {
        return session_error(e);
    }
    let mut guard = TurnGuard {
        sessions: &state.sessions,
        id,
        armed: true,
    };

    info!(session = %id, "Answering message");

    match state.agent.run(content).await {
        Ok(response) => {
            guard.armed = false;
            match state.sessions.complete_turn(id, &response.output) {
                Ok(transcript) => Json(MessageResponse {
                    answer: response.output,
                    status: response.status,
                    steps: response.steps,
                    turns: transcript.turns().to_vec(),
                })
                .into_response(),
                Err(e) => session_error(e),
            }
        }
        Err(e) => {
            error!(session = %id, "Agent failed: {}", e);
            guard.armed = false;
            if let Err(record_err) = state
                .sessions
                .complete_turn(id, &format!("Sorry, something went wrong: {}", e))
            {
                warn!(session = %id, "Failed to record apology turn: {}", record_err);
            }
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

// === Page ===

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_page(agent: &Agent) -> String {
    let tools: String = agent
        .tools()
        .enabled()
        .iter()
        .map(|kind: &ToolKind| {
            format!(
                "<li title=\"{}\"><strong>{}</strong> <code>{}</code></li>",
                escape_html(kind.description()),
                kind.label(),
                kind.name()
            )
        })
        .collect();

    PAGE_TEMPLATE
        .replace("{{tools}}", &tools)
        .replace("{{model}}", &escape_html(agent.model_name()))
}

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AI Research Agent</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
  body { margin: 0; font-family: system-ui, sans-serif; display: flex; height: 100vh; }
  aside { width: 240px; background: #f4f4f6; padding: 1rem; box-sizing: border-box; }
  aside ul { padding-left: 1rem; }
  aside .footer { color: #666; font-size: 0.85rem; border-top: 1px solid #ddd; padding-top: 0.5rem; }
  main { flex: 1; display: flex; flex-direction: column; padding: 1rem 2rem; box-sizing: border-box; }
  #transcript { flex: 1; overflow-y: auto; }
  .turn { margin: 0.5rem 0; padding: 0.6rem 0.8rem; border-radius: 8px; white-space: pre-wrap; }
  .user { background: #e8f0fe; }
  .assistant { background: #f1f3f4; }
  form { display: flex; gap: 0.5rem; }
  input { flex: 1; padding: 0.6rem; font-size: 1rem; }
  #status { color: #666; min-height: 1.2rem; }
</style>
</head>
<body>
<aside>
  <h3>Available Tools</h3>
  <ul>{{tools}}</ul>
  <p class="footer">Powered by {{model}}</p>
</aside>
<main>
  <h1>Personal Research Agent</h1>
  <p>Searches the web, does math, and queries company documents.</p>
  <div id="transcript"></div>
  <div id="status"></div>
  <form id="chat">
    <input id="message" autocomplete="off" placeholder="Ask me anything...">
    <button id="send" type="submit">Send</button>
  </form>
</main>
<script>
let sessionId = null;
const transcript = document.getElementById('transcript');
const status = document.getElementById('status');

function render(turns) {
  transcript.replaceChildren(...turns.map(t => {
    const div = document.createElement('div');
    div.className = 'turn ' + t.role;
    div.textContent = t.content;
    return div;
  }));
  transcript.scrollTop = transcript.scrollHeight;
}

async function ensureSession() {
  if (sessionId) return sessionId;
  const res = await fetch('/api/sessions', { method: 'POST' });
  sessionId = (await res.json()).session_id;
  return sessionId;
}

const input = document.getElementById('message');
const send = document.getElementById('send');

function setBusy(busy) {
  input.disabled = busy;
  send.disabled = busy;
  if (busy) status.textContent = 'Agent is thinking...';
}

document.getElementById('chat').addEventListener('submit', async (event) => {
  event.preventDefault();
  const content = input.value.trim();
  if (!content || input.disabled) return;
  input.value = '';
  setBusy(true);
  try {
    const id = await ensureSession();
    const res = await fetch(`/api/sessions/${id}/messages`, {
      method: 'POST',
      headers: { 'content-type': 'application/json' },
      body: JSON.stringify({ content }),
    });
    const body = await res.json();
    status.textContent = res.ok ? '' : body.error;
    if (res.status === 404) {
      // Session expired; start a new one on the next message.
      sessionId = null;
      return;
    }
    const session = await fetch(`/api/sessions/${id}`).then(r => r.json());
    render(session.turns);
  } catch (err) {
    status.textContent = String(err);
  } finally {
    setBusy(false);
    input.focus();
  }
});
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedModel;
    use crate::tools::Toolbox;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state_with(replies: &[&str]) -> Arc<AppState> {
        let model = Arc::new(ScriptedModel::new(replies.iter().copied()));
        Arc::new(AppState::new(Agent::new(model, Toolbox::offline()).unwrap()))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/sessions")
                    .method("POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_index_page_lists_tools_and_model() {
        let app = router(state_with(&["Final Answer: hi"]));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<code>calculator</code>"));
        assert!(html.contains("Powered by scripted"));
        assert!(!html.contains("{{tools}}"));
        // The input is locked while a turn is in flight.
        assert!(html.contains("input.disabled = busy"));
    }

    #[tokio::test]
    async fn test_tools_endpoint() {
        let app = router(state_with(&["Final Answer: hi"]));

        let response = app
            .oneshot(Request::builder().uri("/api/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;

        assert_eq!(body["model"], "scripted");
        assert_eq!(body["tools"].as_array().unwrap().len(), 2);
        assert_eq!(body["tools"][0]["name"], "calculator");
    }

    #[tokio::test]
    async fn test_message_round_trip_updates_transcript() {
        let app = router(state_with(&[
            "Action: calculator\nAction Input: 2547 * 13",
            "Final Answer: 33111",
        ]));
        let id = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", id),
                serde_json::json!({ "content": "What is 2547 multiplied by 13?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["answer"], "33111");
        assert_eq!(body["status"], "done");
        assert_eq!(body["steps"][0]["action"]["kind"], "tool");
        assert_eq!(body["steps"][0]["observation"], "33111");
        assert_eq!(body["turns"].as_array().unwrap().len(), 2);
        assert_eq!(body["turns"][0]["role"], "user");
        assert_eq!(body["turns"][1]["role"], "assistant");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/sessions/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["turns"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let app = router(state_with(&["Final Answer: hi"]));
        let id = new_session(&app).await;

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", id),
                serde_json::json!({ "content": "   " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = router(state_with(&["Final Answer: hi"]));

        for uri in [
            format!("/api/sessions/{}", Uuid::new_v4()),
            "/api/sessions/not-a-uuid".to_string(),
        ] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", Uuid::new_v4()),
                serde_json::json!({ "content": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_busy_session_conflicts() {
        let state = state_with(&["Final Answer: hi"]);
        let app = router(state.clone());
        let id = new_session(&app).await;

        // Simulate a turn in flight.
        state
            .sessions
            .begin_turn(Uuid::parse_str(&id).unwrap(), "first")
            .unwrap();

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", id),
                serde_json::json!({ "content": "second" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_iteration_limit_is_an_answer_not_an_error() {
        let app = router(state_with(&["I refuse to follow the format."]));
        let id = new_session(&app).await;

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", id),
                serde_json::json!({ "content": "What is today's date?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["answer"], crate::agent::ITERATION_LIMIT_ANSWER);
    }

    struct UnreachableModel;

    #[async_trait::async_trait]
    impl crate::llm::LanguageModel for UnreachableModel {
        async fn complete(&self, _prompt: &str, _stop: &[String]) -> crate::error::Result<String> {
            Err(ScoutError::Provider("connection refused".to_string()))
        }

        fn model_name(&self) -> &str {
            "unreachable"
        }
    }

    #[tokio::test]
    async fn test_model_failure_is_bad_gateway_and_releases_session() {
        let agent = Agent::new(Arc::new(UnreachableModel), Toolbox::offline()).unwrap();
        let state = Arc::new(AppState::new(agent));
        let app = router(state.clone());
        let id = new_session(&app).await;
        let uri = format!("/api/sessions/{}/messages", id);

        let response = app
            .clone()
            .oneshot(post_json(&uri, serde_json::json!({ "content": "hello" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("connection refused"));

        let transcript = state.sessions.transcript(Uuid::parse_str(&id).unwrap()).unwrap();
        assert_eq!(transcript.len(), 2);
        assert!(transcript.turns()[1].content.starts_with("Sorry, something went wrong"));

        // Not left busy: the next message is accepted and fails the same way.
        let response = app
            .oneshot(post_json(&uri, serde_json::json!({ "content": "again" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(state_with(&["Final Answer: hi"]));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["status"], "ok");
    }
}
