//! HTTP gateway for animus.
//!
//! One tiny surface, served on every path:
//! - `OPTIONS` → 204 with CORS headers (browser preflight)
//! - `GET` → health payload
//! - `POST` → chat/choice request
//!
//! Built on Axum. The HTTP layer does parsing, CORS, client identity, and
//! the admin bypass check; everything stateful happens in the
//! [`orchestrator`].

pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
mod test_support;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use animus_config::AppConfig;
use animus_core::kv::KvStore;
use animus_core::message::SessionId;
use animus_retrieval::Retriever;
use animus_store::{InMemoryKv, RateLimiter, SessionStore};

use orchestrator::{ChatReply, ChatTask, Orchestrator, RequestError};
use prompt::{ChoiceReply, Mode};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Orchestrator,

    /// Exact-match secret for the `X-Admin-Key` header; None disables the
    /// bypass entirely.
    pub admin_key: Option<String>,

    /// Echoed in the 429 message so callers know the contract.
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router: every path and method lands in one dispatcher,
/// with CORS and trace layers on top.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(middleware::from_fn(cors_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let backend = animus_providers::build_from_config(&config)?;

    let persona =
        animus_config::Persona::load_from(std::path::Path::new(&config.persona.profile_path))?;
    let corpus = animus_retrieval::load_corpus(std::path::Path::new(&config.persona.corpus_path))?;
    let corpus = Arc::new(corpus);

    // The rate limiter and the session store share one durable KV backend.
    // SQLite also gives the limiter an atomic window increment.
    let (kv, rate_limiter): (Arc<dyn KvStore>, RateLimiter) = match config.store.backend.as_str() {
        "sqlite" => {
            let sqlite = Arc::new(animus_store::SqliteKv::new(&config.store.path).await?);
            let limiter = RateLimiter::with_atomic(
                sqlite.clone(),
                config.rate_limit.window_secs,
                config.rate_limit.max_requests,
            );
            (sqlite, limiter)
        }
        _ => {
            let memory: Arc<dyn KvStore> = Arc::new(InMemoryKv::new());
            let limiter = RateLimiter::new(
                memory.clone(),
                config.rate_limit.window_secs,
                config.rate_limit.max_requests,
            );
            (memory, limiter)
        }
    };

    let state = Arc::new(GatewayState {
        orchestrator: Orchestrator {
            persona,
            backend: backend.clone(),
            retriever: Retriever::new(backend, corpus),
            rate_limiter,
            sessions: SessionStore::new(kv, config.session.ttl_secs, config.session.max_history),
            top_k: config.retrieval.top_k,
        },
        admin_key: config.gateway.admin_key.clone(),
        rate_limit_max: config.rate_limit.max_requests,
        rate_limit_window_secs: config.rate_limit.window_secs,
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- CORS ---

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Add CORS headers to every response; answer OPTIONS directly with 204.
async fn cors_middleware(req: axum::extract::Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors(response.headers_mut());
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors(response.headers_mut());
    response
}

// --- Dispatch ---

async fn dispatch(
    State(state): State<SharedState>,
    headers: HeaderMap,
    method: Method,
    body: Bytes,
) -> Response {
    match method {
        Method::GET => health(&state).into_response(),
        Method::POST => chat(state, headers, body).await,
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            "Use POST for queries, GET for health check",
        )
            .into_response(),
    }
}

// --- Health ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    persona_name: String,
    modes: [&'static str; 2],
    version: &'static str,
}

fn health(state: &GatewayState) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        persona_name: state.orchestrator.persona.name.clone(),
        modes: ["chat", "choice"],
        version: env!("CARGO_PKG_VERSION"),
    })
}

// --- Chat ---

/// The POST body as it arrives; validation happens after parse so the
/// caller gets "Missing mode or message" rather than a serde error.
#[derive(Deserialize)]
struct RawChatRequest {
    mode: Option<String>,
    message: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    r#type: &'static str,
    answer: String,
    session_id: String,
}

#[derive(Serialize)]
struct ChoiceResponse {
    r#type: &'static str,
    choice: String,
    reason: String,
    session_id: String,
}

#[derive(Serialize)]
struct ChoiceRawResponse {
    r#type: &'static str,
    raw: String,
    session_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    r#type: &'static str,
    error: String,
    message: String,
}

async fn chat(state: SharedState, headers: HeaderMap, body: Bytes) -> Response {
    // MalformedRequest is rejected before any state mutation
    let Ok(raw) = serde_json::from_slice::<RawChatRequest>(&body) else {
        return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
    };

    let mode = raw.mode.filter(|m| !m.is_empty());
    let message = raw.message.filter(|m| !m.is_empty());
    let (Some(mode), Some(message)) = (mode, message) else {
        return (StatusCode::BAD_REQUEST, "Missing mode or message").into_response();
    };

    let task = ChatTask {
        mode: if mode == "choice" { Mode::Choice } else { Mode::Chat },
        message,
        options: raw.options,
        // An empty session id is treated as absent, never as a shared key
        session_id: raw
            .session_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(SessionId::from),
    };

    // Admin bypass is decided here, before any state is read or written
    let is_admin = match (&state.admin_key, header_str(&headers, "X-Admin-Key")) {
        (Some(expected), Some(provided)) => expected == provided,
        _ => false,
    };

    let client_key = client_key(&headers);

    match state.orchestrator.handle(task, &client_key, is_admin).await {
        Ok(outcome) => {
            let session_id = outcome.session_id.to_string();
            match outcome.reply {
                ChatReply::Chat { answer } => Json(ChatResponse {
                    r#type: "chat",
                    answer,
                    session_id,
                })
                .into_response(),
                ChatReply::Choice(ChoiceReply::Parsed { choice, reason }) => Json(ChoiceResponse {
                    r#type: "choice",
                    choice,
                    reason,
                    session_id,
                })
                .into_response(),
                ChatReply::Choice(ChoiceReply::Raw(raw)) => Json(ChoiceRawResponse {
                    r#type: "choice",
                    raw,
                    session_id,
                })
                .into_response(),
            }
        }
        Err(RequestError::AdmissionDenied { retry_after }) => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse {
                    r#type: "error",
                    error: "Rate limit exceeded".into(),
                    message: format!(
                        "Limit: {} requests per {} seconds. Please wait before trying again.",
                        state.rate_limit_max, state.rate_limit_window_secs
                    ),
                }),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
        Err(RequestError::GenerationFailed(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                r#type: "error",
                error: "AI service unavailable".into(),
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Client identity for rate limiting: the edge-provided client IP when
/// present, otherwise a shared "unknown" bucket.
fn client_key(headers: &HeaderMap) -> String {
    if let Some(ip) = header_str(headers, "CF-Connecting-IP") {
        return ip.to_string();
    }
    if let Some(forwarded) = header_str(headers, "X-Forwarded-For") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;
    use animus_config::Persona;
    use animus_retrieval::VectorStore;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(backend: Arc<ScriptedBackend>, max_requests: u32) -> SharedState {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKv::new());
        Arc::new(GatewayState {
            orchestrator: Orchestrator {
                persona: Persona {
                    name: "Santo".into(),
                    ..Persona::default()
                },
                backend: backend.clone(),
                retriever: Retriever::new(backend, Arc::new(VectorStore::new(vec![]))),
                rate_limiter: RateLimiter::new(kv.clone(), 60, max_requests),
                sessions: SessionStore::new(kv, 1800, 10),
                top_k: 3,
            },
            admin_key: Some("sekrit".into()),
            rate_limit_max: max_requests,
            rate_limit_window_secs: 60,
        })
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn options_preflight_returns_204_with_cors() {
        let app = build_router(test_state(Arc::new(ScriptedBackend::answering("ok")), 20));

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        assert_eq!(
            response.headers().get("access-control-allow-headers").unwrap(),
            "Content-Type"
        );
    }

    #[tokio::test]
    async fn health_reports_persona_and_modes() {
        let app = build_router(test_state(Arc::new(ScriptedBackend::answering("ok")), 20));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["persona_name"], "Santo");
        assert_eq!(json["modes"], serde_json::json!(["chat", "choice"]));
    }

    #[tokio::test]
    async fn unsupported_method_gets_405() {
        let app = build_router(test_state(Arc::new(ScriptedBackend::answering("ok")), 20));

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        // CORS headers ride along on every response
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn chat_round_trip_creates_a_session() {
        let backend = Arc::new(ScriptedBackend::answering("Semoga segera bisa makan!"));
        let state = test_state(backend.clone(), 20);

        let response = build_router(state.clone())
            .oneshot(post(r#"{"mode":"chat","message":"Saya lapar"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["type"], "chat");
        assert_eq!(json["answer"], "Semoga segera bisa makan!");
        let session_id = json["session_id"].as_str().unwrap().to_string();
        assert!(!session_id.is_empty());

        // A follow-up with that session id sees the prior turn in the prompt
        let follow_up = format!(
            r#"{{"mode":"chat","message":"Apa yang saya bilang tadi?","session_id":"{session_id}"}}"#
        );
        let response = build_router(state).oneshot(post(&follow_up)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let prompts = backend.system_prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("User: Saya lapar"));
        assert!(prompts[1].contains("You: Semoga segera bisa makan!"));
    }

    #[tokio::test]
    async fn empty_session_id_gets_a_fresh_session() {
        let backend = Arc::new(ScriptedBackend::answering("ok"));
        let state = test_state(backend.clone(), 20);

        let response = build_router(state.clone())
            .oneshot(post(r#"{"mode":"chat","message":"secret from A","session_id":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let first_id = json["session_id"].as_str().unwrap().to_string();
        assert!(!first_id.is_empty());

        // A second caller sending "" must not land in the same history
        let response = build_router(state)
            .oneshot(post(r#"{"mode":"chat","message":"hello from B","session_id":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let second_id = json["session_id"].as_str().unwrap().to_string();
        assert_ne!(first_id, second_id);

        let prompts = backend.system_prompts();
        assert!(!prompts[1].contains("secret from A"));
    }

    #[tokio::test]
    async fn missing_mode_or_message_is_400() {
        let app = build_router(test_state(Arc::new(ScriptedBackend::answering("ok")), 20));

        for body in [
            r#"{"message":"hi"}"#,
            r#"{"mode":"chat"}"#,
            r#"{"mode":"chat","message":""}"#,
        ] {
            let response = build_router(test_state(
                Arc::new(ScriptedBackend::answering("ok")),
                20,
            ))
            .oneshot(post(body))
            .await
            .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }

        let response = app.oneshot(post("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rate_limit_denies_with_429_envelope() {
        let state = test_state(Arc::new(ScriptedBackend::answering("ok")), 1);

        let response = build_router(state.clone())
            .oneshot(post(r#"{"mode":"chat","message":"one"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = build_router(state)
            .oneshot(post(r#"{"mode":"chat","message":"two"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));

        let json = body_json(response).await;
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "Rate limit exceeded");
    }

    #[tokio::test]
    async fn admin_header_bypasses_rate_limit() {
        let state = test_state(Arc::new(ScriptedBackend::answering("ok")), 1);

        // Exhaust the public allowance
        let response = build_router(state.clone())
            .oneshot(post(r#"{"mode":"chat","message":"one"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let admin_request = Request::builder()
            .method("POST")
            .uri("/")
            .header("Content-Type", "application/json")
            .header("X-Admin-Key", "sekrit")
            .body(Body::from(r#"{"mode":"chat","message":"two"}"#))
            .unwrap();
        let response = build_router(state.clone()).oneshot(admin_request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // A wrong secret gets normal limiting
        let bad_request = Request::builder()
            .method("POST")
            .uri("/")
            .header("Content-Type", "application/json")
            .header("X-Admin-Key", "wrong")
            .body(Body::from(r#"{"mode":"chat","message":"three"}"#))
            .unwrap();
        let response = build_router(state).oneshot(bad_request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn generation_failure_is_503() {
        let app = build_router(test_state(Arc::new(ScriptedBackend::failing()), 20));

        let response = app
            .oneshot(post(r#"{"mode":"chat","message":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "AI service unavailable");
    }

    #[tokio::test]
    async fn choice_mode_returns_parsed_payload() {
        let backend = Arc::new(ScriptedBackend::answering(
            r#"{"choice":"B","reason":"quieter evening"}"#,
        ));
        let app = build_router(test_state(backend, 20));

        let response = app
            .oneshot(post(
                r#"{"mode":"choice","message":"Stay or go?","options":["Go out","Stay home"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["type"], "choice");
        assert_eq!(json["choice"], "B");
        assert_eq!(json["reason"], "quieter evening");
    }

    #[tokio::test]
    async fn unparseable_choice_returns_raw_fallback() {
        let backend = Arc::new(ScriptedBackend::answering("I would stay home."));
        let app = build_router(test_state(backend, 20));

        let response = app
            .oneshot(post(
                r#"{"mode":"choice","message":"Stay or go?","options":["Go out","Stay home"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["type"], "choice");
        assert_eq!(json["raw"], "I would stay home.");
        assert!(json.get("choice").is_none());
    }
}
