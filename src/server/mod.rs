//! Axum router for the kagami HTTP server.
//!
//! # Routes
//!
//! - `GET  /`                                — liveness greeting
//! - `GET  /health`                          — status/version probe
//! - `POST /api/session/start`              — create a session
//! - `POST /api/session/message`            — run one conversation turn
//! - `POST /api/session/end`                — close a session
//! - `POST /api/session/set_avatar_details` — record avatar metadata
//! - `POST /api/log/frontend_event`         — frontend-originated audit events

use axum::{
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::handler::{
    end_session, handle_message, log_frontend_event, set_avatar_details, start_session, AppState,
};

/// Build the axum router with all routes and middleware.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.frontend_origins);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/session/start", post(start_session))
        .route("/api/session/message", post(handle_message))
        .route("/api/session/end", post(end_session))
        .route("/api/session/set_avatar_details", post(set_avatar_details))
        .route("/api/log/frontend_event", post(log_frontend_event))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS restricted to the configured frontend origins; unparseable origin
/// lists fall back to permissive so a bad env var cannot brick the service.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();

    if parsed.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    }
}

/// GET / — liveness greeting.
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Kagami Chat — backend humming smoothly."
    }))
}

/// GET /health — status probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "kagami",
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Settings;

    fn test_state(dir: &std::path::Path) -> AppState {
        let settings = Settings {
            log_dir: dir.join("logs"),
            session_db_path: dir.join("sessions.db"),
            ..Settings::default()
        };
        AppState::new(settings).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::VERSION);
        assert_eq!(json["service"], "kagami");
    }

    #[tokio::test]
    async fn test_session_start_rejects_unknown_condition() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path()));

        let response = app
            .oneshot(post_json(
                "/api/session/start",
                &json!({ "participantId": "p01", "conditionName": "control" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("control"));
    }

    #[tokio::test]
    async fn test_session_start_seeds_greeting() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = app_router(state.clone());

        let response = app
            .oneshot(post_json(
                "/api/session/start",
                &json!({ "participantId": "p01", "conditionName": "None_Adaptive" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["condition"]["lsm"], true);
        assert_eq!(json["condition"]["avatarType"], "none");
        let history = json["initialHistory"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["role"], "assistant");
        assert!(history[0]["content"].as_str().unwrap().contains("Kagami"));

        // Session is live and persisted.
        let sid = json["sessionId"].as_str().unwrap();
        assert!(state.sessions.contains_key(sid));
        assert!(state.store.load(sid).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_message_unknown_session_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path()));

        let response = app
            .oneshot(post_json(
                "/api/session/message",
                &json!({ "sessionId": "missing", "message": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_turn_fails_closed_without_backend() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = app_router(state.clone());

        let start = app
            .clone()
            .oneshot(post_json(
                "/api/session/start",
                &json!({ "participantId": "p02", "conditionName": "none_static" }),
            ))
            .await
            .unwrap();
        let sid = body_json(start).await["sessionId"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/session/message",
                &json!({ "sessionId": sid, "message": "hey, how are you doing today?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        // No API key in the test environment: the apology is the reply and
        // the turn still completes with a full profile and scores.
        assert!(json["response"].as_str().unwrap().starts_with("Sorry"));
        assert!(json["styleProfile"]["word_count"].as_u64().unwrap() > 0);
        let raw = json["lsmScore"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&raw));
        // Both spans are under the smoothing threshold, so the trend keeps
        // its neutral prior even though a raw score was produced.
        assert_eq!(json["smoothedLsmAfterTurn"], 0.5);

        // A second short turn still leaves the trend untouched.
        let response = app
            .oneshot(post_json(
                "/api/session/message",
                &json!({ "sessionId": sid, "message": "yeah ok" }),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["smoothedLsmAfterTurn"], 0.5);

        // Both turns landed in history.
        let handle = state.sessions.get(&sid).unwrap().value().clone();
        let session = handle.lock().await;
        assert_eq!(session.turn_number, 2);
        assert_eq!(session.history.len(), 5);
        assert_eq!(session.history[1].content, "hey, how are you doing today?");
    }

    #[tokio::test]
    async fn test_session_end_removes_live_and_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = app_router(state.clone());

        let start = app
            .clone()
            .oneshot(post_json(
                "/api/session/start",
                &json!({ "participantId": "p03", "conditionName": "premade_static" }),
            ))
            .await
            .unwrap();
        let sid = body_json(start).await["sessionId"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json("/api/session/end", &json!({ "sessionId": sid })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!state.sessions.contains_key(&sid));
        assert!(state.store.load(&sid).unwrap().is_none());

        // Ending again is idempotent, not an error.
        let response = app
            .oneshot(post_json("/api/session/end", &json!({ "sessionId": sid })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("already ended"));
    }

    #[tokio::test]
    async fn test_avatar_details_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = app_router(state.clone());

        let start = app
            .clone()
            .oneshot(post_json(
                "/api/session/start",
                &json!({ "participantId": "p04", "conditionName": "generated_adaptive" }),
            ))
            .await
            .unwrap();
        let sid = body_json(start).await["sessionId"].as_str().unwrap().to_string();

        let response = app
            .oneshot(post_json(
                "/api/session/set_avatar_details",
                &json!({
                    "sessionId": sid,
                    "avatarUrl": "/static/generated/a1.webp",
                    "avatarPrompt": "a fox with headphones"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let handle = state.sessions.get(&sid).unwrap().value().clone();
        let session = handle.lock().await;
        assert_eq!(session.avatar_url.as_deref(), Some("/static/generated/a1.webp"));
        assert_eq!(session.avatar_prompt.as_deref(), Some("a fox with headphones"));
    }

    #[tokio::test]
    async fn test_frontend_event_accepts_sessionless_payload() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path()));

        let response = app
            .oneshot(post_json(
                "/api/log/frontend_event",
                &json!({ "eventType": "page_view", "eventData": { "screen": "intro" } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
