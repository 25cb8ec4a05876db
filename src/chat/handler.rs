//! Chat endpoints and the per-turn orchestration pipeline.
//!
//! One message runs: style sample → feature extraction → prompt compilation
//! → generation → post-processing → LSM scoring → smoothing → persistence,
//! strictly in that order. The session record is locked for the whole turn,
//! so two turns of one conversation can never interleave; distinct
//! conversations proceed concurrently.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::chat::generation::GenerationClient;
use crate::chat::postprocess::post_process_response;
use crate::config::{Settings, MAX_TOKENS, STYLE_SAMPLE_MAX_LOOKBACK, STYLE_SAMPLE_MIN_TOKENS};
use crate::events::EventLogger;
use crate::nlp::NlpService;
use crate::prompt;
use crate::session::store::SessionStore;
use crate::session::{condition_for_name, initial_greeting, Condition, Message, Role, Session};
use crate::style::lsm;
use crate::style::profile::StyleProfile;

/// Error tuple every handler returns on the failure path.
pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub nlp: Arc<NlpService>,
    pub generation: Arc<GenerationClient>,
    pub store: Arc<SessionStore>,
    pub events: Arc<EventLogger>,
    /// Live sessions. Each entry owns its session behind an async mutex;
    /// holding that mutex is what serializes turns per conversation.
    pub sessions: Arc<DashMap<String, Arc<Mutex<Session>>>>,
}

impl AppState {
    /// Build the full service graph from settings.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let store = SessionStore::new(settings.session_db_path.clone())?;
        Ok(Self {
            nlp: Arc::new(NlpService::new(&settings)),
            generation: Arc::new(GenerationClient::new(&settings)),
            store: Arc::new(store),
            events: Arc::new(EventLogger::new(settings.log_dir.clone())),
            sessions: Arc::new(DashMap::new()),
            settings,
        })
    }

    /// Restore persisted sessions into the live map at startup.
    pub fn load_persisted_sessions(&self) {
        match self.store.load_all() {
            Ok(sessions) => {
                let count = sessions.len();
                for session in sessions {
                    self.sessions.insert(
                        session.session_id.clone(),
                        Arc::new(Mutex::new(session)),
                    );
                }
                tracing::info!("loaded {count} active sessions");
            }
            Err(e) => tracing::error!("failed to reload persisted sessions: {e}"),
        }
    }

    fn session_handle(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(session_id).map(|r| r.value().clone())
    }
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartRequest {
    pub participant_id: String,
    pub condition_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartResponse {
    pub session_id: String,
    pub condition: Condition,
    pub initial_history: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub response: String,
    pub style_profile: StyleProfile,
    pub lsm_score: f64,
    pub smoothed_lsm_after_turn: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAvatarDetailsRequest {
    pub session_id: String,
    pub avatar_url: String,
    #[serde(default)]
    pub avatar_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendEventRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub event_data: Value,
}

fn not_found(session_id: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Session not found: {session_id}") })),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/session/start — create a session under one of the six
/// experiment cells and seed it with the greeting turn.
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<SessionStartRequest>,
) -> ApiResult<SessionStartResponse> {
    let condition_name = request.condition_name.to_lowercase();
    let condition = condition_for_name(&condition_name).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("Invalid conditionName provided: '{condition_name}'")
            })),
        )
    })?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let mut session = Session::new(
        session_id.clone(),
        request.participant_id.clone(),
        condition,
        condition_name.clone(),
        &state.settings.log_dir,
    );

    let greeting = initial_greeting();
    session.push_message(Role::Assistant, greeting.clone());

    state.events.append(
        &session,
        "session_start_backend",
        json!({
            "condition_name_from_request": request.condition_name,
            "initial_greeting": greeting,
        }),
    );

    if let Err(e) = state.store.asave(&session).await {
        tracing::error!("failed to persist new session {session_id}: {e}");
    }

    let response = SessionStartResponse {
        session_id: session_id.clone(),
        condition,
        initial_history: session.history.clone(),
    };
    state
        .sessions
        .insert(session_id, Arc::new(Mutex::new(session)));

    Ok(Json(response))
}

/// POST /api/session/message — run the full per-turn pipeline.
pub async fn handle_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> ApiResult<MessageResponse> {
    let handle = state
        .session_handle(&request.session_id)
        .ok_or_else(|| not_found(&request.session_id))?;
    let mut session = handle.lock().await;
    let started = Instant::now();

    session.turn_number += 1;

    // Style sample: recent user turns when they carry enough signal,
    // otherwise the incoming message itself.
    let sample = user_style_sample(&session.history, &state.nlp)
        .unwrap_or_else(|| request.message.clone());

    let mut user_profile = state.nlp.analyze_text(&sample).await;
    user_profile.lsm_score_prev = Some(session.effective_lsm());

    session.push_message(Role::User, request.message.clone());
    state.events.append(
        &session,
        "user_message",
        json!({
            "content": &request.message,
            "user_linguistic_traits": &user_profile,
        }),
    );

    let system_prompt = prompt::compile(&session.condition, &user_profile);
    let temperature = prompt::temperature_for(&session.condition);

    // History minus the message just appended; the client sends the
    // current user message as its own final entry.
    let prior_history = &session.history[..session.history.len() - 1];
    let generated = state
        .generation
        .generate(
            &system_prompt,
            prior_history,
            &request.message,
            temperature,
            MAX_TOKENS,
        )
        .await;

    if let Some(detail) = &generated.error {
        state.events.append(
            &session,
            "error",
            json!({
                "error_source": "generation_backend",
                "error_message": detail,
            }),
        );
    }

    let adaptive = session.condition.lsm;
    let bot_response = post_process_response(&generated.text, adaptive);

    let bot_profile = state.nlp.analyze_text(&bot_response).await;
    let raw_lsm = state.nlp.compute_lsm(&sample, &bot_response);
    let style_similarity = state.nlp.style_similarity(&sample, &bot_response).await;

    let previous = session.effective_lsm();
    let smoothed = lsm::smooth(
        previous,
        raw_lsm,
        user_profile.word_count,
        bot_profile.word_count,
    );
    session.smoothed_lsm_score = Some(smoothed);
    session.push_message(Role::Assistant, bot_response.clone());

    let (logged_prompt, guardrail_fired) = prompt::strip_guardrail(&system_prompt);
    state.events.append(
        &session,
        "bot_response",
        json!({
            "content": &bot_response,
            "lsm_score_raw": raw_lsm,
            "style_similarity_cosine": style_similarity,
            "lsm_score_smoothed": smoothed,
            "bot_linguistic_traits": &bot_profile,
            "style_profile_used_for_prompt": &user_profile,
            "system_instruction_used": logged_prompt,
            "guardrail_fired": guardrail_fired,
            "response_latency_sec": started.elapsed().as_secs_f64(),
            "generation_usage": &generated.usage,
        }),
    );

    // Best-effort persistence: a failed write never blocks the turn.
    if let Err(e) = state.store.asave(&session).await {
        tracing::error!("failed to persist session {}: {e}", session.session_id);
    }

    Ok(Json(MessageResponse {
        response: bot_response,
        style_profile: user_profile,
        lsm_score: raw_lsm,
        smoothed_lsm_after_turn: smoothed,
    }))
}

/// POST /api/session/end — close out a conversation.
pub async fn end_session(
    State(state): State<AppState>,
    Json(request): Json<SessionEndRequest>,
) -> ApiResult<Value> {
    let Some((_, handle)) = state.sessions.remove(&request.session_id) else {
        tracing::info!(
            "session end called for non-existent/already-ended session: {}",
            request.session_id
        );
        return Ok(Json(json!({ "message": "Session already ended or not found." })));
    };

    let session = handle.lock().await;
    state.events.append(&session, "session_end", json!({}));

    if let Err(e) = state.store.adelete(&session.session_id).await {
        tracing::error!(
            "failed to delete persisted session {}: {e}",
            session.session_id
        );
    }

    Ok(Json(json!({ "message": "Session ended successfully." })))
}

/// POST /api/session/set_avatar_details — record the chosen avatar on the
/// session. Avatar rendering happens elsewhere; only metadata lands here.
pub async fn set_avatar_details(
    State(state): State<AppState>,
    Json(request): Json<SetAvatarDetailsRequest>,
) -> ApiResult<Value> {
    let handle = state
        .session_handle(&request.session_id)
        .ok_or_else(|| not_found(&request.session_id))?;
    let mut session = handle.lock().await;

    session.avatar_url = Some(request.avatar_url.clone());
    if request.avatar_prompt.is_some() {
        session.avatar_prompt = request.avatar_prompt.clone();
    }

    let mut data = json!({ "avatar_url_set": request.avatar_url });
    if let Some(prompt) = &request.avatar_prompt {
        data["avatar_prompt_set"] = json!(prompt);
    }
    state.events.append(&session, "avatar_details_set", data);

    if let Err(e) = state.store.asave(&session).await {
        tracing::error!("failed to persist session {}: {e}", session.session_id);
    }

    Ok(Json(json!({ "message": "Avatar details updated successfully." })))
}

/// POST /api/log/frontend_event — append a frontend-originated event to
/// the audit trail, with participant-keyed and general fallbacks.
pub async fn log_frontend_event(
    State(state): State<AppState>,
    Json(request): Json<FrontendEventRequest>,
) -> ApiResult<Value> {
    let data = json!({ "event_data": request.event_data });

    let handle = request
        .session_id
        .as_deref()
        .and_then(|sid| state.session_handle(sid));
    match handle {
        Some(handle) => {
            let session = handle.lock().await;
            state.events.append(&session, &request.event_type, data);
        }
        None => match &request.participant_id {
            Some(pid) => state.events.append_fallback(
                pid,
                request.session_id.as_deref(),
                &request.event_type,
                data,
            ),
            None => state.events.append_general(&request.event_type, data),
        },
    }

    Ok(Json(json!({ "message": "Frontend event log request received." })))
}

// ============================================================================
// Internal helpers
// ============================================================================

/// Assemble the user style sample: walk back through the most recent user
/// turns (up to the lookback limit) until enough valid tokens accumulate.
/// Returns `None` when even the lookback window is too thin.
pub fn user_style_sample(history: &[Message], nlp: &NlpService) -> Option<String> {
    let mut tokens = 0usize;
    let mut collected: Vec<&str> = Vec::new();

    for message in history
        .iter()
        .rev()
        .filter(|m| m.role == Role::User)
        .take(STYLE_SAMPLE_MAX_LOOKBACK)
    {
        tokens += nlp.valid_token_count(&message.content);
        collected.insert(0, &message.content);
        if tokens >= STYLE_SAMPLE_MIN_TOKENS {
            break;
        }
    }

    (tokens >= STYLE_SAMPLE_MIN_TOKENS).then(|| collected.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nlp() -> NlpService {
        NlpService::new(&Settings::default())
    }

    fn msg(role: Role, content: &str, turn: u32) -> Message {
        Message {
            role,
            content: content.into(),
            turn_number: turn,
        }
    }

    #[test]
    fn test_style_sample_none_when_history_thin() {
        let history = vec![
            msg(Role::Assistant, "Hey there, what's up?", 0),
            msg(Role::User, "hi", 1),
        ];
        assert_eq!(user_style_sample(&history, &nlp()), None);
    }

    #[test]
    fn test_style_sample_collects_recent_user_turns_in_order() {
        let history = vec![
            msg(Role::Assistant, "Hey!", 0),
            msg(Role::User, "i have been listening to a lot of jazz lately", 1),
            msg(Role::Assistant, "Nice, which artists?", 1),
            msg(Role::User, "mostly coltrane and some monk records too", 2),
        ];
        let sample = user_style_sample(&history, &nlp()).unwrap();
        // Chronological order, newest-last.
        assert!(sample.starts_with("i have been listening"));
        assert!(sample.ends_with("records too"));
    }

    #[test]
    fn test_style_sample_lookback_is_bounded() {
        let mut history = vec![msg(
            Role::User,
            "one tiny early message that would push us over",
            1,
        )];
        for turn in 2..6 {
            history.push(msg(Role::User, "hm", turn));
        }
        // Only the last three user turns are eligible; they are too thin.
        assert_eq!(user_style_sample(&history, &nlp()), None);
    }

    #[test]
    fn test_style_sample_stops_once_satisfied() {
        let history = vec![
            msg(Role::User, "early turn that should not be included at all", 1),
            msg(
                Role::User,
                "this single recent turn already has more than enough words to satisfy the minimum token requirement on its own",
                2,
            ),
        ];
        let sample = user_style_sample(&history, &nlp()).unwrap();
        assert!(!sample.contains("early turn"));
    }
}
