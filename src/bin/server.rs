//! kagami HTTP server binary.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8000)
//! - `OPENAI_API_KEY` — generation backend key (turns fail closed without it)
//! - `OPENAI_BASE_URL` — OpenAI-compatible API base (default: api.openai.com/v1)
//! - `KAGAMI_MODEL` — chat model id
//! - `FRONTEND_URL` — comma-separated CORS origins
//! - `KAGAMI_LOG_DIR` — event-log directory (default: experiment_logs)
//! - `KAGAMI_SESSION_DB` — session store path (default: session_state/sessions.db)
//! - `FORMALITY_SIDECAR_URL` / `STYLE_EMBED_SIDECAR_URL` — optional model sidecars
//! - `RUST_LOG` — tracing filter (default: "info,kagami=debug")

use std::sync::Arc;

use kagami::config::Settings;
use kagami::server::app_router;
use kagami::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kagami=debug".into()),
        )
        .init();

    let settings = Settings::from_env();
    let bind_addr = format!("0.0.0.0:{}", settings.port);

    let state = AppState::new(settings)?;

    // Model warm-up runs in the background; early turns block on it or
    // degrade with null model fields, they never crash.
    let nlp = Arc::clone(&state.nlp);
    tokio::spawn(async move {
        nlp.warm_up().await;
    });

    state.load_persisted_sessions();

    let app = app_router(state);

    tracing::info!("kagami server starting on {bind_addr}");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               — status probe");
    tracing::info!("  POST /api/session/start    — create a session");
    tracing::info!("  POST /api/session/message  — run one conversation turn");
    tracing::info!("  POST /api/session/end      — close a session");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
