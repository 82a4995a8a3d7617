//! HTTP route definitions and server startup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::agent::Agent;
use crate::config::Config;

use super::chat::{self, SESSION_COOKIE};
use super::session_store::{run_idle_cleanup, SessionStore};
use super::types::HealthResponse;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub agent: Arc<Agent>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, agent: Arc<Agent>) -> Self {
        Self {
            config,
            agent,
            sessions: SessionStore::new(),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    // Plain HTTP by default, so the cookie must not be marked Secure.
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(inactivity_window(
            state.config.session_idle,
        )));

    Router::new()
        .route("/", get(chat::index))
        .route("/chat", post(chat::submit))
        .route("/chat/reset", post(chat::reset))
        .route("/api/health", get(health))
        .route("/api/tools", get(chat::list_tools))
        .route(
            "/api/messages",
            get(chat::get_messages)
                .post(chat::post_message)
                .delete(chat::clear_messages),
        )
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn inactivity_window(idle: Duration) -> time::Duration {
    time::Duration::try_from(idle).unwrap_or(time::Duration::MAX)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let agent = Arc::new(Agent::new(&config));
    tracing::info!(
        tools = agent.tools().len(),
        max_rounds = agent.settings().max_rounds,
        "Agent ready"
    );

    let state = Arc::new(AppState::new(config.clone(), agent));
    let period = (config.session_idle / 4).max(Duration::from_secs(1));
    tokio::spawn(run_idle_cleanup(
        state.sessions.clone(),
        period,
        config.session_idle,
    ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
