//! Chat endpoints: the HTML page, its form actions, and the JSON message API.
//!
//! Every request is bound to a conversation through the browser session. The
//! session layer issues the cookie; a session without a known conversation
//! gets a fresh one.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Redirect},
    Form, Json,
};
use chrono::Utc;
use tower_sessions::Session;
use uuid::Uuid;

use crate::agent::TurnError;

use super::page::render_page;
use super::routes::AppState;
use super::session_store::{ChatSession, SessionHandle};
use super::types::{
    ChatForm, MessageView, MessagesResponse, PostMessageRequest, ToolView, TurnResponse,
};

pub const SESSION_COOKIE: &str = "scholar_chat_session";

/// Session key holding the id of the session's conversation.
const CONVERSATION_KEY: &str = "conversation_id";

/// Rewritten on every request so the inactivity expiry restarts.
const LAST_SEEN_KEY: &str = "last_seen";

type ApiError = (StatusCode, String);

fn session_unavailable(e: tower_sessions::session::Error) -> ApiError {
    tracing::error!("Session store failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "session unavailable".to_string(),
    )
}

/// Conversation owned by the browser session, created on first use.
async fn conversation_for(state: &AppState, session: &Session) -> Result<SessionHandle, ApiError> {
    let known = session
        .get::<Uuid>(CONVERSATION_KEY)
        .await
        .map_err(session_unavailable)?;

    let (handle, created) = state.sessions.get_or_create(known).await;
    if created {
        let id = handle.lock().await.id;
        session
            .insert(CONVERSATION_KEY, id)
            .await
            .map_err(session_unavailable)?;
    }
    session
        .insert(LAST_SEEN_KEY, Utc::now())
        .await
        .map_err(session_unavailable)?;
    Ok(handle)
}

/// User-facing text for a failed submission.
fn notice_for(error: &TurnError) -> String {
    format!("{}. Your message was not saved, please try again.", error)
}

/// `GET /` - render the chat page.
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let chat = conversation_for(&state, &session).await?;
    let mut chat = chat.lock().await;
    chat.touch();

    let tools = state.agent.tools().list_tools();
    Ok(Html(render_page(
        chat.conversation.messages(),
        chat.notice.as_deref(),
        &tools,
    )))
}

/// `POST /chat` - run a turn for the submitted form, then go back to the page.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<ChatForm>,
) -> Result<Redirect, ApiError> {
    let chat = conversation_for(&state, &session).await?;
    let mut chat = chat.lock().await;
    chat.touch();

    let ChatSession {
        id,
        conversation,
        notice,
        ..
    } = &mut *chat;

    tracing::info!(
        session_id = %id,
        content_len = form.message.len(),
        "Received chat message"
    );

    match state.agent.run_turn(conversation, &form.message).await {
        Ok(_) => *notice = None,
        Err(TurnError::EmptyInput) => {}
        Err(e) => {
            tracing::warn!(session_id = %id, "Chat turn failed: {}", e);
            *notice = Some(notice_for(&e));
        }
    }

    chat.touch();
    Ok(Redirect::to("/"))
}

/// `POST /chat/reset` - clear the conversation.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Redirect, ApiError> {
    let chat = conversation_for(&state, &session).await?;
    let mut chat = chat.lock().await;
    chat.conversation.clear();
    chat.notice = None;
    chat.touch();
    Ok(Redirect::to("/"))
}

/// `GET /api/tools` - registered lookup tools.
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolView>> {
    Json(
        state
            .agent
            .tools()
            .list_tools()
            .into_iter()
            .map(ToolView::from)
            .collect(),
    )
}

/// `GET /api/messages` - the caller's conversation.
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<MessagesResponse>, ApiError> {
    let chat = conversation_for(&state, &session).await?;
    let mut chat = chat.lock().await;
    chat.touch();

    Ok(Json(MessagesResponse {
        session_id: chat.id,
        messages: chat
            .conversation
            .messages()
            .iter()
            .map(MessageView::from)
            .collect(),
    }))
}

/// `POST /api/messages` - run a turn and return the messages it appended.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    if req.content.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "content is required".to_string()));
    }

    let chat = conversation_for(&state, &session).await?;
    let mut chat = chat.lock().await;
    chat.touch();
    let id = chat.id;

    let mark = chat.conversation.len();
    let outcome = match state.agent.run_turn(&mut chat.conversation, &req.content).await {
        Ok(outcome) => outcome,
        Err(TurnError::EmptyInput) => {
            return Err((StatusCode::BAD_REQUEST, "content is required".to_string()));
        }
        Err(e) => {
            tracing::warn!(session_id = %id, "Chat turn failed: {}", e);
            return Err((StatusCode::BAD_GATEWAY, e.to_string()));
        }
    };
    chat.notice = None;
    chat.touch();

    Ok(Json(TurnResponse::new(
        outcome,
        chat.conversation.since(mark),
    )))
}

/// `DELETE /api/messages` - clear the conversation.
pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<serde_json::Value>, ApiError> {
    let chat = conversation_for(&state, &session).await?;
    let mut chat = chat.lock().await;
    chat.conversation.clear();
    chat.notice = None;
    chat.touch();
    Ok(ok_json())
}

/// Shorthand for a `{ "ok": true }` JSON response.
fn ok_json() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
