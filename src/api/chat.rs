//! Help chat endpoints
//!
//! A non-staff user owns at most one conversation, created lazily on first
//! visit. Staff see every conversation. The conversation page doubles as
//! the chat feed: an XHR request carrying `message=1` long-polls for
//! messages newer than the `after` cursor.

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;

use crate::api::{dto, is_xhr};
use crate::auth::{CurrentUser, Session};
use crate::data::{Conversation, EntityId, HelpMessage, now_micros};
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::service::feed;
use crate::service::poll::{PollSettings, cursor_lower_bound, parse_cursor, poll_new};
use crate::AppState;

/// Create help chat router
pub fn chat_router() -> Router<AppState> {
    Router::new()
        .route("/help-chat", get(help_chat_entry))
        .route(
            "/help-chat/:conversation_id",
            get(conversation_page).post(send_message),
        )
}

/// Staff may open any conversation; everyone else only their own.
///
/// Runs before the poll loop ever starts. Distinct from the not-found
/// case, which the conversation lookup handles.
fn authorize_viewer(session: &Session, conversation: &Conversation) -> Result<(), AppError> {
    if session.is_superuser || conversation.user_id == session.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// GET /help-chat - Entry point
///
/// Staff get the conversation overview; a non-staff user is sent to their
/// own conversation, creating it on first visit.
pub async fn help_chat_entry(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Response, AppError> {
    if session.is_superuser {
        let conversations = state.db.list_conversations().await?;
        let summaries: Vec<dto::ConversationSummary> = conversations
            .into_iter()
            .map(|(conversation, username)| dto::ConversationSummary {
                id: conversation.id,
                username,
            })
            .collect();

        return Ok(Json(summaries).into_response());
    }

    let (conversation, created) = state
        .db
        .get_or_create_conversation(&session.user_id)
        .await?;

    if created {
        tracing::info!(
            user = %session.username,
            conversation = %conversation.id,
            "conversation created"
        );
    }

    Ok(Redirect::to(&format!("/help-chat/{}", conversation.id)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ChatPageParams {
    /// "1" selects the chat feed on XHR requests
    message: Option<String>,
    /// Timestamp cursor of the last message the client has seen
    after: Option<String>,
}

/// GET /help-chat/:conversation_id - Conversation page and chat feed
pub async fn conversation_page(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(conversation_id): Path<String>,
    Query(params): Query<ChatPageParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let conversation = state
        .db
        .get_conversation(&conversation_id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize_viewer(&session, &conversation)?;

    if is_xhr(&headers) && params.message.as_deref() == Some("1") {
        return chat_feed(
            &state,
            &conversation.id,
            &session.user_id,
            params.after.as_deref(),
        )
        .await;
    }

    let rows = state.db.new_messages(&conversation.id, None).await?;
    let messages = rows
        .iter()
        .map(|row| feed::message_event(row, &session.user_id))
        .collect();

    Ok(Json(dto::ConversationPageResponse {
        id: conversation.id,
        messages,
    })
    .into_response())
}

/// Long-poll for messages newer than the client's cursor.
async fn chat_feed(
    state: &AppState,
    conversation_id: &str,
    viewer_id: &str,
    after: Option<&str>,
) -> Result<Response, AppError> {
    let cursor = parse_cursor(after);
    let lower_bound = cursor_lower_bound(cursor);
    let settings = PollSettings::chat(&state.config.polling);

    let db = state.db.clone();
    let conversation_id = conversation_id.to_string();
    let rows = poll_new(&settings, cursor, move || {
        let db = db.clone();
        let conversation_id = conversation_id.clone();
        async move { db.new_messages(&conversation_id, lower_bound).await }
    })
    .await?;

    let events: Vec<dto::ChatMessageEvent> = rows
        .iter()
        .map(|row| feed::message_event(row, viewer_id))
        .collect();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/help-chat/:conversation_id", "200"])
        .inc();

    Ok(Json(events).into_response())
}

#[derive(Debug, Deserialize)]
pub struct NewMessageForm {
    message: Option<String>,
}

/// POST /help-chat/:conversation_id - Send a message
///
/// Staff messages address the conversation owner; owner messages carry no
/// recipient (they go to whichever staff member picks the thread up).
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(conversation_id): Path<String>,
    Form(form): Form<NewMessageForm>,
) -> Result<Redirect, AppError> {
    let conversation = state
        .db
        .get_conversation(&conversation_id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize_viewer(&session, &conversation)?;

    let body = form.message.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let recipient_id = session
        .is_superuser
        .then(|| conversation.user_id.clone());

    let message = HelpMessage {
        id: EntityId::new().0,
        conversation_id: conversation.id.clone(),
        sender_id: session.user_id.clone(),
        recipient_id,
        message: body.to_string(),
        created_at: now_micros(),
    };
    state.db.insert_message(&message).await?;

    tracing::debug!(
        sender = %session.username,
        conversation = %conversation.id,
        "help message sent"
    );

    Ok(Redirect::to(&format!("/help-chat/{}", conversation.id)))
}
