//! Suggestion box endpoints
//!
//! Any authenticated user can submit; only staff read the inbox.

use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;

use crate::api::dto;
use crate::auth::CurrentUser;
use crate::data::{EntityId, Suggestion};
use crate::error::AppError;
use crate::service::feed::format_date_es;
use crate::AppState;

/// Create suggestions router
pub fn suggestions_router() -> Router<AppState> {
    Router::new().route("/suggestions", get(list_suggestions).post(create_suggestion))
}

#[derive(Debug, Deserialize)]
pub struct NewSuggestionRequest {
    subject: String,
    message: String,
}

/// POST /suggestions - Submit a suggestion
pub async fn create_suggestion(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<NewSuggestionRequest>,
) -> Result<Json<dto::SuggestionResponse>, AppError> {
    let subject = request.subject.trim();
    let message = request.message.trim();
    if subject.is_empty() || message.is_empty() {
        return Err(AppError::Validation(
            "subject and message must not be empty".to_string(),
        ));
    }

    let suggestion = Suggestion {
        id: EntityId::new().0,
        user_id: Some(session.user_id.clone()),
        subject: subject.to_string(),
        message: message.to_string(),
        created_at: chrono::Utc::now(),
    };
    state.db.insert_suggestion(&suggestion).await?;

    tracing::debug!(user = %session.username, "suggestion submitted");

    Ok(Json(dto::SuggestionResponse {
        id: suggestion.id,
        user: Some(session.username),
        subject: suggestion.subject,
        message: suggestion.message,
        created_at: format_date_es(suggestion.created_at),
    }))
}

/// GET /suggestions - Staff inbox, newest first
pub async fn list_suggestions(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<dto::SuggestionResponse>>, AppError> {
    if !session.is_superuser {
        return Err(AppError::Forbidden);
    }

    let rows = state.db.list_suggestions().await?;
    let response = rows
        .into_iter()
        .map(|(suggestion, username)| dto::SuggestionResponse {
            id: suggestion.id,
            user: username,
            subject: suggestion.subject,
            message: suggestion.message,
            created_at: format_date_es(suggestion.created_at),
        })
        .collect();

    Ok(Json(response))
}
