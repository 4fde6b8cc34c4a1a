//! Account endpoints
//!
//! Registration, login, and the profile icon. Sessions are stateless
//! signed tokens; there is nothing to invalidate server-side.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;

use crate::api::dto;
use crate::auth::{CurrentUser, Session, create_session_token, password};
use crate::data::{EntityId, User};
use crate::error::AppError;
use crate::AppState;

/// Create accounts router
pub fn accounts_router() -> Router<AppState> {
    Router::new()
        .route("/accounts/signup", post(signup))
        .route("/accounts/login", post(login))
        .route("/accounts/profile", get(profile).patch(update_profile))
}

const MIN_PASSWORD_LEN: usize = 8;

fn session_response(
    state: &AppState,
    user: &User,
) -> Result<Json<dto::SessionResponse>, AppError> {
    let session = Session::for_user(user, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    Ok(Json(dto::SessionResponse {
        token,
        user: user.into(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    username: String,
    password: String,
}

/// POST /accounts/signup - Register and log in
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<dto::SessionResponse>, AppError> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username must not be empty".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = User {
        id: EntityId::new().0,
        username: username.to_string(),
        password_hash: password::hash_password(&request.password)?,
        icon: None,
        is_superuser: false,
        created_at: chrono::Utc::now(),
    };
    state.db.insert_user(&user).await?;

    tracing::info!(username = %user.username, "user registered");

    session_response(&state, &user)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

/// POST /accounts/login - Authenticate
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<dto::SessionResponse>, AppError> {
    let user = state
        .db
        .get_user_by_username(request.username.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !password::verify_password(&request.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    session_response(&state, &user)
}

/// GET /accounts/profile - Current account
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<dto::UserResponse>, AppError> {
    let user = state
        .db
        .get_user(&session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json((&user).into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// New icon URL; explicit null clears it
    icon: Option<String>,
}

/// PATCH /accounts/profile - Update the profile icon reference
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<dto::UserResponse>, AppError> {
    let updated = state
        .db
        .update_user_icon(&session.user_id, request.icon.as_deref())
        .await?;
    if !updated {
        return Err(AppError::Unauthorized);
    }

    let user = state
        .db
        .get_user(&session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json((&user).into()))
}
