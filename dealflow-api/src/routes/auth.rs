//! Authentication endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/v1/auth/register` - Register a new user
//! - `POST /api/v1/auth/login` - Login and get a token pair
//! - `POST /api/v1/auth/refresh` - Exchange a refresh token for a new pair
//! - `GET  /api/v1/auth/me` - The authenticated user

use axum::{extract::State, http::StatusCode, Json};
use dealflow_shared::models::user::User;
use dealflow_shared::services::auth::{AuthService, TokenPair};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::extract::CurrentUser;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Login response: the user plus a token pair
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /api/v1/auth/register`
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    body.validate()?;
    let user = AuthService::new(state.store.clone(), state.tokens.clone())
        .register(&body.email, &body.password, &body.full_name)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/v1/auth/login`
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    body.validate()?;
    let (user, tokens) = AuthService::new(state.store.clone(), state.tokens.clone())
        .login(&body.email, &body.password)
        .await?;
    Ok(Json(LoginResponse { user, tokens }))
}

/// `POST /api/v1/auth/refresh`
///
/// # Errors
///
/// - `401 Unauthorized`: token invalid, expired, of the wrong type, or
///   its subject no longer exists
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let tokens = AuthService::new(state.store.clone(), state.tokens.clone())
        .refresh(&body.refresh_token)
        .await?;
    Ok(Json(tokens))
}

/// `GET /api/v1/auth/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
