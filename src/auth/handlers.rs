use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        repo_types::Role,
        services,
    },
    error::AppError,
    extract::JsonBody,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/register/admin", post(register_admin))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = services::register(state.store.as_ref(), &keys, payload, Role::User).await?;
    Ok(Json(AuthResponse {
        token,
        username: user.username,
        role: user.role,
    }))
}

/// Access is decided by the admin-registration policy before this runs.
#[instrument(skip(state, payload))]
pub async fn register_admin(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) =
        services::register(state.store.as_ref(), &keys, payload, Role::Admin).await?;
    Ok(Json(AuthResponse {
        token,
        username: user.username,
        role: user.role,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = services::login(state.store.as_ref(), &keys, payload).await?;
    Ok(Json(AuthResponse {
        token,
        username: user.username,
        role: user.role,
    }))
}
