use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ProfileResponse, UpdateUserRequest},
    services,
};
use crate::{
    auth::{extractors::AuthUser, repo_types::User},
    error::AppError,
    extract::{JsonBody, PathParam},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/profile", get(get_profile).put(update_profile))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, caller), fields(user_id = %caller.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = services::get_profile(state.store.as_ref(), caller.id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = services::update_user(state.store.as_ref(), caller.id, payload).await?;
    Ok(Json(user))
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(services::get_all_users(state.store.as_ref()).await?))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(services::get_user_by_id(state.store.as_ref(), id).await?))
}

#[instrument(skip(state, caller, payload), fields(admin_id = %caller.id))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = services::update_user(state.store.as_ref(), id, payload).await?;
    Ok(Json(user))
}

#[instrument(skip(state, caller), fields(admin_id = %caller.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_user(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
