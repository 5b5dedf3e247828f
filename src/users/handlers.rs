use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    state::AppState,
    users::{
        dto::{CreateUser, UpdateUser},
        repo_types::User,
        services::UserError,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/by-email/:email", get(get_user_by_email))
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.users.create(payload).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    state.users.find_all().await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<User>> {
    state.users.find_one(id).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<User>> {
    state.users.find_by_email(&email).await.map(Json).map_err(reject)
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<Json<User>> {
    state.users.update(id, payload).await.map(Json).map_err(reject)
}

#[instrument(skip(state))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    state.users.remove(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

fn reject(e: UserError) -> (StatusCode, String) {
    let status = match &e {
        UserError::NotFound(_) => StatusCode::NOT_FOUND,
        UserError::Conflict => StatusCode::CONFLICT,
        UserError::Store(err) => {
            error!(error = %err, "store error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}
