use crate::{AppState, error::AppError};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use core_types::{Message, NewMessage, User, UserProfile};
use database::DEFAULT_TIMELINE_LIMIT;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { DEFAULT_TIMELINE_LIMIT }

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// # POST /api/users
/// Signs up a new user. Hashing runs on the blocking pool.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let cost = state.auth.bcrypt_cost;
    let new_user = tokio::task::spawn_blocking(move || {
        User::signup_with_cost(
            req.username.as_deref(),
            req.email.as_deref(),
            req.password.as_deref(),
            req.image_url.as_deref(),
            cost,
        )
    })
    .await??;

    let mut session = state.db_repo.session();
    session.add_user(new_user);
    let user = session
        .commit()
        .await?
        .users
        .pop()
        .ok_or_else(|| AppError::NotFound("created user".to_string()))?;

    tracing::info!(user_id = user.id, username = %user.username, "User signed up.");
    Ok((StatusCode::CREATED, Json(user)))
}

/// # POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>, AppError> {
    state
        .db_repo
        .authenticate(&req.username, &req.password)
        .await?
        .map(Json)
        .ok_or(AppError::Unauthorized)
}

/// # GET /api/users?q=
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.db_repo.search_users(params.q.as_deref()).await?;
    Ok(Json(users))
}

/// # GET /api/users/:user_id
pub async fn get_user_profile(
    Path(user_id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.db_repo.load_profile(user_id).await?;
    Ok(Json(profile))
}

/// # GET /api/users/:user_id/following
pub async fn get_following(
    Path(user_id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, AppError> {
    state.db_repo.get_user(user_id).await?;
    Ok(Json(state.db_repo.following(user_id).await?))
}

/// # GET /api/users/:user_id/followers
pub async fn get_followers(
    Path(user_id): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, AppError> {
    state.db_repo.get_user(user_id).await?;
    Ok(Json(state.db_repo.followers(user_id).await?))
}

/// # POST /api/users/:user_id/following/:other_id
pub async fn follow_user(
    Path((user_id, other_id)): Path<(i32, i32)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    let follower = state.db_repo.get_user(user_id).await?;
    let followed = state.db_repo.get_user(other_id).await?;

    let mut session = state.db_repo.session();
    session.follow(&follower, &followed);
    session.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # DELETE /api/users/:user_id/following/:other_id
pub async fn unfollow_user(
    Path((user_id, other_id)): Path<(i32, i32)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    let follower = state.db_repo.get_user(user_id).await?;
    let followed = state.db_repo.get_user(other_id).await?;

    let mut session = state.db_repo.session();
    session.unfollow(&follower, &followed);
    session.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # POST /api/users/:user_id/messages
pub async fn create_message(
    Path(user_id): Path<i32>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<MessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = NewMessage::new(user_id, &req.text)?;
    state.db_repo.get_user(user_id).await?;

    let mut session = state.db_repo.session();
    session.add_message(message);
    let message = session
        .commit()
        .await?
        .messages
        .pop()
        .ok_or_else(|| AppError::NotFound("created message".to_string()))?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// # GET /api/users/:user_id/timeline
/// Messages from the user and everyone they follow, newest first.
pub async fn get_timeline(
    Path(user_id): Path<i32>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<TimelineParams>,
) -> Result<Json<Vec<Message>>, AppError> {
    state.db_repo.get_user(user_id).await?;
    let limit = params.limit.clamp(1, DEFAULT_TIMELINE_LIMIT);
    Ok(Json(state.db_repo.timeline(user_id, limit).await?))
}

/// # POST /api/users/:user_id/likes/:message_id
pub async fn like_message(
    Path((user_id, message_id)): Path<(i32, i32)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    let (user, message) = user_and_message(&state, user_id, message_id).await?;
    let mut session = state.db_repo.session();
    session.like(&user, &message);
    session.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # DELETE /api/users/:user_id/likes/:message_id
pub async fn unlike_message(
    Path((user_id, message_id)): Path<(i32, i32)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    let (user, message) = user_and_message(&state, user_id, message_id).await?;
    let mut session = state.db_repo.session();
    session.unlike(&user, &message);
    session.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn user_and_message(
    state: &AppState,
    user_id: i32,
    message_id: i32,
) -> Result<(User, Message), AppError> {
    let user = state.db_repo.get_user(user_id).await?;
    let message = state
        .db_repo
        .find_message(message_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("message {message_id}")))?;
    Ok((user, message))
}
