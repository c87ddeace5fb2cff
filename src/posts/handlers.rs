use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{PostItem, PostRequest, UserPosts},
    repo,
};
use crate::{
    auth::{dto::Message, extractors::CurrentUser},
    authz::OwnershipGate,
    error::ApiError,
    state::AppState,
};

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", put(update_post).delete(delete_post))
}

fn title(payload: &PostRequest) -> Result<&str, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        warn!("empty post title");
        return Err(ApiError::BadRequest("Title must not be empty".into()));
    }
    Ok(title)
}

#[instrument(skip_all, fields(username = %user.username))]
pub async fn list_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserPosts>, ApiError> {
    let posts = repo::list_by_owner(&state.db, &user.username).await?;
    Ok(Json(UserPosts {
        username: user.username,
        posts: posts.into_iter().map(PostItem::from).collect(),
    }))
}

#[instrument(skip_all, fields(username = %user.username))]
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PostRequest>,
) -> Result<(StatusCode, Json<PostItem>), ApiError> {
    let title = title(&payload)?;
    let post = repo::create(&state.db, &user.username, title)
        .await?
        .ok_or_else(|| ApiError::Conflict("Failed to create post!".into()))?;
    info!(post_id = %post.id, "post created");
    Ok((StatusCode::CREATED, Json(post.into())))
}

#[instrument(skip(gate, user, payload), fields(username = %user.username))]
pub async fn update_post(
    State(gate): State<OwnershipGate>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<PostRequest>,
) -> Result<Json<PostItem>, ApiError> {
    let title = title(&payload)?;
    let post = gate.update_post(&user, post_id, title).await?;
    Ok(Json(post.into()))
}

#[instrument(skip(gate, user), fields(username = %user.username))]
pub async fn delete_post(
    State(gate): State<OwnershipGate>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    gate.delete_post(&user, post_id).await?;
    Ok(Json(Message::new("Post deleted.")))
}
