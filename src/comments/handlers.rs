use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CommentDetail, CommentItem, CommentRequest, OwnCommentItem, PostComments, UserComments,
    },
    repo,
};
use crate::{
    auth::{dto::Message, extractors::CurrentUser},
    authz::OwnershipGate,
    error::ApiError,
    state::AppState,
};

pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_comments))
        .route(
            "/comments/:id",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .route(
            "/posts/:id/comments",
            get(list_post_comments).post(create_comment),
        )
}

fn body(payload: &CommentRequest) -> Result<&str, ApiError> {
    let body = payload.comment.trim();
    if body.is_empty() {
        warn!("empty comment");
        return Err(ApiError::BadRequest("Comment must not be empty".into()));
    }
    Ok(body)
}

#[instrument(skip_all, fields(username = %user.username))]
pub async fn list_comments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserComments>, ApiError> {
    let rows = repo::list_by_owner(&state.db, &user.username).await?;
    Ok(Json(UserComments {
        username: user.username,
        comments: rows.into_iter().map(OwnCommentItem::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentDetail>, ApiError> {
    let row = repo::find(&state.db, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn list_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostComments>, ApiError> {
    let (post, comments) = repo::list_for_post(&state.db, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;
    Ok(Json(PostComments {
        post_id: post.id,
        title: post.title,
        comments: comments.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, user, payload), fields(username = %user.username))]
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentItem>), ApiError> {
    let body = body(&payload)?;
    let comment = repo::create(&state.db, &user.username, post_id, body)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;
    info!(comment_id = %comment.id, "comment created");
    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[instrument(skip(gate, user, payload), fields(username = %user.username))]
pub async fn update_comment(
    State(gate): State<OwnershipGate>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<CommentItem>, ApiError> {
    let body = body(&payload)?;
    let comment = gate.update_comment(&user, comment_id, body).await?;
    Ok(Json(comment.into()))
}

#[instrument(skip(gate, user), fields(username = %user.username))]
pub async fn delete_comment(
    State(gate): State<OwnershipGate>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    gate.delete_comment(&user, comment_id).await?;
    Ok(Json(Message::new("Comment deleted.")))
}
