use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// A comment with the title of the post it was left on.
#[derive(Debug, Clone, FromRow)]
pub struct OwnCommentRow {
    pub id: Uuid,
    pub body: String,
    pub post_title: String,
}

/// A single comment with its author.
#[derive(Debug, Clone, FromRow)]
pub struct CommentDetailRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub body: String,
    pub author: String,
    pub created_at: OffsetDateTime,
}

/// Comment joined with its author, as listed under a post.
#[derive(Debug, Clone, FromRow)]
pub struct PostCommentRow {
    pub id: Uuid,
    pub body: String,
    pub author: String,
}
