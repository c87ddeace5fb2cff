use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Comment, CommentDetailRow, OwnCommentRow, PostCommentRow};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct CommentItem {
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub commented_on: OffsetDateTime,
}

impl From<Comment> for CommentItem {
    fn from(c: Comment) -> Self {
        Self {
            comment_id: c.id,
            post_id: c.post_id,
            comment: c.body,
            commented_on: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OwnCommentItem {
    pub comment_id: Uuid,
    pub comment: String,
    pub on: String,
}

impl From<OwnCommentRow> for OwnCommentItem {
    fn from(r: OwnCommentRow) -> Self {
        Self {
            comment_id: r.id,
            comment: r.body,
            on: r.post_title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserComments {
    pub username: String,
    pub comments: Vec<OwnCommentItem>,
}

#[derive(Debug, Serialize)]
pub struct CommentDetail {
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub username: String,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub commented_on: OffsetDateTime,
}

impl From<CommentDetailRow> for CommentDetail {
    fn from(r: CommentDetailRow) -> Self {
        Self {
            comment_id: r.id,
            post_id: r.post_id,
            username: r.author,
            comment: r.body,
            commented_on: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostCommentItem {
    pub comment_id: Uuid,
    pub comment: String,
    pub by: String,
}

impl From<PostCommentRow> for PostCommentItem {
    fn from(r: PostCommentRow) -> Self {
        Self {
            comment_id: r.id,
            comment: r.body,
            by: r.author,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostComments {
    pub post_id: Uuid,
    pub title: String,
    pub comments: Vec<PostCommentItem>,
}
