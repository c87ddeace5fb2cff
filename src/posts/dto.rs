use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Post;

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct PostItem {
    pub post_id: Uuid,
    pub post_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Post> for PostItem {
    fn from(p: Post) -> Self {
        Self {
            post_id: p.id,
            post_title: p.title,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserPosts {
    pub username: String,
    pub posts: Vec<PostItem>,
}
