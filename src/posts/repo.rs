use anyhow::Context;
use sqlx::PgPool;

use super::repo_types::Post;
use crate::db::fk_race_as_none;

/// Posts owned by `username`, newest first.
pub async fn list_by_owner(db: &PgPool, username: &str) -> anyhow::Result<Vec<Post>> {
    let rows = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.title, p.created_at
          FROM posts p
          JOIN users u ON u.id = p.user_id
         WHERE u.username = $1
         ORDER BY p.created_at DESC
        "#,
    )
    .bind(username)
    .fetch_all(db)
    .await
    .context("list posts by owner")?;
    Ok(rows)
}

/// Insert a post owned by `username`. `None` if the user row is gone.
pub async fn create(db: &PgPool, username: &str, title: &str) -> anyhow::Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (user_id, title)
        SELECT id, $2 FROM users WHERE username = $1
        RETURNING id, title, created_at
        "#,
    )
    .bind(username)
    .bind(title)
    .fetch_optional(db)
    .await;
    let post = fk_race_as_none(post).context("insert post")?;
    Ok(post)
}
