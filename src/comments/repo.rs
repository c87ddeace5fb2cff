use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Comment, CommentDetailRow, OwnCommentRow, PostCommentRow};
use crate::{db::fk_race_as_none, posts::repo_types::Post};

/// Comments written by `username`, newest first.
pub async fn list_by_owner(db: &PgPool, username: &str) -> anyhow::Result<Vec<OwnCommentRow>> {
    let rows = sqlx::query_as::<_, OwnCommentRow>(
        r#"
        SELECT c.id, c.body, p.title AS post_title
          FROM comments c
          JOIN users u ON u.id = c.user_id
          JOIN posts p ON p.id = c.post_id
         WHERE u.username = $1
         ORDER BY c.created_at DESC
        "#,
    )
    .bind(username)
    .fetch_all(db)
    .await
    .context("list comments by owner")?;
    Ok(rows)
}

/// Insert a comment by `username` on `post_id`. `None` if the post does not exist.
pub async fn create(
    db: &PgPool,
    username: &str,
    post_id: Uuid,
    body: &str,
) -> anyhow::Result<Option<Comment>> {
    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (user_id, post_id, body)
        SELECT u.id, p.id, $3
          FROM users u
          JOIN posts p ON p.id = $2
         WHERE u.username = $1
        RETURNING id, post_id, body, created_at
        "#,
    )
    .bind(username)
    .bind(post_id)
    .bind(body)
    .fetch_optional(db)
    .await;
    let comment = fk_race_as_none(comment).context("insert comment")?;
    Ok(comment)
}

pub async fn find(db: &PgPool, comment_id: Uuid) -> anyhow::Result<Option<CommentDetailRow>> {
    let row = sqlx::query_as::<_, CommentDetailRow>(
        r#"
        SELECT c.id, c.post_id, c.body, u.username AS author, c.created_at
          FROM comments c
          JOIN users u ON u.id = c.user_id
         WHERE c.id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(db)
    .await
    .context("find comment")?;
    Ok(row)
}

/// A post and its comments, read from one snapshot. `None` if the post does not exist.
pub async fn list_for_post(
    db: &PgPool,
    post_id: Uuid,
) -> anyhow::Result<Option<(Post, Vec<PostCommentRow>)>> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await
        .context("set isolation")?;

    let post = sqlx::query_as::<_, Post>("SELECT id, title, created_at FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .context("find post")?;
    let Some(post) = post else {
        tx.commit().await.context("commit tx")?;
        return Ok(None);
    };

    let comments = sqlx::query_as::<_, PostCommentRow>(
        r#"
        SELECT c.id, c.body, u.username AS author
          FROM comments c
          JOIN users u ON u.id = c.user_id
         WHERE c.post_id = $1
         ORDER BY c.created_at ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(&mut *tx)
    .await
    .context("list post comments")?;

    tx.commit().await.context("commit tx")?;
    Ok(Some((post, comments)))
}
