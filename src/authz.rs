//! Ownership checks for post and comment mutations.
//!
//! In Postgres every mutation runs in one transaction: the owner is read with
//! `SELECT ... FOR UPDATE`, checked, and the change applied before commit, so
//! a concurrent delete or re-parent cannot slip between check and act.

use std::{fmt, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use axum::extract::FromRef;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{errors::AuthError, repo_types::Identity},
    comments::repo_types::Comment,
    posts::repo_types::Post,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Post,
    Comment,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Post => f.write_str("Post"),
            Resource::Comment => f.write_str("Comment"),
        }
    }
}

/// Allows the mutation only when `owner` is the acting identity.
///
/// A missing resource and someone else's resource are the same answer.
pub fn authorize_mutation(
    identity: &Identity,
    owner: Option<&str>,
    resource: Resource,
) -> Result<(), AuthError> {
    match owner {
        Some(owner) if owner == identity.username => Ok(()),
        _ => Err(AuthError::ResourceNotFoundOrForbidden(resource)),
    }
}

/// Owner-checked post and comment mutations.
///
/// Each call checks the owner and applies the change as one atomic step. A
/// denied call changes nothing.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn update_post(
        &self,
        actor: &Identity,
        post_id: Uuid,
        title: &str,
    ) -> Result<Post, AuthError>;

    async fn delete_post(&self, actor: &Identity, post_id: Uuid) -> Result<(), AuthError>;

    async fn update_comment(
        &self,
        actor: &Identity,
        comment_id: Uuid,
        body: &str,
    ) -> Result<Comment, AuthError>;

    async fn delete_comment(&self, actor: &Identity, comment_id: Uuid) -> Result<(), AuthError>;
}

/// Handler-facing front of the [`ResourceStore`]; logs outcomes.
#[derive(Clone)]
pub struct OwnershipGate {
    store: Arc<dyn ResourceStore>,
}

impl FromRef<AppState> for OwnershipGate {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.resources.clone())
    }
}

fn log_denial(actor: &Identity, resource: Resource, id: Uuid, err: AuthError) -> AuthError {
    if matches!(err, AuthError::ResourceNotFoundOrForbidden(_)) {
        warn!(username = %actor.username, %resource, %id, "mutation denied");
    }
    err
}

impl OwnershipGate {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    pub async fn update_post(
        &self,
        actor: &Identity,
        post_id: Uuid,
        title: &str,
    ) -> Result<Post, AuthError> {
        let post = self
            .store
            .update_post(actor, post_id, title)
            .await
            .map_err(|e| log_denial(actor, Resource::Post, post_id, e))?;
        info!(username = %actor.username, %post_id, "post updated");
        Ok(post)
    }

    pub async fn delete_post(&self, actor: &Identity, post_id: Uuid) -> Result<(), AuthError> {
        self.store
            .delete_post(actor, post_id)
            .await
            .map_err(|e| log_denial(actor, Resource::Post, post_id, e))?;
        info!(username = %actor.username, %post_id, "post deleted");
        Ok(())
    }

    pub async fn update_comment(
        &self,
        actor: &Identity,
        comment_id: Uuid,
        body: &str,
    ) -> Result<Comment, AuthError> {
        let comment = self
            .store
            .update_comment(actor, comment_id, body)
            .await
            .map_err(|e| log_denial(actor, Resource::Comment, comment_id, e))?;
        info!(username = %actor.username, %comment_id, "comment updated");
        Ok(comment)
    }

    pub async fn delete_comment(&self, actor: &Identity, comment_id: Uuid) -> Result<(), AuthError> {
        self.store
            .delete_comment(actor, comment_id)
            .await
            .map_err(|e| log_denial(actor, Resource::Comment, comment_id, e))?;
        info!(username = %actor.username, %comment_id, "comment deleted");
        Ok(())
    }
}

/// Postgres [`ResourceStore`]: the owner row is read `FOR UPDATE` inside the
/// transaction that applies the change.
#[derive(Clone)]
pub struct PgResourceStore {
    db: PgPool,
}

impl PgResourceStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn update_post(
        &self,
        actor: &Identity,
        post_id: Uuid,
        title: &str,
    ) -> Result<Post, AuthError> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        check(&mut tx, actor, Resource::Post, post_id).await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
               SET title = $1
             WHERE id = $2
            RETURNING id, title, created_at
            "#,
        )
        .bind(title)
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .context("update post")?;

        tx.commit().await.context("commit tx")?;
        Ok(post)
    }

    async fn delete_post(&self, actor: &Identity, post_id: Uuid) -> Result<(), AuthError> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        check(&mut tx, actor, Resource::Post, post_id).await?;

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("delete post")?;

        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn update_comment(
        &self,
        actor: &Identity,
        comment_id: Uuid,
        body: &str,
    ) -> Result<Comment, AuthError> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        check(&mut tx, actor, Resource::Comment, comment_id).await?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
               SET body = $1
             WHERE id = $2
            RETURNING id, post_id, body, created_at
            "#,
        )
        .bind(body)
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await
        .context("update comment")?;

        tx.commit().await.context("commit tx")?;
        Ok(comment)
    }

    async fn delete_comment(&self, actor: &Identity, comment_id: Uuid) -> Result<(), AuthError> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        check(&mut tx, actor, Resource::Comment, comment_id).await?;

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await
            .context("delete comment")?;

        tx.commit().await.context("commit tx")?;
        Ok(())
    }
}

/// Locks the resource row and checks its owner. Dropping `tx` on error rolls back.
async fn check(
    tx: &mut Transaction<'_, Postgres>,
    actor: &Identity,
    resource: Resource,
    id: Uuid,
) -> Result<(), AuthError> {
    let sql = match resource {
        Resource::Post => {
            r#"
            SELECT u.username
              FROM posts p
              JOIN users u ON u.id = p.user_id
             WHERE p.id = $1
               FOR UPDATE OF p
            "#
        }
        Resource::Comment => {
            r#"
            SELECT u.username
              FROM comments c
              JOIN users u ON u.id = c.user_id
             WHERE c.id = $1
               FOR UPDATE OF c
            "#
        }
    };
    let owner: Option<String> = sqlx::query_scalar(sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .with_context(|| format!("lock {resource} owner"))?;

    authorize_mutation(actor, owner.as_deref(), resource)
}

#[cfg(test)]
mod tests {
    use time::{macros::date, OffsetDateTime};

    use super::*;
    use crate::state::FakeStore;

    fn identity(username: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: String::new(),
            dob: date!(1990 - 01 - 01),
            disabled: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn owner_is_allowed() {
        let alice = identity("alice");
        assert!(authorize_mutation(&alice, Some("alice"), Resource::Post).is_ok());
    }

    #[test]
    fn non_owner_and_missing_resource_are_indistinguishable() {
        let alice = identity("alice");
        let foreign = authorize_mutation(&alice, Some("bob"), Resource::Post).unwrap_err();
        let missing = authorize_mutation(&alice, None, Resource::Post).unwrap_err();
        assert!(matches!(
            foreign,
            AuthError::ResourceNotFoundOrForbidden(Resource::Post)
        ));
        assert!(matches!(
            missing,
            AuthError::ResourceNotFoundOrForbidden(Resource::Post)
        ));
        assert_eq!(foreign.to_string(), missing.to_string());
        assert_eq!(foreign.to_string(), "Post not found");
    }

    #[test]
    fn comparison_is_exact() {
        let alice = identity("alice");
        assert!(authorize_mutation(&alice, Some("Alice"), Resource::Comment).is_err());
        assert!(authorize_mutation(&alice, Some("alice "), Resource::Comment).is_err());
        assert_eq!(
            authorize_mutation(&alice, Some("bob"), Resource::Comment)
                .unwrap_err()
                .to_string(),
            "Comment not found"
        );
    }

    fn gate() -> (OwnershipGate, Arc<FakeStore>) {
        let store = Arc::new(FakeStore::default());
        (OwnershipGate::new(store.clone()), store)
    }

    #[tokio::test]
    async fn owner_updates_and_deletes_own_post() {
        let (gate, store) = gate();
        let alice = identity("alice");
        let post_id = store.add_post("alice", "draft");

        let post = gate.update_post(&alice, post_id, "final").await.unwrap();
        assert_eq!(post.title, "final");
        assert_eq!(store.post(post_id).unwrap().title, "final");

        let comment_id = store.add_comment("bob", post_id, "first!");
        gate.delete_post(&alice, post_id).await.unwrap();
        assert!(store.post(post_id).is_none());
        assert!(store.comment(comment_id).is_none(), "comments go with the post");
    }

    #[tokio::test]
    async fn foreign_post_is_left_untouched() {
        let (gate, store) = gate();
        let alice = identity("alice");
        let bobs = store.add_post("bob", "bob's post");

        let err = gate.update_post(&alice, bobs, "hijacked").await.unwrap_err();
        assert!(matches!(err, AuthError::ResourceNotFoundOrForbidden(Resource::Post)));
        let err = gate.delete_post(&alice, bobs).await.unwrap_err();
        assert!(matches!(err, AuthError::ResourceNotFoundOrForbidden(Resource::Post)));

        assert_eq!(store.post(bobs).unwrap().title, "bob's post");
    }

    #[tokio::test]
    async fn foreign_and_missing_post_fail_alike() {
        let (gate, store) = gate();
        let alice = identity("alice");
        let bobs = store.add_post("bob", "bob's post");

        let foreign = gate.update_post(&alice, bobs, "x").await.unwrap_err();
        let missing = gate.update_post(&alice, Uuid::new_v4(), "x").await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());

        let foreign = gate.delete_post(&alice, bobs).await.unwrap_err();
        let missing = gate.delete_post(&alice, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
    }

    #[tokio::test]
    async fn comment_mutations_follow_the_comment_owner() {
        let (gate, store) = gate();
        let alice = identity("alice");
        let bob = identity("bob");
        // bob's post, alice's comment: the comment is hers to change
        let post_id = store.add_post("bob", "bob's post");
        let comment_id = store.add_comment("alice", post_id, "nice");

        let err = gate
            .update_comment(&bob, comment_id, "edited by bob")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ResourceNotFoundOrForbidden(Resource::Comment)));
        assert!(gate.delete_comment(&bob, comment_id).await.is_err());
        assert_eq!(store.comment(comment_id).unwrap().body, "nice");

        let missing = gate
            .update_comment(&bob, Uuid::new_v4(), "x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), missing.to_string());

        let comment = gate
            .update_comment(&alice, comment_id, "very nice")
            .await
            .unwrap();
        assert_eq!(comment.body, "very nice");
        assert_eq!(comment.post_id, post_id);

        gate.delete_comment(&alice, comment_id).await.unwrap();
        assert!(store.comment(comment_id).is_none());
        assert!(store.post(post_id).is_some());
    }
}
