use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;

use crate::auth::repo_types::{Identity, Removal};

/// Credential store the authenticator reads identities from.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Identity>>;

    /// Insert a new user. Returns `None` when the username is already taken.
    async fn create(
        &self,
        username: &str,
        dob: Date,
        password_hash: &str,
    ) -> anyhow::Result<Option<Identity>>;

    /// Replace date of birth and password hash. Returns `false` if the user is gone.
    async fn update_profile(
        &self,
        username: &str,
        dob: Date,
        password_hash: &str,
    ) -> anyhow::Result<bool>;

    /// Delete the user, or disable it when posts or comments still reference it.
    async fn remove(&self, username: &str) -> anyhow::Result<Removal>;
}

#[derive(Clone)]
pub struct PgIdentityStore {
    db: PgPool,
}

impl PgIdentityStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Identity>> {
        let user = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, username, password_hash, dob, disabled, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn create(
        &self,
        username: &str,
        dob: Date,
        password_hash: &str,
    ) -> anyhow::Result<Option<Identity>> {
        let user = sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO users (username, dob, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            RETURNING id, username, password_hash, dob, disabled, created_at
            "#,
        )
        .bind(username)
        .bind(dob)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        username: &str,
        dob: Date,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET dob = $1, password_hash = $2
             WHERE username = $3
            "#,
        )
        .bind(dob)
        .bind(password_hash)
        .bind(username)
        .execute(&self.db)
        .await
        .context("update user profile")?;
        Ok(res.rows_affected() == 1)
    }

    async fn remove(&self, username: &str) -> anyhow::Result<Removal> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Lock the row so no post or comment can be attached while we decide.
        let id: Option<uuid::Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE username = $1 FOR UPDATE")
                .bind(username)
                .fetch_optional(&mut *tx)
                .await
                .context("lock user")?;
        let Some(id) = id else {
            tx.commit().await.context("commit tx")?;
            return Ok(Removal::Deleted);
        };

        let owns_resources: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM posts WHERE user_id = $1)
                OR EXISTS (SELECT 1 FROM comments WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("check owned resources")?;

        let removal = if owns_resources {
            sqlx::query("UPDATE users SET disabled = TRUE WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("disable user")?;
            Removal::Deactivated
        } else {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("delete user")?;
            Removal::Deleted
        };

        tx.commit().await.context("commit tx")?;
        Ok(removal)
    }
}
