use crate::auth::repo::{IdentityStore, PgIdentityStore};
use crate::authz::{PgResourceStore, ResourceStore};
use crate::config::AppConfig;
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub identities: Arc<dyn IdentityStore>,
    pub resources: Arc<dyn ResourceStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let identities = Arc::new(PgIdentityStore::new(db.clone())) as Arc<dyn IdentityStore>;
        let resources = Arc::new(PgResourceStore::new(db.clone())) as Arc<dyn ResourceStore>;

        Ok(Self {
            db,
            config,
            identities,
            resources,
        })
    }
}

#[cfg(test)]
pub(crate) use fake::FakeStore;
