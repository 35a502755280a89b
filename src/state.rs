use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::mail::{self, Mailer};
use crate::storage::{S3Storage, StorageClient};
use crate::users::repo::{PgUserRepo, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserRepo>,
    pub mailer: Arc<dyn Mailer>,
    /// `None` when no object store is configured; uploads are then refused.
    pub storage: Option<Arc<dyn StorageClient>>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let storage = match &config.storage {
            Some(cfg) => Some(Arc::new(S3Storage::new(cfg).await?) as Arc<dyn StorageClient>),
            None => {
                tracing::warn!("STORAGE_ENDPOINT not set; photo uploads disabled");
                None
            }
        };

        Ok(Self::from_parts(
            Arc::new(config.clone()),
            Arc::new(PgUserRepo::new(db)),
            mail::from_config(&config.mail),
            storage,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        mailer: Arc<dyn Mailer>,
        storage: Option<Arc<dyn StorageClient>>,
    ) -> Self {
        Self {
            jwt: JwtKeys::from(&config.jwt),
            config,
            users,
            mailer,
            storage,
        }
    }
}
