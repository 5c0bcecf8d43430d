pub mod repository;

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{User, Workspace};

/// Per-user workspace documents. Last write wins.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Returns an empty workspace for users that never saved anything.
    async fn load(&self, user: &User) -> Result<Workspace, AppError>;
    async fn save(&self, user: &User, workspace: &Workspace) -> Result<(), AppError>;

    async fn health(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Database(e.into()))?;

    info!("database ready at {}", database_url);
    Ok(pool)
}

pub struct SqliteWorkspaceStore {
    db: SqlitePool,
}

impl SqliteWorkspaceStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkspaceStore for SqliteWorkspaceStore {
    async fn load(&self, user: &User) -> Result<Workspace, AppError> {
        match repository::fetch_workspace(&self.db, &user.storage_key()).await? {
            Some(row) => {
                debug!("loaded workspace for {} (updated {})", row.user_key, row.updated_at);
                Ok(serde_json::from_str(&row.document)?)
            }
            None => Ok(Workspace::default()),
        }
    }

    async fn save(&self, user: &User, workspace: &Workspace) -> Result<(), AppError> {
        let document = serde_json::to_string(workspace)?;
        repository::upsert_workspace(&self.db, user, &document).await?;
        Ok(())
    }

    async fn health(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }
}

/// Keeps serialized documents in process memory.
#[derive(Default)]
pub struct MemoryWorkspaceStore {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryWorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkspaceStore for MemoryWorkspaceStore {
    async fn load(&self, user: &User) -> Result<Workspace, AppError> {
        let documents = self.documents.read().await;
        match documents.get(&user.storage_key()) {
            Some(document) => Ok(serde_json::from_str(document)?),
            None => Ok(Workspace::default()),
        }
    }

    async fn save(&self, user: &User, workspace: &Workspace) -> Result<(), AppError> {
        let document = serde_json::to_string(workspace)?;
        self.documents.write().await.insert(user.storage_key(), document);
        Ok(())
    }
}
