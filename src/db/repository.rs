use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

use crate::models::{User, UserKind};

#[derive(Debug, Clone, FromRow)]
pub struct WorkspaceRow {
    pub user_key: String,
    pub user_kind: String,
    pub user_id: String,
    pub display_name: String,
    pub document: String,
    pub updated_at: String,
}

fn kind_label(kind: UserKind) -> &'static str {
    match kind {
        UserKind::Local => "local",
        UserKind::Federated => "federated",
    }
}

pub async fn fetch_workspace(db: &SqlitePool, user_key: &str) -> Result<Option<WorkspaceRow>, sqlx::Error> {
    sqlx::query_as::<_, WorkspaceRow>(
        "SELECT user_key, user_kind, user_id, display_name, document, updated_at FROM workspaces WHERE user_key = ?"
    )
    .bind(user_key)
    .fetch_optional(db)
    .await
}

pub async fn upsert_workspace(db: &SqlitePool, user: &User, document: &str) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO workspaces (user_key, user_kind, user_id, display_name, document, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(user_key) DO UPDATE SET
            display_name = excluded.display_name,
            document = excluded.document,
            updated_at = excluded.updated_at
        "#
    )
    .bind(user.storage_key())
    .bind(kind_label(user.kind))
    .bind(&user.id)
    .bind(&user.display_name)
    .bind(document)
    .bind(now)
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    #[tokio::test]
    async fn test_upsert_and_fetch_workspace() {
        let pool = setup_test_db().await;
        let user = User::local("Alice").unwrap();

        upsert_workspace(&pool, &user, r#"{"tasks":[]}"#)
            .await
            .expect("Failed to insert workspace");

        let row = fetch_workspace(&pool, &user.storage_key())
            .await
            .expect("Failed to fetch workspace")
            .expect("Workspace not found");
        assert_eq!(row.user_id, "alice");
        assert_eq!(row.user_kind, "local");
        assert_eq!(row.document, r#"{"tasks":[]}"#);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_document() {
        let pool = setup_test_db().await;
        let user = User::federated("uid-1", "Bob").unwrap();

        upsert_workspace(&pool, &user, "{}").await.expect("first write");
        upsert_workspace(&pool, &user, r#"{"courses":[]}"#).await.expect("second write");

        let row = fetch_workspace(&pool, &user.storage_key())
            .await
            .expect("Failed to fetch workspace")
            .expect("Workspace not found");
        assert_eq!(row.document, r#"{"courses":[]}"#);
        assert_eq!(row.user_kind, "federated");
    }

    #[tokio::test]
    async fn test_fetch_missing_workspace() {
        let pool = setup_test_db().await;
        let row = fetch_workspace(&pool, "local:nobody").await.expect("query");
        assert!(row.is_none());
    }
}
