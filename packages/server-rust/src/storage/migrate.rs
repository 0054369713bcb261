//! Embedded schema migrations and the connect-with-retry bootstrap.

use sqlx::migrate::Migrator;
use sqlx::{AnyPool, Connection};
use tracing::info;

use super::StoreError;
use crate::backoff::{retry_forever, ExponentialBackoff};

/// Migrations under `packages/server-rust/migrations`, compiled into the binary.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every pending migration. Already-applied migrations are skipped,
/// so running against an up-to-date schema succeeds without changes.
///
/// # Errors
///
/// Returns `StoreError::Migration` if a migration fails or an applied
/// migration was modified after the fact.
pub async fn run_migrations(pool: &AnyPool) -> Result<(), StoreError> {
    MIGRATOR.run(pool).await?;
    info!(known = MIGRATOR.iter().count(), "schema migrations up to date");
    Ok(())
}

/// Blocks until a connection can be acquired and pinged, backing off between
/// attempts without an upper bound.
pub async fn wait_until_reachable(pool: &AnyPool, backoff: ExponentialBackoff) {
    retry_forever("database connect", backoff, move || async move {
        info!("connecting to database");
        let mut conn = pool.acquire().await?;
        conn.ping().await?;
        Ok::<(), sqlx::Error>(())
    })
    .await;
    info!("database reachable");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use roster_core::RecordDraft;

    use super::*;
    use crate::storage::sql::{
        connect_pool, lazy_pool, DatabaseConfig, SqlStore, DEFAULT_OPERATION_TIMEOUT, RECORDS_TABLE,
    };
    use crate::storage::RecordStore;

    fn sqlite_config(dir: &tempfile::TempDir) -> DatabaseConfig {
        DatabaseConfig {
            driver: "sqlite".to_string(),
            name: dir.path().join("migrate.db").display().to_string(),
            max_connections: 1,
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect_pool(&sqlite_config(&dir)).await.unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {RECORDS_TABLE}"))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn migrated_schema_serves_the_sql_store() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect_pool(&sqlite_config(&dir)).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let store = SqlStore::from_pool(pool, DEFAULT_OPERATION_TIMEOUT);
        let id = store.insert(RecordDraft::new("carol", "ops")).await.unwrap();
        assert_eq!(store.fetch_by_id(&id).await.unwrap().name, "carol");
        assert_eq!(store.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wait_until_reachable_returns_for_live_database() {
        let dir = tempfile::tempdir().unwrap();
        let pool = lazy_pool(&sqlite_config(&dir)).unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            wait_until_reachable(&pool, ExponentialBackoff::default()),
        )
        .await
        .expect("database should be reachable on the first attempt");
    }
}
