//! Durable [`RecordStore`] backed by a `sqlx` connection pool.
//!
//! Uses the `Any` driver so the same code runs against `MySQL` in production
//! and `SQLite` in tests. Every write runs in its own transaction and every
//! operation carries a hard deadline independent of server shutdown.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use roster_core::{Record, RecordDraft};
use sqlx::any::{install_default_drivers, AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Row, Transaction};
use tracing::{debug, warn};
use url::Url;

use super::{new_record_id, RecordStore, StoreError};

/// Table created by the embedded migrations.
pub const RECORDS_TABLE: &str = "records";

const INSERT_SQL: &str = "INSERT INTO records (id, name, type) VALUES (?, ?, ?)";
const SELECT_ALL_SQL: &str = "SELECT id, name, type FROM records";
const SELECT_BY_ID_SQL: &str = "SELECT id, name, type FROM records WHERE id = ?";

/// Default per-operation deadline.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the durable store.
///
/// When `url` is set it is used verbatim; otherwise the URL is assembled from
/// the individual fields according to `driver`.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection URL override.
    pub url: Option<String>,
    /// `mysql` or `sqlite`.
    pub driver: String,
    /// Database name (`MySQL`) or file path (`SQLite`).
    pub name: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Maximum wait for a pooled connection.
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            driver: "mysql".to_string(),
            name: String::new(),
            username: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: "3306".to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl DatabaseConfig {
    /// Builds the connection URL. Credentials and the database name are
    /// percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` for unsupported drivers or an unusable
    /// host and port.
    pub fn connection_url(&self) -> Result<String, StoreError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        match self.driver.as_str() {
            "mysql" => self.mysql_url(),
            "sqlite" => Ok(format!("sqlite://{}?mode=rwc", self.name)),
            other => Err(StoreError::Config(format!(
                "unsupported database driver {other:?}"
            ))),
        }
    }

    fn mysql_url(&self) -> Result<String, StoreError> {
        let invalid = |what: &str| {
            StoreError::Config(format!(
                "invalid {what} for {}:{}",
                self.host, self.port
            ))
        };
        let mut url = Url::parse(&format!("mysql://{}:{}", self.host, self.port))
            .map_err(|_| invalid("database address"))?;
        // `Url` encodes reserved characters but passes `%` through, while the
        // driver percent-decodes every component.
        if !self.username.is_empty() {
            url.set_username(&escape_percent(&self.username))
                .map_err(|()| invalid("username"))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&escape_percent(&self.password)))
                .map_err(|()| invalid("password"))?;
        }
        url.set_path(&escape_percent(&self.name).replace('/', "%2F"));
        Ok(url.into())
    }

    fn pool_options(&self) -> AnyPoolOptions {
        AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

fn escape_percent(raw: &str) -> String {
    raw.replace('%', "%25")
}

/// Opens a pool and establishes the first connection immediately.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database is unreachable.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<AnyPool, StoreError> {
    install_default_drivers();
    let url = config.connection_url()?;
    Ok(config.pool_options().connect(&url).await?)
}

/// Builds a pool without connecting. Connections are opened on first use.
///
/// # Errors
///
/// Returns an error only if the URL cannot be parsed.
pub fn lazy_pool(config: &DatabaseConfig) -> Result<AnyPool, StoreError> {
    install_default_drivers();
    let url = config.connection_url()?;
    Ok(config.pool_options().connect_lazy(&url)?)
}

fn decode_row(row: &AnyRow) -> Result<Record, StoreError> {
    Ok(Record {
        id: row.try_get("id").map_err(StoreError::Decode)?,
        name: row.try_get("name").map_err(StoreError::Decode)?,
        record_type: row.try_get("type").map_err(StoreError::Decode)?,
    })
}

/// Transactional record store over a shared pool.
pub struct SqlStore {
    pool: AnyPool,
    operation_timeout: Duration,
}

impl SqlStore {
    /// Connects using `config`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unusable configuration or an unreachable
    /// database.
    pub async fn connect(
        config: &DatabaseConfig,
        operation_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = connect_pool(config).await?;
        Ok(Self::from_pool(pool, operation_timeout))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: AnyPool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
        }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn with_deadline<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => Err(StoreError::Timeout {
                operation,
                timeout: self.operation_timeout,
            }),
        }
    }

    /// Inserts `draft` under a caller-chosen id inside a single transaction.
    ///
    /// The deadline covers `BEGIN` and the `INSERT`. If it fires there, the
    /// dropped transaction guard rolls back. `COMMIT` is never cut short: once
    /// it has been sent, its own result is the answer, so an `Ok` always means
    /// the row is stored and an error always means it is not.
    pub(crate) async fn insert_with_id(
        &self,
        id: &str,
        draft: RecordDraft,
    ) -> Result<(), StoreError> {
        let tx = self
            .with_deadline("insert", self.stage_insert(id, draft))
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn stage_insert(
        &self,
        id: &str,
        draft: RecordDraft,
    ) -> Result<Transaction<'static, Any>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let executed = sqlx::query(INSERT_SQL)
            .bind(id.to_string())
            .bind(draft.name)
            .bind(draft.record_type)
            .execute(&mut *tx)
            .await;

        match executed {
            Ok(_) => Ok(tx),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback after failed insert did not complete");
                }
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl RecordStore for SqlStore {
    async fn insert(&self, draft: RecordDraft) -> Result<String, StoreError> {
        let id = new_record_id();
        self.insert_with_id(&id, draft).await?;
        debug!(%id, "record committed");
        Ok(id)
    }

    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        self.with_deadline("fetch_all", async {
            let mut rows = sqlx::query(SELECT_ALL_SQL).fetch(&self.pool);
            let mut records = Vec::new();
            while let Some(row) = rows.try_next().await? {
                records.push(decode_row(&row)?);
            }
            Ok(records)
        })
        .await
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Record, StoreError> {
        self.with_deadline("fetch_by_id", async {
            let row = sqlx::query(SELECT_BY_ID_SQL)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
            match row {
                Some(row) => decode_row(&row),
                None => Err(StoreError::NotFound { id: id.to_string() }),
            }
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
