//! SQLite connection handle shared by the server and module tests.
//!
//! Builds a sqlx pool with per-connection PRAGMAs and exposes it to SeaORM.
//!
//! # Example
//! ```rust,no_run
//! # async fn demo() -> db::Result<()> {
//! use db::{ConnectOpts, DbHandle};
//! use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
//!
//! let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//! db.sea()
//!     .execute(Statement::from_string(DatabaseBackend::Sqlite, "SELECT 1"))
//!     .await?;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database URL not configured")]
    EmptyDsn,

    #[error("Invalid database DSN '{dsn}': {reason}")]
    InvalidDsn { dsn: String, reason: String },

    #[error("Unsupported database type: {0}")]
    UnsupportedScheme(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pool options. The in-memory DSN always uses a single pinned connection.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    /// Applied to every pooled connection via `PRAGMA busy_timeout`.
    pub sqlite_busy_timeout: Option<Duration>,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            acquire_timeout: Some(Duration::from_secs(30)),
            sqlite_busy_timeout: Some(Duration::from_millis(5_000)),
        }
    }
}

pub struct DbHandle {
    pool: SqlitePool,
    sea: DatabaseConnection,
}

pub fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Validate that the DSN uses a SQLite scheme.
pub fn detect_sqlite(dsn: &str) -> Result<()> {
    let raw = dsn.trim();
    if raw.is_empty() {
        return Err(DbError::EmptyDsn);
    }
    let url = url::Url::parse(raw).map_err(|e| DbError::InvalidDsn {
        dsn: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "sqlite" | "sqlite3" => Ok(()),
        other => Err(DbError::UnsupportedScheme(other.to_string())),
    }
}

/// Expand a `sqlite://` DSN into an absolute-path DSN using a base directory.
///
/// - In-memory DSNs become `sqlite::memory:`.
/// - Backslashes are normalized to forward slashes.
/// - `mode=rwc` is added when no query is given so the file is created on first use.
pub fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| DbError::InvalidDsn {
            dsn: dsn.to_string(),
            reason: "DSN must start with sqlite://".into(),
        })?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(DbError::InvalidDsn {
            dsn: dsn.to_string(),
            reason: "empty SQLite path".into(),
        });
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    out.push('?');
    out.push_str(query.unwrap_or("mode=rwc"));
    Ok(out)
}

impl DbHandle {
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        detect_sqlite(dsn)?;
        let memory = is_memory_dsn(dsn);

        let mut o = SqlitePoolOptions::new();
        if memory {
            // Every new connection to `:memory:` opens a fresh, empty database.
            o = o
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else if let Some(n) = opts.max_conns {
            o = o.max_connections(n);
        }
        if let Some(t) = opts.acquire_timeout {
            o = o.acquire_timeout(t);
        }

        let busy = opts.sqlite_busy_timeout;
        o = o.after_connect(move |conn, _meta| {
            Box::pin(async move {
                if !memory {
                    sqlx::query("PRAGMA journal_mode = WAL")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous = NORMAL")
                        .execute(&mut *conn)
                        .await?;
                }
                if let Some(ms) = busy {
                    // PRAGMA can't use bind parameters; use a numeric literal.
                    let ms = i64::try_from(ms.as_millis()).unwrap_or(i64::MAX);
                    let stmt = format!("PRAGMA busy_timeout = {ms}");
                    sqlx::query(&stmt).execute(&mut *conn).await?;
                }
                Ok(())
            })
        });

        let pool = o.connect(dsn).await?;
        let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
        tracing::debug!(memory, "SQLite pool ready");
        Ok(Self { pool, sea })
    }

    /// SeaORM connection (clone; cheap handle).
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    pub fn sqlx_sqlite(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

    #[tokio::test]
    async fn memory_connection_keeps_its_schema() -> Result<()> {
        let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
        let conn = db.sea();
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "CREATE TABLE t (id INTEGER PRIMARY KEY)",
        ))
        .await?;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "INSERT INTO t (id) VALUES (1)",
        ))
        .await?;
        let row = conn
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                "SELECT COUNT(*) AS n FROM t",
            ))
            .await?
            .expect("one row");
        let n: i64 = row.try_get("", "n")?;
        assert_eq!(n, 1);
        Ok(())
    }

    #[tokio::test]
    async fn file_database_is_created() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let dsn = absolutize_sqlite_dsn("sqlite://data/app.db", tmp.path(), true)?;
        let db = DbHandle::connect(&dsn, ConnectOpts::default()).await?;
        db.close().await;
        assert!(tmp.path().join("data/app.db").exists());
        Ok(())
    }

    #[test]
    fn detects_scheme() {
        assert!(detect_sqlite("sqlite://test.db").is_ok());
        assert!(detect_sqlite("sqlite::memory:").is_ok());
        assert!(matches!(
            detect_sqlite("postgres://localhost/test"),
            Err(DbError::UnsupportedScheme(s)) if s == "postgres"
        ));
        assert!(matches!(detect_sqlite("  "), Err(DbError::EmptyDsn)));
    }

    #[test]
    fn absolutize_relative_path() {
        let base = Path::new("/srv/home");
        let dsn = absolutize_sqlite_dsn("sqlite://db/users.db", base, false).unwrap();
        assert_eq!(dsn, "sqlite:///srv/home/db/users.db?mode=rwc");
    }

    #[test]
    fn absolutize_keeps_query_and_memory() {
        let base = Path::new("/srv/home");
        assert_eq!(
            absolutize_sqlite_dsn("sqlite:///abs/x.db?mode=ro", base, false).unwrap(),
            "sqlite:///abs/x.db?mode=ro"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://:memory:", base, false).unwrap(),
            "sqlite::memory:"
        );
        assert!(absolutize_sqlite_dsn("postgres://x", base, false).is_err());
    }
}
