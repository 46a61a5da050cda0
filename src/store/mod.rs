//! Embedded document store.
//!
//! Entities are kept as JSON bodies in a single SQLite table, partitioned by
//! collection name, and queried through SQLite's JSON functions. Every call is
//! moved onto the blocking pool and bounded by the configured store timeout.

mod collection;
mod media;
mod ratings;
mod users;
mod watchlist;

pub use collection::{Collection, Filter, Order};
pub use media::MediaStore;
pub use ratings::RatingStore;
pub use users::UserStore;
pub use watchlist::WatchlistStore;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    body       TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// Handle on the document database. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: DbPool,
    timeout: Duration,
}

impl Database {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::store(format!("creating {}: {e}", parent.display())))?;
        }
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder().max_size(8).build(manager)?;
        let db = Self { pool, timeout };
        db.migrate()?;
        info!("Opened document store at {}", path.display());
        Ok(db)
    }

    /// Single-connection in-memory database; every clone sees the same data.
    pub fn in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;
        let db = Self {
            pool,
            timeout: Duration::from_secs(10),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn collection<T>(&self, name: impl Into<String>) -> Collection<T> {
        Collection::new(self.clone(), name.into())
    }

    /// Round-trips a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        self.run(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map(|_| ())
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Runs `op` on a pooled connection off the async runtime, failing with a
    /// store error once the timeout elapses.
    pub(crate) async fn run<F, R>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<R> {
            let conn = pool.get()?;
            Ok(op(&conn)?)
        });
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::store(format!("store task failed: {join}"))),
            Err(_) => Err(Error::store(format!(
                "operation timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_answers_ping() {
        let db = Database::in_memory().unwrap();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn slow_operation_times_out_as_store_error() {
        let db = Database {
            timeout: Duration::from_millis(20),
            ..Database::in_memory().unwrap()
        };
        let res = db
            .run(|conn| {
                std::thread::sleep(Duration::from_millis(300));
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            })
            .await;
        match res {
            Err(Error::Store(msg)) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("expected store timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_database_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("cinevault-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("store.db");
        let db = Database::open(&path, Duration::from_secs(5)).unwrap();
        db.ping().await.unwrap();
        assert!(path.exists());
        drop(db);
        let _ = std::fs::remove_dir_all(dir);
    }
}
