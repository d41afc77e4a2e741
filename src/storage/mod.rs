pub mod schema;

use std::path::Path;

use log::{info, warn};
use rusqlite::OpenFlags;
use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};
use schema::SchemaCapabilities;

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_crm_tables.sql"))])
}

/// Handle on a CRM SQLite dataset.
///
/// Report queries only ever read. Files opened with [`Database::open_at`]
/// are opened read-only; [`Database::create_at`] and
/// [`Database::open_memory`] produce writable databases with the bundled
/// schema, for seeding and tests.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    read_only: bool,
}

impl Database {
    /// Open an existing CRM file read-only.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(format!("database {}", path.display())));
        }
        let conn = tokio_rusqlite::Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .await?;
        conn.call(|conn| {
            conn.execute_batch("PRAGMA busy_timeout=5000;")?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;

        Ok(Self {
            conn,
            read_only: true,
        })
    }

    /// Create (or upgrade) a writable warehouse at `path` with the bundled
    /// contacts/deals schema.
    pub async fn create_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = tokio_rusqlite::Connection::open(path).await?;
        Self::init_writable(&conn).await?;
        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Open an in-memory database with the bundled schema (for testing).
    pub async fn open_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writable(&conn).await?;
        Ok(Self {
            conn,
            read_only: false,
        })
    }

    async fn init_writable(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch("PRAGMA busy_timeout=5000;")
                .map_err(|e| e.to_string())?;
            migrations().to_latest(conn).map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Migration(e.to_string()))
    }

    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// The connection for seeding data. Fails on read-only datasets.
    pub fn writer(&self) -> Result<&tokio_rusqlite::Connection> {
        if self.read_only {
            return Err(Error::Database("database is opened read-only".into()));
        }
        Ok(&self.conn)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Probe which optional attribution columns this dataset has.
    pub async fn capabilities(&self) -> Result<SchemaCapabilities> {
        let caps = self
            .conn
            .call(|conn| SchemaCapabilities::probe(conn))
            .await?;

        info!("schema capabilities: {caps:?}");
        for field in caps.missing() {
            warn!(
                "contacts column {:?} not found; {} will read as (not set)",
                schema::column_for(field).1,
                field.name()
            );
        }
        Ok(caps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open_memory().await.unwrap();

        let tables: Vec<String> = db
            .reader()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
            })
            .await
            .unwrap();

        assert!(tables.contains(&"contacts".to_string()));
        assert!(tables.contains(&"deals".to_string()));
        assert!(!db.is_read_only());
    }

    #[tokio::test]
    async fn test_capabilities_full_schema() {
        let db = Database::open_memory().await.unwrap();
        let caps = db.capabilities().await.unwrap();
        assert_eq!(caps, SchemaCapabilities::all());
    }

    #[tokio::test]
    async fn test_open_at_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::open_at(dir.path().join("nope.db")).await.err().unwrap();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_open_at_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crm.db");
        {
            let db = Database::create_at(&path).await.unwrap();
            db.writer()
                .unwrap()
                .call(|conn| {
                    conn.execute(r#"INSERT INTO contacts ("ID") VALUES ('C1')"#, [])?;
                    Ok::<(), rusqlite::Error>(())
                })
                .await
                .unwrap();
        }

        let db = Database::open_at(&path).await.unwrap();
        assert!(db.is_read_only());
        assert!(db.writer().is_err());

        let write = db
            .reader()
            .call(|conn| {
                conn.execute(r#"INSERT INTO contacts ("ID") VALUES ('C2')"#, [])?;
                Ok::<(), rusqlite::Error>(())
            })
            .await;
        assert!(write.is_err());
    }

    #[tokio::test]
    async fn test_create_at_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("crm.db");
        Database::create_at(&path).await.unwrap();
        let db = Database::create_at(&path).await.unwrap();
        assert_eq!(db.capabilities().await.unwrap(), SchemaCapabilities::all());
    }
}
