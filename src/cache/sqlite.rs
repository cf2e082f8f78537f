//! SQLite document cache

use super::traits::{CacheError, CacheKey, CacheResult, CachedDocument, DocumentCache, OpenCache};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed document cache
///
/// One row per cache key. Thread-safe via internal mutex on the connection.
pub struct SqliteDocumentCache {
    conn: Mutex<Connection>,
}

impl SqliteDocumentCache {
    fn init_schema(conn: &Connection) -> CacheResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                mime TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                bytes BLOB NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DocumentCache for SqliteDocumentCache {
    fn save(&self, key: CacheKey, document: &CachedDocument) -> CacheResult<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO documents (key, name, mime, updated_at, bytes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(key) DO UPDATE SET
                name = excluded.name,
                mime = excluded.mime,
                updated_at = excluded.updated_at,
                bytes = excluded.bytes
            "#,
            params![
                key.as_str(),
                document.name,
                document.mime,
                document.updated_at.to_rfc3339(),
                &document.bytes[..],
            ],
        )?;
        Ok(())
    }

    fn load(&self, key: CacheKey) -> CacheResult<Option<CachedDocument>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT name, mime, updated_at, bytes FROM documents WHERE key = ?1",
                params![key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((name, mime, updated_at, bytes)) = row else {
            return Ok(None);
        };
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| CacheError::DateParse(e.to_string()))?
            .with_timezone(&Utc);

        Ok(Some(CachedDocument {
            name,
            mime,
            bytes: Bytes::from(bytes),
            updated_at,
        }))
    }

    fn remove(&self, key: CacheKey) -> CacheResult<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM documents WHERE key = ?1", params![key.as_str()])?;
        Ok(deleted > 0)
    }
}

impl OpenCache for SqliteDocumentCache {
    fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
