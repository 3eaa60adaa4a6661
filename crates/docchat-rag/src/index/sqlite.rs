//! SQLite collection store: one table per document
//!
//! A rebuild writes the new generation into a staging table and, inside the
//! same transaction, drops the live table and renames the staging table into
//! its place. The `collections` catalog maps document ids to table names.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{Chunk, CollectionInfo, DocumentId};

use super::{Collection, CollectionStore};

/// SQLite-backed collection store
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::index(format!("Failed to open {}: {}", path.display(), e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate(true)?;
        Ok(store)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::index(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate(false)?;
        Ok(store)
    }

    fn migrate(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                "#,
            )?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                document_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                dimensions INTEGER NOT NULL,
                chunk_count INTEGER NOT NULL,
                metadata TEXT NOT NULL,
                ingested_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Run a blocking closure against the connection off the async runtime
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    /// Names of all physical tables, catalog excluded
    pub async fn table_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name != 'collections' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })
        .await
    }
}

#[async_trait]
impl CollectionStore for SqliteStore {
    async fn replace(&self, collection: Collection) -> Result<()> {
        self.with_conn(move |conn| replace_collection(conn, &collection))
            .await
    }

    async fn load(&self, document_id: DocumentId) -> Result<Option<Arc<Collection>>> {
        self.with_conn(move |conn| load_collection(conn, document_id))
            .await
            .map(|c| c.map(Arc::new))
    }

    async fn remove(&self, document_id: DocumentId) -> Result<bool> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let name: Option<String> = tx
                .query_row(
                    "SELECT name FROM collections WHERE document_id = ?1",
                    params![document_id],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(name) = name else {
                return Ok(false);
            };
            check_identifier(&name)?;

            tx.execute_batch(&format!(r#"DROP TABLE IF EXISTS "{}";"#, name))?;
            tx.execute(
                "DELETE FROM collections WHERE document_id = ?1",
                params![document_id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn info(&self, document_id: DocumentId) -> Result<Option<CollectionInfo>> {
        self.with_conn(move |conn| {
            let info = conn
                .query_row(
                    "SELECT name, dimensions, chunk_count, ingested_at FROM collections WHERE document_id = ?1",
                    params![document_id],
                    |row| {
                        Ok(CollectionInfo {
                            document_id,
                            name: row.get(0)?,
                            dimensions: row.get::<_, i64>(1)? as usize,
                            chunk_count: row.get::<_, i64>(2)? as usize,
                            ingested_at: parse_timestamp(&row.get::<_, String>(3)?),
                        })
                    },
                )
                .optional()?;
            Ok(info)
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

fn replace_collection(conn: &mut Connection, collection: &Collection) -> Result<()> {
    let name = &collection.name;
    check_identifier(name)?;
    let staging = format!("{}__staging", name);

    let tx = conn.transaction()?;

    tx.execute_batch(&format!(
        r#"
        DROP TABLE IF EXISTS "{staging}";
        CREATE TABLE "{staging}" (
            id TEXT PRIMARY KEY,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            vector BLOB NOT NULL
        );
        "#
    ))?;

    {
        let mut stmt = tx.prepare(&format!(
            r#"INSERT INTO "{staging}" (id, chunk_index, text, vector) VALUES (?1, ?2, ?3, ?4)"#
        ))?;
        for chunk in &collection.chunks {
            stmt.execute(params![
                chunk.id,
                chunk.index as i64,
                chunk.text,
                encode_vector(&chunk.vector),
            ])?;
        }
    }

    // The live table may have been written under a different prefix
    let previous: Option<String> = tx
        .query_row(
            "SELECT name FROM collections WHERE document_id = ?1",
            params![collection.document_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(previous) = previous.filter(|p| p != name) {
        check_identifier(&previous)?;
        tx.execute_batch(&format!(r#"DROP TABLE IF EXISTS "{}";"#, previous))?;
    }

    tx.execute_batch(&format!(
        r#"
        DROP TABLE IF EXISTS "{name}";
        ALTER TABLE "{staging}" RENAME TO "{name}";
        "#
    ))?;

    tx.execute(
        r#"
        INSERT OR REPLACE INTO collections
            (document_id, name, dimensions, chunk_count, metadata, ingested_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            collection.document_id,
            name,
            collection.dimensions as i64,
            collection.chunks.len() as i64,
            serde_json::to_string(&collection.metadata)?,
            collection.ingested_at.to_rfc3339(),
        ],
    )?;

    tx.commit()?;
    Ok(())
}

fn load_collection(conn: &mut Connection, document_id: DocumentId) -> Result<Option<Collection>> {
    let row = conn
        .query_row(
            "SELECT name, dimensions, metadata, ingested_at FROM collections WHERE document_id = ?1",
            params![document_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((name, dimensions, metadata, ingested_at)) = row else {
        return Ok(None);
    };
    check_identifier(&name)?;

    let mut stmt = conn.prepare(&format!(
        r#"SELECT id, chunk_index, text, vector FROM "{}" ORDER BY chunk_index"#,
        name
    ))?;
    let chunks = stmt
        .query_map([], |row| {
            let blob: Vec<u8> = row.get(3)?;
            Ok(Chunk {
                id: row.get(0)?,
                index: row.get::<_, i64>(1)? as usize,
                text: row.get(2)?,
                vector: decode_vector(&blob),
                source_document_id: document_id,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)?;

    Ok(Some(Collection {
        document_id,
        name,
        dimensions: dimensions as usize,
        chunks,
        metadata,
        ingested_at: parse_timestamp(&ingested_at),
    }))
}

/// Table names are interpolated into SQL, so only plain identifiers pass
fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::index(format!("Invalid collection name: {:?}", name)))
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
