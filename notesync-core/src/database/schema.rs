//! SQLite-backed record store and its schema.

use crate::database::LocalStore;
use crate::sync::models::{ContentShape, NoteRecord, PlainContent, SyncMetadata, SyncState};
use crate::{DatabaseError, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Current schema version. Incremented when the schema changes.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Record store persisted in a SQLite database.
///
/// Statements run on tokio's blocking pool so disk I/O never stalls a
/// runtime worker.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (and initialize if needed) a database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(DatabaseError::Sqlite)?;
        Self::with_connection(conn)
    }

    /// Create a new in-memory database for testing
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Sqlite)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self, context: &str) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned(context.to_string()).into())
    }

    /// Run `op` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, context: &'static str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DatabaseError::LockPoisoned(context.to_string()))?;
            op(&guard).map_err(DatabaseError::Sqlite)
        })
        .await
        .map_err(|e| DatabaseError::TaskFailed(format!("{}: {}", context, e)))?
        .map_err(Into::into)
    }

    /// Create tables if they do not exist and check the schema version
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn("initialize schema")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS db_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                last_modified INTEGER,
                status TEXT NOT NULL DEFAULT 'created'
            );
            CREATE TABLE IF NOT EXISTS sync_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                collection_timestamp INTEGER,
                last_sync_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_records_status ON records(status);",
        )
        .map_err(DatabaseError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO db_metadata (id, version) VALUES (1, ?1)",
            [CURRENT_SCHEMA_VERSION],
        )
        .map_err(DatabaseError::Sqlite)?;

        let version: i32 = conn
            .query_row("SELECT version FROM db_metadata WHERE id = 1", [], |row| {
                row.get(0)
            })
            .map_err(DatabaseError::Sqlite)?;

        if version != CURRENT_SCHEMA_VERSION {
            return Err(DatabaseError::Serialization(format!(
                "Unsupported schema version {} (expected {})",
                version, CURRENT_SCHEMA_VERSION
            ))
            .into());
        }
        Ok(())
    }

    fn row_to_record(
        id: String,
        content: String,
        last_modified: Option<i64>,
        status: String,
    ) -> Result<NoteRecord> {
        let shape: ContentShape = serde_json::from_str(&content)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        Ok(NoteRecord {
            id,
            content: PlainContent::from(shape),
            last_modified,
            status: SyncState::parse(&status)?,
        })
    }
}

type RecordRow = (String, String, Option<i64>, String);

const SELECT_RECORD: &str = "SELECT id, content, last_modified, status FROM records";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<NoteRecord>> {
        let id = id.to_string();
        let row = self
            .blocking("get record", move |conn| {
                conn.query_row(&format!("{} WHERE id = ?1", SELECT_RECORD), [id], read_row)
                    .optional()
            })
            .await?;

        row.map(|(id, content, last_modified, status)| {
            Self::row_to_record(id, content, last_modified, status)
        })
        .transpose()
    }

    async fn put(&self, record: &NoteRecord) -> Result<()> {
        let content = serde_json::to_string(&record.content)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let id = record.id.clone();
        let last_modified = record.last_modified;
        let status = record.status.as_str();

        self.blocking("put record", move |conn| {
            conn.execute(
                "INSERT INTO records (id, content, last_modified, status)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    content = excluded.content,
                    last_modified = excluded.last_modified,
                    status = excluded.status",
                rusqlite::params![id, content, last_modified, status],
            )
        })
        .await?;
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<NoteRecord>> {
        let rows = self
            .blocking("list pending", |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE status != 'synced' ORDER BY id",
                    SELECT_RECORD
                ))?;
                let rows = stmt
                    .query_map([], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            })
            .await?;

        rows.into_iter()
            .map(|(id, content, last_modified, status)| {
                Self::row_to_record(id, content, last_modified, status)
            })
            .collect()
    }

    async fn sync_metadata(&self) -> Result<SyncMetadata> {
        let metadata = self
            .blocking("load sync metadata", |conn| {
                conn.query_row(
                    "SELECT collection_timestamp, last_sync_at FROM sync_metadata WHERE id = 1",
                    [],
                    |row| {
                        Ok(SyncMetadata {
                            collection_timestamp: row.get(0)?,
                            last_sync_at: row.get(1)?,
                        })
                    },
                )
                .optional()
            })
            .await?;
        Ok(metadata.unwrap_or_default())
    }

    async fn save_sync_metadata(&self, metadata: &SyncMetadata) -> Result<()> {
        let collection_timestamp = metadata.collection_timestamp;
        let last_sync_at = metadata.last_sync_at;

        self.blocking("save sync metadata", move |conn| {
            conn.execute(
                "INSERT INTO sync_metadata (id, collection_timestamp, last_sync_at)
                 VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                    collection_timestamp = excluded.collection_timestamp,
                    last_sync_at = excluded.last_sync_at",
                rusqlite::params![collection_timestamp, last_sync_at],
            )
        })
        .await?;
        Ok(())
    }
}
