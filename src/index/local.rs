//! Local SQLite + sqlite-vec index.
//!
//! Stores documents in a `documents` table and their embeddings in a
//! `documents_vec` vec0 table using cosine distance. The vector width is fixed
//! when the file is created and recorded in `index_meta`; reopening with a
//! different dimensionality is refused.

use std::path::Path;
use std::sync::{Arc, Mutex, Once};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use sqlite_vec::sqlite3_vec_init;

use super::{IndexRecord, VectorIndexClient, UNKNOWN_TITLE};
use crate::error::IndexError;
use crate::retrieval::types::ReferenceDocument;

static SQLITE_VEC_INIT: Once = Once::new();

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
fn vector_to_bytes(vector: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            vector.as_ptr() as *const u8,
            std::mem::size_of_val(vector),
        )
    }
}

fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Create tables and record the vector width. Idempotent for the same width.
fn init_schema(conn: &Connection, dimensions: usize) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = 'dimensions'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        Some(value) => {
            let stored_dims: usize = value
                .parse()
                .with_context(|| format!("corrupt dimensions entry: {value}"))?;
            anyhow::ensure!(
                stored_dims == dimensions,
                "index was built with {stored_dims}-dimensional vectors but {dimensions} are configured"
            );
        }
        None => {
            conn.execute(
                "INSERT INTO index_meta (key, value) VALUES ('dimensions', ?1)",
                params![dimensions.to_string()],
            )?;
        }
    }

    // vec0 table must be created separately (sqlite-vec syntax)
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS documents_vec USING vec0(
            id TEXT PRIMARY KEY,
            embedding FLOAT[{dimensions}] distance_metric=cosine
        );"
    ))?;

    Ok(())
}

/// Offline vector index backed by a single SQLite file.
pub struct LocalIndex {
    conn: Arc<Mutex<Connection>>,
    dimensions: usize,
}

impl LocalIndex {
    /// Open (or create) the index at `path`.
    pub fn open(path: impl AsRef<Path>, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        load_sqlite_vec();

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open index at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;
        init_schema(&conn, dimensions).context("failed to initialize index schema")?;

        tracing::info!(path = %path.display(), dimensions, "local index opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions,
        })
    }

    /// Open an in-memory index, for tests and throwaway sessions.
    pub fn open_in_memory(dimensions: usize) -> Result<Self> {
        load_sqlite_vec();
        let conn = Connection::open_in_memory().context("failed to open in-memory index")?;
        init_schema(&conn, dimensions)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Insert or replace records. Records without an id get a UUID v7.
    /// Returns the number of records written.
    pub fn upsert(&self, records: &[IndexRecord]) -> Result<usize, IndexError> {
        for record in records {
            self.check_dimensions(&record.values)?;
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| IndexError::Task(format!("index lock poisoned: {e}")))?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().to_rfc3339();

        for record in records {
            let id = record
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
            let title = record
                .metadata
                .title
                .clone()
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
            let text = record.metadata.text.clone().unwrap_or_default();

            tx.execute(
                "INSERT INTO documents (id, title, text, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET title = excluded.title, text = excluded.text",
                params![id, title, text, now],
            )?;
            // vec0 has no upsert; replace by delete + insert
            tx.execute("DELETE FROM documents_vec WHERE id = ?1", params![id])?;
            tx.execute(
                "INSERT INTO documents_vec (id, embedding) VALUES (?1, ?2)",
                params![id, vector_to_bytes(&record.values)],
            )?;
        }

        tx.commit()?;
        tracing::info!(count = records.len(), "records upserted into local index");
        Ok(records.len())
    }

    /// Number of documents stored.
    pub fn count(&self) -> Result<usize, IndexError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IndexError::Task(format!("index lock poisoned: {e}")))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimensions {
            return Err(IndexError::Dimension {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndexClient for LocalIndex {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ReferenceDocument>, IndexError> {
        self.check_dimensions(vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = Arc::clone(&self.conn);
        let query = vector.to_vec();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| IndexError::Task(format!("index lock poisoned: {e}")))?;
            knn_search(&conn, &query, top_k)
        })
        .await
        .map_err(|e| IndexError::Task(format!("search task failed: {e}")))?
    }
}

/// Vector KNN search via sqlite-vec, hydrated with title, text, and the
/// stored vector. Similarity is `1 - cosine distance`.
fn knn_search(
    conn: &Connection,
    vector: &[f32],
    top_k: usize,
) -> Result<Vec<ReferenceDocument>, IndexError> {
    let mut knn = conn.prepare(
        "SELECT id, distance, embedding FROM documents_vec \
         WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
    )?;
    let hits = knn
        .query_map(params![vector_to_bytes(vector), top_k as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut doc_stmt = conn.prepare("SELECT title, text FROM documents WHERE id = ?1")?;
    let mut docs = Vec::with_capacity(hits.len());
    for (id, distance, embedding) in hits {
        let (title, text) = doc_stmt
            .query_row(params![id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .optional()?
            .unwrap_or_else(|| (UNKNOWN_TITLE.to_string(), String::new()));
        docs.push(ReferenceDocument {
            id,
            vector: bytes_to_vector(&embedding),
            text,
            title,
            score: (1.0 - distance) as f32,
        });
    }
    Ok(docs)
}
