//! Durable storage for vector indexes.
//!
//! Each logical index persists as one SQLite database under the store
//! directory: a single metadata row plus one row per chunk, with the f16
//! embedding stored as a blob. Multiple named indexes coexist as separate
//! files.
//!
//! Load failures are split along the line callers care about: a missing
//! file is [`RetrievalError::IndexNotFound`] (the lifecycle engine rebuilds
//! on that), while anything wrong *inside* an existing file is
//! [`RetrievalError::IndexCorrupt`] and is surfaced, never swallowed.

use crate::error::{Result, RetrievalError};
use crate::index::{IndexMetadata, IndexedChunk, VectorIndex};
use half::f16;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

const CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS index_metadata (
    name TEXT PRIMARY KEY,
    provider TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    chunk_size INTEGER NOT NULL,
    overlap INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    version TEXT NOT NULL
)
"#;

const CREATE_CHUNKS: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    sequence INTEGER PRIMARY KEY,
    start_offset INTEGER NOT NULL,
    page INTEGER,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL
)
"#;

/// Saves and loads [`VectorIndex`]es under a directory, keyed by name.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the database file backing `name`.
    pub fn index_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.db"))
    }

    /// Persist `index` under its metadata name, replacing any previous
    /// contents in a single transaction.
    pub async fn save(&self, index: &VectorIndex) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.index_path(&index.metadata().name);

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true),
        )
        .await?;

        sqlx::query(CREATE_METADATA).execute(&pool).await?;
        sqlx::query(CREATE_CHUNKS).execute(&pool).await?;

        let metadata = index.metadata();
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM index_metadata")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO index_metadata
            (name, provider, dimension, chunk_size, overlap, created_at, updated_at, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&metadata.name)
        .bind(&metadata.provider)
        .bind(metadata.dimension as i64)
        .bind(metadata.chunk_size as i64)
        .bind(metadata.overlap as i64)
        .bind(metadata.created_at)
        .bind(metadata.updated_at)
        .bind(&metadata.version)
        .execute(&mut *tx)
        .await?;

        for (chunk, vector) in index.chunks().iter().zip(index.vectors()) {
            let blob: &[u8] = bytemuck::cast_slice::<f16, u8>(vector);
            sqlx::query(
                r#"
                INSERT INTO chunks (sequence, start_offset, page, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(chunk.sequence as i64)
            .bind(chunk.offset as i64)
            .bind(chunk.page.map(|p| p as i64))
            .bind(&chunk.text)
            .bind(blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        pool.close().await;

        tracing::info!(
            "saved index {} ({} chunks, dimension {}) to {}",
            metadata.name,
            index.len(),
            metadata.dimension,
            path.display()
        );
        Ok(())
    }

    /// Load the index persisted under `name`.
    pub async fn load(&self, name: &str) -> Result<VectorIndex> {
        let path = self.index_path(name);
        if !path.exists() {
            return Err(RetrievalError::IndexNotFound {
                name: name.to_string(),
            });
        }
        self.load_existing(name, &path).await
    }

    async fn load_existing(&self, name: &str, path: &Path) -> Result<VectorIndex> {
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(false)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .map_err(|e| RetrievalError::corrupt(name, e.to_string()))?;

        let result = Self::read_index(&pool, name).await;
        pool.close().await;
        result
    }

    async fn read_index(pool: &SqlitePool, name: &str) -> Result<VectorIndex> {
        let corrupt = |detail: String| RetrievalError::corrupt(name, detail);

        let row = sqlx::query("SELECT * FROM index_metadata")
            .fetch_optional(pool)
            .await
            .map_err(|e| corrupt(e.to_string()))?
            .ok_or_else(|| corrupt("metadata row missing".to_string()))?;

        let metadata = IndexMetadata {
            name: row.get("name"),
            provider: row.get("provider"),
            dimension: row.get::<i64, _>("dimension") as usize,
            chunk_size: row.get::<i64, _>("chunk_size") as usize,
            overlap: row.get::<i64, _>("overlap") as usize,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            version: row.get("version"),
        };
        if metadata.name != name {
            return Err(corrupt(format!(
                "metadata names index {:?}, expected {:?}",
                metadata.name, name
            )));
        }
        if metadata.dimension == 0 {
            return Err(corrupt("metadata has zero dimension".to_string()));
        }

        let rows = sqlx::query(
            "SELECT sequence, start_offset, page, content, embedding FROM chunks ORDER BY sequence",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| corrupt(e.to_string()))?;
        if rows.is_empty() {
            return Err(corrupt("index has no chunks".to_string()));
        }

        let mut chunks = Vec::with_capacity(rows.len());
        let mut vectors = Vec::with_capacity(rows.len());
        for row in rows {
            let bytes: Vec<u8> = row.get("embedding");
            if bytes.len() != metadata.dimension * size_of::<f16>() {
                return Err(corrupt(format!(
                    "embedding blob is {} bytes, expected {}",
                    bytes.len(),
                    metadata.dimension * size_of::<f16>()
                )));
            }
            vectors.push(bytemuck::pod_collect_to_vec::<u8, f16>(&bytes));
            chunks.push(IndexedChunk {
                sequence: row.get::<i64, _>("sequence") as usize,
                offset: row.get::<i64, _>("start_offset") as usize,
                page: row.get::<Option<i64>, _>("page").map(|p| p as usize),
                text: row.get("content"),
            });
        }

        VectorIndex::build(metadata, chunks, vectors)
            .map_err(|e| RetrievalError::corrupt(name, e.to_string()))
    }

    /// Remove a persisted index. Returns whether a file was deleted.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.index_path(name);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(&path).await?;
        for suffix in ["-wal", "-shm"] {
            let side = PathBuf::from(format!("{}{suffix}", path.display()));
            if side.exists() {
                tokio::fs::remove_file(side).await?;
            }
        }
        Ok(true)
    }
}
