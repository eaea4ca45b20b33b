use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use rig::OneOrMany;
use rig::embeddings::{Embedding, EmbeddingModel};
use rig_sqlite::{Column, ColumnValue, SqliteVectorStore, SqliteVectorStoreTable};
use tokio_rusqlite::{Connection, ffi};
use tracing::debug;
use uuid::Uuid;

use crate::chunking::Chunk;
use crate::types::RagError;

/// One indexed chunk as stored in the `chunks` table.
///
/// Numeric fields are stored as TEXT because the store serializes every
/// column value through its string representation; they are parsed back on
/// read.
#[derive(Clone, Debug)]
pub struct ChunkRecord {
    pub id: String,
    /// Sanitized file name of the originating PDF.
    pub source: String,
    /// Zero-based page number within the source file.
    pub page: usize,
    /// Zero-based chunk position within the page.
    pub chunk_index: usize,
    pub content: String,
}

impl From<Chunk> for ChunkRecord {
    fn from(chunk: Chunk) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: chunk.source,
            page: chunk.page,
            chunk_index: chunk.chunk_index,
            content: chunk.content,
        }
    }
}

impl SqliteVectorStoreTable for ChunkRecord {
    fn name() -> &'static str {
        "chunks"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("source", "TEXT").indexed(),
            Column::new("page", "TEXT"),
            Column::new("chunk_index", "TEXT"),
            Column::new("content", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("source", Box::new(self.source.clone())),
            ("page", Box::new(self.page.to_string())),
            ("chunk_index", Box::new(self.chunk_index.to_string())),
            ("content", Box::new(self.content.clone())),
        ]
    }
}

/// A session's vector index, backed by one SQLite file.
#[derive(Clone)]
pub struct SqliteVectorIndex<E>
where
    E: EmbeddingModel + 'static,
{
    store: SqliteVectorStore<E, ChunkRecord>,
    /// Separate handle for the raw similarity and count queries that the
    /// store wrapper does not cover. Clone of the store's own connection.
    conn: Connection,
}

impl<E> SqliteVectorIndex<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    /// Builds a fresh index at `path` from embedded chunk rows.
    ///
    /// An existing file at `path` is replaced wholesale; uploading again in
    /// the same session rebuilds the index rather than appending to it.
    pub async fn build(
        path: impl AsRef<Path>,
        model: &E,
        rows: Vec<(ChunkRecord, Vec<f32>)>,
    ) -> Result<Self, RagError> {
        let path = path.as_ref();
        if path.exists() {
            debug!(path = %path.display(), "replacing existing index file");
            tokio::fs::remove_file(path).await?;
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let index = Self::open(path, model).await?;
        index.insert_rows(rows).await?;
        Ok(index)
    }

    /// Opens the index previously built at `path`.
    ///
    /// Questions can only be asked against an index that exists; a missing
    /// file is reported as [`RagError::IndexNotFound`] instead of silently
    /// creating an empty one.
    pub async fn open_existing(path: impl AsRef<Path>, model: &E) -> Result<Self, RagError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RagError::IndexNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::open(path, model).await
    }

    async fn open(path: &Path, model: &E) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;
        // Clone connection for direct queries before moving into the store.
        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, model)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self {
            store,
            conn: conn_for_queries,
        })
    }

    async fn insert_rows(&self, rows: Vec<(ChunkRecord, Vec<f32>)>) -> Result<(), RagError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut prepared = Vec::with_capacity(rows.len());
        for (record, vector) in rows {
            let converted: Vec<f64> = vector.into_iter().map(f64::from).collect();
            let embedding = Embedding {
                document: record.content.clone(),
                vec: converted,
            };
            prepared.push((record, OneOrMany::one(embedding)));
        }
        self.store
            .add_rows(prepared)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(())
    }

    /// Returns the `top_k` chunks nearest to `query_embedding` by cosine
    /// distance, most similar first, each with its similarity score.
    pub async fn top_k(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkRecord, f32)>, RagError> {
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.id, c.source, c.page, c.chunk_index, c.content, \
                         vec_distance_cosine(e.embedding, vec_f32(?)) as distance \
                         FROM chunks c \
                         JOIN chunks_embeddings e ON c.id = e.id \
                         ORDER BY distance ASC \
                         LIMIT {}",
                        top_k
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        let record = ChunkRecord {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            page: row.get::<_, String>(2)?.parse().unwrap_or(0),
                            chunk_index: row.get::<_, String>(3)?.parse().unwrap_or(0),
                            content: row.get(4)?,
                        };
                        let distance: f32 = row.get(5)?;
                        // Cosine distance to similarity.
                        Ok((record, 1.0 - distance))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    /// Number of chunk rows in the index.
    pub async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

/// Registers sqlite-vec for every connection opened by this process.
fn register_sqlite_vec() -> Result<(), RagError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| unsafe {
        type SqliteExtensionInit = unsafe extern "C" fn(
            *mut ffi::sqlite3,
            *mut *mut c_char,
            *const ffi::sqlite3_api_routines,
        ) -> i32;

        let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
        let init_fn = transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
        let rc = ffi::sqlite3_auto_extension(Some(init_fn));
        if rc != 0 {
            Err(format!(
                "failed to register sqlite-vec extension (code {rc})"
            ))
        } else {
            Ok(())
        }
    })
    .clone()
    .map_err(RagError::Storage)
}
