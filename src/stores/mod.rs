//! Persisted vector index.
//!
//! Each session owns one SQLite database file holding its chunk rows and
//! their embeddings (via the `sqlite-vec` extension). [`SqliteVectorIndex`]
//! is the only way in: building writes a fresh file, opening requires the
//! file to exist already, and both go through the same constructor checks.

mod sqlite;

pub use sqlite::{ChunkRecord, SqliteVectorIndex};
