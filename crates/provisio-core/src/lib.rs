//! All retrieval logic independent of how it is called (CLI or an agent host).
//!
//! A corpus (the built-in clauses, a directory of clause text files, or a PDF)
//! is chunked, embedded and indexed once, persisted in the app data directory
//! (see [app_data]), and reused until the source changes. Queries go through
//! [`QueryEngine`], which degrades to keyword matching when semantic search is
//! unavailable.

pub mod app_data;
pub mod chunks;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod keyword;
pub mod mock;
pub mod ollama;
pub mod persist;
pub mod query;
pub mod source;
pub mod store;
pub mod watcher;

pub use app_data::{app_data_dir, default_index_dir};
pub use chunks::{split, Chunk, ChunkConfig, ClauseMap, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
pub use config::{load_config, resolve_source, save_config, set_source, Config, ConfigFileError};
pub use embed::{Embedder, WithTimeout};
pub use error::{ConfigurationError, EmbeddingError, IndexUnavailable, PersistenceError};
pub use index::{CorpusIndex, CorpusManager, IndexOrigin};
pub use ollama::OllamaClient;
pub use persist::Fingerprint;
pub use query::{QueryEngine, QueryResponse, RetrievalMode, DEFAULT_K};
pub use source::{Document, DocumentSource, SourceError};
pub use store::{QueryResult, VectorIndex};
pub use watcher::{watch_source, WatchError};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "provisio-core ready"
}
