//! Error taxonomy shared across the retrieval pipeline.
//!
//! Configuration errors are fatal at setup time. Embedding and persistence
//! errors are recoverable: the corpus manager treats a bad stored index as a
//! cache miss, and the query engine turns an unavailable index into keyword mode.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// Invalid setup parameters. Never silently corrected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("chunk size must be positive")]
    ZeroChunkSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
    #[error("k must be at least 1")]
    ZeroK,
    #[error("query vector has {actual} dimensions, index has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("query vector contains a non-finite value")]
    NonFiniteQuery,
}

/// Failure of the embedding capability.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("invalid embedding endpoint: {0}")]
    Endpoint(String),
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("embedding provider returned an empty vector")]
    Empty,
    #[error("expected {expected} embeddings, provider returned {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding {0} of the batch contains a non-finite value")]
    NonFinite(usize),
}

/// A stored index that cannot be trusted. Always handled as a cache miss.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no stored index at {0}")]
    Missing(PathBuf),
    #[error("failed to read stored index {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("stored index is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u32),
    #[error("stored entry {entry} has {actual} dimensions, index declares {expected}")]
    Dimension {
        entry: usize,
        expected: usize,
        actual: usize,
    },
    #[error("stored entry {0} contains a non-finite value")]
    NonFinite(usize),
    #[error("failed to write index to {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

/// The corpus manager could not produce a usable index.
#[derive(Debug, Error)]
pub enum IndexUnavailable {
    #[error("document source unavailable: {0}")]
    Source(#[from] SourceError),
    #[error("embedding provider unavailable: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
}
