//! In-memory vector index for chunk embeddings. Supports batch add and exact
//! cosine-similarity search by linear scan, which keeps rankings reproducible.
//! Persistence lives in [`crate::persist`].

use serde::{Deserialize, Serialize};

use crate::chunks::Chunk;
use crate::embed::Embedder;
use crate::error::{ConfigurationError, EmbeddingError};

/// A chunk with its embedding, stored for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    /// Normalized embedding vector (unit length for cosine similarity via dot product).
    embedding: Vec<f32>,
}

impl IndexedChunk {
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub chunk: Chunk,
    /// Relevance in `[0, 1]`.
    pub score: f32,
    /// 1-based, dense.
    pub rank: usize,
}

/// Attach dense 1-based ranks to hits already sorted by descending score.
pub(crate) fn ranked(hits: impl IntoIterator<Item = (Chunk, f32)>) -> Vec<QueryResult> {
    hits.into_iter()
        .enumerate()
        .map(|(i, (chunk, score))| QueryResult {
            chunk,
            score,
            rank: i + 1,
        })
        .collect()
}

/// In-memory vector index. Every stored vector has the same dimensionality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    items: Vec<IndexedChunk>,
    dimension: usize,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored entries. Callers have already validated dimensionality.
    pub(crate) fn from_parts(items: Vec<IndexedChunk>, dimension: usize) -> Self {
        Self { items, dimension }
    }

    /// Embed `chunks` and store them. All-or-nothing: if any embedding fails, has
    /// the wrong dimensionality or holds a non-finite value, nothing is added.
    pub async fn add(
        &mut self,
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
    ) -> Result<(), EmbeddingError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            });
        }

        let expected = if self.items.is_empty() {
            embeddings[0].len()
        } else {
            self.dimension
        };
        if expected == 0 {
            return Err(EmbeddingError::Empty);
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }
        if let Some(i) = embeddings.iter().position(|e| !all_finite(e)) {
            return Err(EmbeddingError::NonFinite(i));
        }

        self.dimension = expected;
        self.items.extend(
            chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexedChunk {
                    chunk,
                    embedding: normalize(&embedding),
                }),
        );
        Ok(())
    }

    /// Return the `k` chunks most similar to `query_embedding`, best first.
    /// Ties keep insertion order. `k` beyond the index size returns everything.
    pub fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<QueryResult>, ConfigurationError> {
        if k == 0 {
            return Err(ConfigurationError::ZeroK);
        }
        if self.items.is_empty() {
            return Ok(Vec::new());
        }
        if query_embedding.len() != self.dimension {
            return Err(ConfigurationError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }
        if !all_finite(query_embedding) {
            return Err(ConfigurationError::NonFiniteQuery);
        }
        let q_norm = normalize(query_embedding);
        let mut scored: Vec<(&IndexedChunk, f32)> = self
            .items
            .iter()
            .map(|ic| (ic, dot(&q_norm, &ic.embedding)))
            .collect();
        // Stable sort, so equal similarities stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(ranked(
            scored
                .into_iter()
                .take(k)
                .map(|(ic, sim)| (ic.chunk.clone(), sim.clamp(0.0, 1.0))),
        ))
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Embedding dimensionality. Zero while the index is empty.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn items(&self) -> &[IndexedChunk] {
        &self.items
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.items.iter().map(|ic| &ic.chunk)
    }
}

fn all_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
