//! Query engine: the interface calling agents use.
//!
//! Answers with semantic search when an index and the embedding provider are
//! available, and with keyword matching otherwise. It never fails a query; the
//! response carries a [`RetrievalMode`] so callers can judge how much to trust it.
//! Fallback is decided per call: one failed embedding does not switch the engine
//! to keyword mode for later calls.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::chunks::Chunk;
use crate::embed::Embedder;
use crate::index::{CorpusIndex, CorpusManager};
use crate::keyword::keyword_search;
use crate::source::DocumentSource;
use crate::store::QueryResult;

/// Default number of results per query.
pub const DEFAULT_K: usize = 3;

/// How a response was produced. Scores are only comparable within one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalMode {
    /// Cosine similarity against the vector index.
    Semantic,
    /// Fraction of query terms found in the chunk text.
    Keyword,
}

/// Ranked results for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub mode: RetrievalMode,
    pub results: Vec<QueryResult>,
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.results.is_empty() {
            return writeln!(f, "No relevant provisions found. Please rephrase your query.");
        }
        let how = match self.mode {
            RetrievalMode::Semantic => "Semantic Search",
            RetrievalMode::Keyword => "Keyword Matching",
        };
        let rule = "=".repeat(80);
        writeln!(f, "CODE PROVISIONS (Retrieved via {how})")?;
        writeln!(f, "Query: {}", self.query)?;
        writeln!(f, "{rule}")?;
        for r in &self.results {
            let clause = if r.chunk.source_tag.is_empty() {
                "N/A"
            } else {
                r.chunk.source_tag.as_str()
            };
            writeln!(f)?;
            writeln!(f, "--- Result {} (Relevance: {:.2}%) ---", r.rank, r.score * 100.0)?;
            writeln!(f, "Clause: {clause}")?;
            writeln!(f)?;
            writeln!(f, "{}", r.chunk.text.trim())?;
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

struct Semantic {
    index: Arc<CorpusIndex>,
    embedder: Arc<dyn Embedder>,
}

/// Answers queries against one loaded index, or keyword-only when none is available.
pub struct QueryEngine {
    semantic: Option<Semantic>,
    keyword_corpus: Arc<[Chunk]>,
}

impl QueryEngine {
    /// Semantic engine over `index`. `embedder` must be the provider the index was built with.
    /// Keyword fallback searches the same chunks.
    pub fn new(index: Arc<CorpusIndex>, embedder: Arc<dyn Embedder>) -> Self {
        if embedder.id() != index.embedder() {
            warn!(
                index = index.embedder(),
                query = %embedder.id(),
                "query embedder differs from the one that built the index"
            );
        }
        let keyword_corpus: Arc<[Chunk]> = index.chunks().cloned().collect();
        Self {
            semantic: Some(Semantic { index, embedder }),
            keyword_corpus,
        }
    }

    /// Keyword-only engine over `corpus`.
    pub fn keyword_only(corpus: Vec<Chunk>) -> Self {
        Self {
            semantic: None,
            keyword_corpus: corpus.into(),
        }
    }

    /// Obtain the index through `manager`. If it is unavailable, fall back to a
    /// keyword-only engine over the best corpus the manager can still read.
    pub async fn connect(manager: &CorpusManager, source: &DocumentSource, persist_dir: &Path) -> Self {
        match manager.get_or_build(source, persist_dir).await {
            Ok(index) => Self::new(index, manager.embedder()),
            Err(e) => {
                warn!(error = %e, "semantic index unavailable; using keyword search");
                Self::keyword_only(manager.keyword_corpus(source, persist_dir))
            }
        }
    }

    /// Whether a semantic index is loaded. Individual queries may still fall back.
    pub fn has_index(&self) -> bool {
        self.semantic.is_some()
    }

    pub fn index(&self) -> Option<&Arc<CorpusIndex>> {
        self.semantic.as_ref().map(|s| &s.index)
    }

    /// The top `k` chunks for `text`, best first. Never fails; `k == 0` yields no results.
    pub async fn query(&self, text: &str, k: usize) -> QueryResponse {
        if let Some(semantic) = &self.semantic {
            match self.semantic_search(semantic, text, k).await {
                Some(results) => {
                    return QueryResponse {
                        query: text.to_string(),
                        mode: RetrievalMode::Semantic,
                        results,
                    }
                }
                None => debug!(query = text, "falling back to keyword search"),
            }
        }
        QueryResponse {
            query: text.to_string(),
            mode: RetrievalMode::Keyword,
            results: keyword_search(&self.keyword_corpus, text, k),
        }
    }

    async fn semantic_search(&self, semantic: &Semantic, text: &str, k: usize) -> Option<Vec<QueryResult>> {
        if k == 0 {
            return Some(Vec::new());
        }
        let vector = match semantic.embedder.embed(text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                return None;
            }
        };
        match semantic.index.search(&vector, k) {
            Ok(results) => Some(results),
            Err(e) => {
                warn!(error = %e, "semantic search rejected query vector");
                None
            }
        }
    }

    /// Every chunk tagged with `clause`, in document order.
    pub fn clause(&self, clause: &str) -> Vec<&Chunk> {
        let clause = clause.trim();
        self.keyword_corpus
            .iter()
            .filter(|c| c.source_tag == clause)
            .collect()
    }
}
