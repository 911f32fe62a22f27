//! Index pipeline: read source → chunk → embed → store → persist.
//!
//! [`CorpusManager::get_or_build`] is the single entry point. A stored index is
//! reused only when its fingerprint matches the current source; otherwise the
//! corpus is rebuilt and written back. Concurrent calls on one manager are
//! serialized; builders in separate processes sharing a directory must be
//! serialized by the caller.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chunks::{Chunk, ChunkConfig};
use crate::embed::Embedder;
use crate::error::{ConfigurationError, EmbeddingError, IndexUnavailable, PersistenceError};
use crate::mock;
use crate::persist::{self, Fingerprint};
use crate::source::{Document, DocumentSource};
use crate::store::{QueryResult, VectorIndex};

/// A built or loaded index: embedded chunks plus the fingerprint of the corpus
/// they came from. Read-only once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusIndex {
    fingerprint: Fingerprint,
    embedder: String,
    vectors: VectorIndex,
}

impl CorpusIndex {
    /// Chunk and embed `doc`. Fails if any embedding fails; nothing partial is kept.
    pub async fn build(
        doc: &Document,
        chunking: &ChunkConfig,
        embedder: &dyn Embedder,
    ) -> Result<Self, EmbeddingError> {
        let embedder_id = embedder.id();
        let fingerprint = Fingerprint::compute(doc, chunking, &embedder_id);
        let chunks = chunking.split_document(doc);
        info!(chunks = chunks.len(), embedder = %embedder_id, "embedding corpus");

        let mut vectors = VectorIndex::new();
        vectors.add(chunks, embedder).await?;
        Ok(Self {
            fingerprint,
            embedder: embedder_id,
            vectors,
        })
    }

    pub(crate) fn from_parts(fingerprint: Fingerprint, embedder: String, vectors: VectorIndex) -> Self {
        Self {
            fingerprint,
            embedder,
            vectors,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Id of the embedder the vectors came from.
    pub fn embedder(&self) -> &str {
        &self.embedder
    }

    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.vectors.chunks()
    }

    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<QueryResult>, ConfigurationError> {
        self.vectors.search(query_embedding, k)
    }
}

/// Where an index returned by [`CorpusManager::open`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// Stored index with a matching fingerprint; no embedding calls were made.
    Loaded,
    /// Freshly built from the source.
    Built,
}

/// Owns the embedding provider and chunking parameters used to build indices.
pub struct CorpusManager {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkConfig,
    build_gate: Mutex<()>,
}

impl CorpusManager {
    pub fn new(embedder: Arc<dyn Embedder>, chunking: ChunkConfig) -> Self {
        Self {
            embedder,
            chunking,
            build_gate: Mutex::new(()),
        }
    }

    /// The provider this manager embeds with. Queries against its indices must use the same one.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub fn chunking(&self) -> &ChunkConfig {
        &self.chunking
    }

    /// Return the index for `source`, loading it from `persist_dir` when the stored
    /// fingerprint matches and building (then persisting) it otherwise.
    pub async fn get_or_build(
        &self,
        source: &DocumentSource,
        persist_dir: &Path,
    ) -> Result<Arc<CorpusIndex>, IndexUnavailable> {
        self.open(source, persist_dir).await.map(|(index, _)| index)
    }

    /// Like [`get_or_build`](Self::get_or_build), also reporting whether the index was reused.
    pub async fn open(
        &self,
        source: &DocumentSource,
        persist_dir: &Path,
    ) -> Result<(Arc<CorpusIndex>, IndexOrigin), IndexUnavailable> {
        let _gate = self.build_gate.lock().await;

        let doc = source.read()?;
        let fingerprint = Fingerprint::compute(&doc, &self.chunking, &self.embedder.id());

        match persist::load_index(persist_dir) {
            Ok(stored) if stored.fingerprint() == &fingerprint => {
                info!(%source, chunks = stored.len(), "using stored index");
                return Ok((Arc::new(stored), IndexOrigin::Loaded));
            }
            Ok(stored) => info!(
                %source,
                stored = %stored.fingerprint(),
                current = %fingerprint,
                "stored index is stale; rebuilding"
            ),
            Err(PersistenceError::Missing(path)) => {
                debug!(path = %path.display(), "no stored index; building")
            }
            Err(e) => warn!(error = %e, "stored index unusable; rebuilding"),
        }

        let index = CorpusIndex::build(&doc, &self.chunking, self.embedder.as_ref()).await?;
        info!(chunks = index.len(), dimension = index.dimension(), "index built");
        if let Err(e) = persist::save_index(persist_dir, &index) {
            warn!(error = %e, "failed to persist index; continuing with in-memory copy");
        }
        Ok((Arc::new(index), IndexOrigin::Built))
    }

    /// Chunks for keyword search when no index could be produced: the current
    /// source chunked without embedding, else whatever index is stored (even if
    /// stale), else the built-in corpus.
    pub fn keyword_corpus(&self, source: &DocumentSource, persist_dir: &Path) -> Vec<Chunk> {
        match source.read() {
            Ok(doc) => return self.chunking.split_document(&doc),
            Err(e) => debug!(error = %e, "source unreadable for keyword corpus"),
        }
        match persist::load_index(persist_dir) {
            Ok(stored) => return stored.chunks().cloned().collect(),
            Err(e) => debug!(error = %e, "no stored index for keyword corpus"),
        }
        warn!("falling back to built-in corpus for keyword search");
        mock::chunks()
    }
}
