//! End-to-end retrieval through the public API with a stub embedding provider.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use provisio_core::persist::load_index;
use provisio_core::{
    ChunkConfig, CorpusManager, DocumentSource, Embedder, EmbeddingError, IndexOrigin,
    QueryEngine, RetrievalMode,
};

const VOCAB: &[&str] = &["load", "combination", "resistance", "flexural", "cover"];

/// Counts vocabulary words; every vector gets a small constant component so none is zero.
#[derive(Default)]
struct Stub {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for Stub {
    fn id(&self) -> String {
        "stub:vocab".to_string()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = VOCAB
            .iter()
            .map(|w| lower.matches(w).count() as f32)
            .collect();
        v.push(0.01);
        Ok(v)
    }
}

struct Down;

#[async_trait]
impl Embedder for Down {
    fn id(&self) -> String {
        "stub:down".to_string()
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Request("connection refused".to_string()))
    }
}

fn write_three_clauses(dir: &Path) {
    std::fs::write(
        dir.join("4.1.3.2.txt"),
        "Principal load combinations for ultimate limit states. Load combination 1: 1.4D.",
    )
    .unwrap();
    std::fs::write(
        dir.join("8.4.2.txt"),
        "Material resistance factors: concrete 0.65, reinforcing steel 0.85.",
    )
    .unwrap();
    std::fs::write(
        dir.join("10.5.txt"),
        "Flexural design of reinforced concrete beams.",
    )
    .unwrap();
}

fn text_source(dir: &Path) -> DocumentSource {
    DocumentSource::TextCorpus {
        dir: dir.to_path_buf(),
    }
}

async fn engine_over(corpus: &Path, store: &Path, embedder: Arc<dyn Embedder>) -> QueryEngine {
    let manager = CorpusManager::new(embedder, ChunkConfig::default());
    QueryEngine::connect(&manager, &text_source(corpus), store).await
}

#[tokio::test]
async fn top_result_is_the_load_combination_clause() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_three_clauses(corpus.path());

    let engine = engine_over(corpus.path(), store.path(), Arc::new(Stub::default())).await;
    let res = engine
        .query("load combinations for ultimate limit states", 2)
        .await;

    assert_eq!(res.mode, RetrievalMode::Semantic);
    assert_eq!(res.results.len(), 2);
    assert_eq!(res.results[0].chunk.source_tag, "4.1.3.2");
    assert_eq!(res.results[0].rank, 1);
    assert_eq!(res.results[1].rank, 2);
    assert!(res.results[0].score >= res.results[1].score);
}

#[tokio::test]
async fn k_larger_than_corpus_returns_everything() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_three_clauses(corpus.path());

    let engine = engine_over(corpus.path(), store.path(), Arc::new(Stub::default())).await;
    let res = engine.query("resistance", 10).await;

    assert_eq!(res.mode, RetrievalMode::Semantic);
    assert_eq!(res.results.len(), 3);
    let ranks: Vec<usize> = res.results.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(res.results[0].chunk.source_tag, "8.4.2");
}

#[tokio::test]
async fn empty_corpus_answers_semantic_with_no_results() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    std::fs::write(corpus.path().join("blank.txt"), "").unwrap();

    let engine = engine_over(corpus.path(), store.path(), Arc::new(Stub::default())).await;
    assert!(engine.has_index());
    let res = engine.query("load", 3).await;

    assert_eq!(res.mode, RetrievalMode::Semantic);
    assert!(res.results.is_empty());
}

#[tokio::test]
async fn failing_provider_never_answers_semantic() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_three_clauses(corpus.path());

    let engine = engine_over(corpus.path(), store.path(), Arc::new(Down)).await;
    assert!(!engine.has_index());
    for q in ["material resistance factors", "flexural beams", "nothing matches"] {
        assert_eq!(engine.query(q, 3).await.mode, RetrievalMode::Keyword);
    }

    let res = engine.query("material resistance factors", 3).await;
    assert_eq!(res.results[0].chunk.source_tag, "8.4.2");
    assert!(!store.path().join("index.json").exists());
}

#[tokio::test]
async fn edited_corpus_is_rebuilt_not_reused() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_three_clauses(corpus.path());
    let stub = Arc::new(Stub::default());
    let manager = CorpusManager::new(stub.clone(), ChunkConfig::default());
    let source = text_source(corpus.path());

    let (first, origin) = manager.open(&source, store.path()).await.unwrap();
    assert_eq!(origin, IndexOrigin::Built);
    let (_, origin) = manager.open(&source, store.path()).await.unwrap();
    assert_eq!(origin, IndexOrigin::Loaded);
    let calls = stub.calls.load(Ordering::SeqCst);

    std::fs::write(
        corpus.path().join("7.4.txt"),
        "Concrete cover of 40 mm for surfaces exposed to weather.",
    )
    .unwrap();
    let (second, origin) = manager.open(&source, store.path()).await.unwrap();
    assert_eq!(origin, IndexOrigin::Built);
    assert!(stub.calls.load(Ordering::SeqCst) > calls);
    assert_ne!(second.fingerprint(), first.fingerprint());
    assert_eq!(second.len(), 4);
    assert_eq!(load_index(store.path()).unwrap().fingerprint(), second.fingerprint());
}

#[tokio::test]
async fn stored_index_answers_like_the_built_one() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_three_clauses(corpus.path());
    let manager = CorpusManager::new(Arc::new(Stub::default()), ChunkConfig::default());

    let built = manager
        .get_or_build(&text_source(corpus.path()), store.path())
        .await
        .unwrap();
    let loaded = load_index(store.path()).unwrap();

    let q = [1.0, 0.5, 0.0, 0.2, 0.0, 0.01];
    let a = built.search(&q, 3).unwrap();
    let b = loaded.search(&q, 3).unwrap();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.chunk, y.chunk);
        assert_eq!(x.rank, y.rank);
        assert!((x.score - y.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn concurrent_calls_build_once() {
    let corpus = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_three_clauses(corpus.path());
    let stub = Arc::new(Stub::default());
    let manager = CorpusManager::new(stub.clone(), ChunkConfig::default());
    let source = text_source(corpus.path());

    let (a, b) = tokio::join!(
        manager.open(&source, store.path()),
        manager.open(&source, store.path())
    );
    let mut origins = vec![a.unwrap().1, b.unwrap().1];
    origins.sort_by_key(|o| *o == IndexOrigin::Loaded);
    assert_eq!(origins, vec![IndexOrigin::Built, IndexOrigin::Loaded]);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
}
