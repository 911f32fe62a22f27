//! The embedding capability the index and query engine consume.
//!
//! Implementations map text to a fixed-length vector. The same provider (same
//! [`Embedder::id`]) must be used to build an index and to query it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Maps text to a fixed-dimension numeric vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider and model, e.g. `ollama:nomic-embed-text`.
    /// Part of the corpus fingerprint, so changing models invalidates stored indices.
    fn id(&self) -> String;

    /// Embed a single string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed multiple strings. Returns one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn id(&self) -> String {
        (**self).id()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_batch(texts).await
    }
}

/// Bounds every call to the wrapped provider. An elapsed call is an
/// [`EmbeddingError::Timeout`], handled like any other embedding failure.
///
/// Batches are forwarded `batch_size` inputs at a time and each forwarded call
/// gets its own limit, so a large corpus is not held to a single deadline.
#[derive(Debug, Clone)]
pub struct WithTimeout<E> {
    inner: E,
    limit: Duration,
    batch_size: usize,
}

impl<E> WithTimeout<E> {
    /// One input per bounded call until [`with_batch_size`](Self::with_batch_size) says otherwise.
    pub fn new(inner: E, limit: Duration) -> Self {
        Self {
            inner,
            limit,
            batch_size: 1,
        }
    }

    /// Inputs per bounded call. Match the inner provider's request size. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[async_trait]
impl<E: Embedder> Embedder for WithTimeout<E> {
    fn id(&self) -> String {
        self.inner.id()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::timeout(self.limit, self.inner.embed(text))
            .await
            .map_err(|_| EmbeddingError::Timeout(self.limit))?
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = tokio::time::timeout(self.limit, self.inner.embed_batch(batch))
                .await
                .map_err(|_| EmbeddingError::Timeout(self.limit))??;
            out.extend(embeddings);
        }
        Ok(out)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{SlowEmbedder, StalledEmbedder, VocabEmbedder};
    use super::*;

    #[tokio::test]
    async fn default_batch_embeds_in_order() {
        let e = VocabEmbedder::new(&["shear", "load"]);
        let out = e
            .embed_batch(&["load load".to_string(), "shear".to_string()])
            .await
            .unwrap();
        assert_eq!(out[0][..2], [0.0, 2.0]);
        assert_eq!(out[1][..2], [1.0, 0.0]);
        assert_eq!(e.calls(), 2);
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let e = WithTimeout::new(StalledEmbedder, Duration::from_millis(20));
        let err = e.embed("anything").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Timeout(d) if d == Duration::from_millis(20)));
        assert_eq!(e.id(), "stalled");
    }

    #[tokio::test]
    async fn timeout_bounds_each_call_not_the_batch() {
        let e = WithTimeout::new(SlowEmbedder::new(Duration::from_millis(20)), Duration::from_millis(100));
        let texts: Vec<String> = (0..10).map(|i| format!("clause {i}")).collect();
        let out = e.embed_batch(&texts).await.unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[3], vec![8.0, 1.0]);
        assert_eq!(e.inner.calls(), 10);
    }

    #[tokio::test]
    async fn forwarded_batch_that_overruns_times_out() {
        let e = WithTimeout::new(SlowEmbedder::new(Duration::from_millis(40)), Duration::from_millis(100))
            .with_batch_size(5);
        let texts: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        let err = e.embed_batch(&texts).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Timeout(_)));
        assert_eq!(e.batch_size(), 5);
    }
}
