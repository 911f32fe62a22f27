//! Ollama embedding provider. Wraps ollama-rs behind the [`Embedder`] trait.

use async_trait::async_trait;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;
use tracing::debug;

use crate::embed::Embedder;
use crate::error::EmbeddingError;

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Inputs sent per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Thin wrapper around Ollama for embedding.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    embed_model: String,
    batch_size: usize,
}

impl OllamaClient {
    /// Create from URL string, e.g. `http://localhost:11434`.
    pub fn from_url(url: &str) -> Result<Self, EmbeddingError> {
        let inner = Ollama::try_new(url).map_err(|e| EmbeddingError::Endpoint(e.to_string()))?;
        Ok(Self {
            inner,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set the embedding model (e.g. `nomic-embed-text`, `all-minilm`).
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set how many inputs go into one request. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    async fn request(&self, input: EmbeddingsInput) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let req = GenerateEmbeddingsRequest::new(self.embed_model.clone(), input);
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
        Ok(res.embeddings)
    }
}

impl Default for OllamaClient {
    /// Localhost:11434 with the default model.
    fn default() -> Self {
        Self {
            inner: Ollama::default(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    fn id(&self) -> String {
        format!("ollama:{}", self.embed_model)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let embedding = self
            .request(EmbeddingsInput::Single(text.to_string()))
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        if embedding.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(model = %self.embed_model, inputs = batch.len(), "embedding batch");
            let embeddings = self.request(EmbeddingsInput::Multiple(batch.to_vec())).await?;
            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: embeddings.len(),
                });
            }
            out.extend(embeddings);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn id_names_the_model() {
        let client = OllamaClient::default().with_embed_model("all-minilm");
        assert_eq!(client.id(), "ollama:all-minilm");
    }

    #[test]
    fn bad_url_is_an_endpoint_error() {
        let err = OllamaClient::from_url("not a url").unwrap_err();
        assert!(matches!(err, EmbeddingError::Endpoint(_)));
    }

    #[tokio::test]
    async fn embeds_through_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "nomic-embed-text",
                "embeddings": [[0.1, 0.2, 0.3]]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::from_url(&server.uri()).unwrap();
        let v = client.embed("load combinations").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn server_error_is_an_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let client = OllamaClient::from_url(&server.uri()).unwrap();
        let err = client
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Request(_)));
    }
}
