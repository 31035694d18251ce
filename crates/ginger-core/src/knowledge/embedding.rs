//! Text-to-vector embedding providers
//!
//! Provides the [`EmbeddingProvider`] trait and two implementations:
//! - [`HashedEmbedder`]: deterministic feature hashing, works offline
//! - [`OllamaEmbedder`]: calls a local Ollama server's `/api/embeddings`
//!
//! Providers are created via [`create_provider`] from configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{EmbeddingConfig, EmbeddingKind};
use crate::error::{Error, Result};

/// Trait for embedding text into vectors
///
/// Any failure to produce a vector is reported as [`Error::IndexUnavailable`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Number of dimensions this provider produces
    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

/// Create an embedding provider from config
pub fn create_provider(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
    match config.kind {
        EmbeddingKind::Hashed => Arc::new(HashedEmbedder::new(config.dimensions)),
        EmbeddingKind::Ollama => Arc::new(OllamaEmbedder::new(
            &config.host,
            &config.model,
            config.dimensions,
        )),
    }
}

/// Feature-hashing embedder
///
/// Each lower-cased alphanumeric token is hashed with SHA-256; the first eight
/// bytes pick a bucket and the ninth picks a sign. The vector is L2-normalized,
/// so texts sharing vocabulary land close together. Not semantic, but stable
/// across runs and platforms.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() >= 2)
            .map(|s| s.to_lowercase())
    }

    /// Synchronous embedding (the async trait method delegates here)
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in Self::tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashed"
    }
}

/// Embedder backed by Ollama's `/api/embeddings`
#[derive(Clone)]
pub struct OllamaEmbedder {
    http_client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dimensions: usize) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .http_client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::IndexUnavailable(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::IndexUnavailable(format!(
                "embedding server returned {}",
                status
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::IndexUnavailable(format!("malformed embedding response: {}", e)))?;

        if body.embedding.len() != self.dimensions {
            return Err(Error::IndexUnavailable(format!(
                "model {} returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            )));
        }
        debug!(model = %self.model, dims = body.embedding.len(), "Embedded text");

        let mut vector = body.embedding;
        normalize(&mut vector);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// L2-normalize in place; zero vectors stay zero
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity; 0.0 when either side is a zero vector
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockOllamaServer;

    #[test]
    fn test_hashed_embedder_is_deterministic_and_normalized() {
        let embedder = HashedEmbedder::new(64);
        let a = embedder.embed_sync("Plan a family hike this weekend");
        let b = embedder.embed_sync("Plan a family hike this weekend");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashed_embedder_similarity_tracks_vocabulary() {
        let embedder = HashedEmbedder::new(256);
        let query = embedder.embed_sync("board games with kids");
        let close = embedder.embed_sync("Board games night with the kids");
        let far = embedder.embed_sync("quarterly tax filing deadline");

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashedEmbedder::new(16);
        let v = embedder.embed_sync("");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&v, &v), 0.0);
    }

    #[tokio::test]
    async fn test_ollama_embedder_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let embedder = OllamaEmbedder::new(&server.url(), "nomic-embed-text", 8);

        let vector = embedder.embed("family dinner").await.unwrap();
        assert_eq!(vector.len(), 8);
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_ollama_embedder_rejects_dimension_mismatch() {
        let server = MockOllamaServer::start().await;
        let embedder = OllamaEmbedder::new(&server.url(), "nomic-embed-text", 768);

        let err = embedder.embed("family dinner").await.unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_ollama_embedder_unreachable() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:1", "nomic-embed-text", 8);
        let err = embedder.embed("anything").await.unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }
}
