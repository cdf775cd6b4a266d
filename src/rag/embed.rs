// src/rag/embed.rs
//! Embedding collaborator: text -> vector.
//!
//! Providers:
//! - "openai": remote embeddings API, key resolved from the environment
//! - "mock":  deterministic hashed bag-of-words (tests, offline demos)
//! - "disabled": always errors; the index will skip-and-count

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn model_name(&self) -> &str;
    fn dims(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbedConfig {
    /// "openai" | "mock" | "disabled"
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_key")]
    pub api_key: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_key() -> String {
    "ENV".to_string()
}
fn default_dims() -> usize {
    384
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: default_model(),
            api_key: default_key(),
            dims: default_dims(),
        }
    }
}

pub type DynEmbedder = Arc<dyn Embedder>;

/// Factory: build an embedder according to config and environment.
///
/// `EMBED_TEST_MODE=mock` forces the deterministic mock regardless of
/// config, mirroring the generation client's test escape hatch.
pub fn build_embedder(cfg: &EmbedConfig) -> DynEmbedder {
    if std::env::var("EMBED_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockEmbedder::new(cfg.dims));
    }
    match cfg.provider.to_lowercase().as_str() {
        "openai" => {
            let key = crate::config::resolve_secret(&cfg.api_key, "OPENAI_API_KEY")
                .unwrap_or_default();
            if key.is_empty() {
                tracing::warn!("embedding key missing; embeddings disabled");
                return Arc::new(DisabledEmbedder);
            }
            Arc::new(HttpEmbedder::new(key, cfg.model.clone(), cfg.dims))
        }
        "mock" => Arc::new(MockEmbedder::new(cfg.dims)),
        _ => Arc::new(DisabledEmbedder),
    }
}

/// Cosine similarity between two equal-length vectors; 0.0 when either
/// norm degenerates.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// Remote embeddings API (OpenAI-compatible `POST /v1/embeddings`).
pub struct HttpEmbedder {
    http: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
}

impl HttpEmbedder {
    pub fn new(api_key: String, model: String, dims: usize) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("flashpoint-engine/0.1 (+embeddings)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model,
            dims,
        }
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            data: Vec<Row>,
        }
        #[derive(Deserialize)]
        struct Row {
            embedding: Vec<f32>,
        }

        let resp = self
            .http
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&Req {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .context("embeddings request")?;

        if !resp.status().is_success() {
            bail!("embeddings api status {}", resp.status());
        }
        let body: Resp = resp.json().await.context("embeddings payload")?;
        body.data
            .into_iter()
            .next()
            .map(|r| r.embedding)
            .ok_or_else(|| anyhow!("empty embeddings response"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Deterministic hashed bag-of-words projection. Identical texts map to
/// identical vectors, overlapping vocabularies to similar ones; good
/// enough to exercise ranking without a model.
pub struct MockEmbedder {
    dims: usize,
}

impl MockEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(8),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut h = DefaultHasher::new();
            token.hash(&mut h);
            let idx = (h.finish() % self.dims as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn model_name(&self) -> &str {
        "mock-bow"
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Always errors; used when embeddings are not configured.
pub struct DisabledEmbedder;

#[async_trait::async_trait]
impl Embedder for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("embedding provider is disabled")
    }

    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let e = MockEmbedder::new(64);
        let a = e.embed("missile strike near the border").await.unwrap();
        let b = e.embed("missile strike near the border").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn self_similarity_beats_unrelated_text() {
        let e = MockEmbedder::new(128);
        let a = e.embed("grain exports resume from the port").await.unwrap();
        let b = e.embed("grain exports resume from the port").await.unwrap();
        let c = e.embed("championship final goes to penalties").await.unwrap();
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
