//! shelfrank-embed
//!
//! Embedding provider clients behind the `Embedder` trait: an HTTP provider
//! for real deployments and a deterministic hashed embedder for offline
//! runs and tests. Provider failures surface as `Error::Provider`; retry
//! policy belongs to the caller, not here.

use serde::Deserialize;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::info;
use twox_hash::XxHash64;

use shelfrank_core::error::{Error, Result};
use shelfrank_core::traits::Embedder;

/// Client for an HTTP embedding provider speaking
/// `POST {endpoint} {"model": ..., "inputs": [...]}` →
/// `{"embeddings": [[f32, ...], ...]}`.
pub struct HttpEmbedder {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dim: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbedder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dim: usize) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            dim,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({ "model": self.model, "inputs": texts });
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| Error::Provider(format!("{}: {e}", self.endpoint)))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| Error::Provider(format!("{}: {e}", self.endpoint)))?;
        let parsed: EmbedResponse = resp
            .json()
            .map_err(|e| Error::Provider(format!("{}: malformed response: {e}", self.endpoint)))?;
        if parsed.embeddings.len() != texts.len() {
            return Err(Error::Provider(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        for e in &parsed.embeddings {
            if e.len() != self.dim {
                return Err(Error::Provider(format!(
                    "provider returned a {}-dim vector, expected {}",
                    e.len(),
                    self.dim
                )));
            }
        }
        Ok(parsed.embeddings)
    }
}

/// Deterministic feature-hashing embedder: each whitespace token is hashed
/// into one of `dim` buckets and the result is L2-normalized. No semantics,
/// but stable across runs, which is all offline tests need.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let mut v = vec![0f32; self.dim];
            for (i, token) in text.split_whitespace().enumerate() {
                let mut hasher = XxHash64::with_seed(0);
                token.hash(&mut hasher);
                let h = hasher.finish();
                let idx = (h as usize) % self.dim;
                let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
                v[idx] += val + (i as f32 % 3.0) * 0.01;
            }
            let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
            for x in &mut v {
                *x /= norm;
            }
            out.push(v);
        }
        Ok(out)
    }
}

/// Pick the provider for a deployment: the hashed embedder when
/// `SHELFRANK_USE_HASH_EMBEDDER` is set, the HTTP provider when an endpoint
/// is configured.
pub fn resolve_embedder(endpoint: &str, model: &str, dim: usize) -> Result<Box<dyn Embedder>> {
    let use_hash = std::env::var("SHELFRANK_USE_HASH_EMBEDDER")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_hash {
        info!("using hashed embedder ({dim} dims)");
        return Ok(Box::new(HashEmbedder::new(dim)));
    }
    if endpoint.is_empty() {
        return Err(Error::Provider(
            "no embedding endpoint configured; set embedding.endpoint or SHELFRANK_USE_HASH_EMBEDDER=1".to_string(),
        ));
    }
    info!("using embedding provider at {endpoint} (model {model}, {dim} dims)");
    Ok(Box::new(HttpEmbedder::new(endpoint, model, dim)?))
}
