//! Embedding generation
//!
//! Providers are configured explicitly at construction; nothing here reads
//! the environment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Text to vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> StorageResult<Vec<f32>>;

    /// Embed several texts. The default embeds them one by one.
    async fn embed_batch(&self, texts: &[String]) -> StorageResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize;

    /// Label of the model, for logs and config output
    fn model(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 384,
            model: "hashing-fnv1a".to_string(),
        }
    }
}

/// Offline feature-hashing embedder
///
/// Each lowercase word (and each `_`-separated part of it) is hashed with
/// FNV-1a into a signed bucket; the result is L2-normalized. Texts sharing
/// vocabulary land close together, which is enough for local search
/// without a model download.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    config: EmbeddingConfig,
}

impl HashingEmbedder {
    pub fn new(config: EmbeddingConfig) -> StorageResult<Self> {
        if config.dimensions == 0 {
            return Err(StorageError::Embedding(
                "embedding dimensions must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let dimensions = self.config.dimensions;
        let mut vector = vec![0.0f32; dimensions];

        for token in tokens(text) {
            let hash = fnv1a_64(token.as_bytes());
            let bucket = (hash % dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            config: EmbeddingConfig::default(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> StorageResult<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if word.contains('_') {
            out.extend(
                word.split('_')
                    .filter(|part| !part.is_empty())
                    .map(String::from),
            );
        }
        out.push(word);
    }
    out
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector {
        *value /= norm;
    }
}

/// Cosine similarity; 0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Whether a vector carries no signal (e.g. the embedding of punctuation)
pub fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}
