use crate::error::{DocragError, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;

/// Trait for embedding providers
///
/// Implementations must be deterministic: identical text yields a
/// bit-identical vector, and batching must not change any per-text
/// result. Every output has the provider's fixed dimension.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one output per input in
    /// the same order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed output dimension
    fn dimension(&self) -> usize;

    /// Model name for logs and diagnostics
    fn model_name(&self) -> &str;
}

/// FastEmbed provider for local embedding generation
///
/// Uses all-MiniLM-L6-v2 (384 dimensions) by default. Fully offline once
/// the model weights are cached.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
    batch_size: usize,
}

impl FastEmbedProvider {
    /// Create a provider for the named model.
    ///
    /// Models are downloaded on demand to `~/.cache/huggingface/` on
    /// first use; all-MiniLM-L6-v2 is ~90MB. A model that cannot be
    /// loaded is a process-level condition, not a per-call one.
    pub fn new(model_name: &str, batch_size: usize) -> Result<Self> {
        let embedding_model = match model_name {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            _ => {
                return Err(DocragError::EmbeddingUnavailable(format!(
                    "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                    model_name
                )));
            }
        };

        let dimension = match embedding_model {
            EmbeddingModel::BGEBaseENV15 => 768,
            _ => 384,
        };

        tracing::info!(
            "Initializing embedding model: {} ({}D, downloaded on first use)",
            model_name,
            dimension
        );

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| DocragError::EmbeddingUnavailable(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimension,
            batch_size,
        })
    }

    /// Create a provider with the default model (all-MiniLM-L6-v2)
    pub fn with_default_model() -> Result<Self> {
        Self::new("all-MiniLM-L6-v2", 32)
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| DocragError::EmbeddingUnavailable(e.to_string()))?;

        let embedding = embeddings
            .pop()
            .ok_or_else(|| DocragError::EmbeddingUnavailable("No embedding generated".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(DocragError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Texts pass through unfiltered: the output must stay one vector
        // per input, in input order.
        let embeddings = self
            .model
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| DocragError::EmbeddingUnavailable(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(DocragError::EmbeddingUnavailable(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(DocragError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
