use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use ahash::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};

/// Deterministic bag-of-tokens embedder.
///
/// Hashes each whitespace token into a signed bucket and normalizes the
/// result to unit length. Carries no semantic signal beyond shared
/// vocabulary, but it is fast, needs no model weights, and identical
/// text yields a bit-identical vector regardless of batching. Used for
/// tests and offline smoke runs.
pub struct HashedEmbedder {
    dimension: usize,
    state: RandomState,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        // Fixed seeds keep vectors stable across processes and restarts.
        Self {
            dimension,
            state: RandomState::with_seeds(41, 59, 26, 53),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split_whitespace() {
            let mut hasher = self.state.build_hasher();
            token.hash(&mut hasher);
            let h = hasher.finish();

            let bucket = (h % self.dimension as u64) as usize;
            if h & (1 << 63) == 0 {
                vector[bucket] += 1.0;
            } else {
                vector[bucket] -= 1.0;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        vector
    }
}

impl EmbeddingProvider for HashedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_one(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashed-bow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_requested_dimension() {
        for dim in [8, 64, 384] {
            let embedder = HashedEmbedder::new(dim);
            assert_eq!(embedder.dimension(), dim);
            assert_eq!(embedder.embed("some text here").unwrap().len(), dim);
        }
    }

    #[test]
    fn identical_text_yields_bit_identical_vectors() {
        let embedder = HashedEmbedder::new(64);
        let a = embedder.embed("the quick brown fox").unwrap();
        let b = embedder.embed("the quick brown fox").unwrap();

        let a_bits: Vec<u32> = a.iter().map(|x| x.to_bits()).collect();
        let b_bits: Vec<u32> = b.iter().map(|x| x.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }

    #[test]
    fn batching_does_not_change_results() {
        let embedder = HashedEmbedder::new(64);
        let texts = vec![
            "alpha beta gamma".to_string(),
            "delta epsilon".to_string(),
            "zeta".to_string(),
        ];

        let batched = embedder.embed_batch(&texts).unwrap();
        for (text, batch_vec) in texts.iter().zip(&batched) {
            assert_eq!(&embedder.embed(text).unwrap(), batch_vec);
        }
    }

    #[test]
    fn non_empty_text_is_unit_length() {
        let embedder = HashedEmbedder::new(128);
        let v = embedder.embed("vectors should be normalized").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_the_zero_vector() {
        let embedder = HashedEmbedder::new(32);
        let v = embedder.embed("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn different_texts_differ() {
        let embedder = HashedEmbedder::new(384);
        let a = embedder.embed("storage engines and write amplification").unwrap();
        let b = embedder.embed("medieval falconry techniques").unwrap();
        assert_ne!(a, b);
    }
}
