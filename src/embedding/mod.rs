//! Embedding generation
//!
//! Maps text (chunks at ingest, questions at query time) to fixed-length
//! dense vectors. The provider is loaded once at startup and injected into
//! the pipeline, so callers can substitute a deterministic double where
//! model weights are unavailable.

mod hashed;
mod provider;

pub use hashed::HashedEmbedder;
pub use provider::{EmbeddingProvider, FastEmbedProvider};
