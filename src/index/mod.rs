//! Persistent vector index
//!
//! An append-only arena of (vector, chunk) pairs addressed by strictly
//! increasing ids, with exact nearest-neighbor search. Entries are held
//! in memory for scanning and written through to SQLite, which is the
//! durable representation loaded at startup.

mod vector_index;

pub use vector_index::VectorIndex;

use crate::chunking::{Chunk, FileType};
use serde::{Deserialize, Serialize};

/// One indexed (vector, chunk) pair.
///
/// `id` is assigned at insertion and never reused; it uniquely
/// determines the entry's position in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: i64,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// A search match with its squared-L2 distance to the query
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: IndexEntry,
    pub distance: f32,
}

impl SearchHit {
    /// Normalized similarity in (0, 1], strictly decreasing in distance.
    /// Callers can treat higher as better without knowing the metric.
    pub fn score(&self) -> f32 {
        1.0 / (1.0 + self.distance)
    }
}

/// Aggregated view of all entries sharing a source filename.
///
/// Computed by folding over the entries at read time; never persisted
/// on its own, so it cannot drift from the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCatalogEntry {
    pub filename: String,
    pub file_type: FileType,
    pub num_chunks: usize,
}
