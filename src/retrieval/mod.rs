//! Retrieval coordination
//!
//! Ties the pipeline together: on ingest, chunk then embed then index;
//! on query, embed the question, search the index scoped to the active
//! file set, and ground an answer in the retrieved passages. Generation
//! failures degrade to presenting the passages, never to a failed query.

mod context;
mod pipeline;

pub use context::assemble_context;
pub use pipeline::{RetrievalPipeline, FALLBACK_PREFIX, NO_RESULTS_ANSWER};

use crate::chunking::FileType;
use serde::{Deserialize, Serialize};

/// Number of passages retrieved when the caller does not choose
pub const DEFAULT_TOP_K: usize = 5;

/// Outcome of ingesting one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub filename: String,
    pub chunks_created: usize,
    pub file_type: FileType,
}

/// One retrieved passage backing an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub filename: String,
    pub chunk_text: String,
    /// Normalized similarity in (0, 1], higher is better
    pub score: f32,
    pub chunk_index: usize,
}

/// Answer plus the passages that grounded it.
///
/// `sources` always reflects what retrieval actually returned, whether
/// or not generation succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<SourceInfo>,
}
