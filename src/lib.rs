//! Docrag - Local Document Question Answering
//!
//! Ingests text and markdown documents, splits them into overlapping token
//! windows, embeds each window locally, and answers questions by exact
//! vector search over the selected files, with optional answer generation
//! through a local Ollama instance.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod retrieval;
pub mod storage;

pub use error::{DocragError, Result};
