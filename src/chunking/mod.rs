//! Document chunking
//!
//! Splits extracted text into overlapping fixed-size token windows. The
//! same whitespace token rule is used everywhere token counts matter
//! (window sizing here, context budgets at query time), so counts agree
//! across the pipeline.

use crate::error::{DocragError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Split text into tokens using the pipeline-wide tokenization rule.
///
/// Whitespace-delimited, deterministic, no normalization beyond what
/// `split_whitespace` does.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Count tokens without allocating the token list
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Declared format of an ingested document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Txt,
    Md,
    Docx,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Txt => "txt",
            FileType::Md => "md",
            FileType::Docx => "docx",
        }
    }

    /// Infer the file type from a filename extension
    pub fn from_extension(filename: &str) -> Result<Self> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(FileType::Pdf),
            "txt" => Ok(FileType::Txt),
            "md" | "markdown" => Ok(FileType::Md),
            "docx" => Ok(FileType::Docx),
            _ => Err(DocragError::UnsupportedFormat { extension }),
        }
    }
}

impl FromStr for FileType {
    type Err = DocragError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pdf" => Ok(FileType::Pdf),
            "txt" => Ok(FileType::Txt),
            "md" => Ok(FileType::Md),
            "docx" => Ok(FileType::Docx),
            other => Err(DocragError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One overlapping window of a document's text, the unit of embedding
/// and retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_filename: String,
    /// 0-based window position, stable across re-chunking of the same input
    pub chunk_index: usize,
    pub file_type: FileType,
}

/// Splits text into overlapping token windows
///
/// Each window after the first repeats the trailing `chunk_overlap`
/// tokens of its predecessor. The final window is kept even when it is
/// shorter than the overlap, so no trailing content is lost.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocragError::InvalidConfigValue {
                path: "chunking.chunk_size".to_string(),
                message: "Chunk size must be greater than 0".to_string(),
            });
        }
        if chunk_overlap >= chunk_size {
            return Err(DocragError::InvalidConfigValue {
                path: "chunking.chunk_overlap".to_string(),
                message: format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    chunk_overlap, chunk_size
                ),
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks carrying provenance metadata.
    ///
    /// Pure and deterministic. Empty or whitespace-only input produces
    /// zero chunks, which is a valid result rather than an error.
    pub fn chunk(&self, text: &str, filename: &str, file_type: FileType) -> Vec<Chunk> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Vec::new();
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = usize::min(start + self.chunk_size, tokens.len());
            chunks.push(Chunk {
                text: tokens[start..end].join(" "),
                source_filename: filename.to_string(),
                chunk_index: chunks.len(),
                file_type,
            });

            if end == tokens.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}
