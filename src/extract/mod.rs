//! Text extraction seam
//!
//! Turns uploaded bytes into plain text for chunking. Plain text passes
//! through; markdown is stripped of its markup so chunk text reads as
//! prose. PDF and DOCX extraction are external collaborators, so those
//! types are reported as unsupported here.

use crate::chunking::FileType;
use crate::error::{DocragError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*```.*$").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").unwrap());
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}>\s?").unwrap());
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*+]|\d+\.)\s+").unwrap());
static HORIZONTAL_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*_]{3,}\s*$").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{1,3}([^*\n]+)\*{1,3}").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>\n]+>").unwrap());

/// Extract plain text from raw file bytes for the declared type.
///
/// Fails with `UnsupportedFormat` for types this core does not extract
/// itself, and `ExtractionFailed` when declared text is not decodable.
/// The index is never touched by a failed extraction.
pub fn extract_text(filename: &str, file_type: FileType, bytes: &[u8]) -> Result<String> {
    match file_type {
        FileType::Txt => decode_utf8(filename, bytes),
        FileType::Md => Ok(strip_markdown(&decode_utf8(filename, bytes)?)),
        FileType::Pdf | FileType::Docx => Err(DocragError::UnsupportedFormat {
            extension: file_type.as_str().to_string(),
        }),
    }
}

fn decode_utf8(filename: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| DocragError::ExtractionFailed {
        filename: filename.to_string(),
        message: format!("not valid UTF-8 text: {}", e),
    })
}

/// Strip markdown markup, keeping the textual content.
///
/// Link and emphasis text survives, URLs and images do not, fenced code
/// keeps its body but loses the fence lines. Whitespace left behind is
/// harmless because chunking retokenizes on whitespace anyway.
fn strip_markdown(markdown: &str) -> String {
    let text = CODE_FENCE.replace_all(markdown, "");
    let text = IMAGE.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BLOCKQUOTE.replace_all(&text, "");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = HORIZONTAL_RULE.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = EMPHASIS.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, "");
    text.into_owned()
}
