//! Context assembly
//!
//! Formats retrieved passages into the context block handed to the
//! generation adapter (and shown directly when generation is down).

use crate::chunking::count_tokens;
use crate::retrieval::SourceInfo;

/// Join passages into a context string, in rank order, under a token
/// budget.
///
/// Each passage gets a `[Source N: file, chunk i]` header so answers can
/// cite where they came from. The budget uses the same whitespace token
/// rule as chunking; a passage is never split, so one that would push
/// the total past the budget is dropped together with everything ranked
/// below it. The top-ranked passage is always kept, budget or not.
pub fn assemble_context(sources: &[SourceInfo], token_budget: usize) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut used_tokens = 0;

    for (rank, source) in sources.iter().enumerate() {
        let block = format!(
            "[Source {}: {}, chunk {}]\n{}\n",
            rank + 1,
            source.filename,
            source.chunk_index,
            source.chunk_text
        );

        let block_tokens = count_tokens(&block);
        if !blocks.is_empty() && used_tokens + block_tokens > token_budget {
            break;
        }

        used_tokens += block_tokens;
        blocks.push(block);
    }

    blocks.join("\n")
}
