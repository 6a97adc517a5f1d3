//! Splitting an encoded message into DATA-sized chunks.
//!
//! Chunking is two-pass, to stay wire compatible with existing peers:
//!
//! 1. Estimate the in-memory size of the message (byte length plus a fixed
//!    string-object overhead) and divide by the chunk budget, rounding up.
//!    That gives the chunk count.
//! 2. Divide the message's character count by the chunk count, rounding up.
//!    That gives the per-chunk length in characters.
//!
//! The message is then cut into contiguous slices of that many characters.
//! A slice is also cut early when the next character would push it past the
//! budget in bytes, so text mixing ASCII and multi-byte characters can yield
//! more slices than the estimate. Slicing is by `char`, so a multi-byte
//! character is never split across two packets.

/// Fixed per-string overhead included in the size estimate.
const STRING_OVERHEAD: usize = 49;

/// Estimated size of `message` used to pick the chunk count.
pub fn estimated_size(message: &str) -> usize {
    STRING_OVERHEAD + message.len()
}

/// Number of chunks the estimate asks for. Zero for an empty message.
pub fn chunk_count(message: &str, budget: usize) -> usize {
    if message.is_empty() {
        return 0;
    }
    estimated_size(message).div_ceil(budget.max(1))
}

/// Cuts `message` into contiguous chunks whose concatenation is `message`.
///
/// No chunk is longer than `budget` bytes.
pub fn split_into_chunks(message: &str, budget: usize) -> Vec<String> {
    let count = chunk_count(message, budget);
    if count == 0 {
        return Vec::new();
    }
    let per_chunk = message.chars().count().div_ceil(count);
    let max_bytes = budget.max(1);

    let mut chunks = Vec::with_capacity(count);
    let mut start = 0;
    let mut taken = 0;
    let mut bytes = 0;
    for (idx, ch) in message.char_indices() {
        let width = ch.len_utf8();
        if taken == per_chunk || (taken > 0 && bytes + width > max_bytes) {
            chunks.push(message[start..idx].to_string());
            start = idx;
            taken = 0;
            bytes = 0;
        }
        taken += 1;
        bytes += width;
    }
    chunks.push(message[start..].to_string());
    chunks
}
