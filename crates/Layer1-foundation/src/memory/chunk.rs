//! Chunked processing of oversized inputs
//!
//! Input longer than `chunk_size` units is split into contiguous,
//! non-overlapping chunks of at most `chunk_size` units. `step` runs on each
//! chunk in order and the outputs are concatenated in order. Input that is
//! not longer than `chunk_size` (including empty input) is handed to `step`
//! whole. A `chunk_size` of zero is treated as one.
//!
//! Text variants count `char`s, so a chunk never splits a code point.

use std::future::Future;
use tracing::trace;

fn effective(chunk_size: usize) -> usize {
    chunk_size.max(1)
}

/// Apply `step` to bounded slices of `input`
pub fn process_in_chunks<T, R, F>(input: &[T], chunk_size: usize, mut step: F) -> Vec<R>
where
    F: FnMut(&[T]) -> Vec<R>,
{
    let chunk_size = effective(chunk_size);
    if input.len() <= chunk_size {
        return step(input);
    }

    let mut output = Vec::with_capacity(input.len());
    for (index, chunk) in input.chunks(chunk_size).enumerate() {
        trace!(index, len = chunk.len(), "processing chunk");
        output.extend(step(chunk));
    }
    output
}

/// Split text into chunks of at most `chunk_size` chars
///
/// Returns a single (possibly empty) chunk when the text fits.
pub fn split_text_chunks(text: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = effective(chunk_size);

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}

/// Apply `step` to bounded pieces of `text`
pub fn process_text_in_chunks<F>(text: &str, chunk_size: usize, mut step: F) -> String
where
    F: FnMut(&str) -> String,
{
    let chunks = split_text_chunks(text, chunk_size);
    if chunks.len() == 1 {
        return step(text);
    }

    let mut output = String::with_capacity(text.len());
    for chunk in chunks {
        output.push_str(&step(chunk));
    }
    output
}

/// Async, fallible variant of [`process_text_in_chunks`]
///
/// Chunks are processed sequentially; the first error aborts the run and is
/// returned unchanged.
pub async fn process_text_in_chunks_async<F, Fut, E>(
    text: &str,
    chunk_size: usize,
    mut step: F,
) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<String, E>>,
{
    let chunks = split_text_chunks(text, chunk_size);
    if chunks.len() == 1 {
        return step(text.to_string()).await;
    }

    let total = chunks.len();
    let mut output = String::with_capacity(text.len());
    for (index, chunk) in chunks.into_iter().enumerate() {
        trace!(index, total, "processing text chunk");
        output.push_str(&step(chunk.to_string()).await?);
    }
    Ok(output)
}
