//! Word-window chunking with configurable size and overlap.

use crate::types::Chunk;
use explainer_core::{AppError, AppResult};

/// A window must contain more than this many words to be kept.
pub const MIN_CHUNK_WORDS: usize = 20;

/// Check chunking parameters; the stride `chunk_size - overlap` must be at least 1.
pub fn validate_params(chunk_size: usize, overlap: usize) -> AppResult<()> {
    if chunk_size == 0 {
        return Err(AppError::Config("chunk size must be positive".to_string()));
    }

    if overlap >= chunk_size {
        return Err(AppError::Config(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }

    Ok(())
}

/// Split text into overlapping word windows.
///
/// Windows start every `chunk_size - overlap` words and hold up to
/// `chunk_size` words. Windows of `MIN_CHUNK_WORDS` words or fewer are
/// dropped, so a trailing short window may disappear.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    validate_params(chunk_size, overlap)?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = chunk_size - overlap;

    let chunks: Vec<String> = (0..words.len())
        .step_by(stride)
        .map(|start| &words[start..(start + chunk_size).min(words.len())])
        .filter(|window| window.len() > MIN_CHUNK_WORDS)
        .map(|window| window.join(" "))
        .collect();

    tracing::debug!(
        "Chunked {} words into {} chunks (size: {}, overlap: {})",
        words.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}

/// Chunk one document, numbering the kept windows from 0.
pub fn chunk_document(
    source: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<Chunk>> {
    Ok(chunk(text, chunk_size, overlap)?
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk::new(source, i as u32, text))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk("", 200, 50).unwrap().is_empty());
        assert!(chunk("   \n\t ", 200, 50).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_is_dropped() {
        assert!(chunk(&numbered_words(20), 200, 50).unwrap().is_empty());
        assert_eq!(chunk(&numbered_words(21), 200, 50).unwrap().len(), 1);
    }

    #[test]
    fn test_windows_respect_size_and_overlap() {
        let chunks = chunk(&numbered_words(600), 200, 50).unwrap();

        // Windows start at 0, 150, 300 and 450
        assert_eq!(chunks.len(), 4);
        for window in &chunks {
            assert!(window.split_whitespace().count() <= 200);
        }

        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].split_whitespace().collect();
            let next: Vec<&str> = pair[1].split_whitespace().collect();
            assert_eq!(&prev[prev.len() - 50..], &next[..50]);
        }

        assert!(chunks[0].starts_with("w0 w1 "));
        assert!(chunks[1].starts_with("w150 "));
        assert_eq!(chunks[3].split_whitespace().count(), 150);
    }

    #[test]
    fn test_trailing_short_window_is_dropped() {
        // Last window starts at 450 and holds only 20 words
        let chunks = chunk(&numbered_words(470), 200, 50).unwrap();
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_whitespace_is_normalised() {
        let text = format!("  {}  ", numbered_words(30).replace(' ', " \n\t "));
        let chunks = chunk(&text, 200, 50).unwrap();
        assert_eq!(chunks, vec![numbered_words(30)]);
    }

    #[test]
    fn test_overlap_not_below_size_is_config_error() {
        assert!(matches!(chunk("a b c", 50, 50), Err(AppError::Config(_))));
        assert!(matches!(chunk("a b c", 50, 80), Err(AppError::Config(_))));
        assert!(matches!(chunk("a b c", 0, 0), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_overlap_windows_are_disjoint() {
        let chunks = chunk(&numbered_words(100), 50, 0).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].starts_with("w50 "));
    }

    #[test]
    fn test_chunk_is_deterministic() {
        let text = numbered_words(333);
        assert_eq!(chunk(&text, 200, 50).unwrap(), chunk(&text, 200, 50).unwrap());
    }

    #[test]
    fn test_chunk_document_numbers_from_zero() {
        let chunks = chunk_document("paper.pdf", &numbered_words(600), 200, 50).unwrap();
        let ids: Vec<u32> = chunks.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(chunks.iter().all(|c| c.source == "paper.pdf"));
    }
}
