//! Recursive character splitting with overlap.

use std::collections::VecDeque;

/// Separators tried in order before falling back to hard cuts.
pub const SEPARATORS: [&str; 3] = ["\n\n", "\n", "."];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into pieces of at most `chunk_size` characters.
///
/// The first separator present in the text is used to cut it; pieces that
/// are still too long are split again with the remaining separators, and
/// finally cut at character boundaries. Neighbouring pieces share up to
/// `chunk_overlap` characters of trailing context.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chunk_overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
    split_recursive(text, &SEPARATORS, chunk_size, chunk_overlap)
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let Some(position) = separators.iter().position(|sep| text.contains(sep)) else {
        return hard_cut(text, chunk_size, chunk_overlap);
    };
    let separator = separators[position];
    let remaining = &separators[position + 1..];

    let mut out = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for piece in text.split_inclusive(separator) {
        if char_len(piece) <= chunk_size {
            fitting.push(piece);
            continue;
        }

        if !fitting.is_empty() {
            out.extend(merge(&fitting, chunk_size, chunk_overlap));
            fitting.clear();
        }
        out.extend(split_recursive(piece, remaining, chunk_size, chunk_overlap));
    }

    if !fitting.is_empty() {
        out.extend(merge(&fitting, chunk_size, chunk_overlap));
    }

    out
}

/// Greedily join small pieces into chunks, carrying overlap forward.
fn merge(pieces: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        let len = char_len(piece);

        if total + len > chunk_size && !window.is_empty() {
            push_trimmed(&mut chunks, window.iter().copied().collect::<String>());

            while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                match window.pop_front() {
                    Some(first) => total -= char_len(first),
                    None => break,
                }
            }
        }

        window.push_back(piece);
        total += len;
    }

    push_trimmed(&mut chunks, window.iter().copied().collect::<String>());
    chunks
}

/// Fixed-width character windows for text with no usable separator.
fn hard_cut(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - chunk_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        push_trimmed(&mut chunks, chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: String) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split_text("A short paragraph.", 100, 10), vec!["A short paragraph."]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "First paragraph about matrices.\n\nSecond paragraph about vectors.\n\nThird paragraph about scalars.";
        let chunks = split_text(text, 40, 0);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert_eq!(chunks[1], "Second paragraph about vectors.");
    }

    #[test]
    fn test_falls_back_to_sentences() {
        let text = "One sentence here. Another sentence there. A third one too.";
        let chunks = split_text(text, 25, 0);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 25));
        assert!(chunks[0].starts_with("One sentence"));
    }

    #[test]
    fn test_overlap_repeats_trailing_piece() {
        let text = "aaaa\nbbbb\ncccc\ndddd";
        let chunks = split_text(text, 10, 5);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "bbbb\ncccc", "cccc\ndddd"]);
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let chunks = split_text("abcdefghij", 4, 1);
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_multibyte_text_counts_chars() {
        let chunks = split_text("ééééé", 2, 0);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }
}
