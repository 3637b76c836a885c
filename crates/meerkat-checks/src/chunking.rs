//! # Context Chunking
//!
//! Splits merged source context into overlapping windows sized for a
//! 512-token NLI model, and picks the best premise chunk for a sentence by
//! non-stopword token overlap.

const CHUNK_WORDS: usize = 380;
const OVERLAP_WORDS: usize = 50;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being",
    "to", "of", "in", "on", "at", "for", "with", "by", "from", "as", "this", "that", "these",
    "those", "it", "its", "he", "she", "they", "we", "you", "i", "not", "no",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token.to_ascii_lowercase().as_str())
}

/// Split `context` into overlapping word-windows of `CHUNK_WORDS` words with
/// `OVERLAP_WORDS` words of overlap between consecutive chunks.
pub fn chunk(context: &str) -> Vec<String> {
    let words: Vec<&str> = context.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= CHUNK_WORDS {
        return vec![words.join(" ")];
    }

    let stride = CHUNK_WORDS - OVERLAP_WORDS;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + CHUNK_WORDS).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }
    chunks
}

pub(crate) fn meaningful_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_ascii_lowercase()
        })
        .filter(|w| !w.is_empty() && !is_stopword(w))
        .collect()
}

/// Return the index of the chunk with the most non-stopword token overlap
/// with `sentence`, or `None` if `chunks` is empty.
pub fn best_premise_chunk<'a>(sentence: &str, chunks: &'a [String]) -> Option<&'a str> {
    let sentence_tokens = meaningful_tokens(sentence);
    if chunks.is_empty() {
        return None;
    }
    chunks
        .iter()
        .map(|chunk| {
            let chunk_tokens = meaningful_tokens(chunk);
            let overlap = sentence_tokens
                .iter()
                .filter(|t| chunk_tokens.contains(t))
                .count();
            (chunk.as_str(), overlap)
        })
        .max_by_key(|(_, overlap)| *overlap)
        .map(|(chunk, _)| chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_context_is_a_single_chunk() {
        let chunks = chunk("a short piece of source context");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_context_splits_with_overlap() {
        let words: Vec<String> = (0..1000).map(|i| format!("word{i}")).collect();
        let context = words.join(" ");
        let chunks = chunk(&context);
        assert!(chunks.len() > 1);
        // consecutive chunks must share overlap words
        let first_words: Vec<&str> = chunks[0].split_whitespace().collect();
        let second_words: Vec<&str> = chunks[1].split_whitespace().collect();
        assert!(first_words[first_words.len() - 1..].iter().any(|w| second_words.contains(w)));
    }

    #[test]
    fn best_premise_chunk_picks_highest_overlap() {
        let chunks = vec![
            "revenue grew in the pacific region".to_string(),
            "quarterly revenue was eight hundred million dollars".to_string(),
        ];
        let best = best_premise_chunk("Revenue for the quarter was eight hundred million", &chunks);
        assert_eq!(best, Some(chunks[1].as_str()));
    }

    #[test]
    fn best_premise_chunk_none_for_empty_chunks() {
        assert_eq!(best_premise_chunk("anything", &[]), None);
    }
}
