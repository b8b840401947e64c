//! Sentence segmentation and sliding-window context combination.
//!
//! Splitting is on sentence-ending punctuation (`.`, `?`, `!`) followed by
//! whitespace, with the terminator kept attached to the preceding sentence.
//! This is a known first-pass heuristic: abbreviations and decimals will
//! produce spurious boundaries.

use crate::document::{CombinedSentence, Sentence};

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into an ordered sequence of [`Sentence`]s.
///
/// Indices are 0-based and contiguous. Empty input yields an empty sequence.
pub fn split_into_sentences(text: &str) -> Vec<Sentence> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '?' | '!') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    let segment = text[start..end].trim();
                    if !segment.is_empty() {
                        sentences.push(Sentence { index: sentences.len(), text: segment.to_string() });
                    }
                    start = end;
                }
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(Sentence { index: sentences.len(), text: tail.to_string() });
    }

    sentences
}

/// Annotate each sentence with a space-joined window of `buffer_size`
/// neighbors on both sides, clipped at the sequence ends.
///
/// A 1:1 pass: the output length always equals the input length. With
/// `buffer_size == 0` the combined text is the sentence text itself.
pub fn combine_sentences(sentences: &[Sentence], buffer_size: usize) -> Vec<CombinedSentence> {
    sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let lo = i.saturating_sub(buffer_size);
            let hi = (i + buffer_size + 1).min(sentences.len());
            let combined_text = sentences[lo..hi]
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            CombinedSentence { sentence: sentence.clone(), combined_text }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_runs() {
        assert_eq!(normalize_whitespace("  a \t b\n\nc  "), "a b c");
    }

    #[test]
    fn splits_on_terminators_keeping_them_attached() {
        let sentences = split_into_sentences("One. Two? Three! Four");
        let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["One.", "Two?", "Three!", "Four"]);
        let indices: Vec<usize> = sentences.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn terminator_at_end_does_not_create_empty_sentence() {
        let sentences = split_into_sentences("Only one sentence.");
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].text, "Only one sentence.");
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        assert!(split_into_sentences("").is_empty());
        assert!(split_into_sentences("   ").is_empty());
    }

    #[test]
    fn decimal_points_stay_inside_a_sentence() {
        // Known heuristic limit: only terminator-then-whitespace splits.
        let sentences = split_into_sentences("The rate is 3.5 percent.");
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn combine_clips_at_sequence_edges() {
        let sentences = split_into_sentences("A. B. C. D.");
        let combined = combine_sentences(&sentences, 1);
        assert_eq!(combined.len(), 4);
        assert_eq!(combined[0].combined_text, "A. B.");
        assert_eq!(combined[1].combined_text, "A. B. C.");
        assert_eq!(combined[3].combined_text, "C. D.");
    }

    #[test]
    fn zero_buffer_is_identity() {
        let sentences = split_into_sentences("A. B. C.");
        for combined in combine_sentences(&sentences, 0) {
            assert_eq!(combined.combined_text, combined.sentence.text);
        }
    }
}
