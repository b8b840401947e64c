//! Structural-marker extraction and metadata propagation.
//!
//! Structured corpora have sparse headings relative to chunk density.
//! The [`MetadataPropagator`] scans a bounded lookback window of preceding
//! chunks and carries the latest-seen title, subtitle, and sub-subtitle
//! forward onto each chunk, keeping the cost at O(n·window).
//!
//! Pattern sets are pluggable per document family through the
//! [`StructureMatcher`] trait; [`RegulatoryMatcher`] is the built-in family
//! for US regulatory text (`PART N—…`, `Subpart X—…`, `§ N.N …`).

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::document::{Chunk, ChunkMetadata};

/// Extracts hierarchical structure markers from chunk text.
///
/// Each method returns the first match of its pattern, or `None` when the
/// text carries no marker of that level.
pub trait StructureMatcher: Send + Sync {
    /// Match a top-level title marker.
    fn match_title(&self, text: &str) -> Option<String>;

    /// Match a subtitle marker.
    fn match_subtitle(&self, text: &str) -> Option<String>;

    /// Match a sub-subtitle marker.
    fn match_sub_subtitle(&self, text: &str) -> Option<String>;
}

// Heading classes exclude '.' so a match stops at the end of the heading
// instead of running into the following sentence.
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PART \d+[-—]\s*[A-Za-z0-9 ,\-]+").expect("title pattern is valid")
});

static SUBTITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Subpart [A-Z]—[A-Za-z0-9 ,\-]+").expect("subtitle pattern is valid")
});

static SUB_SUBTITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"§\s*\d+\.\d+\s+[A-Za-z0-9 ,\-]+").expect("sub-subtitle pattern is valid")
});

/// The built-in pattern family for US regulatory documents.
///
/// Titles look like `PART 131—Milk and Cream`, subtitles like
/// `Subpart B—Requirements`, sub-subtitles like `§ 131.110 Milk.`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegulatoryMatcher;

impl StructureMatcher for RegulatoryMatcher {
    fn match_title(&self, text: &str) -> Option<String> {
        TITLE_RE.find(text).map(|m| m.as_str().trim().to_string())
    }

    fn match_subtitle(&self, text: &str) -> Option<String> {
        SUBTITLE_RE.find(text).map(|m| m.as_str().trim().to_string())
    }

    fn match_sub_subtitle(&self, text: &str) -> Option<String> {
        SUB_SUBTITLE_RE.find(text).map(|m| m.as_str().trim().to_string())
    }
}

/// Carries structural metadata forward onto chunks within a bounded window.
///
/// For the chunk at position `i`, chunks `[max(0, i - window), i)` are
/// scanned in order and the latest match per pattern wins; a chunk without
/// its own heading inherits the nearest preceding heading found in-window.
/// The chunk itself is not part of its own window.
pub struct MetadataPropagator {
    matcher: Arc<dyn StructureMatcher>,
    window: usize,
}

impl MetadataPropagator {
    /// Create a propagator with the given matcher and lookback window size.
    pub fn new(matcher: Arc<dyn StructureMatcher>, window: usize) -> Self {
        Self { matcher, window }
    }

    /// Annotate each chunk with the latest in-window structural markers.
    ///
    /// Chunk text and order are left untouched; only metadata is assigned.
    pub fn annotate(&self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut metadata = ChunkMetadata::default();
                for text in &texts[i.saturating_sub(self.window)..i] {
                    if let Some(title) = self.matcher.match_title(text) {
                        metadata.title = Some(title);
                    }
                    if let Some(subtitle) = self.matcher.match_subtitle(text) {
                        metadata.subtitle = Some(subtitle);
                    }
                    if let Some(sub_subtitle) = self.matcher.match_sub_subtitle(text) {
                        metadata.sub_subtitle = Some(sub_subtitle);
                    }
                }
                Chunk { text: chunk.text.clone(), metadata }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text)
    }

    #[test]
    fn matcher_finds_each_level() {
        let matcher = RegulatoryMatcher;
        let text = "PART 131—Milk and Cream. Subpart B—Requirements. § 131.110 Milk standards.";
        assert_eq!(matcher.match_title(text).as_deref(), Some("PART 131—Milk and Cream"));
        assert_eq!(matcher.match_subtitle(text).as_deref(), Some("Subpart B—Requirements"));
        assert_eq!(matcher.match_sub_subtitle(text).as_deref(), Some("§ 131.110 Milk standards"));
    }

    #[test]
    fn heading_match_stops_at_sentence_end() {
        let matcher = RegulatoryMatcher;
        let text = "PART 131—Milk and Cream. Subpart B—Requirements follow here.";
        assert_eq!(matcher.match_title(text).as_deref(), Some("PART 131—Milk and Cream"));
        assert_eq!(
            matcher.match_subtitle(text).as_deref(),
            Some("Subpart B—Requirements follow here")
        );
    }

    #[test]
    fn matcher_returns_none_without_markers() {
        let matcher = RegulatoryMatcher;
        assert!(matcher.match_title("plain prose with no markers").is_none());
        assert!(matcher.match_subtitle("plain prose").is_none());
        assert!(matcher.match_sub_subtitle("plain prose").is_none());
    }

    #[test]
    fn markers_carry_forward_within_window() {
        let propagator = MetadataPropagator::new(Arc::new(RegulatoryMatcher), 10);
        let chunks = vec![
            chunk("PART 7—General. Introductory text."),
            chunk("No markers here."),
            chunk("Still no markers."),
        ];
        let annotated = propagator.annotate(chunks);
        assert_eq!(annotated[0].metadata.title, None);
        assert_eq!(annotated[1].metadata.title.as_deref(), Some("PART 7—General"));
        assert_eq!(annotated[2].metadata.title.as_deref(), Some("PART 7—General"));
    }

    #[test]
    fn latest_marker_in_window_wins() {
        let propagator = MetadataPropagator::new(Arc::new(RegulatoryMatcher), 10);
        let chunks = vec![
            chunk("PART 1—First."),
            chunk("PART 2—Second."),
            chunk("no markers"),
        ];
        let annotated = propagator.annotate(chunks);
        assert_eq!(annotated[2].metadata.title.as_deref(), Some("PART 2—Second"));
    }

    #[test]
    fn markers_outside_window_are_forgotten() {
        let propagator = MetadataPropagator::new(Arc::new(RegulatoryMatcher), 1);
        let chunks = vec![chunk("PART 3—Old."), chunk("gap"), chunk("target")];
        let annotated = propagator.annotate(chunks);
        // Window of 1 only sees the immediately preceding chunk.
        assert_eq!(annotated[2].metadata.title, None);
    }

    #[test]
    fn levels_propagate_independently() {
        let propagator = MetadataPropagator::new(Arc::new(RegulatoryMatcher), 10);
        let chunks = vec![
            chunk("PART 131—Milk and Cream."),
            chunk("Subpart A—Scope."),
            chunk("no markers"),
        ];
        let annotated = propagator.annotate(chunks);
        assert_eq!(annotated[2].metadata.title.as_deref(), Some("PART 131—Milk and Cream"));
        assert_eq!(annotated[2].metadata.subtitle.as_deref(), Some("Subpart A—Scope"));
        assert_eq!(annotated[2].metadata.sub_subtitle, None);
    }
}
