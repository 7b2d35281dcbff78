//! Paragraph splitting and offset indexes.
//!
//! All offsets are char (Unicode scalar) indices into the full text, matching
//! the offsets the model server emits. `CharMap` converts them to byte
//! positions for slicing.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{EventId, NarrativeEvent};

/// Blank line separating paragraphs
pub const PARAGRAPH_DELIMITER: &str = "\n\n";

/// Width of `PARAGRAPH_DELIMITER` in chars
pub const DELIMITER_WIDTH: usize = 2;

/// Absolute char range `[start, end)` of one paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphExtent {
    pub start: usize,
    pub end: usize,
}

impl ParagraphExtent {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Event start offset -> positions of the events starting there, in input order
pub type StartIndex = BTreeMap<usize, Vec<usize>>;

/// Split on blank lines; the delimiter is consumed
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split(PARAGRAPH_DELIMITER).collect()
}

/// Absolute extents of already-split paragraphs.
///
/// Extent `k` starts after all previous paragraphs plus `k` consumed delimiters.
pub fn compute_extents(paragraphs: &[&str]) -> Vec<ParagraphExtent> {
    let mut start = 0;
    paragraphs
        .iter()
        .map(|paragraph| {
            let len = paragraph.chars().count();
            let extent = ParagraphExtent {
                start,
                end: start + len,
            };
            start += len + DELIMITER_WIDTH;
            extent
        })
        .collect()
}

/// Group event positions by start offset, preserving input order
pub fn index_by_start(events: &[NarrativeEvent]) -> StartIndex {
    let mut index = StartIndex::new();
    for (i, event) in events.iter().enumerate() {
        index.entry(event.start).or_default().push(i);
    }
    index
}

/// Positions of every event whose start lies in `[start, end]` (inclusive),
/// ordered by start offset then input order
pub fn relevant_event_indices(
    index: &StartIndex,
    start: usize,
    end: usize,
) -> impl Iterator<Item = usize> + '_ {
    let upper = end.max(start);
    index
        .range(start..=upper)
        .filter(move |(offset, _)| **offset <= end)
        .flat_map(|(_, positions)| positions.iter().copied())
}

/// Events whose start lies in `[start, end]` (inclusive)
pub fn relevant_events<'a>(
    index: &'a StartIndex,
    events: &'a [NarrativeEvent],
    start: usize,
    end: usize,
) -> impl Iterator<Item = &'a NarrativeEvent> + 'a {
    relevant_event_indices(index, start, end).map(move |i| &events[i])
}

/// Map event ids to the paragraph containing their start offset.
///
/// Single forward scan: events must already be sorted by `start`. An event
/// starting inside a delimiter, or past the last paragraph, lands in the next
/// (or last) paragraph.
pub fn index_id_to_paragraph(
    events: &[NarrativeEvent],
    extents: &[ParagraphExtent],
) -> HashMap<EventId, usize> {
    let mut map = HashMap::with_capacity(events.len());
    if extents.is_empty() {
        return map;
    }

    let last = extents.len() - 1;
    let mut current = 0;
    for event in events {
        while current < last && event.start > extents[current].end {
            current += 1;
        }
        map.insert(event.id, current);
    }
    map
}

/// Char-to-byte offset table for one string
#[derive(Debug, Clone)]
pub struct CharMap {
    /// Byte position of each char, plus the total byte length
    bytes: Vec<usize>,
}

impl CharMap {
    pub fn new(text: &str) -> Self {
        let mut bytes: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        bytes.push(text.len());
        Self { bytes }
    }

    /// Number of chars
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte position of a char offset, clamped to the end of the text
    pub fn byte_offset(&self, char_offset: usize) -> usize {
        self.bytes[char_offset.min(self.len())]
    }

    /// Slice `[start, end)` in char offsets; empty when the range is inverted
    pub fn slice<'t>(&self, text: &'t str, start: usize, end: usize) -> &'t str {
        let from = self.byte_offset(start);
        let to = self.byte_offset(end);
        if from >= to {
            return "";
        }
        &text[from..to]
    }
}

/// One-off char-offset slice; prefer `CharMap` when slicing repeatedly
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    CharMap::new(text).slice(text, start, end)
}
