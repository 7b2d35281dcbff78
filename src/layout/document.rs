//! Derived layout of one text + event set.
//!
//! Built once per session revision. Paragraph splitting and the offset
//! indexes are computed eagerly; span resolution is deferred until a
//! paragraph is actually requested and then memoized.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::domain::{EventId, NarrativeEvent};

use super::paragraphs::{
    compute_extents, index_by_start, index_id_to_paragraph, relevant_event_indices,
    split_paragraphs, ParagraphExtent, StartIndex, DELIMITER_WIDTH,
};
use super::render::{render_paragraph, Segment};
use super::spans::{resolve_leaves, Leaf, ResolvedSpan};

/// Paragraphs, indexes and lazily resolved spans for a text/event pair
#[derive(Debug)]
pub struct DocumentLayout {
    text: Arc<str>,
    events: Arc<[NarrativeEvent]>,
    /// Byte ranges of each paragraph inside `text`
    paragraph_bytes: Vec<(usize, usize)>,
    extents: Vec<ParagraphExtent>,
    by_start: StartIndex,
    id_to_paragraph: HashMap<EventId, usize>,
    /// Per-paragraph surviving leaves; `owner_index` is the event's position
    /// in `events`
    spans: Vec<OnceLock<Vec<Leaf>>>,
}

impl DocumentLayout {
    pub fn new(text: Arc<str>, events: Arc<[NarrativeEvent]>) -> Self {
        let paragraphs = split_paragraphs(&text);
        let extents = compute_extents(&paragraphs);

        let mut paragraph_bytes = Vec::with_capacity(paragraphs.len());
        let mut byte_start = 0;
        for paragraph in &paragraphs {
            paragraph_bytes.push((byte_start, byte_start + paragraph.len()));
            byte_start += paragraph.len() + DELIMITER_WIDTH;
        }

        let by_start = index_by_start(&events);

        // The id scan needs ascending starts; the wire order is not guaranteed
        let mut ordered: Vec<NarrativeEvent> = events.to_vec();
        ordered.sort_by_key(|e| e.start);
        let id_to_paragraph = index_id_to_paragraph(&ordered, &extents);

        let spans = (0..paragraphs.len()).map(|_| OnceLock::new()).collect();

        Self {
            text,
            events,
            paragraph_bytes,
            extents,
            by_start,
            id_to_paragraph,
            spans,
        }
    }

    pub fn paragraph_count(&self) -> usize {
        self.extents.len()
    }

    pub fn paragraph(&self, k: usize) -> Option<&str> {
        self.paragraph_bytes
            .get(k)
            .map(|&(from, to)| &self.text[from..to])
    }

    pub fn extent(&self, k: usize) -> Option<ParagraphExtent> {
        self.extents.get(k).copied()
    }

    pub fn extents(&self) -> &[ParagraphExtent] {
        &self.extents
    }

    pub fn events(&self) -> &[NarrativeEvent] {
        &self.events
    }

    /// Paragraph holding the event's start, for scroll-to-event
    pub fn paragraph_of(&self, id: EventId) -> Option<usize> {
        self.id_to_paragraph.get(&id).copied()
    }

    /// Events starting inside paragraph `k` (bounds inclusive)
    pub fn relevant_events(&self, k: usize) -> Vec<&NarrativeEvent> {
        match self.extents.get(k) {
            Some(extent) => relevant_event_indices(&self.by_start, extent.start, extent.end)
                .map(|i| &self.events[i])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Resolved leaves of paragraph `k`, computed on first access
    pub fn spans(&self, k: usize) -> &[Leaf] {
        match self.spans.get(k) {
            Some(cell) => cell.get_or_init(|| self.resolve_paragraph(k)),
            None => &[],
        }
    }

    /// Resolved spans of paragraph `k` paired with their events
    pub fn resolved_spans(&self, k: usize) -> Vec<ResolvedSpan<'_>> {
        self.spans(k)
            .iter()
            .map(|&leaf| ResolvedSpan {
                leaf,
                event: &self.events[leaf.owner_index],
            })
            .collect()
    }

    /// Render paragraph `k` into plain and event segments
    pub fn render(&self, k: usize) -> Vec<Segment<'_>> {
        let (Some(paragraph), Some(extent)) = (self.paragraph(k), self.extent(k)) else {
            return Vec::new();
        };
        render_paragraph(paragraph, extent.start, &self.resolved_spans(k))
    }

    fn resolve_paragraph(&self, k: usize) -> Vec<Leaf> {
        let extent = self.extents[k];
        let positions: Vec<usize> =
            relevant_event_indices(&self.by_start, extent.start, extent.end).collect();
        let resolution =
            resolve_leaves(positions.iter().map(|&i| self.events[i].spans.as_slice()));

        debug!(
            paragraph = k,
            events = positions.len(),
            spans = resolution.leaves.len(),
            "Resolved paragraph spans"
        );

        resolution
            .leaves
            .into_iter()
            .map(|leaf| Leaf {
                owner_index: positions[leaf.owner_index],
                ..leaf
            })
            .collect()
    }
}
