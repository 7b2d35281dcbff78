//! Annotation layout engine.
//!
//! This module contains:
//! - Paragraphs: Splitting, extents and offset indexes
//! - Spans: Conflict-free span resolution
//! - Render: Paragraph slicing into plain/event segments
//! - Document: Memoized layout of one text/event pair

pub mod document;
pub mod paragraphs;
pub mod render;
pub mod spans;

// Re-export commonly used types
pub use document::DocumentLayout;
pub use paragraphs::{
    char_slice, compute_extents, index_by_start, index_id_to_paragraph, relevant_events,
    split_paragraphs, CharMap, ParagraphExtent, StartIndex,
};
pub use render::{render_paragraph, to_markup, Segment};
pub use spans::{
    resolve_leaves, resolve_spans, DiscardReason, Leaf, OverlapResolutionWarning,
    ResolvedSpan, SpanResolution,
};
