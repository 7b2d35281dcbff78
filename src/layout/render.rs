//! Turn a paragraph plus its resolved spans into render segments.
//!
//! Spans are clipped to the paragraph, so an event running into the next
//! paragraph is simply cut at the paragraph end.

use std::fmt::Write as _;

use crate::domain::{EventId, EventKind};

use super::paragraphs::CharMap;
use super::spans::ResolvedSpan;

/// A run of paragraph text, either plain or belonging to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'t> {
    Plain(&'t str),
    Event {
        text: &'t str,
        event: EventId,
        kind: EventKind,
        /// Offset-derived anchor used as element id by front ends
        anchor: String,
        /// Render the category label after this fragment
        label: bool,
    },
}

impl Segment<'_> {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain(text) => text,
            Segment::Event { text, .. } => text,
        }
    }
}

/// Slice `paragraph` along `spans` in a single left-to-right pass.
///
/// `paragraph_start` is the paragraph's absolute char offset; `spans` must be
/// the resolver's ordered, disjoint output.
pub fn render_paragraph<'t>(
    paragraph: &'t str,
    paragraph_start: usize,
    spans: &[ResolvedSpan<'_>],
) -> Vec<Segment<'t>> {
    let chars = CharMap::new(paragraph);
    let len = chars.len();
    let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;

    for span in spans {
        let start = span
            .leaf
            .start
            .saturating_sub(paragraph_start)
            .clamp(cursor, len);
        let end = span.leaf.end.saturating_sub(paragraph_start).min(len);
        if end <= start {
            continue;
        }

        if start > cursor {
            segments.push(Segment::Plain(chars.slice(paragraph, cursor, start)));
        }
        segments.push(Segment::Event {
            text: chars.slice(paragraph, start, end),
            event: span.event.id,
            kind: span.event.kind,
            anchor: span.event.anchor(),
            label: span.leaf.is_last,
        });
        cursor = end;
    }

    if cursor < len {
        segments.push(Segment::Plain(chars.slice(paragraph, cursor, len)));
    }
    segments
}

/// Terminal markup: event text in brackets, label as `_kind` suffix.
/// The focused event is doubled (`[[...]]`).
pub fn to_markup(segments: &[Segment<'_>], focus: Option<EventId>) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Plain(text) => out.push_str(text),
            Segment::Event {
                text,
                event,
                kind,
                label,
                ..
            } => {
                let focused = focus == Some(*event);
                let (open, close) = if focused { ("[[", "]]") } else { ("[", "]") };
                let _ = write!(out, "{open}{text}{close}");
                if *label {
                    let _ = write!(out, "_{kind}");
                }
            }
        }
    }
    out
}
