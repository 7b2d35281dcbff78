//! Span resolution: turn possibly overlapping multi-span events into a
//! disjoint, ordered list of leaves ready for a single left-to-right slicing pass.
//!
//! # Algorithm
//!
//! 1. Explode every event's spans into leaves tagged with the event's position
//! 2. Stable sort by `start`
//! 3. Forward pass: a leaf overlapping its predecessor is dropped. Dropped
//!    leaves still take part in the comparison with their successor.
//! 4. Leaves of at most `DEGENERATE_SPAN_LEN` chars are dropped
//! 5. The right-most surviving leaf of each event is tagged `is_last`

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{NarrativeEvent, TextRange};

/// Spans this short (or shorter) are never rendered
pub const DEGENERATE_SPAN_LEN: usize = 2;

/// One exploded span awaiting or having survived resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    pub start: usize,
    pub end: usize,
    /// Right-most surviving leaf of its owner; carries the category label
    pub is_last: bool,
    /// Position of the owning event in the resolver's input
    pub owner_index: usize,
}

impl Leaf {
    fn is_degenerate(&self) -> bool {
        self.end.abs_diff(self.start) <= DEGENERATE_SPAN_LEN
    }
}

/// Why a leaf was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Overlap,
    Degenerate,
}

/// Non-fatal diagnostic: a leaf was dropped during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapResolutionWarning {
    pub leaf: Leaf,
    pub reason: DiscardReason,
}

/// Resolver output: surviving leaves plus what was dropped
#[derive(Debug, Clone, Default)]
pub struct SpanResolution {
    pub leaves: Vec<Leaf>,
    pub warnings: Vec<OverlapResolutionWarning>,
}

/// A surviving leaf paired with its owning event
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSpan<'a> {
    pub leaf: Leaf,
    pub event: &'a NarrativeEvent,
}

/// Resolve the span sets of several owners, one slice per owner in input order
pub fn resolve_leaves<'s, I>(span_sets: I) -> SpanResolution
where
    I: IntoIterator<Item = &'s [TextRange]>,
{
    let mut leaves: Vec<Leaf> = span_sets
        .into_iter()
        .enumerate()
        .flat_map(|(owner_index, spans)| {
            spans.iter().map(move |span| Leaf {
                start: span.start,
                end: span.end,
                is_last: false,
                owner_index,
            })
        })
        .collect();

    // Stable: leaves sharing a start keep explode order
    leaves.sort_by_key(|leaf| leaf.start);

    let mut discard: Vec<Option<DiscardReason>> = vec![None; leaves.len()];
    for k in 1..leaves.len() {
        if leaves[k - 1].end > leaves[k].start {
            discard[k] = Some(DiscardReason::Overlap);
        }
    }
    for (leaf, reason) in leaves.iter().zip(discard.iter_mut()) {
        if reason.is_none() && leaf.is_degenerate() {
            *reason = Some(DiscardReason::Degenerate);
        }
    }

    let mut resolution = SpanResolution::default();
    for (leaf, reason) in leaves.into_iter().zip(discard) {
        match reason {
            Some(reason) => resolution
                .warnings
                .push(OverlapResolutionWarning { leaf, reason }),
            None => resolution.leaves.push(leaf),
        }
    }

    let mut seen = HashSet::new();
    for leaf in resolution.leaves.iter_mut().rev() {
        if seen.insert(leaf.owner_index) {
            leaf.is_last = true;
        }
    }

    if !resolution.warnings.is_empty() {
        debug!(
            discarded = resolution.warnings.len(),
            kept = resolution.leaves.len(),
            "Discarded conflicting or degenerate spans"
        );
    }

    resolution
}

/// Resolve the spans of `events`, pairing each surviving leaf with its event
pub fn resolve_spans<'a>(events: &[&'a NarrativeEvent]) -> Vec<ResolvedSpan<'a>> {
    resolve_leaves(events.iter().map(|e| e.spans.as_slice()))
        .leaves
        .into_iter()
        .map(|leaf| ResolvedSpan {
            leaf,
            event: events[leaf.owner_index],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(pairs: &[(usize, usize)]) -> Vec<TextRange> {
        pairs.iter().map(|&(s, e)| TextRange::new(s, e)).collect()
    }

    fn bounds(resolution: &SpanResolution) -> Vec<(usize, usize)> {
        resolution.leaves.iter().map(|l| (l.start, l.end)).collect()
    }

    #[test]
    fn test_empty_input() {
        let resolution = resolve_leaves(std::iter::empty::<&[TextRange]>());
        assert!(resolution.leaves.is_empty());
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_sorted_output() {
        let a = ranges(&[(20, 30)]);
        let b = ranges(&[(0, 10)]);
        let resolution = resolve_leaves([a.as_slice(), b.as_slice()]);
        assert_eq!(bounds(&resolution), vec![(0, 10), (20, 30)]);
        assert_eq!(resolution.leaves[0].owner_index, 1);
    }

    #[test]
    fn test_deleted_leaf_still_competes() {
        // (5,12) overlaps (0,10) and is dropped, yet still knocks out (11,20)
        let a = ranges(&[(0, 10)]);
        let b = ranges(&[(5, 12)]);
        let c = ranges(&[(11, 20)]);
        let resolution = resolve_leaves([a.as_slice(), b.as_slice(), c.as_slice()]);
        assert_eq!(bounds(&resolution), vec![(0, 10)]);
        assert_eq!(resolution.warnings.len(), 2);
        assert!(resolution
            .warnings
            .iter()
            .all(|w| w.reason == DiscardReason::Overlap));
    }

    #[test]
    fn test_degenerate_dropped() {
        let a = ranges(&[(0, 2), (4, 7), (9, 11)]);
        let resolution = resolve_leaves([a.as_slice()]);
        assert_eq!(bounds(&resolution), vec![(4, 7)]);
        assert_eq!(
            resolution
                .warnings
                .iter()
                .filter(|w| w.reason == DiscardReason::Degenerate)
                .count(),
            2
        );
    }

    #[test]
    fn test_last_leaf_per_owner() {
        let a = ranges(&[(0, 5), (20, 25)]);
        let b = ranges(&[(10, 15)]);
        let resolution = resolve_leaves([a.as_slice(), b.as_slice()]);
        let flags: Vec<(usize, bool)> = resolution
            .leaves
            .iter()
            .map(|l| (l.owner_index, l.is_last))
            .collect();
        assert_eq!(flags, vec![(0, false), (1, true), (0, true)]);
    }

    #[test]
    fn test_fully_dropped_owner_has_no_label() {
        let a = ranges(&[(0, 10)]);
        let b = ranges(&[(3, 8)]);
        let resolution = resolve_leaves([a.as_slice(), b.as_slice()]);
        assert!(resolution.leaves.iter().all(|l| l.owner_index == 0));
        assert!(resolution.leaves[0].is_last);
    }
}
