//! Narrative event model and its wire format.
//!
//! Events are parsed once from a prediction response and are immutable
//! afterwards; a new submission replaces the whole set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::PredictionError;

/// Predicted narrative category of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NonEvent,
    ChangeOfState,
    Process,
    StativeEvent,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::NonEvent,
        EventKind::ChangeOfState,
        EventKind::Process,
        EventKind::StativeEvent,
    ];

    /// Lowercase snake-case form used on the wire and as the weight-table key
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NonEvent => "non_event",
            EventKind::ChangeOfState => "change_of_state",
            EventKind::Process => "process",
            EventKind::StativeEvent => "stative_event",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "non_event" => Ok(EventKind::NonEvent),
            "change_of_state" => Ok(EventKind::ChangeOfState),
            "process" => Ok(EventKind::Process),
            "stative_event" => Ok(EventKind::StativeEvent),
            other => Err(PredictionError::UnknownCategory(other.to_string())),
        }
    }
}

/// Stable identity of an event within one parsed batch.
///
/// Assigned in response order at parse time, so two events sharing the same
/// offsets still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl EventId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Half-open char range `[start, end)` into the submitted text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.abs_diff(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A predicted narrative event over the submitted text
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeEvent {
    pub id: EventId,

    /// Semantic extent; may be wider than the union of `spans`
    pub start: usize,
    pub end: usize,

    /// Surface realizations, each within `[start, end]`
    pub spans: Vec<TextRange>,

    pub kind: EventKind,

    /// Confidence assigned by the model
    pub score: f64,
}

impl NarrativeEvent {
    /// Offset-derived anchor string, e.g. `span12_40`.
    ///
    /// Not unique: events with identical offsets share it. Use `id` for lookups.
    pub fn anchor(&self) -> String {
        format!("span{}_{}", self.start, self.end)
    }

    pub fn extent(&self) -> TextRange {
        TextRange::new(self.start, self.end)
    }
}

/// One annotation as sent by the model server and as persisted locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAnnotation {
    pub start: usize,
    pub end: usize,
    pub spans: Vec<(usize, usize)>,
    pub predicted: String,
    #[serde(default)]
    pub predicted_score: f64,
}

/// Successful prediction body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub annotations: Vec<WireAnnotation>,
}

/// Typed result of parsing a prediction body
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Server-normalized text, if the server sent one
    pub text: Option<String>,
    pub events: Vec<NarrativeEvent>,
}

impl WireAnnotation {
    /// Convert into a typed event carrying the given id
    pub fn into_event(self, id: EventId) -> Result<NarrativeEvent, PredictionError> {
        let kind = self.predicted.parse::<EventKind>()?;
        Ok(NarrativeEvent {
            id,
            start: self.start,
            end: self.end,
            spans: self
                .spans
                .into_iter()
                .map(|(start, end)| TextRange::new(start, end))
                .collect(),
            kind,
            score: self.predicted_score,
        })
    }

    pub fn from_event(event: &NarrativeEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            spans: event.spans.iter().map(|s| (s.start, s.end)).collect(),
            predicted: event.kind.as_str().to_string(),
            predicted_score: event.score,
        }
    }
}

/// Assign ids in order and convert every annotation; first failure aborts
pub fn events_from_wire(
    annotations: Vec<WireAnnotation>,
) -> Result<Vec<NarrativeEvent>, PredictionError> {
    annotations
        .into_iter()
        .enumerate()
        .map(|(i, anno)| {
            let id = u32::try_from(i)
                .map_err(|_| PredictionError::malformed("too many annotations"))?;
            anno.into_event(EventId(id))
        })
        .collect()
}

pub fn events_to_wire(events: &[NarrativeEvent]) -> Vec<WireAnnotation> {
    events.iter().map(WireAnnotation::from_event).collect()
}

/// Parse an already-decoded JSON body
pub fn parse_prediction_value(value: serde_json::Value) -> Result<Prediction, PredictionError> {
    let response: WireResponse = serde_json::from_value(value)?;
    Ok(Prediction {
        text: response.text,
        events: events_from_wire(response.annotations)?,
    })
}

/// Parse a raw prediction body
pub fn parse_prediction(body: &str) -> Result<Prediction, PredictionError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    parse_prediction_value(value)
}
