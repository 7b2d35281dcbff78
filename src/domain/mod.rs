//! Domain types for eventlens.
//!
//! This module contains the core data structures:
//! - Events: Predicted narrative events and their wire form
//! - Kinds: Per-kind score weights and score policy
//! - Error: Prediction/transport/config error taxonomy

pub mod error;
pub mod events;
pub mod kinds;

// Re-export commonly used types
pub use error::{ConfigError, PredictionError, TransportError};
pub use events::{
    events_from_wire, events_to_wire, parse_prediction, parse_prediction_value, EventId,
    EventKind, NarrativeEvent, Prediction, TextRange, WireAnnotation, WireResponse,
};
pub use kinds::{EventKindConfig, EventKindTable, ScorePolicy, MAX_KIND_SCORE};
