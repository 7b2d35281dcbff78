//! eventlens - Narrative-event annotation layout engine
//!
//! Renders narrative-event predictions over literary text: each predicted
//! event carries a category and a score; eventlens lays the events out as
//! conflict-free highlight spans per paragraph and derives a smoothed score
//! curve from the same event set.
//!
//! # Architecture
//!
//! The session store owns the submitted text and its events. Everything
//! else is a pure, memoized view of a session snapshot:
//! - Paragraph layout and span resolution
//! - Plotted x/y values and their smoothed curve
//! - Event id -> paragraph index for click-to-scroll
//!
//! # Modules
//!
//! - `adapters`: Model server integration
//! - `core`: Session store and local persistence
//! - `domain`: Event model, kind weights, errors
//! - `layout`: Paragraph indexer, span resolver, renderer
//! - `smoothing`: Moving-average and Gaussian smoothing
//! - `library`: Precomputed prediction catalog
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Score a text
//! eventlens submit --input chapter.txt
//!
//! # Show the annotated text
//! eventlens show
//!
//! # Print the plotted series
//! eventlens plot --window 20
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod layout;
pub mod library;
pub mod smoothing;

// Re-export main types at crate root for convenience
pub use adapters::{ModelServerClient, PredictionService};
pub use self::core::{LocalStorage, SessionSnapshot, SessionStore, SubmitOutcome};
pub use domain::{EventId, EventKind, NarrativeEvent, PredictionError, TextRange};
pub use layout::{DocumentLayout, Segment};
pub use library::{Book, Catalog};
pub use smoothing::{SmoothingConfig, SmoothingStrategy};
