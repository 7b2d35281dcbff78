//! Session store: the single owner of the current text and event set.
//!
//! Everything else (paragraph layout, plotted series) is derived from an
//! immutable [`SessionSnapshot`]. All mutation goes through one
//! state-transition boundary guarded by a single mutex, so observers never
//! see text and events from different submissions.
//!
//! Submissions and library loads carry a monotonically increasing sequence
//! number; a response arriving after a newer request was issued is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::adapters::{PredictionBody, PredictionService};
use crate::config::ResolvedConfig;
use crate::domain::{
    events_from_wire, parse_prediction_value, ConfigError, EventId, EventKindTable,
    NarrativeEvent, PredictionError, ScorePolicy,
};
use crate::layout::{CharMap, DocumentLayout};
use crate::library::Catalog;
use crate::smoothing::{SmoothingConfig, SmoothingStrategy};

use super::storage::{LocalStorage, PersistedSession};

/// Interaction flags surfaced to the front end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// A request is in flight
    pub loading: bool,
    pub showing_error: bool,
    pub error_text: String,
    /// Event selected on the plot (click-to-scroll target)
    pub active_event: Option<EventId>,
    /// One-shot: the view should scroll to `active_event`
    pub should_scroll: bool,
    pub hovered_event: Option<EventId>,
}

/// Result of a submission or library load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Text and events replaced
    Applied { events: usize },
    /// A newer request was issued meanwhile; response ignored
    Superseded,
    /// State unchanged; error surfaced
    Failed { message: String },
}

type LayoutCell = Arc<OnceLock<Arc<DocumentLayout>>>;

#[derive(Debug)]
struct SessionState {
    text: Arc<str>,
    events: Arc<[NarrativeEvent]>,
    /// Bumped whenever text/events are replaced
    revision: u64,
    layout: LayoutCell,
    smoothing: SmoothingConfig,
    weights: EventKindTable,
    policy: ScorePolicy,
    ui: UiState,
    /// Persisted fields changed since the last save
    dirty: bool,
}

impl SessionState {
    fn replace_document(&mut self, text: Arc<str>, events: Arc<[NarrativeEvent]>) {
        self.text = text;
        self.events = events;
        self.revision += 1;
        self.layout = LayoutCell::default();
        self.ui.active_event = None;
        self.ui.should_scroll = false;
        self.ui.hovered_event = None;
        self.dirty = true;
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            revision: self.revision,
            text: Arc::clone(&self.text),
            events: Arc::clone(&self.events),
            smoothing: self.smoothing,
            weights: self.weights.clone(),
            policy: self.policy,
            ui: self.ui.clone(),
            layout: Arc::clone(&self.layout),
        }
    }
}

/// Immutable view of the session at one point in time
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub revision: u64,
    pub text: Arc<str>,
    pub events: Arc<[NarrativeEvent]>,
    pub smoothing: SmoothingConfig,
    pub weights: EventKindTable,
    pub policy: ScorePolicy,
    pub ui: UiState,
    layout: LayoutCell,
}

impl SessionSnapshot {
    pub fn event(&self, id: EventId) -> Option<&NarrativeEvent> {
        self.events.get(id.index()).filter(|e| e.id == id)
    }

    /// Text covered by each event's extent
    pub fn display_texts(&self) -> Vec<String> {
        let chars = CharMap::new(&self.text);
        self.events
            .iter()
            .map(|e| chars.slice(&self.text, e.start, e.end).to_string())
            .collect()
    }

    pub fn x_values(&self) -> Vec<usize> {
        (0..self.events.len()).collect()
    }

    /// Per-event score under the current policy
    pub fn y_values(&self) -> Vec<f64> {
        self.events
            .iter()
            .map(|e| self.policy.score(e, &self.weights))
            .collect()
    }

    pub fn smoothed_values(&self) -> Vec<f64> {
        self.smoothing.smooth(&self.y_values())
    }

    /// Paragraph layout, built once per revision and shared by all
    /// snapshots of that revision
    pub fn layout(&self) -> Arc<DocumentLayout> {
        Arc::clone(self.layout.get_or_init(|| {
            Arc::new(DocumentLayout::new(
                Arc::clone(&self.text),
                Arc::clone(&self.events),
            ))
        }))
    }

    fn persisted(&self) -> PersistedSession {
        PersistedSession::capture(
            &self.text,
            &self.events,
            self.smoothing,
            &self.weights,
            self.policy,
            self.ui.active_event,
        )
    }
}

/// Owner of the current text, events and configuration
pub struct SessionStore {
    state: Mutex<SessionState>,
    service: Arc<dyn PredictionService>,
    sequence: AtomicU64,
    storage: Option<LocalStorage>,
    /// Held from snapshot capture until the write completes, so saves land
    /// on disk in transition order
    save_lock: Mutex<()>,
}

impl SessionStore {
    /// Empty session with default settings
    pub fn new(service: Arc<dyn PredictionService>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                text: Arc::from(""),
                events: Arc::from(Vec::new()),
                revision: 0,
                layout: LayoutCell::default(),
                smoothing: SmoothingConfig::default(),
                weights: EventKindTable::default(),
                policy: ScorePolicy::default(),
                ui: UiState::default(),
                dirty: false,
            }),
            service,
            sequence: AtomicU64::new(0),
            storage: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Session seeded with the configured smoothing and scoring settings
    pub fn from_config(service: Arc<dyn PredictionService>, config: &ResolvedConfig) -> Self {
        let store = Self::new(service);
        store.transition(|state| {
            state.smoothing = config.smoothing;
            state.weights = config.weights.clone();
            state.policy = config.policy;
        });
        store
    }

    /// Persist every change to `storage`
    pub fn with_storage(mut self, storage: LocalStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Load the stored session, if any. Call once at startup.
    pub fn restore(&self) -> Result<bool> {
        let Some(storage) = &self.storage else {
            return Ok(false);
        };
        let Some(stored) = storage.load()? else {
            return Ok(false);
        };

        let events = match events_from_wire(stored.annotations) {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    path = %storage.path().display(),
                    error = %e,
                    "Stored annotations unreadable, discarding annotations"
                );
                Vec::new()
            }
        };

        let mut state = self.lock();
        state.replace_document(Arc::from(stored.submit_text), Arc::from(events));
        state.smoothing = stored.smoothing;
        state.weights = stored.weights;
        state.policy = stored.policy;
        let active = stored
            .active_event
            .filter(|id| state.events.get(id.index()).is_some_and(|e| e.id == *id));
        state.ui.active_event = active;
        state.dirty = false;
        info!(events = state.events.len(), "Restored session");
        Ok(true)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Memoized layout of the current text/events
    pub fn layout(&self) -> Arc<DocumentLayout> {
        self.snapshot().layout()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` as one atomic step, then persist if needed.
    ///
    /// The save lock is taken before the state lock is released, so a later
    /// transition can never overwrite the file before an earlier one.
    fn transition<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, pending) = {
            let mut state = self.lock();
            let result = f(&mut state);
            let pending = match &self.storage {
                Some(storage) if state.dirty => {
                    state.dirty = false;
                    let guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
                    Some((storage, state.snapshot().persisted(), guard))
                }
                _ => None,
            };
            (result, pending)
        };

        if let Some((storage, session, _guard)) = pending {
            if let Err(e) = storage.save(&session) {
                warn!(error = %e, "Failed to persist session");
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Submission protocol
    // ------------------------------------------------------------------

    /// Score `text` with the prediction service and replace the session on success
    #[instrument(skip(self, text), fields(service = self.service.name()))]
    pub async fn submit(&self, text: String) -> SubmitOutcome {
        let seq = self.begin_request();
        let result = self.service.predict(&text).await;
        self.finish_request(seq, result, Some(text))
    }

    /// Replace the session with a precomputed prediction from the library
    #[instrument(skip(self), fields(service = self.service.name()))]
    pub async fn load_precomputed(&self, id: &str) -> SubmitOutcome {
        let seq = self.begin_request();
        let result = self.service.precomputed(id).await;
        self.finish_request(seq, result, None)
    }

    /// Fetch the precomputed library index
    pub async fn library(&self) -> Result<Catalog, PredictionError> {
        Ok(Catalog::new(self.service.library_index().await?))
    }

    fn begin_request(&self) -> u64 {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(|state| state.ui.loading = true);
        seq
    }

    fn finish_request(
        &self,
        seq: u64,
        result: Result<PredictionBody, PredictionError>,
        fallback_text: Option<String>,
    ) -> SubmitOutcome {
        // Parse outside the lock
        let parsed = result.and_then(parse_prediction_value).and_then(|prediction| {
            let text = prediction.text.or(fallback_text).ok_or_else(|| {
                PredictionError::malformed("precomputed prediction has no text")
            })?;
            Ok((text, prediction.events))
        });

        self.transition(|state| {
            if seq != self.sequence.load(Ordering::SeqCst) {
                warn!(seq, "Ignoring response to superseded request");
                return SubmitOutcome::Superseded;
            }

            state.ui.loading = false;
            match parsed {
                Ok((text, events)) => {
                    let count = events.len();
                    state.replace_document(Arc::from(text), Arc::from(events));
                    state.ui.showing_error = false;
                    state.ui.error_text.clear();
                    info!(events = count, revision = state.revision, "Applied prediction");
                    SubmitOutcome::Applied { events: count }
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(error = %message, "Prediction failed");
                    state.ui.error_text = message.clone();
                    state.ui.showing_error = true;
                    SubmitOutcome::Failed { message }
                }
            }
        })
    }

    /// Hide the error surface
    pub fn dismiss_error(&self) {
        self.transition(|state| state.ui.showing_error = false);
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_window_size(&self, window_size: usize) {
        self.transition(|state| {
            state.smoothing.window_size = window_size;
            state.dirty = true;
        });
    }

    pub fn set_strategy(&self, strategy: SmoothingStrategy) {
        self.transition(|state| {
            state.smoothing.strategy = strategy;
            state.dirty = true;
        });
    }

    pub fn set_score_policy(&self, policy: ScorePolicy) {
        self.transition(|state| {
            state.policy = policy;
            state.dirty = true;
        });
    }

    /// Set the weight of one kind, addressed by its string form
    pub fn set_kind_score(&self, name: &str, score: i64) -> Result<(), ConfigError> {
        self.transition(|state| {
            state.weights.set_score(name, score)?;
            state.dirty = true;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    pub fn hover(&self, event: Option<EventId>) {
        self.transition(|state| state.ui.hovered_event = event);
    }

    /// Select plot point `point` and request a scroll to it.
    ///
    /// Returns the paragraph holding that event, or `None` when out of range.
    pub fn focus_point(&self, point: usize) -> Option<usize> {
        let snapshot = self.snapshot();
        let id = snapshot.events.get(point)?.id;
        let paragraph = snapshot.layout().paragraph_of(id);

        self.transition(|state| {
            if state.revision == snapshot.revision {
                state.ui.active_event = Some(id);
                state.ui.should_scroll = true;
                state.dirty = true;
            }
        });
        paragraph
    }

    /// Consume a pending scroll request: `(event, paragraph)`
    pub fn take_scroll_request(&self) -> Option<(EventId, usize)> {
        let snapshot = self.snapshot();
        let id = snapshot.ui.active_event.filter(|_| snapshot.ui.should_scroll)?;
        let paragraph = snapshot.layout().paragraph_of(id)?;

        self.transition(|state| {
            if state.revision == snapshot.revision {
                state.ui.should_scroll = false;
            }
        });
        Some((id, paragraph))
    }
}
