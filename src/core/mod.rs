//! Session orchestration.
//!
//! This module contains:
//! - Session: The session store, snapshots and derived views
//! - Storage: Local persistence of the session

pub mod session;
pub mod storage;

// Re-export commonly used types
pub use session::{SessionSnapshot, SessionStore, SubmitOutcome, UiState};
pub use storage::{compute_text_digest, LocalStorage, PersistedSession};
