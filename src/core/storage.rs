//! Local persistence of the session.
//!
//! The session is written as a single JSON document after every state change
//! and read back once at startup. Writes go to a temp file in the same
//! directory and are renamed into place, so a crash never leaves a torn file.
//!
//! The stored text carries a SHA256 digest; annotations are only restored
//! when the digest still matches, since their offsets are meaningless
//! against any other text.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::domain::{
    events_to_wire, EventId, EventKindTable, NarrativeEvent, ScorePolicy, WireAnnotation,
};
use crate::smoothing::SmoothingConfig;

pub const STORAGE_VERSION: u32 = 1;

/// On-disk session document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub submit_text: String,
    /// Digest of `submit_text` when the annotations were produced
    pub text_sha256: String,
    pub annotations: Vec<WireAnnotation>,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub weights: EventKindTable,
    #[serde(default)]
    pub policy: ScorePolicy,
    /// Event last focused on the plot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_event: Option<EventId>,
}

impl PersistedSession {
    pub fn capture(
        text: &str,
        events: &[NarrativeEvent],
        smoothing: SmoothingConfig,
        weights: &EventKindTable,
        policy: ScorePolicy,
        active_event: Option<EventId>,
    ) -> Self {
        Self {
            version: STORAGE_VERSION,
            saved_at: Utc::now(),
            submit_text: text.to_string(),
            text_sha256: compute_text_digest(text),
            annotations: events_to_wire(events),
            smoothing,
            weights: weights.clone(),
            policy,
            active_event,
        }
    }

    /// Whether the annotations still belong to `submit_text`
    pub fn digest_ok(&self) -> bool {
        self.text_sha256 == compute_text_digest(&self.submit_text)
    }
}

/// Compute SHA256 of the text, returning hex string with prefix
pub fn compute_text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// File-backed session storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage at the configured session path
    pub fn from_config() -> Result<Self> {
        Ok(Self::new(crate::config::session_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session, if any.
    ///
    /// Annotations are dropped (text kept) when the digest does not match.
    pub fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session: {}", self.path.display()))?;
        let mut session: PersistedSession = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session: {}", self.path.display()))?;

        if !session.digest_ok() {
            warn!(
                path = %self.path.display(),
                "Stored text changed since annotation, discarding annotations"
            );
            session.annotations.clear();
            session.active_event = None;
            session.text_sha256 = compute_text_digest(&session.submit_text);
        }

        Ok(Some(session))
    }

    /// Atomically replace the stored session
    pub fn save(&self, session: &PersistedSession) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write session")?;
        tmp.flush().context("Failed to flush session")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write session: {}", self.path.display()))?;

        debug!(path = %self.path.display(), events = session.annotations.len(), "Session saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events_from_wire;
    use tempfile::TempDir;

    fn sample_session() -> PersistedSession {
        let annotations = vec![WireAnnotation {
            start: 0,
            end: 15,
            spans: vec![(0, 15)],
            predicted: "process".to_string(),
            predicted_score: 5.0,
        }];
        let events = events_from_wire(annotations).unwrap();
        PersistedSession::capture(
            "Er sagte: Ich gehe.",
            &events,
            SmoothingConfig::default(),
            &EventKindTable::default(),
            ScorePolicy::KindWeight,
            Some(EventId(0)),
        )
    }

    #[test]
    fn test_digest_format() {
        let digest = compute_text_digest("hello");
        assert!(digest.starts_with("sha256:"));
        assert_eq!(digest.len(), 7 + 64);
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path().join("session.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path().join("nested").join("session.json"));
        let session = sample_session();
        storage.save(&session).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.submit_text, session.submit_text);
        assert_eq!(loaded.annotations, session.annotations);
        assert_eq!(loaded.annotations[0].predicted, "process");
        assert_eq!(loaded.active_event, Some(EventId(0)));
    }

    #[test]
    fn test_tampered_text_drops_annotations() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path().join("session.json"));
        let mut session = sample_session();
        session.submit_text = "Ganz anderer Text.".to_string();
        storage.save(&session).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.submit_text, "Ganz anderer Text.");
        assert!(loaded.annotations.is_empty());
        assert_eq!(loaded.active_event, None);
    }

    #[test]
    fn test_stored_weights_are_validated() {
        use crate::domain::EventKind;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        let mut value = serde_json::to_value(sample_session()).unwrap();
        value["weights"] = serde_json::json!({
            "configs": [{"name": "process", "kind": "process", "score": 99}]
        });
        std::fs::write(&path, value.to_string()).unwrap();

        let loaded = LocalStorage::new(path).load().unwrap().unwrap();
        let mut weights = loaded.weights;
        assert_eq!(weights.configs().len(), 4);
        assert_eq!(weights.score_for(EventKind::Process), 5);
        assert_eq!(weights.score_for(EventKind::ChangeOfState), 7);
        assert!(weights.set_score("change_of_state", 9).is_ok());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(LocalStorage::new(path).load().is_err());
    }
}
