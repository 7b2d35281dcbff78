//! Per-kind score weights and the policy for deriving an event's plotted score.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ConfigError;
use super::events::{EventKind, NarrativeEvent};

/// Upper bound for a user-assigned kind weight
pub const MAX_KIND_SCORE: u8 = 20;

/// Weight assigned to one event kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventKindConfig {
    /// Canonical string form of `kind`
    pub name: String,
    pub kind: EventKind,
    pub score: u8,
}

impl EventKindConfig {
    pub fn new(kind: EventKind, score: u8) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            score,
        }
    }
}

/// The fixed four-entry weight table, one entry per `EventKind`.
///
/// Deserialized tables are rebuilt from the defaults, so a stored table can
/// never lose a kind or carry an out-of-range score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredKindTable")]
pub struct EventKindTable {
    configs: Vec<EventKindConfig>,
}

/// Unchecked on-disk form of `EventKindTable`
#[derive(Deserialize)]
struct StoredKindTable {
    #[serde(default)]
    configs: Vec<EventKindConfig>,
}

impl From<StoredKindTable> for EventKindTable {
    fn from(stored: StoredKindTable) -> Self {
        let mut table = EventKindTable::default();
        for config in stored.configs {
            if let Err(e) = table.set_score(&config.name, i64::from(config.score)) {
                warn!(error = %e, "Ignoring stored kind weight");
            }
        }
        table
    }
}

impl Default for EventKindTable {
    fn default() -> Self {
        Self {
            configs: vec![
                EventKindConfig::new(EventKind::ChangeOfState, 7),
                EventKindConfig::new(EventKind::Process, 5),
                EventKindConfig::new(EventKind::StativeEvent, 2),
                EventKindConfig::new(EventKind::NonEvent, 0),
            ],
        }
    }
}

impl EventKindTable {
    pub fn configs(&self) -> &[EventKindConfig] {
        &self.configs
    }

    pub fn score_for(&self, kind: EventKind) -> u8 {
        self.configs
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.score)
            .unwrap_or(0)
    }

    /// Set the weight for a kind, addressed by its string form
    pub fn set_score(&mut self, name: &str, score: i64) -> Result<(), ConfigError> {
        if !(0..=i64::from(MAX_KIND_SCORE)).contains(&score) {
            return Err(ConfigError::ScoreOutOfRange {
                kind: name.to_string(),
                score,
                max: MAX_KIND_SCORE,
            });
        }

        let config = self
            .configs
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ConfigError::UnknownKind(name.to_string()))?;
        config.score = score as u8;
        Ok(())
    }

    /// Apply `(name, score)` overrides, e.g. from a config file
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a String, &'a i64)>,
    {
        for (name, score) in overrides {
            self.set_score(name, *score)?;
        }
        Ok(self)
    }
}

/// How an event's numeric score is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// Look the kind up in the weight table
    #[default]
    KindWeight,
    /// Use the model's own confidence
    ModelConfidence,
}

impl ScorePolicy {
    pub fn score(&self, event: &NarrativeEvent, table: &EventKindTable) -> f64 {
        match self {
            ScorePolicy::KindWeight => f64::from(table.score_for(event.kind)),
            ScorePolicy::ModelConfidence => event.score,
        }
    }
}

impl FromStr for ScorePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kind_weight" => Ok(ScorePolicy::KindWeight),
            "model_confidence" => Ok(ScorePolicy::ModelConfidence),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}
