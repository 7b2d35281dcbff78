//! Configuration for eventlens.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EVENTLENS_HOME, EVENTLENS_SERVER)
//! 2. Config file (.eventlens/config.yaml)
//! 3. Defaults (~/.eventlens, http://localhost:8080)
//!
//! Config file discovery:
//! - Searches current directory and parents for .eventlens/config.yaml
//! - `paths.home` in the config file is relative to the .eventlens/ directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::{EventKindTable, ScorePolicy};
use crate::smoothing::{SmoothingConfig, SmoothingStrategy, DEFAULT_WINDOW_SIZE};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
const SESSION_FILE: &str = "session.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub smoothing: Option<SmoothingSection>,
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .eventlens/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmoothingSection {
    pub window_size: Option<usize>,
    pub strategy: Option<SmoothingStrategy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    pub policy: Option<ScorePolicy>,
    /// Kind name -> weight in 0..=20
    #[serde(default)]
    pub weights: HashMap<String, i64>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to eventlens home (session state)
    pub home: PathBuf,
    /// Model server base URL
    pub server_url: String,
    /// Request timeout for the model server
    pub timeout: Duration,
    /// Initial smoothing settings
    pub smoothing: SmoothingConfig,
    /// Initial score policy
    pub policy: ScorePolicy,
    /// Initial kind weights
    pub weights: EventKindTable,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Persisted session file ($EVENTLENS_HOME/session.json)
    pub fn session_path(&self) -> PathBuf {
        self.home.join(SESSION_FILE)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".eventlens").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed config file (if any) with environment overrides
fn resolve(
    file: Option<(&Path, ConfigFile)>,
    env_home: Option<String>,
    env_server: Option<String>,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let (config_path, config) = match file {
        Some((path, config)) => (Some(path), Some(config)),
        None => (None, None),
    };

    let home = if let Some(env_home) = env_home {
        PathBuf::from(env_home)
    } else if let (Some(path), Some(home)) = (
        config_path,
        config.as_ref().and_then(|c| c.paths.home.as_deref()),
    ) {
        let dot_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(dot_dir, home)
    } else {
        default_home
    };

    let server = config.as_ref().and_then(|c| c.server.as_ref());
    let server_url = env_server
        .or_else(|| server.and_then(|s| s.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let timeout = Duration::from_secs(
        server
            .and_then(|s| s.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
    );

    let smoothing_section = config.as_ref().and_then(|c| c.smoothing.as_ref());
    let smoothing = SmoothingConfig {
        window_size: smoothing_section
            .and_then(|s| s.window_size)
            .unwrap_or(DEFAULT_WINDOW_SIZE),
        strategy: smoothing_section
            .and_then(|s| s.strategy)
            .unwrap_or_default(),
    };

    let scoring = config.as_ref().and_then(|c| c.scoring.as_ref());
    let policy = scoring.and_then(|s| s.policy).unwrap_or_default();
    let weights = match scoring {
        Some(scoring) => EventKindTable::default()
            .with_overrides(scoring.weights.iter())
            .context("Invalid scoring.weights in config file")?,
        None => EventKindTable::default(),
    };

    Ok(ResolvedConfig {
        home,
        server_url,
        timeout,
        smoothing,
        policy,
        weights,
        config_file: config_path.map(Path::to_path_buf),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".eventlens");

    let config_path = find_config_file();
    let file = match config_path {
        Some(ref path) => Some((path.as_path(), load_config_file(path)?)),
        None => None,
    };

    resolve(
        file,
        std::env::var("EVENTLENS_HOME").ok(),
        std::env::var("EVENTLENS_SERVER").ok(),
        default_home,
    )
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the persisted session path
pub fn session_path() -> Result<PathBuf> {
    Ok(config()?.session_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventKind;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let dot_dir = dir.join(".eventlens");
        std::fs::create_dir_all(&dot_dir).unwrap();
        let config_path = dot_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", body).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, None, None, PathBuf::from("/home/u/.eventlens")).unwrap();
        assert_eq!(config.home, PathBuf::from("/home/u/.eventlens"));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.smoothing, SmoothingConfig::default());
        assert_eq!(config.policy, ScorePolicy::KindWeight);
        assert_eq!(config.weights, EventKindTable::default());
        assert_eq!(
            config.session_path(),
            PathBuf::from("/home/u/.eventlens/session.json")
        );
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            temp.path(),
            r#"
version: "1.0"
paths:
  home: ./state
server:
  base_url: http://scoring.internal:9000
  timeout_seconds: 30
smoothing:
  window_size: 25
  strategy: moving_average
scoring:
  policy: model_confidence
  weights:
    process: 11
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        assert_eq!(file.version, "1.0");

        let config = resolve(
            Some((config_path.as_path(), file)),
            None,
            None,
            PathBuf::from("/unused"),
        )
        .unwrap();
        assert!(config.home.ends_with("state"));
        assert_eq!(config.server_url, "http://scoring.internal:9000");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.smoothing.window_size, 25);
        assert_eq!(config.smoothing.strategy, SmoothingStrategy::MovingAverage);
        assert_eq!(config.policy, ScorePolicy::ModelConfidence);
        assert_eq!(config.weights.score_for(EventKind::Process), 11);
        assert_eq!(config.weights.score_for(EventKind::ChangeOfState), 7);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            temp.path(),
            "version: \"1.0\"\nserver:\n  base_url: http://from-file\n",
        );
        let file = load_config_file(&config_path).unwrap();

        let config = resolve(
            Some((config_path.as_path(), file)),
            Some("/env/home".to_string()),
            Some("http://from-env".to_string()),
            PathBuf::from("/unused"),
        )
        .unwrap();
        assert_eq!(config.home, PathBuf::from("/env/home"));
        assert_eq!(config.server_url, "http://from-env");
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            temp.path(),
            "version: \"1.0\"\nscoring:\n  weights:\n    process: 40\n",
        );
        let file = load_config_file(&config_path).unwrap();
        let result = resolve(
            Some((config_path.as_path(), file)),
            None,
            None,
            PathBuf::from("/unused"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
