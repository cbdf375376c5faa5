use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::engine::{GameSettings, RetryPolicy};
use crate::session::{Skips, DEFAULT_SECONDS_PER_TURN, DEFAULT_TOTAL_ROUNDS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub players: Vec<String>,
    pub total_rounds: u32,
    pub seconds_per_turn: u32,
    pub skips_per_turn: Skips,
    pub category: String,
    pub difficulty: String,
    pub language: String,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// `None` retries forever
    pub max_fetch_attempts: Option<u32>,
    /// a fetch with no answer by then counts as a failed attempt
    pub fetch_timeout_ms: u64,
    pub deck_path: Option<PathBuf>,
    pub word_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            players: (1..=3).map(|n| format!("Player {n}")).collect(),
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            seconds_per_turn: DEFAULT_SECONDS_PER_TURN,
            skips_per_turn: Skips::default(),
            category: "general".to_string(),
            difficulty: "medium".to_string(),
            language: "english".to_string(),
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 8000,
            max_fetch_attempts: Some(5),
            fetch_timeout_ms: 20_000,
            deck_path: None,
            word_command: None,
        }
    }
}

impl From<&Config> for GameSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            total_rounds: cfg.total_rounds,
            seconds_per_turn: cfg.seconds_per_turn,
            skips_per_turn: cfg.skips_per_turn,
            category: cfg.category.clone(),
            difficulty: cfg.difficulty.clone(),
            language: cfg.language.clone(),
        }
    }
}

impl From<&Config> for RetryPolicy {
    fn from(cfg: &Config) -> Self {
        let base_delay = Duration::from_millis(cfg.retry_base_delay_ms);
        Self {
            base_delay,
            max_delay: Duration::from_millis(cfg.retry_max_delay_ms).max(base_delay),
            max_attempts: cfg.max_fetch_attempts,
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.max(1))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "taboo") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("taboo_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable config");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            players: vec!["Ana".into(), "Ben".into()],
            total_rounds: 5,
            seconds_per_turn: 90,
            skips_per_turn: Skips::Unlimited,
            category: "animals".into(),
            difficulty: "hard".into(),
            language: "spanish".into(),
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 4000,
            max_fetch_attempts: None,
            fetch_timeout_ms: 5_000,
            deck_path: Some(PathBuf::from("/tmp/deck.json")),
            word_command: Some("./gen-word.sh".into()),
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"total_rounds": 7}"#).unwrap();
        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.total_rounds, 7);
        assert_eq!(loaded.seconds_per_turn, 60);
        assert_eq!(loaded.players.len(), 3);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn retry_policy_from_config() {
        let cfg = Config {
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 100,
            max_fetch_attempts: Some(2),
            ..Default::default()
        };
        let policy = RetryPolicy::from(&cfg);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        // the cap never undercuts the base delay
        assert_eq!(policy.max_delay, Duration::from_millis(250));
        assert_eq!(policy.max_attempts, Some(2));
    }

    #[test]
    fn fetch_timeout_is_never_zero() {
        let cfg = Config {
            fetch_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.fetch_timeout(), Duration::from_millis(1));
        assert_eq!(Config::default().fetch_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn settings_from_config() {
        let cfg = Config::default();
        let settings = GameSettings::from(&cfg);
        assert_eq!(settings, GameSettings::default());
    }
}
