use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::session::model::ReviewMode;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_mode")]
    pub default_mode: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_stale_session_minutes")]
    pub stale_session_minutes: u64,
    #[serde(default = "default_known_sibling_threshold")]
    pub known_sibling_threshold: usize,
    #[serde(default = "default_intro_interleaving")]
    pub intro_interleaving: bool,
    #[serde(default = "default_auto_wrap_up")]
    pub auto_wrap_up: bool,
    #[serde(default = "default_wrap_up_min_submissions")]
    pub wrap_up_min_submissions: usize,
    #[serde(default = "default_session_cache_enabled")]
    pub session_cache_enabled: bool,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_mode() -> String {
    "reading".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_stale_session_minutes() -> u64 {
    15
}
fn default_known_sibling_threshold() -> usize {
    1
}
fn default_intro_interleaving() -> bool {
    true
}
fn default_auto_wrap_up() -> bool {
    true
}
fn default_wrap_up_min_submissions() -> usize {
    2
}
fn default_session_cache_enabled() -> bool {
    true
}
fn default_history_limit() -> usize {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            default_mode: default_mode(),
            request_timeout_secs: default_request_timeout_secs(),
            stale_session_minutes: default_stale_session_minutes(),
            known_sibling_threshold: default_known_sibling_threshold(),
            intro_interleaving: default_intro_interleaving(),
            auto_wrap_up: default_auto_wrap_up(),
            wrap_up_min_submissions: default_wrap_up_min_submissions(),
            session_cache_enabled: default_session_cache_enabled(),
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("alif")
            .join("config.toml")
    }

    /// Clamp out-of-range values and reset unknown modes.
    pub fn validate(&mut self) {
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, 120);
        self.stale_session_minutes = self.stale_session_minutes.clamp(1, 24 * 60);
        self.known_sibling_threshold = self.known_sibling_threshold.clamp(1, 10);
        self.wrap_up_min_submissions = self.wrap_up_min_submissions.clamp(1, 50);
        self.history_limit = self.history_limit.clamp(10, 5000);
        // Only session modes are valid defaults; quiz and reintro are sub-phases.
        let valid = ReviewMode::from_name(&self.default_mode).is_some_and(|m| m.is_session_mode());
        if !valid {
            self.default_mode = default_mode();
        }
    }

    pub fn review_mode(&self) -> ReviewMode {
        ReviewMode::from_name(&self.default_mode)
            .filter(|m| m.is_session_mode())
            .unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_session_minutes * 60)
    }
}
