use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};

use crate::session::model::ReviewMode;
use crate::session::summary::SessionSummary;
use crate::store::schema::{CachedSession, SessionHistoryData};

#[derive(Clone, Debug)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("alif");
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => T::default(),
            }
        } else {
            T::default()
        }
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load_session_history(&self) -> SessionHistoryData {
        self.load("session_history.json")
    }

    pub fn save_session_history(&self, data: &SessionHistoryData) -> Result<()> {
        self.save("session_history.json", data)
    }

    pub fn append_summary(&self, summary: SessionSummary, limit: usize) -> Result<()> {
        let mut history = self.load_session_history();
        history.push(summary, limit);
        self.save_session_history(&history)
    }

    fn cache_name(mode: ReviewMode) -> String {
        format!("session_cache_{}.json", mode.as_str())
    }

    /// Returns None if the cache file is missing or cannot be parsed.
    pub fn load_cached_session(&self, mode: ReviewMode) -> Option<CachedSession> {
        let path = self.file_path(&Self::cache_name(mode));
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save_cached_session(&self, cached: &CachedSession) -> Result<()> {
        self.save(&Self::cache_name(cached.mode), cached)
    }

    pub fn clear_cached_session(&self, mode: ReviewMode) {
        let _ = fs::remove_file(self.file_path(&Self::cache_name(mode)));
    }
}
