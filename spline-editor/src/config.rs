use serde::{Deserialize, Serialize};
use spline_core::config::InteractionConfig;
use std::path::{Path, PathBuf};

/// Most documents remembered in the recent list
const MAX_RECENT: usize = 10;

/// Application configuration (persistent)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding documents; the platform data directory when unset
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,

    /// Recently opened document names (newest first, max 10 items)
    #[serde(default)]
    pub recent_documents: Vec<String>,

    /// Pointer and fling tuning
    #[serde(default)]
    pub interaction: InteractionConfig,
}

impl AppConfig {
    /// Load config from standard location
    /// Returns default config if file doesn't exist or is malformed
    pub fn load() -> Self {
        let loaded = Self::config_path().and_then(|path| Self::try_load_from(&path));
        match loaded {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {e:#}");
                Self::default()
            }
        }
    }

    fn try_load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to standard location
    /// Logs error but doesn't block if save fails
    pub fn save(&self) {
        let saved = Self::config_path().and_then(|path| self.try_save_to(&path));
        if let Err(e) = saved {
            log::warn!("Failed to save config: {e:#}");
        }
    }

    /// Save atomically (write to temp, then rename)
    fn try_save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(temp_path, path)?;

        Ok(())
    }

    fn project_dirs() -> anyhow::Result<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "spline")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine config directory"))
    }

    /// Get cross-platform config file path
    fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.json"))
    }

    /// Directory documents are stored in
    ///
    /// Falls back to `./documents` when the platform has no data directory.
    pub fn documents_dir(&self) -> PathBuf {
        if let Some(dir) = &self.documents_dir {
            return dir.clone();
        }
        match Self::project_dirs() {
            Ok(dirs) => dirs.data_dir().join("documents"),
            Err(e) => {
                log::warn!("{e:#}, storing documents in ./documents");
                PathBuf::from("documents")
            }
        }
    }

    /// Move a document to the front of the recent list, keeping at most 10
    /// Returns true if the list changed
    pub fn push_recent_document(&mut self, name: &str) -> bool {
        if self.recent_documents.first().map(String::as_str) == Some(name) {
            return false;
        }
        self.recent_documents.retain(|n| n != name);
        self.recent_documents.insert(0, name.to_string());
        self.recent_documents.truncate(MAX_RECENT);
        true
    }

    /// Add a document to the recent list and auto-save
    pub fn add_recent_document(&mut self, name: &str) {
        if self.push_recent_document(name) {
            self.save();
        }
    }

    /// Recent documents that still exist in `dir`, newest first
    pub fn recent_documents_in(&self, dir: &Path) -> Vec<String> {
        self.recent_documents
            .iter()
            .filter(|n| dir.join(n).exists())
            .cloned()
            .collect()
    }

    /// Forget all recent documents
    /// Returns true if the list changed
    pub fn clear_recent_documents(&mut self) -> bool {
        let changed = !self.recent_documents.is_empty();
        self.recent_documents.clear();
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_documents_are_unique_and_bounded() {
        let mut config = AppConfig::default();
        for i in 0..12 {
            config.push_recent_document(&format!("doc{i}.json"));
        }
        assert_eq!(config.recent_documents.len(), 10);
        assert_eq!(config.recent_documents[0], "doc11.json");

        assert!(config.push_recent_document("doc5.json"));
        assert_eq!(config.recent_documents[0], "doc5.json");
        assert_eq!(config.recent_documents.iter().filter(|n| *n == "doc5.json").count(), 1);
        assert!(!config.push_recent_document("doc5.json"));
    }

    #[test]
    fn test_clear_recent_documents() {
        let mut config = AppConfig::default();
        assert!(!config.clear_recent_documents());

        config.push_recent_document("a.json");
        config.push_recent_document("b.json");
        assert!(config.clear_recent_documents());
        assert!(config.recent_documents.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.documents_dir = Some(dir.path().join("docs"));
        config.push_recent_document("a.json");
        config.interaction.touch_radius = 32.0;

        config.try_save_to(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(AppConfig::try_load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::try_load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::try_load_from(&path).is_err());
    }

    #[test]
    fn test_recent_documents_filter_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kept.json"), "").unwrap();

        let mut config = AppConfig::default();
        config.push_recent_document("gone.json");
        config.push_recent_document("kept.json");
        assert_eq!(config.recent_documents_in(dir.path()), vec!["kept.json"]);
    }
}
