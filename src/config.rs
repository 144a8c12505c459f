use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DB_ENV: &str = "SONGSHELF_DB";
pub const MUSIC_DIR_ENV: &str = "SONGSHELF_MUSIC_DIR";

const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "ogg", "wav", "aiff", "opus"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub db_path: PathBuf,
    pub music_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub debug: bool,
    pub watch_debounce_secs: u64,
    pub extensions: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            db_path: data_dir.join("songshelf.db"),
            music_dir: data_dir.join("songs"),
            log_dir: None,
            debug: false,
            watch_debounce_secs: 2,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl CatalogConfig {
    /// Loads the JSON config at `path` (defaults when the file is absent),
    /// then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            _ => CatalogConfig::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup(DB_ENV).filter(|v| !v.trim().is_empty()) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(dir) = lookup(MUSIC_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.music_dir = PathBuf::from(dir);
        }
    }

    pub fn watch_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.watch_debounce_secs.max(1))
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("songshelf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CatalogConfig::load(Some(&dir.path().join("absent.json"))).unwrap();
        // The process environment may carry overrides; compare the rest.
        config.db_path = CatalogConfig::default().db_path;
        config.music_dir = CatalogConfig::default().music_dir;
        assert_eq!(config, CatalogConfig::default());
        assert!(config.extensions.contains(&"flac".to_string()));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "debug": true, "watch_debounce_secs": 0 }"#).unwrap();

        let config = CatalogConfig::load(Some(&path)).unwrap();
        assert!(config.debug);
        assert_eq!(config.watch_debounce(), std::time::Duration::from_secs(1));
        assert_eq!(config.extensions, CatalogConfig::default().extensions);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(CatalogConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut config = CatalogConfig::default();
        config.apply_env_overrides(|key| match key {
            DB_ENV => Some("/tmp/other.db".to_string()),
            MUSIC_DIR_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.music_dir, CatalogConfig::default().music_dir);
    }
}
