//! Server configuration.

use std::path::{Path, PathBuf};

use ::config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{PocketError, PocketResult};
use crate::images::UPLOAD_SUBDIR;

const CONFIG_FILE_NAME: &str = "pocketbook.toml";

const RECORDS_FILE: &str = "data.json";
const EVENTS_FILE: &str = "events.json";
const IMAGE_INDEX_FILE: &str = "images.json";

/// Settings for the pocketbook server.
///
/// Looked up in `./pocketbook.toml`, then `~/.config/pocketbook/config.toml`.
/// Every key is optional.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PocketbookConfig {
    pub host: String,
    pub port: u16,

    /// Where data.json, events.json and images.json live. `~` is expanded.
    pub data_dir: PathBuf,

    /// Static root. Uploads go to `picture/upload` below it.
    pub public_dir: PathBuf,

    pub max_upload_bytes: usize,

    /// Mount the calendar event routes
    pub calendar: bool,

    /// Mount the image routes
    pub images: bool,
}

impl Default for PocketbookConfig {
    fn default() -> Self {
        PocketbookConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir: PathBuf::from("."),
            public_dir: PathBuf::from("public"),
            max_upload_bytes: 10 * 1024 * 1024,
            calendar: true,
            images: true,
        }
    }
}

impl PocketbookConfig {
    /// Load from `explicit` if given (it must exist), else from the first default location found.
    pub fn load(explicit: Option<&Path>) -> PocketResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path, true);
        }

        match Self::default_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::from_file(&path, false),
            None => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path, required: bool) -> PocketResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(required))
            .build()
            .map_err(|e| PocketError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PocketError::Config(e.to_string()))
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("pocketbook").join("config.toml"));
        }
        paths
    }

    pub fn data_path(&self) -> PathBuf {
        expand(&self.data_dir)
    }

    pub fn public_path(&self) -> PathBuf {
        expand(&self.public_dir)
    }

    pub fn records_file(&self) -> PathBuf {
        self.data_path().join(RECORDS_FILE)
    }

    pub fn events_file(&self) -> PathBuf {
        self.data_path().join(EVENTS_FILE)
    }

    pub fn image_index_file(&self) -> PathBuf {
        self.data_path().join(IMAGE_INDEX_FILE)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.public_path().join(UPLOAD_SUBDIR)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pocketbook.toml");
        std::fs::write(&path, "port = 8080\nimages = false\n").unwrap();

        let config = PocketbookConfig::load(Some(&path)).unwrap();

        assert_eq!(config.port, 8080);
        assert!(!config.images);
        assert!(config.calendar);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.public_dir, PathBuf::from("public"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PocketbookConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, PocketError::Config(_)));
    }

    #[test]
    fn test_derived_paths() {
        let config = PocketbookConfig {
            data_dir: PathBuf::from("/srv/pocketbook"),
            public_dir: PathBuf::from("/srv/www"),
            ..Default::default()
        };

        assert_eq!(config.records_file(), PathBuf::from("/srv/pocketbook/data.json"));
        assert_eq!(config.events_file(), PathBuf::from("/srv/pocketbook/events.json"));
        assert_eq!(config.upload_dir(), PathBuf::from("/srv/www/picture/upload"));
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }
}
