//! Persisted monitoring preferences.
//!
//! A JSON-file-backed store for the consent flags the first-run flow
//! writes and startup reads. The serialized key names are part of the
//! persisted format and must not change.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Preference store errors.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("failed to access preference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The monitoring consent flags. Defaults to everything off on first run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Whether the user opted into crash monitoring.
    #[serde(rename = "crashBugEnabled")]
    pub enabled: bool,

    /// Whether the first-run welcome dialog was already shown.
    #[serde(rename = "hasShownCrashBugWelcome")]
    pub welcome_shown: bool,

    /// Whether the user asked never to see the welcome dialog again.
    #[serde(rename = "crashBugDoNotShowWelcomeAgain")]
    pub never_show_again: bool,
}

/// Durable key/value storage for [`MonitoringConfig`].
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the flags. A missing file is first run: defaults, not an
    /// error. An unreadable or corrupt file is reported to the caller.
    pub fn load(&self) -> Result<MonitoringConfig, PrefsError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(MonitoringConfig::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Saves the flags atomically (temp file + rename).
    pub fn save(&self, config: &MonitoringConfig) -> Result<(), PrefsError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(serde_json::to_string_pretty(config)?.as_bytes())?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));

        let config = store.load().unwrap();

        assert_eq!(config, MonitoringConfig::default());
        assert!(!config.enabled);
    }

    #[test]
    fn round_trip_preserves_flags() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));

        let config = MonitoringConfig {
            enabled: true,
            welcome_shown: true,
            never_show_again: false,
        };
        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn serialized_keys_match_the_persisted_format() {
        let json = serde_json::to_string(&MonitoringConfig {
            enabled: true,
            welcome_shown: false,
            never_show_again: false,
        })
        .unwrap();

        assert!(json.contains("\"crashBugEnabled\":true"));
        assert!(json.contains("\"hasShownCrashBugWelcome\":false"));
        assert!(json.contains("\"crashBugDoNotShowWelcomeAgain\":false"));
    }

    #[test]
    fn partial_file_fills_missing_flags_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{"crashBugEnabled": true}"#).unwrap();

        let config = PreferenceStore::new(&path).load().unwrap();

        assert!(config.enabled);
        assert!(!config.welcome_shown);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            PreferenceStore::new(&path).load(),
            Err(PrefsError::Malformed(_))
        ));
    }
}
