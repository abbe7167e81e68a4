use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::config::ClientConfig;
use crate::ids::ChatId;

/// Namespace of the single preferences entry; also the file stem on disk.
pub const PREFERENCES_KEY: &str = "alpaca-preferences";

/// UI state restored on startup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub selected_model: Option<String>,
    #[serde(default)]
    pub current_chat_id: Option<ChatId>,
}

impl Preferences {
    fn normalized(mut self) -> Self {
        self.selected_model = self
            .selected_model
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty());
        self
    }
}

/// Best-effort preferences persistence.
///
/// Reads never fail: a missing or unreadable file yields defaults. Writes go
/// through a temporary file and a rename; failures are logged and dropped.
pub struct PreferencesStore {
    preferences: ArcSwap<Preferences>,
    path: Option<PathBuf>,
}

impl PreferencesStore {
    pub fn default_path() -> PathBuf {
        ClientConfig::default_config_dir().join(format!("{PREFERENCES_KEY}.json"))
    }

    pub fn open(path: PathBuf) -> Self {
        let preferences = Self::load_from_disk(&path);
        Self {
            preferences: ArcSwap::from_pointee(preferences),
            path: Some(path),
        }
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            preferences: ArcSwap::from_pointee(Preferences::default()),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> Arc<Preferences> {
        self.preferences.load_full()
    }

    /// Replaces the in-memory preferences and tries to persist them.
    pub fn save(&self, preferences: Preferences) {
        let preferences = preferences.normalized();
        if let Err(error) = self.persist(&preferences) {
            tracing::warn!(%error, "preferences not saved");
        }
        self.preferences.store(Arc::new(preferences));
    }

    fn load_from_disk(path: &Path) -> Preferences {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no stored preferences, using defaults");
            return Preferences::default();
        }

        let figment = Figment::from(Serialized::defaults(Preferences::default()))
            .merge(Json::file(path));
        match figment.extract::<Preferences>() {
            Ok(preferences) => preferences.normalized(),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "unreadable preferences, using defaults"
                );
                Preferences::default()
            }
        }
    }

    fn persist(&self, preferences: &Preferences) -> Result<(), PreferencesError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-preferences-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(preferences).context(SerializePreferencesSnafu {
            stage: "serialize-preferences-json",
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-preferences-file",
            path: temp_path.clone(),
        })?;
        std::fs::rename(&temp_path, path).context(RenameTempFileSnafu {
            stage: "rename-temporary-preferences-file",
            from: temp_path,
            to: path.to_path_buf(),
        })?;

        tracing::debug!(path = %path.display(), "saved preferences");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PreferencesError {
    #[snafu(display("failed to create preferences directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize preferences on `{stage}`: {source}"))]
    SerializePreferences {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write preferences file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace preferences file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::open(dir.path().join("alpaca-preferences.json"));
        assert_eq!(*store.get(), Preferences::default());
    }

    #[test]
    fn saved_preferences_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("alpaca-preferences.json");
        let store = PreferencesStore::open(path.clone());

        store.save(Preferences {
            selected_model: Some(" llama3 ".to_string()),
            current_chat_id: Some(ChatId::new(12)),
        });

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"selectedModel\": \"llama3\""));
        assert!(raw.contains("\"currentChatId\": 12"));

        let reopened = PreferencesStore::open(path);
        assert_eq!(reopened.get().selected_model.as_deref(), Some("llama3"));
        assert_eq!(reopened.get().current_chat_id, Some(ChatId::new(12)));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpaca-preferences.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = PreferencesStore::open(path);
        assert_eq!(*store.get(), Preferences::default());
    }

    #[test]
    fn unwritable_location_keeps_in_memory_value() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = PreferencesStore::open(blocker.join("alpaca-preferences.json"));

        store.save(Preferences {
            selected_model: Some("mistral".to_string()),
            current_chat_id: None,
        });

        assert_eq!(store.get().selected_model.as_deref(), Some("mistral"));
    }

    #[test]
    fn blank_model_is_not_a_selection() {
        let store = PreferencesStore::in_memory();
        store.save(Preferences {
            selected_model: Some("  ".to_string()),
            current_chat_id: None,
        });
        assert_eq!(store.get().selected_model, None);
    }
}
