// Copilot preferences store
// Provides persisted preferences for copilot sessions
//
// This module provides:
// 1. App identifier and data directory resolution
// 2. `CopilotPreferences` with serde defaults
// 3. `PreferencesStore`, the in-memory state container; disk I/O happens
//    only in `load`/`save`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::services::copilot::error::{CopilotError, CopilotResult};

// ============================================================================
// App Constants
// ============================================================================

pub const APP_IDENTIFIER: &str = "com.copilot.Copilot";

/// Preferences file name inside the app data directory
pub const PREFERENCES_FILE: &str = "copilot.json";

/// Get the application data directory
pub fn get_app_data_dir() -> CopilotResult<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(APP_IDENTIFIER))
        .ok_or_else(|| CopilotError::StorageError("Could not determine application data directory".to_string()))
}

/// Default preferences file location
pub fn preferences_path() -> CopilotResult<PathBuf> {
    Ok(get_app_data_dir()?.join(PREFERENCES_FILE))
}

// ============================================================================
// Preferences
// ============================================================================

/// Default web search toggle
fn default_web_search_enabled() -> bool {
    false
}

/// Copilot session preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CopilotPreferences {
    /// Model picked by the user; the configured model applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
    #[serde(default = "default_web_search_enabled")]
    pub web_search_enabled: bool,
    /// Tool active when the session ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tool_id: Option<String>,
}

impl CopilotPreferences {
    /// Model for the next turn
    pub fn model_or(&self, configured: &str) -> String {
        self.selected_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(configured)
            .to_string()
    }
}

/// Read preferences from `path`. A missing file yields defaults.
pub fn load_preferences(path: &Path) -> CopilotResult<CopilotPreferences> {
    if !path.exists() {
        log::debug!("No copilot preferences at {}, using defaults", path.display());
        return Ok(CopilotPreferences::default());
    }

    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        CopilotError::StorageError(format!("Invalid preferences file {}: {}", path.display(), e))
    })
}

/// Write preferences to `path` as pretty JSON, creating parent directories
pub fn save_preferences(path: &Path, preferences: &CopilotPreferences) -> CopilotResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(preferences)?;
    std::fs::write(path, json)?;
    Ok(())
}

// ============================================================================
// State Container
// ============================================================================

/// Shared, explicitly passed preferences state
#[derive(Clone)]
pub struct PreferencesStore {
    path: PathBuf,
    inner: Arc<RwLock<CopilotPreferences>>,
}

impl PreferencesStore {
    /// Hydrate from `path`
    pub fn load(path: impl Into<PathBuf>) -> CopilotResult<Self> {
        let path = path.into();
        let preferences = load_preferences(&path)?;
        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(preferences)),
        })
    }

    /// Hydrate from the default location in the app data directory
    pub fn load_default() -> CopilotResult<Self> {
        Self::load(preferences_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> CopilotPreferences {
        self.inner.read().await.clone()
    }

    /// Apply a change in memory; call `save` to persist it
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut CopilotPreferences),
    {
        let mut preferences = self.inner.write().await;
        f(&mut preferences);
    }

    pub async fn save(&self) -> CopilotResult<()> {
        let preferences = self.inner.read().await.clone();
        save_preferences(&self.path, &preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let preferences = load_preferences(&dir.path().join("copilot.json")).unwrap();
        assert_eq!(preferences, CopilotPreferences::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("copilot.json");
        std::fs::write(&path, r#"{"selectedModel": "llama3", "webSearchEnabled": true}"#).unwrap();

        let preferences = load_preferences(&path).unwrap();

        assert_eq!(preferences.selected_model.as_deref(), Some("llama3"));
        assert!(preferences.web_search_enabled);
        assert_eq!(preferences.last_tool_id, None);
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("copilot.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_preferences(&path), Err(CopilotError::StorageError(_))));
    }

    #[tokio::test]
    async fn test_store_update_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("copilot.json");

        let store = PreferencesStore::load(&path).unwrap();
        store
            .update(|p| {
                p.selected_model = Some("llama3".to_string());
                p.web_search_enabled = true;
                p.last_tool_id = Some("intents".to_string());
            })
            .await;

        // Nothing is written until save
        assert!(!path.exists());
        store.save().await.unwrap();

        let reloaded = PreferencesStore::load(&path).unwrap().get().await;
        assert_eq!(reloaded.model_or("gpt-4o-mini"), "llama3");
        assert!(reloaded.web_search_enabled);
        assert_eq!(reloaded.last_tool_id.as_deref(), Some("intents"));
    }

    #[test]
    fn test_model_falls_back_to_configured() {
        let mut preferences = CopilotPreferences::default();
        assert_eq!(preferences.model_or("llama3"), "llama3");

        preferences.selected_model = Some("  ".to_string());
        assert_eq!(preferences.model_or("llama3"), "llama3");

        preferences.selected_model = Some("gpt-4o".to_string());
        assert_eq!(preferences.model_or("llama3"), "gpt-4o");
    }

    #[test]
    fn test_defaults_serialize_without_model() {
        let json = serde_json::to_value(CopilotPreferences::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "webSearchEnabled": false }));
    }
}
