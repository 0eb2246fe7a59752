use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DATA_DIR_ENV: &str = "NOTES_ASSISTANT_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".notes-assistant";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub database_file: String,
    pub api_endpoint: String,
    pub app_title: String,
    pub secrets_path: String,
    pub api_key_field: String,
    pub history_window: usize,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_file: "notes.sqlite".to_string(),
            api_endpoint: "https://api.vsegpt.ru/v1/chat/completions".to_string(),
            app_title: "SmartAssistantModular".to_string(),
            secrets_path: "/secrets/api_keys.json".to_string(),
            api_key_field: "vsegpt".to_string(),
            history_window: 10,
            default_temperature: 0.7,
            default_max_tokens: 1000,
            request_timeout_secs: 60,
        }
    }
}

impl AppSettings {
    /// Loads `settings.json` from the data directory on top of the defaults.
    /// A missing file is not an error.
    pub fn load(data_dir: &Path) -> AppResult<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let overrides: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|error| AppError::Config(format!("{}: {}", path.display(), error)))?;
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overrides);

        let settings: Self = serde_json::from_value(merged)
            .map_err(|error| AppError::Config(format!("{}: {}", path.display(), error)))?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }
}

/// Explicit flag wins, then the environment, then a directory under the cwd.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_data_dir, AppSettings, SETTINGS_FILE};
    use crate::errors::AppError;
    use std::path::PathBuf;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(AppSettings::load(dir.path()).expect("load"), AppSettings::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "apiEndpoint": "http://localhost:9/v1/chat/completions", "historyWindow": 4 }"#,
        )
        .expect("write");

        let settings = AppSettings::load(dir.path()).expect("load");
        assert_eq!(settings.api_endpoint, "http://localhost:9/v1/chat/completions");
        assert_eq!(settings.history_window, 4);
        assert_eq!(settings.default_max_tokens, 1000);
        assert_eq!(settings.database_path(dir.path()), dir.path().join("notes.sqlite"));
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ broken").expect("write");
        assert!(matches!(AppSettings::load(dir.path()), Err(AppError::Config(_))));

        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{ "historyWindow": "lots" }"#).expect("write");
        assert!(matches!(AppSettings::load(dir.path()), Err(AppError::Config(_))));
    }

    #[test]
    fn explicit_data_dir_wins() {
        let explicit = PathBuf::from("/tmp/explicit-notes");
        assert_eq!(resolve_data_dir(Some(explicit.clone())), explicit);
    }
}
