//! Typed access to the JSON documents kept under `/chats/`, `/agents/` and
//! `/secrets/`.

use crate::config::AppSettings;
use crate::errors::{AppError, AppResult};
use crate::filesystem::FileSystem;
use crate::models::{AgentDocument, ChatDocument, SaveOutcome};
use chrono::Utc;
use rand::Rng;

const ID_SUFFIX_LEN: usize = 7;

/// Short unique-enough identifier: `id_<epoch millis>_<base36 suffix>`.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let suffix = (0..ID_SUFFIX_LEN)
        .map(|_| char::from_digit(rng.random_range(0..36u32), 36).unwrap_or('0'))
        .collect::<String>();
    format!("id_{}_{}", Utc::now().timestamp_millis(), suffix)
}

pub fn load_agent(fs: &FileSystem, path: &str) -> AppResult<AgentDocument> {
    let record = fs
        .get_file(path)?
        .ok_or_else(|| AppError::NotFound(format!("agent configuration {}", path)))?;
    AgentDocument::parse(&record.content)
}

/// Loads a chat transcript; `None` when the file does not exist yet.
pub fn load_chat(fs: &FileSystem, path: &str) -> AppResult<Option<ChatDocument>> {
    match fs.get_file(path)? {
        Some(record) => ChatDocument::parse(&record.content).map(Some),
        None => Ok(None),
    }
}

/// Reads the completion API key from the secrets document. Missing files,
/// missing fields and unreadable documents all yield `None`.
pub fn read_api_key(fs: &FileSystem, settings: &AppSettings) -> AppResult<Option<String>> {
    let Some(record) = fs.get_file(&settings.secrets_path)? else {
        return Ok(None);
    };

    let document = match serde_json::from_str::<serde_json::Value>(&record.content) {
        Ok(document) => document,
        Err(error) => {
            tracing::warn!(path = %settings.secrets_path, error = %error, "secrets file is not valid JSON");
            return Ok(None);
        }
    };

    Ok(document
        .get(&settings.api_key_field)
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(ToString::to_string))
}

/// Stores the API key in the secrets document, keeping any other fields.
pub fn store_api_key(fs: &FileSystem, settings: &AppSettings, key: &str) -> AppResult<SaveOutcome> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::MalformedDocument("API key is empty".to_string()));
    }

    let mut document = match fs.get_file(&settings.secrets_path)? {
        Some(record) => match serde_json::from_str::<serde_json::Value>(&record.content) {
            Ok(value @ serde_json::Value::Object(_)) => value,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %settings.secrets_path, "replacing unreadable secrets file");
                serde_json::json!({})
            }
        },
        None => serde_json::json!({}),
    };

    if let Some(map) = document.as_object_mut() {
        map.insert(
            settings.api_key_field.clone(),
            serde_json::Value::String(key.to_string()),
        );
    }

    let outcome = fs.save_file(&settings.secrets_path, document)?;
    tracing::info!(path = %settings.secrets_path, "API key stored");
    Ok(outcome)
}
