use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,
    pub directory: String,
    pub name: String,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
}

/// Payload accepted by `FileSystem::save_file`. Structured values are stored as
/// pretty-printed JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    Text(String),
    Structured(serde_json::Value),
}

impl FileContent {
    pub fn into_text(self) -> AppResult<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Structured(serde_json::Value::String(text)) => Ok(text),
            Self::Structured(value) => serde_json::to_string_pretty(&value).map_err(AppError::from),
        }
    }
}

impl From<String> for FileContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FileContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for FileContent {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<serde_json::Value> for FileContent {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    BackupFailed,
    ReadBeforeWriteFailed,
}

/// Non-fatal condition reported next to a successful primary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationWarning {
    pub kind: WarningKind,
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for OperationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            WarningKind::BackupFailed => {
                write!(f, "failed to create backup for {}: {}", self.path, self.message)
            }
            WarningKind::ReadBeforeWriteFailed => {
                write!(f, "could not read {} before writing: {}", self.path, self.message)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub record: FileRecord,
    pub backup: Option<FileRecord>,
    pub warnings: Vec<OperationWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub path: String,
    pub existed: bool,
    pub backup: Option<FileRecord>,
    pub warnings: Vec<OperationWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sender {
    User,
    Agent,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDocument {
    #[serde(default)]
    pub id: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|error| AppError::MalformedDocument(format!("invalid chat file format: {}", error)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AgentConfigurations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub configurations: AgentConfigurations,
}

impl AgentDocument {
    pub fn parse(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|error| AppError::MalformedDocument(format!("invalid agent configuration: {}", error)))
    }

    pub fn require_model(&self) -> AppResult<&str> {
        match self.configurations.model.as_deref().map(str::trim) {
            Some(model) if !model.is_empty() => Ok(model),
            _ => Err(AppError::MalformedDocument(format!(
                "agent '{}' has no configurations.model",
                self.name
            ))),
        }
    }
}
