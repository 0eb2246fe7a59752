//! Chat transcripts and the outbound completion call.
//!
//! A turn appends the user's message to the transcript, sends the recent
//! history to the completion endpoint, appends either the reply or an error
//! message, and saves the transcript back through the filesystem.

use crate::config::AppSettings;
use crate::documents::{generate_id, load_chat};
use crate::errors::{AppError, AppResult};
use crate::filesystem::FileSystem;
use crate::models::{AgentDocument, ChatDocument, ChatMessage, OperationWarning, Sender};
use crate::paths::{get_directory, get_file_name, sanitized_timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CHATS_DIR: &str = "/chats/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<CompletionMessage>,
    pub temperature: f64,
    pub n: u32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Result of one chat turn. `reply` is the agent message on success or the
/// error message recorded in the transcript on failure.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub chat_path: String,
    pub reply: ChatMessage,
    pub transcript: ChatDocument,
    pub warnings: Vec<OperationWarning>,
}

impl ChatTurn {
    pub fn failed(&self) -> bool {
        self.reply.sender == Sender::Error
    }
}

/// Builds the request body from the agent configuration and the last
/// `history_window` messages. Error messages are never sent.
pub fn build_request(
    agent: &AgentDocument,
    messages: &[ChatMessage],
    settings: &AppSettings,
) -> AppResult<CompletionRequest> {
    let model = agent.require_model()?.to_string();
    let start = messages.len().saturating_sub(settings.history_window);
    let messages = messages[start..]
        .iter()
        .filter_map(|message| {
            let role = match message.sender {
                Sender::User => Role::User,
                Sender::Agent => Role::Assistant,
                Sender::Error => return None,
            };
            Some(CompletionMessage {
                role,
                content: message.text.clone(),
            })
        })
        .collect();

    Ok(CompletionRequest {
        model,
        messages,
        temperature: agent
            .configurations
            .temperature
            .unwrap_or(settings.default_temperature),
        n: 1,
        max_tokens: agent
            .configurations
            .max_tokens
            .unwrap_or(settings.default_max_tokens),
    })
}

pub fn extract_reply(response: &CompletionResponse) -> AppResult<String> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.as_ref())
        .and_then(|message| message.content.as_deref())
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| AppError::Api("API returned an empty response".to_string()))
}

/// Transcript id for a chat file: its name without the `.json` extension.
pub fn chat_id_for_path(path: &str) -> String {
    let name = get_file_name(path);
    let id = name.strip_suffix(".json").unwrap_or(name);
    if id.is_empty() {
        generate_id()
    } else {
        id.to_string()
    }
}

pub fn is_chat_file(path: &str) -> bool {
    get_directory(path) == CHATS_DIR && path.ends_with(".json")
}

/// Returns `selected` when it names a chat file, otherwise creates a fresh,
/// empty chat file and returns its path.
pub fn ensure_chat_path(fs: &FileSystem, selected: Option<&str>) -> AppResult<String> {
    if let Some(path) = selected.filter(|path| is_chat_file(path)) {
        return Ok(path.to_string());
    }

    let path = format!(
        "{}chat_{}.json",
        CHATS_DIR,
        sanitized_timestamp(Utc::now().timestamp_millis())
    );
    fs.save_file(&path, serde_json::to_value(ChatDocument::new(generate_id()))?)?;
    tracing::info!(path = %path, "created new chat file");
    Ok(path)
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    settings: AppSettings,
}

impl ChatClient {
    pub fn new(settings: AppSettings) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub async fn complete(&self, api_key: &str, request: &CompletionRequest) -> AppResult<String> {
        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );
        let response = self
            .http
            .post(&self.settings.api_endpoint)
            .bearer_auth(api_key)
            .header("X-Title", &self.settings.app_title)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<serde_json::Value>().await.ok();
            let detail = body
                .as_ref()
                .and_then(|body| body.pointer("/error/message"))
                .and_then(|message| message.as_str())
                .unwrap_or_default();
            let message = format!(
                "API Error: {} {}. {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                detail
            );
            tracing::warn!(status = status.as_u16(), "completion request rejected");
            return Err(AppError::Api(message.trim_end().to_string()));
        }

        let body = response
            .json::<CompletionResponse>()
            .await
            .map_err(|error| AppError::Api(format!("unreadable completion response: {}", error)))?;
        extract_reply(&body)
    }

    /// Runs one chat turn against the transcript at `chat_path` and saves the
    /// transcript whether or not the completion succeeded.
    pub async fn send_message(
        &self,
        fs: &FileSystem,
        chat_path: &str,
        agent: &AgentDocument,
        api_key: &str,
        text: &str,
    ) -> AppResult<ChatTurn> {
        if !chat_path.starts_with(CHATS_DIR) {
            return Err(AppError::InvalidPath(format!("{} is not a chat file", chat_path)));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidInput("message is empty".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(AppError::InvalidInput("API key is empty".to_string()));
        }
        agent.require_model()?;

        let mut transcript =
            load_chat(fs, chat_path)?.unwrap_or_else(|| ChatDocument::new(chat_id_for_path(chat_path)));
        transcript.messages.push(ChatMessage {
            sender: Sender::User,
            text: text.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        });

        let request = build_request(agent, &transcript.messages, &self.settings)?;
        let reply = match self.complete(api_key, &request).await {
            Ok(content) => ChatMessage {
                sender: Sender::Agent,
                text: content,
                timestamp: Utc::now().timestamp_millis(),
            },
            Err(error) => {
                tracing::warn!(path = %chat_path, error = %error, "completion failed");
                ChatMessage {
                    sender: Sender::Error,
                    text: format!("Error: {}", failure_text(&error)),
                    timestamp: Utc::now().timestamp_millis(),
                }
            }
        };
        transcript.messages.push(reply.clone());
        transcript.id = chat_id_for_path(chat_path);

        let saved = fs.save_file(chat_path, serde_json::to_value(&transcript)?)?;
        tracing::info!(path = %chat_path, failed = reply.sender == Sender::Error, "chat saved");

        Ok(ChatTurn {
            chat_path: chat_path.to_string(),
            reply,
            transcript,
            warnings: saved.warnings,
        })
    }
}

fn failure_text(error: &AppError) -> String {
    match error {
        AppError::Api(message) => message.clone(),
        other => other.to_string(),
    }
}
