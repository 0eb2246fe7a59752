use crate::documents::generate_id;
use crate::errors::AppResult;
use crate::paths::{get_directory, get_file_name};
use serde_json::json;

pub const DEFAULT_AGENT_MODEL: &str = "anthropic/claude-3-haiku";

/// Starting content for a newly created file, chosen by its directory and
/// extension.
pub fn initial_content(path: &str) -> AppResult<String> {
    let name = get_file_name(path);
    let directory = get_directory(path);

    if name.ends_with(".json") {
        let document = match directory {
            "/chats/" => json!({ "id": generate_id(), "messages": [] }),
            "/agents/" => json!({
                "id": generate_id(),
                "name": "New Agent",
                "configurations": { "model": DEFAULT_AGENT_MODEL }
            }),
            "/secrets/" => json!({ "id": generate_id(), "service": "New Service", "data": {} }),
            _ => return Ok("{}".to_string()),
        };
        return Ok(serde_json::to_string_pretty(&document)?);
    }

    if name.ends_with(".txt") || name.ends_with(".md") {
        return Ok(format!("New file: {}\n", name));
    }

    Ok(String::new())
}
