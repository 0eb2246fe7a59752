use notes_assistant_lib::chat::ChatClient;
use notes_assistant_lib::config::AppSettings;
use notes_assistant_lib::db::{Database, StoreLocation};
use notes_assistant_lib::documents::{load_agent, load_chat};
use notes_assistant_lib::errors::AppError;
use notes_assistant_lib::filesystem::FileSystem;
use notes_assistant_lib::models::Sender;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn memory_fs() -> FileSystem {
    FileSystem::from_store(Arc::new(Database::open(&StoreLocation::InMemory).expect("db")))
}

fn client_for(server: &MockServer) -> ChatClient {
    let settings = AppSettings {
        api_endpoint: format!("{}/v1/chat/completions", server.uri()),
        ..AppSettings::default()
    };
    ChatClient::new(settings).expect("client")
}

#[tokio::test]
async fn successful_turn_appends_reply_and_backs_up_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-title", "SmartAssistantModular"))
        .and(body_partial_json(serde_json::json!({
            "model": "anthropic/claude-3-haiku",
            "n": 1,
            "temperature": 0.7,
            "max_tokens": 1000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "  Hi there!  " } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fs = memory_fs();
    let agent = load_agent(&fs, "/agents/example-agent.json").expect("agent");
    let client = client_for(&server);

    let turn = client
        .send_message(&fs, "/chats/welcome.json", &agent, "sk-test", "Hello")
        .await
        .expect("turn");
    assert!(!turn.failed());
    assert_eq!(turn.reply.text, "Hi there!");

    let chat = load_chat(&fs, "/chats/welcome.json").expect("load").expect("present");
    assert_eq!(chat.id, "welcome");
    let senders = chat.messages.iter().map(|m| m.sender).collect::<Vec<_>>();
    assert_eq!(senders, vec![Sender::Agent, Sender::User, Sender::Agent]);
    assert_eq!(fs.list_files("/backup/").expect("backups").len(), 1);
}

#[tokio::test]
async fn api_error_is_recorded_in_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "bad key" }
        })))
        .mount(&server)
        .await;

    let fs = memory_fs();
    let agent = load_agent(&fs, "/agents/openai-gpt4o.json").expect("agent");
    let turn = client_for(&server)
        .send_message(&fs, "/chats/new.json", &agent, "sk-wrong", "Hello")
        .await
        .expect("turn is saved even on failure");

    assert!(turn.failed());
    assert_eq!(turn.reply.text, "Error: API Error: 401 Unauthorized. bad key");

    let chat = load_chat(&fs, "/chats/new.json").expect("load").expect("created");
    assert_eq!(chat.id, "new");
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1].sender, Sender::Error);
}

#[tokio::test]
async fn empty_choices_count_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&server)
        .await;

    let fs = memory_fs();
    let agent = load_agent(&fs, "/agents/example-agent.json").expect("agent");
    let turn = client_for(&server)
        .send_message(&fs, "/chats/empty.json", &agent, "sk-test", "ping")
        .await
        .expect("turn");
    assert!(turn.failed());
    assert_eq!(turn.reply.text, "Error: API returned an empty response");
}

#[tokio::test]
async fn rejects_bad_input_before_calling_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fs = memory_fs();
    let agent = load_agent(&fs, "/agents/example-agent.json").expect("agent");
    let client = client_for(&server);

    let outside = client
        .send_message(&fs, "/agents/example-agent.json", &agent, "sk-test", "hi")
        .await;
    assert!(matches!(outside, Err(AppError::InvalidPath(_))));

    let blank = client
        .send_message(&fs, "/chats/welcome.json", &agent, "sk-test", "   ")
        .await;
    assert!(matches!(blank, Err(AppError::InvalidInput(_))));

    fs.save_file("/chats/broken.json", "{ not json").expect("save");
    let broken = client
        .send_message(&fs, "/chats/broken.json", &agent, "sk-test", "hi")
        .await;
    assert!(matches!(broken, Err(AppError::MalformedDocument(_))));
}
