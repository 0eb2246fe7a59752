use notes_assistant_lib::db::{StoreHandle, StoreLocation};
use notes_assistant_lib::errors::AppError;
use notes_assistant_lib::filesystem::FileSystem;
use notes_assistant_lib::models::{DirectoryEntry, EntryKind};
use notes_assistant_lib::paths::{backup_path, get_directory, get_file_name};
use std::sync::Arc;

fn file_backed(dir: &tempfile::TempDir) -> FileSystem {
    let handle = StoreHandle::new(StoreLocation::File(dir.path().join("notes.sqlite")));
    FileSystem::new(Arc::new(handle))
}

fn backup_count(fs: &FileSystem) -> usize {
    fs.list_files("/backup/").expect("list backups").len()
}

#[test]
fn seeded_root_lists_each_directory_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fs = file_backed(&dir);
    fs.save_file("/agents/extra/one.json", "{}").expect("save");
    fs.save_file("/agents/extra/two.json", "{}").expect("save");
    fs.save_file("/todo.txt", "x").expect("save");

    let entries = fs.list_files("/").expect("list");
    let directories = entries
        .iter()
        .filter(|entry| entry.kind == EntryKind::Directory)
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(directories, vec!["agents", "chats", "secrets"]);

    let first_file = entries
        .iter()
        .position(|entry| entry.kind == EntryKind::File)
        .expect("root file");
    assert_eq!(first_file, 3);
    assert_eq!(entries[3].path, "/todo.txt");
}

#[test]
fn example_agent_is_readable_and_listed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fs = file_backed(&dir);

    let record = fs
        .get_file("/agents/example-agent.json")
        .expect("get")
        .expect("seeded");
    assert!(record.timestamp > 0);
    let document: serde_json::Value = serde_json::from_str(&record.content).expect("json");
    assert_eq!(document["configurations"]["model"], "anthropic/claude-3-haiku");

    let entries = fs.list_files("/agents/").expect("list");
    assert_eq!(
        entries[0],
        DirectoryEntry {
            name: "example-agent.json".to_string(),
            kind: EntryKind::File,
            path: "/agents/example-agent.json".to_string(),
        }
    );
    assert!(entries.iter().all(|entry| entry.kind == EntryKind::File));
}

#[test]
fn chat_saved_twice_keeps_first_version_in_backup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fs = file_backed(&dir);
    let first = r#"{"id":"x","messages":[]}"#;
    let second = r#"{"id":"x","messages":[{"sender":"user","text":"hi","timestamp":1}]}"#;

    let saved = fs.save_file("/chats/a.json", first).expect("first");
    fs.save_file("/chats/a.json", second).expect("second");

    let expected = backup_path("a.json", saved.record.timestamp);
    assert!(expected.starts_with("/backup/a_") && expected.ends_with(".json"));
    let backup = fs.get_file(&expected).expect("get").expect("backup exists");
    assert_eq!(backup.content, first);
    assert_eq!(backup.directory, "/backup/");
    assert_eq!(backup_count(&fs), 1);
    assert_eq!(fs.get_file("/chats/a.json").expect("get").expect("live").content, second);
}

#[test]
fn delete_leaves_only_the_backup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fs = file_backed(&dir);

    let outcome = fs.delete_file("/chats/welcome.json").expect("delete");
    assert!(outcome.existed);
    assert!(fs.get_file("/chats/welcome.json").expect("get").is_none());
    assert_eq!(backup_count(&fs), 1);

    let backup = outcome.backup.expect("backup");
    fs.delete_file(&backup.path).expect("delete backup");
    assert_eq!(backup_count(&fs), 0);
}

#[test]
fn data_survives_reopening() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let fs = file_backed(&dir);
        fs.save_file("/notes/keep.md", "# kept").expect("save");
        fs.delete_file("/secrets/sample-credentials.json").expect("delete");
    }

    let fs = file_backed(&dir);
    assert_eq!(
        fs.get_file("/notes/keep.md").expect("get").expect("kept").content,
        "# kept"
    );
    assert!(fs
        .get_file("/secrets/sample-credentials.json")
        .expect("get")
        .is_none());
}

#[test]
fn unavailable_store_fails_every_operation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").expect("write");
    let fs = FileSystem::new(Arc::new(StoreHandle::new(StoreLocation::File(
        blocker.join("notes.sqlite"),
    ))));

    assert!(matches!(fs.list_files("/"), Err(AppError::StoreUnavailable(_))));
    assert!(matches!(fs.get_file("/a"), Err(AppError::StoreUnavailable(_))));
    assert!(matches!(fs.save_file("/a", "x"), Err(AppError::StoreUnavailable(_))));
    assert!(matches!(fs.delete_file("/a"), Err(AppError::StoreUnavailable(_))));
}

#[test]
fn path_helpers_recompose() {
    for path in ["/chats/welcome.json", "/a", "/deep/er/path.tar.gz"] {
        assert_eq!(format!("{}{}", get_directory(path), get_file_name(path)), path);
    }
}
