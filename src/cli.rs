use crate::chat::ensure_chat_path;
use crate::documents::{load_agent, read_api_key, store_api_key};
use crate::errors::{AppError, AppResult};
use crate::models::{EntryKind, OperationWarning};
use crate::App;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "notes-assistant", version, about = "Notes and chat manager over a virtual filesystem")]
pub struct Cli {
    /// Directory holding the database, settings and logs
    #[arg(long, global = true, env = crate::config::DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        directory: String,
    },
    /// Print a file
    Cat { path: String },
    /// Write a file from --content or stdin
    Write {
        path: String,
        #[arg(long)]
        content: Option<String>,
    },
    /// Create a file with starter content
    Touch { path: String },
    /// Delete a file (a backup copy is kept)
    Rm { path: String },
    /// Store the completion API key in the secrets file
    SetKey { key: String },
    /// Send a chat message and print the reply
    Chat {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        chat: Option<String>,
        message: String,
    },
}

pub async fn execute(app: &App, command: Command) -> AppResult<()> {
    match command {
        Command::Ls { directory } => {
            for entry in app.fs.list_files(&directory)? {
                match entry.kind {
                    EntryKind::Directory => println!("d  {}/\t{}", entry.name, entry.path),
                    EntryKind::File => println!("-  {}\t{}", entry.name, entry.path),
                }
            }
        }
        Command::Cat { path } => {
            let record = app
                .fs
                .get_file(&path)?
                .ok_or_else(|| AppError::NotFound(path.clone()))?;
            println!("{}", record.content);
        }
        Command::Write { path, content } => {
            let content = match content {
                Some(content) => content,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let outcome = app.fs.save_file(&path, content)?;
            print_warnings(&outcome.warnings);
            if let Some(backup) = outcome.backup {
                println!("saved {} (previous version at {})", path, backup.path);
            } else {
                println!("saved {}", path);
            }
        }
        Command::Touch { path } => {
            let outcome = app.fs.create_file(&path)?;
            print_warnings(&outcome.warnings);
            println!("created {}", outcome.record.path);
        }
        Command::Rm { path } => {
            let outcome = app.fs.delete_file(&path)?;
            print_warnings(&outcome.warnings);
            match (outcome.existed, outcome.backup) {
                (true, Some(backup)) => println!("deleted {} (backup at {})", path, backup.path),
                (true, None) => println!("deleted {}", path),
                (false, _) => println!("{} did not exist", path),
            }
        }
        Command::SetKey { key } => {
            let outcome = store_api_key(&app.fs, &app.settings, &key)?;
            print_warnings(&outcome.warnings);
            println!("API key saved to {}", app.settings.secrets_path);
        }
        Command::Chat { agent, chat, message } => {
            let api_key = read_api_key(&app.fs, &app.settings)?.ok_or_else(|| {
                AppError::NotFound(format!(
                    "no API key in {}; run `set-key` first",
                    app.settings.secrets_path
                ))
            })?;
            let agent = load_agent(&app.fs, &agent)?;
            let chat_path = ensure_chat_path(&app.fs, chat.as_deref())?;

            let turn = app
                .chat
                .send_message(&app.fs, &chat_path, &agent, &api_key, &message)
                .await?;
            print_warnings(&turn.warnings);
            if turn.failed() {
                return Err(AppError::Api(format!("{} (saved to {})", turn.reply.text, turn.chat_path)));
            }
            println!("{}", turn.reply.text);
        }
    }
    Ok(())
}

fn print_warnings(warnings: &[OperationWarning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}
