pub mod chat;
pub mod cli;
pub mod config;
pub mod db;
pub mod documents;
pub mod errors;
pub mod filesystem;
pub mod models;
pub mod paths;
pub mod templates;

use crate::chat::ChatClient;
use crate::cli::Cli;
use crate::config::{resolve_data_dir, AppSettings};
use crate::db::{StoreHandle, StoreLocation};
use crate::errors::AppResult;
use crate::filesystem::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Everything a command needs: settings, the filesystem over the lazily
/// opened store, and the completion client.
#[derive(Clone, Debug)]
pub struct App {
    pub settings: AppSettings,
    pub fs: FileSystem,
    pub chat: ChatClient,
    data_dir: PathBuf,
}

impl App {
    pub fn new(data_dir: PathBuf) -> AppResult<Self> {
        let settings = AppSettings::load(&data_dir)?;
        let handle = StoreHandle::new(StoreLocation::File(settings.database_path(&data_dir)));
        Self::with_store(data_dir, settings, Arc::new(handle))
    }

    pub fn with_store(data_dir: PathBuf, settings: AppSettings, handle: Arc<StoreHandle>) -> AppResult<Self> {
        let chat = ChatClient::new(settings.clone())?;
        Ok(Self {
            settings,
            fs: FileSystem::new(handle),
            chat,
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    init_tracing(&data_dir).map_err(anyhow::Error::msg)?;

    let app = App::new(data_dir)?;
    app.fs.open()?;
    tracing::info!(data_dir = %app.data_dir().display(), "notes assistant ready");

    if let Err(error) = cli::execute(&app, cli.command).await {
        tracing::error!(error = %error, "command failed");
        return Err(error.into());
    }
    Ok(())
}

fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "notes-assistant.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
