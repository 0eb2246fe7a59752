use clap::Parser;
use notes_assistant_lib::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    notes_assistant_lib::run(Cli::parse()).await
}
