use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// CLI aider tool for AIGC workflows.
#[derive(Parser, Debug)]
#[command(name = "aider", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate captions for images in a directory
    Caption(commands::caption::Args),
    /// Generate speech-to-text transcripts for audio files
    Stt(commands::stt::Args),
    /// Crop and resize images in a directory
    Crop(commands::crop::Args),
    /// Parse a TensorBoard event file
    Parsetfef(commands::parsetfef::Args),
    /// Normalize filenames in a directory
    Norfilenames(commands::norfilenames::Args),
    /// Generate a GPT-SoVITS dataset annotation list file
    SovitsGenlist(commands::genlist::Args),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Caption(args) => commands::caption::run(args).await,
        Command::Stt(args) => commands::stt::run(args).await,
        Command::Crop(args) => commands::crop::run(args),
        Command::Parsetfef(args) => commands::parsetfef::run(args),
        Command::Norfilenames(args) => commands::norfilenames::run(args),
        Command::SovitsGenlist(args) => commands::genlist::run(args),
    }
}
