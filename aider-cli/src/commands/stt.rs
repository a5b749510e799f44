use std::path::PathBuf;

use aider::batch::{self, BatchOptions, Prompted};
use aider::gemini::{self, GeminiClient};
use aider::media::MediaKind;
use anyhow::{bail, Context, Result};

const TRANSCRIBE_PROMPT: &str = include_str!("../../prompts/stt.md");

/// Generate speech-to-text transcripts for a directory of audio files
/// (.wav, .mp3, .m4a, .flac, .ogg) using the Gemini API. Rate limiting is
/// absorbed by exponential backoff.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Directory containing audio files
    #[arg(long)]
    pub dir: PathBuf,
    /// Overwrite existing .txt transcript files
    #[arg(long)]
    pub force: bool,
    /// The model to use for transcription
    #[arg(long, default_value = gemini::DEFAULT_MODEL)]
    pub model: String,
}

pub async fn run(args: Args) -> Result<()> {
    let api_key = dotenvy::var(gemini::ENV_API_KEY)
        .with_context(|| format!("{} environment variable not set", gemini::ENV_API_KEY))?;

    println!("Processing audio files in: {}", args.dir.display());
    println!("Using model: {}", args.model);

    let client = GeminiClient::new(api_key, args.model)?;
    let options = BatchOptions {
        force: args.force,
        prefix: None,
    };
    let generator = Prompted {
        client: &client,
        instruction: TRANSCRIBE_PROMPT,
    };
    let summary = batch::run(&args.dir, MediaKind::Audio, &generator, &options).await?;

    println!(
        "Processing complete. {} processed, {} skipped, {} failed.",
        summary.processed, summary.skipped, summary.failed
    );
    if summary.failed > 0 {
        bail!("{} errors", summary.failed);
    }
    Ok(())
}
