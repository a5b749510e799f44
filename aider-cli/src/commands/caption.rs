use std::path::PathBuf;

use aider::batch::{self, BatchOptions, Prompted};
use aider::gemini::{self, GeminiClient};
use aider::media::MediaKind;
use anyhow::{bail, Context, Result};

const CAPTION_PROMPT: &str = include_str!("../../prompts/caption.md");

/// Generate captions for all images in a directory using the Gemini API.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to the image directory
    #[arg(long)]
    pub dir: PathBuf,
    /// Re-generate all captions, even if .txt files exist
    #[arg(long)]
    pub force: bool,
    /// Trigger word (e.g. "foobar" or "photo of foobar") to prepend to each caption
    #[arg(long)]
    pub identity: Option<String>,
    /// The model to use for captioning
    #[arg(long, default_value = gemini::DEFAULT_MODEL)]
    pub model: String,
}

pub async fn run(args: Args) -> Result<()> {
    let api_key = dotenvy::var(gemini::ENV_API_KEY)
        .with_context(|| format!("{} environment variable not set", gemini::ENV_API_KEY))?;
    let client = GeminiClient::new(api_key, args.model)?;

    println!("Starting captioning for images in: {}", args.dir.display());
    if args.force {
        println!("Force: re-generating all captions.");
    }
    if let Some(identity) = &args.identity {
        println!("Identity: prepending {identity:?} to all new captions.");
    }

    let options = BatchOptions {
        force: args.force,
        prefix: args.identity,
    };
    let generator = Prompted {
        client: &client,
        instruction: CAPTION_PROMPT,
    };
    let summary = batch::run(&args.dir, MediaKind::Image, &generator, &options).await?;

    println!(
        "Captioning complete. {} processed, {} skipped, {} failed.",
        summary.processed, summary.skipped, summary.failed
    );
    if summary.failed > 0 {
        bail!("{} errors", summary.failed);
    }
    Ok(())
}
