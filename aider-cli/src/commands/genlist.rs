use std::fs;
use std::path::PathBuf;

use aider::genlist;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;

/// Language spoken in the audio files.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Language {
    Zh,
    Ja,
    En,
    Ko,
    Yue,
}

impl Language {
    fn code(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::En => "en",
            Language::Ko => "ko",
            Language::Yue => "yue",
        }
    }
}

/// Generate a GPT-SoVITS dataset annotation list from paired .wav audio and
/// .txt transcription files. Each line has the form
/// `audio_filename|speaker|language|text`.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Directory containing audio & transcription files
    #[arg(long)]
    pub dir: PathBuf,
    /// Output filename in the target dir; "-" writes to stdout
    #[arg(long, default_value = "sovits.list")]
    pub output: String,
    /// Language spoken in the audio files
    #[arg(long, value_enum)]
    pub lang: Language,
    /// Speaker name
    #[arg(long)]
    pub speaker: String,
    /// Re-generate the list file even if it already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: Args) -> Result<()> {
    let dir = fs::canonicalize(&args.dir)
        .with_context(|| format!("failed to resolve directory {}", args.dir.display()))?;

    let output_path = (args.output != "-").then(|| dir.join(&args.output));
    if let Some(path) = &output_path {
        if !args.force && path.exists() {
            bail!(
                "output file {} already exists, use --force to overwrite",
                path.display()
            );
        }
    }

    let pairs = genlist::collect_pairs(&dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;
    if pairs.is_empty() {
        bail!("no valid wav files found");
    }
    let list = genlist::build_list(&pairs, &args.speaker, args.lang.code());

    match &output_path {
        Some(path) => {
            fs::write(path, &list)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Generated GPT-SoVITS list file: {}", path.display());
        }
        None => print!("{list}"),
    }
    Ok(())
}
