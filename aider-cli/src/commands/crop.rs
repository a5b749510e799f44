use std::fs;
use std::path::{Path, PathBuf};

use aider::crop;
use anyhow::{bail, Context, Result};

/// Crop and resize all images in a directory with content-aware framing.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to the image directory
    #[arg(long)]
    pub dir: PathBuf,
    /// Output dir name; defaults to "<input-dir>-crop"
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Target photo width
    #[arg(long, default_value_t = 1024)]
    pub width: u32,
    /// Target photo height
    #[arg(long, default_value_t = 1024)]
    pub height: u32,
    /// Process even if the target output file already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: Args) -> Result<()> {
    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => {
            let abs = fs::canonicalize(&args.dir)
                .with_context(|| format!("failed to resolve path {}", args.dir.display()))?;
            let mut name = abs.into_os_string();
            name.push("-crop");
            PathBuf::from(name)
        }
    };
    fs::create_dir_all(&output_dir).context("failed to create output directory")?;

    let mut error_cnt = 0usize;
    let entries = fs::read_dir(&args.dir)
        .with_context(|| format!("failed to read directory {}", args.dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if !is_croppable(Path::new(&name)) {
            continue;
        }
        let input = entry.path();
        let output = output_dir.join(&name);
        if !args.force && output.exists() {
            println!("Skipping {}, output file already exists.", input.display());
            continue;
        }
        match crop::process_file(&input, &output, args.width, args.height) {
            Ok(()) => println!(
                "Cropped and resized {} to {}",
                input.display(),
                output.display()
            ),
            Err(err) => {
                tracing::error!("failed to process {}: {err}", input.display());
                error_cnt += 1;
            }
        }
    }
    if error_cnt > 0 {
        bail!("{error_cnt} errors");
    }
    Ok(())
}

fn is_croppable(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "png" | "webp")
    )
}
