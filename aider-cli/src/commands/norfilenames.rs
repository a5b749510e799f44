use std::io::{self, Write};
use std::path::PathBuf;

use aider::rename;
use anyhow::{bail, Context, Result};

/// Normalize all filenames within a directory, replacing special characters
/// (like #, $, %) with underscores.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Directory to normalize filenames in
    #[arg(long)]
    pub dir: PathBuf,
    /// Rename without asking for confirmation
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: Args) -> Result<()> {
    println!("Normalizing filenames in directory: {}", args.dir.display());
    let pending = rename::plan(&args.dir)
        .with_context(|| format!("failed to walk {}", args.dir.display()))?;

    if pending.is_empty() {
        println!("No filenames need normalization.");
        return Ok(());
    }

    println!();
    println!("Pending renamings:");
    for rename in &pending {
        println!("  {:?} -> {:?}", rename.old_name, rename.new_name);
    }

    if !args.force && !confirm("Proceed with renaming? (y/N): ")? {
        println!("Renaming cancelled.");
        return Ok(());
    }

    println!();
    println!("Performing renamings...");
    let mut error_cnt = 0usize;
    for rename in &pending {
        match std::fs::rename(&rename.from, &rename.to) {
            Ok(()) => println!("Renamed {:?} to {:?}", rename.old_name, rename.new_name),
            Err(err) => {
                tracing::error!("error renaming {:?}: {err}", rename.old_name);
                error_cnt += 1;
            }
        }
    }
    println!("Filename normalization complete.");
    if error_cnt > 0 {
        bail!("{error_cnt} errors");
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
