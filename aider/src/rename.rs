//! Filename normalization planning.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use walkdir::WalkDir;

lazy_static! {
    // ASCII characters outside [-_.a-zA-Z0-9]; multi-byte characters are
    // deliberately left alone.
    static ref SPECIALS: Regex =
        Regex::new(r"[\x00-\x2C\x2F\x3A-\x40\x5B-\x5E\x60\x7B-\x7F]").expect("valid regex");
}

/// Replaces every special ASCII character in a file name with `_`.
pub fn normalize(name: &str) -> String {
    SPECIALS.replace_all(name, "_").into_owned()
}

/// One pending rename, kept as full paths plus the bare names for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
    pub old_name: String,
    pub new_name: String,
}

/// Walks `root` recursively and plans a rename for every file whose name
/// contains special characters. Pure: nothing is renamed here.
pub fn plan(root: &Path) -> Result<Vec<Rename>, walkdir::Error> {
    let mut pending = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let old_name = entry.file_name().to_string_lossy().into_owned();
        let new_name = normalize(&old_name);
        if new_name != old_name {
            let from = entry.path().to_path_buf();
            let to = from.with_file_name(&new_name);
            pending.push(Rename {
                from,
                to,
                old_name,
                new_name,
            });
        }
    }
    Ok(pending)
}
