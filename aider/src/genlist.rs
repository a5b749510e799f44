//! GPT-SoVITS dataset annotation assembly.
//!
//! Pairs `<base>.wav` audio with `<base>.txt` transcripts and renders
//! `audio|speaker|language|text` lines.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// One `audio|speaker|language|text` annotation line.
pub fn format_line(base: &str, speaker: &str, lang: &str, text: &str) -> String {
    format!("{base}.wav|{speaker}|{lang}|{text}")
}

/// Collapses line breaks to single spaces and trims the transcript, since
/// the list format is strictly one record per line.
pub fn flatten_transcript(raw: &str) -> String {
    raw.replace("\r\n", " ").replace('\n', " ").trim().to_string()
}

/// Collects `(base name, transcript)` pairs: every `.txt` in `dir` whose
/// base name also has a `.wav` sibling, in listing order. Unreadable
/// transcripts are warned about and skipped.
pub fn collect_pairs(dir: &Path) -> io::Result<Vec<(String, String)>> {
    let mut names = Vec::new();
    let mut wav_bases = HashSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(base) = name.strip_suffix(".wav") {
            wav_bases.insert(base.to_string());
        }
        names.push(name);
    }

    let mut pairs = Vec::new();
    for name in &names {
        let Some(base) = name.strip_suffix(".txt") else {
            continue;
        };
        if !wav_bases.contains(base) {
            continue;
        }
        match fs::read_to_string(dir.join(name)) {
            Ok(raw) => pairs.push((base.to_string(), flatten_transcript(&raw))),
            Err(err) => {
                tracing::warn!("failed to read transcription {name}: {err}; skipping");
            }
        }
    }
    Ok(pairs)
}

/// Renders the full list file content, one line per pair.
pub fn build_list(pairs: &[(String, String)], speaker: &str, lang: &str) -> String {
    let mut out = String::new();
    for (base, text) in pairs {
        out.push_str(&format_line(base, speaker, lang, text));
        out.push('\n');
    }
    out
}
