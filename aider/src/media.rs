//! Discovery of files eligible for remote processing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The two media families the remote API accepts from us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// MIME type for an eligible file, or `None` if a batch of this kind
    /// should skip it. Extensions are matched case-insensitively; the MIME
    /// strings are exactly what the API expects for inline data.
    pub fn mime_for(self, path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match self {
            MediaKind::Image => match ext.as_str() {
                "jpg" | "jpeg" => Some("image/jpeg"),
                "png" => Some("image/png"),
                "webp" => Some("image/webp"),
                _ => None,
            },
            MediaKind::Audio => match ext.as_str() {
                "wav" => Some("audio/wav"),
                "mp3" => Some("audio/mpeg"),
                "m4a" => Some("audio/m4a"),
                "flac" => Some("audio/flac"),
                "ogg" => Some("audio/ogg"),
                _ => None,
            },
        }
    }
}

/// One input file eligible for remote processing.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub path: PathBuf,
    pub mime_type: &'static str,
}

impl MediaItem {
    /// Bare file name for progress messages.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Sibling artifact path: same base name, `.txt` extension.
    pub fn artifact_path(&self) -> PathBuf {
        self.path.with_extension("txt")
    }
}

/// Lists the direct entries of `dir` that are eligible `kind` files, in
/// directory listing order. Subdirectories are never descended into.
pub fn enumerate(dir: &Path, kind: MediaKind) -> io::Result<Vec<MediaItem>> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(mime_type) = kind.mime_for(&path) {
            items.push(MediaItem { path, mime_type });
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_map_to_api_mime_types() {
        assert_eq!(
            MediaKind::Image.mime_for(Path::new("photo.JPG")),
            Some("image/jpeg")
        );
        assert_eq!(
            MediaKind::Image.mime_for(Path::new("photo.webp")),
            Some("image/webp")
        );
        assert_eq!(MediaKind::Image.mime_for(Path::new("clip.wav")), None);
        assert_eq!(
            MediaKind::Audio.mime_for(Path::new("clip.WAV")),
            Some("audio/wav")
        );
        assert_eq!(
            MediaKind::Audio.mime_for(Path::new("clip.mp3")),
            Some("audio/mpeg")
        );
        assert_eq!(MediaKind::Audio.mime_for(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::Audio.mime_for(Path::new("no_extension")), None);
    }

    #[test]
    fn artifact_path_replaces_the_extension() {
        let item = MediaItem {
            path: PathBuf::from("/data/set/clip.wav"),
            mime_type: "audio/wav",
        };
        assert_eq!(item.artifact_path(), PathBuf::from("/data/set/clip.txt"));
        assert_eq!(item.name(), "clip.wav");
    }

    #[test]
    fn enumerate_filters_to_eligible_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.wav"), b"riff").unwrap();
        fs::write(dir.path().join("b.MP3"), b"id3").unwrap();
        fs::write(dir.path().join("notes.txt"), b"n").unwrap();
        fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let items = enumerate(dir.path(), MediaKind::Audio).unwrap();
        let mut names: Vec<String> = items.iter().map(|item| item.name()).collect();
        names.sort();
        assert_eq!(names, vec!["a.wav", "b.MP3"]);
    }
}
