//! Sequential batch driver: one sibling `.txt` artifact per media file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::gemini::{GeminiClient, GeminiError, Transport};
use crate::media::{self, MediaItem, MediaKind};

/// Remote-call seam used by the batch driver; stubbed in tests.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, media: &[u8], mime_type: &str) -> Result<String, GeminiError>;
}

/// Binds a client to one instruction so every file in a batch is sent with
/// the same prompt.
pub struct Prompted<'a, T: Transport> {
    pub client: &'a GeminiClient<T>,
    pub instruction: &'a str,
}

#[async_trait]
impl<T: Transport> Generate for Prompted<'_, T> {
    async fn generate(&self, media: &[u8], mime_type: &str) -> Result<String, GeminiError> {
        self.client.generate(self.instruction, media, mime_type).await
    }
}

/// Per-invocation switches for a batch run.
#[derive(Debug, Default, Clone)]
pub struct BatchOptions {
    /// Re-generate artifacts even when they already exist.
    pub force: bool,
    /// Literal trigger word(s) written before each generated text as
    /// `"<prefix>, <text>"`.
    pub prefix: Option<String>,
}

/// Aggregate outcome of one batch invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Processes every eligible file in `dir`, strictly sequentially and in
/// listing order. One item's failure never aborts the batch; every failure
/// is logged with the item's name and folded into the summary.
pub async fn run<G: Generate>(
    dir: &Path,
    kind: MediaKind,
    generator: &G,
    options: &BatchOptions,
) -> Result<RunSummary> {
    let items = media::enumerate(dir, kind)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;

    let mut summary = RunSummary::default();
    for item in &items {
        let artifact = item.artifact_path();
        if !options.force && artifact.exists() {
            println!("Skipping (exists): {}", item.name());
            summary.skipped += 1;
            continue;
        }
        println!("Processing: {}", item.name());
        match process_item(item, &artifact, generator, options).await {
            Ok(()) => {
                println!(
                    "Generated: {}",
                    artifact
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default()
                );
                summary.processed += 1;
            }
            Err(err) => {
                tracing::error!("{}: {err:#}", item.name());
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// Reads one file, sends it to the remote API, and writes the artifact.
/// The artifact is only ever written after a successful generation, so a
/// failed attempt never leaves a truncated file behind.
async fn process_item<G: Generate>(
    item: &MediaItem,
    artifact: &Path,
    generator: &G,
    options: &BatchOptions,
) -> Result<()> {
    // A local read failure is not transient; fail the item without touching
    // the network.
    let bytes = fs::read(&item.path)
        .with_context(|| format!("failed to read {}", item.path.display()))?;

    let text = generator.generate(&bytes, item.mime_type).await?;

    let mut content = text.trim().to_string();
    if let Some(prefix) = &options.prefix {
        content = format!("{prefix}, {content}");
    }
    fs::write(artifact, &content)
        .with_context(|| format!("failed to write {}", artifact.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGenerator {
        text: String,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Generate for FixedGenerator {
        async fn generate(&self, _media: &[u8], _mime: &str) -> Result<String, GeminiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    struct FailingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generate for FailingGenerator {
        async fn generate(&self, _media: &[u8], _mime: &str) -> Result<String, GeminiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GeminiError::Status {
                status: 401,
                body: "bad key".into(),
            })
        }
    }

    #[tokio::test]
    async fn existing_artifacts_are_skipped_without_api_calls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"riff").unwrap();
        std::fs::write(dir.path().join("b.wav"), b"riff").unwrap();
        std::fs::write(dir.path().join("b.txt"), "already transcribed").unwrap();

        let generator = FixedGenerator::new("hello there");
        let summary = run(
            dir.path(),
            MediaKind::Audio,
            &generator,
            &BatchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                processed: 1,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(generator.calls(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "hello there"
        );
        // The existing artifact is untouched.
        assert_eq!(
            std::fs::read_to_string(dir.path().join("b.txt")).unwrap(),
            "already transcribed"
        );
    }

    #[tokio::test]
    async fn a_second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"riff").unwrap();
        std::fs::write(dir.path().join("b.wav"), b"riff").unwrap();

        let generator = FixedGenerator::new("text");
        let options = BatchOptions::default();
        let first = run(dir.path(), MediaKind::Audio, &generator, &options)
            .await
            .unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(generator.calls(), 2);

        let second = run(dir.path(), MediaKind::Audio, &generator, &options)
            .await
            .unwrap();
        assert_eq!(
            second,
            RunSummary {
                processed: 0,
                skipped: 2,
                failed: 0
            }
        );
        // No additional API calls on the second run.
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn force_regenerates_existing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"riff").unwrap();
        std::fs::write(dir.path().join("a.txt"), "stale").unwrap();

        let generator = FixedGenerator::new("fresh");
        let options = BatchOptions {
            force: true,
            ..BatchOptions::default()
        };
        let summary = run(dir.path(), MediaKind::Audio, &generator, &options)
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(generator.calls(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "fresh"
        );
    }

    #[tokio::test]
    async fn identity_prefix_is_prepended() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.jpg"), b"jfif").unwrap();

        let generator = FixedGenerator::new("red hat\n");
        let options = BatchOptions {
            force: false,
            prefix: Some("foo".into()),
        };
        run(dir.path(), MediaKind::Image, &generator, &options)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("x.txt")).unwrap(),
            "foo, red hat"
        );
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"riff").unwrap();
        std::fs::write(dir.path().join("b.wav"), b"riff").unwrap();

        let generator = FailingGenerator {
            calls: AtomicUsize::new(0),
        };
        let summary = run(
            dir.path(),
            MediaKind::Audio,
            &generator,
            &BatchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                processed: 0,
                skipped: 0,
                failed: 2
            }
        );
        // Both items were attempted despite the first failure.
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert!(!dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
    }

    #[tokio::test]
    async fn directories_and_foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"n").unwrap();
        std::fs::create_dir(dir.path().join("inner")).unwrap();

        let generator = FixedGenerator::new("unused");
        let summary = run(
            dir.path(),
            MediaKind::Audio,
            &generator,
            &BatchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(generator.calls(), 0);
    }
}
