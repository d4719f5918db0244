//! Word-level transcripts.
//!
//! A [`Transcriber`] turns audio into timestamped words. The engine treats
//! every transcriber as fallible: errors and timeouts fall through to the
//! audio-feature strategy.

pub mod align;
pub mod client;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::TranscriptWord;

pub use align::{TranscriptAligner, TranscriptAlignment};
pub use client::HttpTranscriber;

/// Source of word-level transcripts.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe encoded audio bytes into timestamped words.
    async fn transcribe(&self, audio: &[u8]) -> Result<Vec<TranscriptWord>>;

    /// Get the name of this transcriber (for debugging/logging).
    fn name(&self) -> &'static str;
}

/// Transcriber backed by a pre-computed JSON transcript on disk.
///
/// Accepts either a bare word array or an object with a `words` array, as
/// produced by `lyricsync sync --transcript`.
#[derive(Debug, Clone)]
pub struct FileTranscriber {
    path: PathBuf,
}

impl FileTranscriber {
    /// Create a transcriber reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Transcriber for FileTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<Vec<TranscriptWord>> {
        load_words(&self.path)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Words(Vec<TranscriptWord>),
    Wrapped { words: Vec<TranscriptWord> },
}

/// Load and sanitize a transcript file.
pub fn load_words(path: &Path) -> Result<Vec<TranscriptWord>> {
    let raw = fs_err::read_to_string(path)?;
    let parsed: TranscriptFile = serde_json::from_str(&raw)
        .map_err(|e| Error::parse(format!("invalid transcript JSON: {e}"), path.to_path_buf()))?;
    let words = match parsed {
        TranscriptFile::Words(words) | TranscriptFile::Wrapped { words } => words,
    };
    Ok(sanitize_words(words))
}

/// Drop unusable words, restore chronological order and trim overlaps.
///
/// Words with blank text, non-finite times or `end < start` are discarded.
/// A word running past the start of the next one is cut at that start.
pub fn sanitize_words(mut words: Vec<TranscriptWord>) -> Vec<TranscriptWord> {
    let before = words.len();
    words.retain(|w| {
        !w.text.trim().is_empty()
            && w.start.is_finite()
            && w.end.is_finite()
            && w.start >= 0.0
            && w.end >= w.start
    });
    if words.len() < before {
        tracing::debug!("Dropped {} malformed transcript words", before - words.len());
    }
    words.sort_by(|a, b| a.start.total_cmp(&b.start));
    for i in 1..words.len() {
        let next_start = words[i].start;
        let prev = &mut words[i - 1];
        if prev.end > next_start {
            prev.end = next_start.max(prev.start);
        }
    }
    words
}
