//! Known-track override table.
//!
//! Some recordings defeat every strategy (long spoken intros, a cappella
//! openings). The table maps such tracks to a forced vocal start, looked up
//! by normalized title and artist before synchronization begins.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::error::{Error, Result};
use crate::lyrics::normalize_title;

/// Timing exception for a known track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VocalOverride {
    /// Time of the first sung line, used as the heuristic lead-in.
    pub forced_vocal_start: f64,
    /// Duration floor used when the real duration is unknown.
    pub min_duration: Option<f64>,
}

/// Source of per-track timing exceptions.
pub trait OverrideLookup: Send + Sync {
    /// Find the override for a track, if any.
    fn lookup(&self, title: &str, artist: Option<&str>) -> Option<VocalOverride>;
}

/// One row of the override file.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideEntry {
    /// Track title as displayed.
    pub title: String,
    /// Artist, when the title alone is ambiguous.
    #[serde(default)]
    pub artist: Option<String>,
    /// Time of the first sung line in seconds.
    pub forced_vocal_start: f64,
    /// Duration floor in seconds.
    #[serde(default)]
    pub min_duration: Option<f64>,
}

#[derive(Debug, Clone)]
struct IndexedEntry {
    title_key: String,
    artist_key: Option<String>,
    value: VocalOverride,
}

/// Data-driven override table loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: Vec<IndexedEntry>,
}

impl OverrideTable {
    /// Build a table from entries, dropping rows with invalid timings.
    pub fn new(entries: Vec<OverrideEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|e| {
                let valid = e.forced_vocal_start.is_finite()
                    && e.forced_vocal_start >= 0.0
                    && e.min_duration.iter().all(|d| d.is_finite() && *d > 0.0);
                if !valid {
                    tracing::warn!("Skipping override for {:?}: invalid timing", e.title);
                    return None;
                }
                let title_key = normalize_title(&e.title);
                if title_key.is_empty() {
                    return None;
                }
                Some(IndexedEntry {
                    title_key,
                    artist_key: e.artist.as_deref().map(normalize_artist),
                    value: VocalOverride {
                        forced_vocal_start: e.forced_vocal_start,
                        min_duration: e.min_duration,
                    },
                })
            })
            .collect();
        Self { entries }
    }

    /// Load the table from a JSON file.
    ///
    /// A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Override table {} not found; no overrides active", path.display());
            return Ok(Self::default());
        }
        let raw = fs_err::read_to_string(path)?;
        let entries: Vec<OverrideEntry> = serde_json::from_str(&raw)
            .map_err(|e| Error::parse(format!("invalid override table: {e}"), PathBuf::from(path)))?;
        let table = Self::new(entries);
        tracing::info!("Loaded {} track overrides from {}", table.len(), path.display());
        Ok(table)
    }

    /// Number of usable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OverrideLookup for OverrideTable {
    fn lookup(&self, title: &str, artist: Option<&str>) -> Option<VocalOverride> {
        // Fuzzy match with a minimum quality threshold
        const MIN_SCORE: i64 = 80;

        let query = normalize_title(title);
        if query.is_empty() || self.entries.is_empty() {
            return None;
        }
        let artist = artist.map(normalize_artist).filter(|a| !a.is_empty());
        let artist_ok = |entry: &IndexedEntry| match (&entry.artist_key, &artist) {
            (None, _) => true,
            (Some(want), Some(got)) => starts_with_words(got, want),
            (Some(_), None) => false,
        };
        let pinned = |entry: &IndexedEntry| entry.artist_key.is_some() && artist.is_some() && artist_ok(entry);

        if let Some(entry) = self.entries.iter().find(|e| e.title_key == query && artist_ok(e)) {
            return Some(entry.value);
        }

        // Whole-word title prefix, pinned artists only
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| pinned(e) && starts_with_words(&query, &e.title_key))
        {
            return Some(entry.value);
        }

        // Fuzzy only for entries pinned to this artist
        let matcher = SkimMatcherV2::default();
        let best = self
            .entries
            .iter()
            .filter(|e| pinned(e))
            .filter_map(|entry| {
                let score = matcher.fuzzy_match(&entry.title_key, &query)?;
                (score >= MIN_SCORE).then_some((score, entry))
            })
            .max_by_key(|(score, _)| *score);

        best.map(|(_, entry)| entry.value)
    }
}

/// Lookup that never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl OverrideLookup for NoOverrides {
    fn lookup(&self, _title: &str, _artist: Option<&str>) -> Option<VocalOverride> {
        None
    }
}

fn normalize_artist(artist: &str) -> String {
    normalize_title(artist)
}

/// Whether the words of `prefix` are the leading words of `text`.
fn starts_with_words(text: &str, prefix: &str) -> bool {
    let mut words = text.split_whitespace();
    let mut any = false;
    for want in prefix.split_whitespace() {
        if words.next() != Some(want) {
            return false;
        }
        any = true;
    }
    any
}
