//! Synchronization configuration.
//!
//! [`SyncConfig`] carries every tunable used by the engine. [`Config`] wraps it
//! with service settings loaded from environment variables and .env files.

use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Tunables for feature extraction, alignment, placement and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Z-scored energy a frame must exceed to count as vocal.
    pub vocal_energy_threshold: f64,
    /// Z-scored spectral centroid a frame must exceed to count as vocal.
    pub vocal_spectral_threshold: f64,
    /// Shortest vocal segment kept by the detector, in seconds.
    pub min_segment_duration: f64,
    /// Shortest heuristic line duration, in seconds.
    pub min_line_duration: f64,
    /// Longest heuristic line duration, in seconds.
    pub max_line_duration: f64,
    /// Smallest gap between heuristic lines, in seconds.
    pub min_line_gap: f64,
    /// Largest gap between heuristic lines, in seconds.
    pub max_line_gap: f64,
    /// Score a transcript span must exceed to match a line.
    pub match_threshold: f64,
    /// Number of transcript words searched ahead of the cursor.
    pub search_window: usize,
    /// Fraction of transcript-matched lines needed to accept the strategy.
    pub transcript_acceptance: f64,
    /// Time kept free at the end of the track by the heuristic, in seconds.
    pub trailing_margin: f64,
    /// Time kept free at the end of the track by the validator, in seconds.
    pub end_margin: f64,
    /// Base pause between heuristic lines, scaled by punctuation.
    pub pause_factor: f64,
    /// Gap after the previous line for unmatched transcript lines, in seconds.
    pub unmatched_gap: f64,
    /// Confidence of unmatched transcript lines.
    pub unmatched_confidence: f64,
    /// Analysis frame length in samples.
    pub frame_len: usize,
    /// Analysis hop size in samples.
    pub hop_len: usize,
    /// Duration assumed when the real one cannot be determined, in seconds.
    pub default_duration: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            vocal_energy_threshold: 0.3,
            vocal_spectral_threshold: -0.5,
            min_segment_duration: 1.0,
            min_line_duration: 1.5,
            max_line_duration: 6.0,
            min_line_gap: 0.1,
            max_line_gap: 1.0,
            match_threshold: 0.6,
            search_window: 100,
            transcript_acceptance: 0.7,
            trailing_margin: 2.0,
            end_margin: 1.0,
            pause_factor: 1.0,
            unmatched_gap: 0.5,
            unmatched_confidence: 0.3,
            frame_len: 2048,
            hop_len: 512,
            default_duration: 180.0,
        }
    }
}

impl SyncConfig {
    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.min_line_duration <= 0.0 || self.min_line_duration > self.max_line_duration {
            return Err(Error::config(
                format!(
                    "line duration range {}..{} is invalid",
                    self.min_line_duration, self.max_line_duration
                ),
                "Set LYRICSYNC_LINE_MIN to a positive value no larger than LYRICSYNC_LINE_MAX",
            ));
        }
        if self.min_line_gap < 0.0 || self.min_line_gap > self.max_line_gap {
            return Err(Error::config(
                format!("line gap range {}..{} is invalid", self.min_line_gap, self.max_line_gap),
                "The minimum gap must be non-negative and no larger than the maximum gap",
            ));
        }
        if !(0.0..=1.0).contains(&self.match_threshold)
            || !(0.0..=1.0).contains(&self.transcript_acceptance)
        {
            return Err(Error::config(
                "match threshold and transcript acceptance must lie in [0, 1]",
                "Set LYRICSYNC_MATCH_THRESHOLD to a fraction such as 0.6",
            ));
        }
        if self.search_window == 0 {
            return Err(Error::config(
                "search window must be at least one word",
                "Set LYRICSYNC_SEARCH_WINDOW to a positive word count",
            ));
        }
        if self.frame_len == 0 || self.hop_len == 0 || self.hop_len > self.frame_len {
            return Err(Error::config(
                format!("frame/hop {}/{} is invalid", self.frame_len, self.hop_len),
                "The hop must be positive and no larger than the frame length",
            ));
        }
        if self.min_segment_duration < 0.0 || self.default_duration <= 0.0 {
            return Err(Error::config(
                "segment floor must be non-negative and default duration positive",
                "Check LYRICSYNC_MIN_SEGMENT",
            ));
        }
        Ok(())
    }
}

/// Configuration for the application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The application name
    app_name: String,
    /// The application version
    app_version: String,
    /// Engine tunables
    pub sync: SyncConfig,
    /// Transcription service endpoint
    pub transcribe_url: Option<String>,
    /// Transcription service API key
    pub transcribe_key: String,
    /// Upper bound on a transcription call
    pub transcript_timeout: Duration,
    /// Location of the known-track override table
    pub overrides_path: Option<PathBuf>,
}

impl Config {
    /// Get the application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Get the application version.
    #[must_use]
    pub fn app_version(&self) -> &str {
        &self.app_version
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            sync: SyncConfig::default(),
            transcribe_url: None,
            transcribe_key: String::new(),
            transcript_timeout: Duration::from_secs(30),
            overrides_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = env::var("LYRICSYNC_TRANSCRIBE_URL") {
            if !url.trim().is_empty() {
                config.transcribe_url = Some(url);
            }
        }

        if let Ok(key) = env::var("LYRICSYNC_TRANSCRIBE_KEY") {
            config.transcribe_key = key;
        }

        if let Some(secs) = env_parse::<u64>("LYRICSYNC_TRANSCRIPT_TIMEOUT_SECS") {
            config.transcript_timeout = Duration::from_secs(secs);
        }

        // Overrides path: env var override, or default <data dir>/lyricsync/overrides.json
        config.overrides_path = env::var("LYRICSYNC_OVERRIDES_PATH").ok().map_or_else(
            || dirs::data_dir().map(|d| d.join("lyricsync").join("overrides.json")),
            |path| Some(PathBuf::from(shellexpand::tilde(&path).to_string())),
        );

        let sync = &mut config.sync;
        if let Some(v) = env_parse("LYRICSYNC_MATCH_THRESHOLD") {
            sync.match_threshold = v;
        }
        if let Some(v) = env_parse("LYRICSYNC_SEARCH_WINDOW") {
            sync.search_window = v;
        }
        if let Some(v) = env_parse("LYRICSYNC_MIN_SEGMENT") {
            sync.min_segment_duration = v;
        }
        if let Some(v) = env_parse("LYRICSYNC_LINE_MIN") {
            sync.min_line_duration = v;
        }
        if let Some(v) = env_parse("LYRICSYNC_LINE_MAX") {
            sync.max_line_duration = v;
        }

        config.sync.validate()?;
        Ok(config)
    }

    /// Check if a transcription service is configured
    pub const fn has_transcription_service(&self) -> bool {
        self.transcribe_url.is_some()
    }
}

/// Read and parse an environment variable, warning on garbage.
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    let parsed = raw.trim().parse::<T>().ok();
    if parsed.is_none() {
        tracing::warn!("Ignoring unparseable {name}={raw:?}");
    }
    parsed
}
