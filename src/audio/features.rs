//! Audio feature extraction.
//!
//! [`FeatureExtractor`] runs the analyzer primitives over a mono signal,
//! derives the per-frame vocal indicator and hands it to the segment
//! detector. Failures never propagate: they are logged and reported as
//! "no features" so the caller can fall back to a cheaper strategy.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::analyzer::{SignalAnalysis, SignalAnalyzer};
use super::segments::VocalSegmentDetector;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::types::VocalSegment;

/// Acoustic description of a track.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioFeatures {
    /// Estimated tempo in BPM (zero when no periodicity was found).
    pub tempo_bpm: f64,
    /// Beat positions in seconds, strictly increasing.
    pub beat_times: Vec<f64>,
    /// Onset positions in seconds, strictly increasing.
    pub onset_times: Vec<f64>,
    /// RMS energy per frame.
    pub energy_profile: Vec<f64>,
    /// Spectral centroid per frame, in Hz.
    pub spectral_centroid: Vec<f64>,
    /// Zero-crossing rate per frame.
    pub zero_crossing_rate: Vec<f64>,
    /// Per-frame vocal indicator.
    pub vocal_activity: Vec<bool>,
    /// Seconds between consecutive frames.
    pub hop_seconds: f64,
    /// Track duration in seconds.
    pub duration: f64,
    /// Detected vocal segments, ordered and non-overlapping.
    pub vocal_segments: Vec<VocalSegment>,
}

impl AudioFeatures {
    /// Number of analysis frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.energy_profile.len()
    }

    /// Time of frame `i` in seconds.
    #[must_use]
    pub fn frame_time(&self, i: usize) -> f64 {
        i as f64 * self.hop_seconds
    }
}

/// The part of a sorted beat list inside `[start, end]`.
#[must_use]
pub fn beats_within(beats: &[f64], start: f64, end: f64) -> &[f64] {
    let lo = beats.partition_point(|&b| b < start);
    let hi = beats.partition_point(|&b| b <= end);
    &beats[lo..hi.max(lo)]
}

/// Derives [`AudioFeatures`] from decoded samples.
pub struct FeatureExtractor {
    analyzer: Arc<dyn SignalAnalyzer>,
    config: SyncConfig,
}

impl FeatureExtractor {
    /// Create an extractor over the given analyzer.
    pub fn new(analyzer: Arc<dyn SignalAnalyzer>, config: SyncConfig) -> Self {
        Self { analyzer, config }
    }

    /// Name of the underlying analyzer.
    pub fn analyzer_name(&self) -> &'static str {
        self.analyzer.name()
    }

    /// Extract features, returning `None` when the analyzer cannot.
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Option<AudioFeatures> {
        match self.try_extract(samples, sample_rate) {
            Ok(features) => Some(features),
            Err(e) => {
                tracing::warn!("Feature extraction with {} failed: {e}", self.analyzer.name());
                None
            }
        }
    }

    /// Extract features, reporting why extraction failed.
    pub fn try_extract(&self, samples: &[f32], sample_rate: u32) -> Result<AudioFeatures> {
        if sample_rate == 0 {
            return Err(Error::FeatureExtractionUnavailable("sample rate is zero".into()));
        }
        let started = Instant::now();
        let cfg = &self.config;

        let SignalAnalysis {
            tempo_bpm,
            beats,
            onsets,
            energy: mut energy,
            centroid: mut centroid,
            zcr: mut zcr,
        } = self
            .analyzer
            .analyze(samples, sample_rate, cfg.frame_len, cfg.hop_len)?;

        // Per-frame series share one time base
        let frames = energy.len().min(centroid.len()).min(zcr.len());
        energy.truncate(frames);
        centroid.truncate(frames);
        zcr.truncate(frames);

        let hop_seconds = cfg.hop_len as f64 / f64::from(sample_rate);
        let duration = samples.len() as f64 / f64::from(sample_rate);

        let vocal_activity = vocal_indicator(
            &energy,
            &centroid,
            cfg.vocal_energy_threshold,
            cfg.vocal_spectral_threshold,
        );
        let vocal_segments =
            VocalSegmentDetector::from_config(cfg).detect(&vocal_activity, hop_seconds, duration);

        let features = AudioFeatures {
            tempo_bpm: if tempo_bpm.is_finite() { tempo_bpm.max(0.0) } else { 0.0 },
            beat_times: strictly_increasing(beats),
            onset_times: strictly_increasing(onsets),
            energy_profile: energy,
            spectral_centroid: centroid,
            zero_crossing_rate: zcr,
            vocal_activity,
            hop_seconds,
            duration,
            vocal_segments,
        };

        tracing::info!(
            "Extracted features with {} in {:?}: {:.1} BPM, {} beats, {} vocal segments",
            self.analyzer.name(),
            started.elapsed(),
            features.tempo_bpm,
            features.beat_times.len(),
            features.vocal_segments.len()
        );
        Ok(features)
    }
}

/// Standardize a series to zero mean and unit variance.
///
/// A constant series maps to all zeros.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

/// Per-frame vocal indicator: loud and bright relative to the track.
pub fn vocal_indicator(energy: &[f64], centroid: &[f64], energy_threshold: f64, spectral_threshold: f64) -> Vec<bool> {
    zscore(energy)
        .into_iter()
        .zip(zscore(centroid))
        .map(|(e, c)| e > energy_threshold && c > spectral_threshold)
        .collect()
}

fn strictly_increasing(mut times: Vec<f64>) -> Vec<f64> {
    times.retain(|t| t.is_finite() && *t >= 0.0);
    let mut last = f64::NEG_INFINITY;
    times.retain(|&t| {
        let keep = t > last;
        if keep {
            last = t;
        }
        keep
    });
    times
}
