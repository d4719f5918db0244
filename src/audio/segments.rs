//! Vocal segment detection.
//!
//! A two-state machine over the per-frame vocal indicator. Runs of vocal
//! frames no longer than the duration floor are treated as noise.

use crate::config::SyncConfig;
use crate::constants::analysis::{FALLBACK_SEGMENT_END, FALLBACK_SEGMENT_START};
use crate::types::VocalSegment;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DetectorState {
    Outside,
    Inside { start: f64 },
}

/// Turns a boolean vocal-activity stream into ordered vocal segments.
#[derive(Debug, Clone, Copy)]
pub struct VocalSegmentDetector {
    min_segment_duration: f64,
}

impl VocalSegmentDetector {
    /// Create a detector with the given duration floor in seconds.
    #[must_use]
    pub const fn new(min_segment_duration: f64) -> Self {
        Self { min_segment_duration }
    }

    /// Create a detector from the engine configuration.
    #[must_use]
    pub const fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.min_segment_duration)
    }

    /// Detect vocal segments, falling back to the middle 80% of the track.
    ///
    /// `hop_seconds` is the time between indicator frames. The result is never
    /// empty when `duration` is positive.
    pub fn detect(&self, indicator: &[bool], hop_seconds: f64, duration: f64) -> Vec<VocalSegment> {
        let segments = self.scan(indicator, hop_seconds);
        if segments.is_empty() && duration > 0.0 {
            tracing::debug!("No vocal segment survived the {}s floor; using fallback", self.min_segment_duration);
            return vec![fallback_segment(duration)];
        }
        segments
    }

    /// Run the state machine without the fallback.
    pub fn scan(&self, indicator: &[bool], hop_seconds: f64) -> Vec<VocalSegment> {
        let mut segments = Vec::new();
        let mut state = DetectorState::Outside;

        for (i, &active) in indicator.iter().enumerate() {
            let t = i as f64 * hop_seconds;
            state = match (state, active) {
                (DetectorState::Outside, true) => DetectorState::Inside { start: t },
                (DetectorState::Inside { start }, false) => {
                    if t - start > self.min_segment_duration {
                        segments.push(VocalSegment::new(start, t));
                    }
                    DetectorState::Outside
                }
                (unchanged, _) => unchanged,
            };
        }

        if let DetectorState::Inside { start } = state {
            let last = indicator.len().saturating_sub(1) as f64 * hop_seconds;
            if last - start > self.min_segment_duration {
                segments.push(VocalSegment::new(start, last));
            }
        }

        segments
    }
}

/// The `[10%, 90%]` segment used when nothing passes the duration floor.
#[must_use]
pub fn fallback_segment(duration: f64) -> VocalSegment {
    VocalSegment::new(duration * FALLBACK_SEGMENT_START, duration * FALLBACK_SEGMENT_END)
}
