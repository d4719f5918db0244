//! Core timing types shared by every synchronization strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous time interval judged likely to contain sung content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VocalSegment {
    /// Segment start, in seconds.
    pub start: f64,
    /// Segment end, in seconds.
    pub end: f64,
}

impl VocalSegment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the segment in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `[start, end]` shares any time with this segment.
    #[must_use]
    pub fn intersects(&self, start: f64, end: f64) -> bool {
        start < self.end && end > self.start
    }

    /// Distance from `t` to the nearest point of the segment (zero inside).
    #[must_use]
    pub fn distance_to(&self, t: f64) -> f64 {
        if t < self.start {
            self.start - t
        } else if t > self.end {
            t - self.end
        } else {
            0.0
        }
    }
}

/// A word with timestamps from the transcription service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    /// The recognized word.
    #[serde(alias = "word")]
    pub text: String,
    /// Word start, in seconds.
    pub start: f64,
    /// Word end, in seconds.
    pub end: f64,
}

impl TranscriptWord {
    /// Create a new transcript word.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// How a line's timing was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMethod {
    /// Matched against the transcript.
    Transcript,
    /// Distributed across detected vocal segments.
    SegmentPlaced,
    /// Estimated from syllable counts.
    Heuristic,
    /// Moved by the validator to restore the timing invariants.
    Adjusted,
}

impl SyncMethod {
    /// Returns the human-readable name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::SegmentPlaced => "segment_placed",
            Self::Heuristic => "heuristic",
            Self::Adjusted => "adjusted",
        }
    }
}

impl fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lyric line with its display timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedLine {
    /// The lyric text.
    pub text: String,
    /// Display start, in seconds.
    pub start: f64,
    /// Display end, in seconds.
    pub end: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// How the timing was produced.
    pub method: SyncMethod,
}

impl SyncedLine {
    /// Create a new synced line.
    pub fn new(text: impl Into<String>, start: f64, end: f64, confidence: f64, method: SyncMethod) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence,
            method,
        }
    }

    /// Display duration in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A synchronization strategy, in descending order of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Align lines against a word-level transcript.
    Transcript,
    /// Place lines on detected vocal segments and beats.
    AudioFeature,
    /// Estimate timing from syllable counts.
    Heuristic,
}

impl Strategy {
    /// Returns all strategies in priority order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Transcript, Self::AudioFeature, Self::Heuristic]
    }

    /// Returns the human-readable name of this strategy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::AudioFeature => "audio_feature",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn segment_distance_is_zero_inside() {
        let seg = VocalSegment::new(2.0, 5.0);
        assert!(seg.distance_to(3.0).abs() < f64::EPSILON);
        assert!((seg.distance_to(1.0) - 1.0).abs() < f64::EPSILON);
        assert!((seg.distance_to(7.5) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn segment_intersection_excludes_touching() {
        let seg = VocalSegment::new(2.0, 5.0);
        assert!(seg.intersects(4.0, 6.0));
        assert!(!seg.intersects(5.0, 6.0));
        assert!(!seg.intersects(0.0, 2.0));
    }

    #[test]
    fn transcript_word_accepts_word_alias() {
        let w: TranscriptWord =
            serde_json::from_str(r#"{"word": "hello", "start": 1.0, "end": 1.5}"#).unwrap();
        assert_eq!(w.text, "hello");
    }

    #[test]
    fn strategies_serialize_snake_case() {
        let json = serde_json::to_string(&Strategy::AudioFeature).unwrap();
        assert_eq!(json, "\"audio_feature\"");
        assert_eq!(Strategy::all().first(), Some(&Strategy::Transcript));
    }
}
