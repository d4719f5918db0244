//! Synchronization constants.
//!
//! Centralizes magic numbers that have no configuration knob.

/// Signal analysis constants.
pub mod analysis {
    /// Lowest tempo considered by the tempo estimator.
    pub const MIN_TEMPO_BPM: f64 = 60.0;

    /// Highest tempo considered by the tempo estimator.
    pub const MAX_TEMPO_BPM: f64 = 200.0;

    /// Centre of the log-normal tempo prior.
    pub const PRIOR_TEMPO_BPM: f64 = 120.0;

    /// Width of the tempo prior in octaves.
    pub const PRIOR_TEMPO_OCTAVES: f64 = 1.0;

    /// Tightness of the beat tracker's tempo-consistency penalty.
    pub const BEAT_TIGHTNESS: f64 = 100.0;

    /// Onset peak picking: look-back for the local maximum, in seconds.
    pub const ONSET_PRE_MAX: f64 = 0.03;

    /// Onset peak picking: moving-average window on each side, in seconds.
    pub const ONSET_AVG_WINDOW: f64 = 0.1;

    /// Onset peak picking: threshold above the moving average (normalized envelope).
    pub const ONSET_DELTA: f64 = 0.07;

    /// Onset peak picking: minimum spacing between onsets, in seconds.
    pub const ONSET_WAIT: f64 = 0.03;

    /// Fallback vocal segment start as a fraction of the track duration.
    pub const FALLBACK_SEGMENT_START: f64 = 0.1;

    /// Fallback vocal segment end as a fraction of the track duration.
    pub const FALLBACK_SEGMENT_END: f64 = 0.9;
}

/// Transcript alignment constants.
pub mod alignment {
    /// Weight of the string similarity in the match score.
    pub const TEXT_WEIGHT: f64 = 0.7;

    /// Weight of the word-count agreement in the match score.
    pub const LENGTH_WEIGHT: f64 = 0.3;

    /// Candidate spans may be up to this many times the target word count.
    pub const MAX_SPAN_FACTOR: usize = 3;

    /// Minimum duration of an unmatched fallback line.
    pub const FALLBACK_MIN_DURATION: f64 = 2.0;

    /// Seconds of fallback duration per character of line text.
    pub const FALLBACK_SECONDS_PER_CHAR: f64 = 0.05;
}

/// Heuristic timing constants.
pub mod heuristic {
    /// Duration multiplier for the first line.
    pub const FIRST_LINE_MULTIPLIER: f64 = 1.2;

    /// Duration multiplier for the last line.
    pub const LAST_LINE_MULTIPLIER: f64 = 1.3;

    /// Pause multiplier after sentence-ending punctuation.
    pub const SENTENCE_PAUSE: f64 = 1.0;

    /// Pause multiplier after clause punctuation.
    pub const CLAUSE_PAUSE: f64 = 0.7;

    /// Pause multiplier after unpunctuated lines.
    pub const PLAIN_PAUSE: f64 = 0.5;

    /// Breathing-room syllables reserved per line.
    pub const BREATH_SYLLABLES_PER_LINE: f64 = 2.0;

    /// Confidence assigned to heuristic lines.
    pub const CONFIDENCE: f64 = 0.3;
}

/// Segment placement constants.
pub mod placement {
    /// Confidence of beat-quantized lines.
    pub const BEAT_CONFIDENCE: f64 = 0.6;

    /// Confidence of evenly split lines.
    pub const EVEN_CONFIDENCE: f64 = 0.5;

    /// Confidence multiplier for lines snapped back into a segment.
    pub const SNAP_PENALTY: f64 = 0.8;
}

/// Validation constants.
pub mod validation {
    /// Movement below this many seconds does not count as an adjustment.
    pub const ADJUST_EPSILON: f64 = 1e-3;

    /// Confidence multiplier for adjusted lines.
    pub const ADJUST_PENALTY: f64 = 0.9;
}
