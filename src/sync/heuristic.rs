//! Syllable-based timing estimation.
//!
//! The last-resort strategy: spreads lines over the available time in
//! proportion to their syllable counts, with punctuation-driven pauses.

use crate::config::SyncConfig;
use crate::constants::heuristic::{BREATH_SYLLABLES_PER_LINE, CONFIDENCE, FIRST_LINE_MULTIPLIER, LAST_LINE_MULTIPLIER};
use crate::lyrics::{line_syllables, pause_multiplier};
use crate::types::{SyncMethod, SyncedLine};

/// Estimates line timing from syllable counts alone.
#[derive(Debug, Clone)]
pub struct HeuristicTimingEstimator {
    min_line_duration: f64,
    max_line_duration: f64,
    min_line_gap: f64,
    max_line_gap: f64,
    trailing_margin: f64,
    pause_factor: f64,
}

impl HeuristicTimingEstimator {
    /// Create an estimator from the engine configuration.
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            min_line_duration: config.min_line_duration,
            max_line_duration: config.max_line_duration,
            min_line_gap: config.min_line_gap,
            max_line_gap: config.max_line_gap,
            trailing_margin: config.trailing_margin,
            pause_factor: config.pause_factor,
        }
    }

    /// Estimate timings for `lines` in a track of `duration` seconds.
    ///
    /// Lines are placed back to back from the lead-in, so the result never
    /// overlaps. Placement that would run past the trailing margin is
    /// compressed to fit.
    pub fn estimate(&self, lines: &[String], duration: f64, lead_in: Option<f64>) -> Vec<SyncedLine> {
        if lines.is_empty() {
            return Vec::new();
        }

        let margin = if duration > self.trailing_margin { self.trailing_margin } else { 0.0 };
        let lead_in = match lead_in {
            Some(t) if t.is_finite() && t >= 0.0 && duration - t - margin > 0.0 => t,
            Some(t) => {
                tracing::warn!("Ignoring lead-in {t}s: leaves no time in a {duration:.1}s track");
                0.0
            }
            None => 0.0,
        };
        let available = (duration - lead_in - margin).max(0.0);
        let limit = lead_in + available;

        let syllables: Vec<usize> = lines.iter().map(|l| line_syllables(l)).collect();
        let total: usize = syllables.iter().sum();
        let n = lines.len();
        let time_per_syllable = available / (total as f64 + BREATH_SYLLABLES_PER_LINE * n as f64);

        let mut out = Vec::with_capacity(n);
        let mut cursor = lead_in;
        for (i, (line, &syl)) in lines.iter().zip(&syllables).enumerate() {
            let position = if i == 0 {
                FIRST_LINE_MULTIPLIER
            } else if i + 1 == n {
                LAST_LINE_MULTIPLIER
            } else {
                1.0
            };
            let length = (syl as f64 * time_per_syllable * position).clamp(self.min_line_duration, self.max_line_duration);

            let start = cursor;
            let end = start + length;
            out.push(SyncedLine::new(line.as_str(), start, end, CONFIDENCE, SyncMethod::Heuristic));

            let gap = (pause_multiplier(line) * self.pause_factor).clamp(self.min_line_gap, self.max_line_gap);
            cursor = end + gap;
        }

        let placed_end = out.last().map_or(lead_in, |l| l.end);
        if placed_end > limit && placed_end > lead_in {
            let factor = available / (placed_end - lead_in);
            tracing::debug!("Compressing heuristic timeline by {factor:.3} to fit {limit:.1}s");
            for line in &mut out {
                line.start = lead_in + (line.start - lead_in) * factor;
                line.end = lead_in + (line.end - lead_in) * factor;
            }
        }

        out
    }
}
