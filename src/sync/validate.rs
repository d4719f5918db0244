//! Timing repair.
//!
//! Whatever strategy won, its lines pass through [`TimingValidator`] before
//! they leave the engine. The validator restores ordering, removes overlaps
//! and keeps every line inside the track, re-tagging what it moved.

use crate::config::SyncConfig;
use crate::constants::validation::{ADJUST_EPSILON, ADJUST_PENALTY};
use crate::types::{SyncMethod, SyncedLine};

/// Repairs a timed line sequence so it satisfies the output invariants.
#[derive(Debug, Clone, Copy)]
pub struct TimingValidator {
    end_margin: f64,
}

impl TimingValidator {
    /// Create a validator from the engine configuration.
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            end_margin: config.end_margin,
        }
    }

    /// Repair `lines` for a track of `duration` seconds.
    pub fn validate(&self, mut lines: Vec<SyncedLine>, duration: f64) -> Vec<SyncedLine> {
        if lines.is_empty() {
            return lines;
        }
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        let original: Vec<(f64, f64)> = lines.iter().map(|l| (l.start, l.end)).collect();

        // Finite, in range, ordered
        let mut floor = 0.0_f64;
        for line in &mut lines {
            let start = if line.start.is_finite() { line.start } else { floor };
            line.start = start.clamp(0.0, duration).max(floor);
            let end = if line.end.is_finite() { line.end } else { line.start };
            line.end = end.clamp(0.0, duration).max(line.start);
            floor = line.start;
        }

        // Shrink into the next line's start
        for i in 1..lines.len() {
            let next_start = lines[i].start;
            if lines[i - 1].end > next_start {
                lines[i - 1].end = next_start;
            }
        }

        let limit = if duration - self.end_margin > 0.0 {
            duration - self.end_margin
        } else {
            duration
        };
        if lines.iter().any(|l| l.start > limit) {
            compress(&mut lines, limit);
        }
        for line in &mut lines {
            if line.end > limit {
                line.end = limit.max(line.start);
            }
        }

        let mut adjusted = 0usize;
        for (line, &(start, end)) in lines.iter_mut().zip(&original) {
            if moved(start, line.start) || moved(end, line.end) {
                line.method = SyncMethod::Adjusted;
                line.confidence *= ADJUST_PENALTY;
                adjusted += 1;
            }
            line.confidence = if line.confidence.is_finite() {
                line.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        if adjusted > 0 {
            tracing::debug!("Validator adjusted {adjusted} of {} lines", lines.len());
        }

        lines
    }
}

fn moved(before: f64, after: f64) -> bool {
    !before.is_finite() || (before - after).abs() > ADJUST_EPSILON
}

/// Linearly map the timeline from the first start into `[first, limit]`.
fn compress(lines: &mut [SyncedLine], limit: f64) {
    let first = lines.first().map_or(0.0, |l| l.start);
    let last = lines.iter().map(|l| l.end).fold(first, f64::max);
    let origin = first.min(limit);
    let scale = if last > first { (limit - origin) / (last - first) } else { 0.0 };
    tracing::debug!("Compressing timeline {first:.2}-{last:.2} into {origin:.2}-{limit:.2}");
    for line in lines {
        line.start = origin + (line.start - first) * scale;
        line.end = origin + (line.end - first) * scale;
    }
}
