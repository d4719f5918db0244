//! Segment-based line placement.
//!
//! Lines are shared out across the detected vocal segments and, inside each
//! segment, either quantized to beats or split evenly.

use crate::audio::features::beats_within;
use crate::constants::placement::{BEAT_CONFIDENCE, EVEN_CONFIDENCE, SNAP_PENALTY};
use crate::types::{SyncMethod, SyncedLine, VocalSegment};

/// Places lines onto vocal segments, snapping to beats when possible.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentTimingPlacer;

impl SegmentTimingPlacer {
    /// Create a placer.
    pub const fn new() -> Self {
        Self
    }

    /// Place `lines` across `segments`.
    ///
    /// Returns `None` when there are no lines or no segments to place on.
    pub fn place(&self, lines: &[String], segments: &[VocalSegment], beats: &[f64]) -> Option<Vec<SyncedLine>> {
        if lines.is_empty() || segments.is_empty() {
            return None;
        }

        let mut out = Vec::with_capacity(lines.len());
        for (segment, range) in segments.iter().zip(distribute(lines.len(), segments.len())) {
            let assigned = &lines[range];
            let in_segment = beats_within(beats, segment.start, segment.end);

            let (bounds, confidence) = if in_segment.len() >= 2 {
                (beat_boundaries(in_segment, assigned.len()), BEAT_CONFIDENCE)
            } else {
                (even_boundaries(segment, assigned.len()), EVEN_CONFIDENCE)
            };

            for (line, edge) in assigned.iter().zip(bounds.windows(2)) {
                out.push(SyncedLine::new(line.as_str(), edge[0], edge[1], confidence, SyncMethod::SegmentPlaced));
            }
        }

        snap_to_segments(&mut out, segments);
        Some(out)
    }
}

/// Split `n` lines across at most `segments` consecutive ranges.
///
/// Each range holds `max(1, n / used)` lines; the last absorbs the remainder.
fn distribute(n: usize, segments: usize) -> Vec<std::ops::Range<usize>> {
    let used = segments.min(n);
    if used == 0 {
        return Vec::new();
    }
    let per = (n / used).max(1);
    (0..used)
        .map(|k| {
            let start = k * per;
            let end = if k + 1 == used { n } else { start + per };
            start..end
        })
        .collect()
}

/// `lines + 1` boundaries at linspace positions over the beat indices.
///
/// With enough beats every boundary lands on a beat; otherwise boundaries
/// interpolate between neighbouring beats.
fn beat_boundaries(beats: &[f64], lines: usize) -> Vec<f64> {
    let last = beats.len() - 1;
    let step = last as f64 / lines as f64;
    let on_beats = beats.len() > lines;

    (0..=lines)
        .map(|k| {
            let pos = k as f64 * step;
            if on_beats {
                beats[(pos.round() as usize).min(last)]
            } else {
                let i = (pos.floor() as usize).min(last);
                let frac = pos - i as f64;
                match beats.get(i + 1) {
                    Some(next) => beats[i] + frac * (next - beats[i]),
                    None => beats[i],
                }
            }
        })
        .collect()
}

fn even_boundaries(segment: &VocalSegment, lines: usize) -> Vec<f64> {
    let step = segment.duration() / lines as f64;
    (0..=lines).map(|k| segment.start + k as f64 * step).collect()
}

/// Move lines that miss every segment onto the nearest one.
///
/// The snapped line starts at the segment start, keeps its duration where
/// the segment allows and loses confidence.
pub fn snap_to_segments(lines: &mut [SyncedLine], segments: &[VocalSegment]) {
    for line in lines.iter_mut() {
        if segments.iter().any(|s| s.intersects(line.start, line.end)) {
            continue;
        }
        let nearest = segments
            .iter()
            .min_by(|a, b| a.distance_to(line.start).total_cmp(&b.distance_to(line.start)));
        if let Some(seg) = nearest {
            let duration = line.duration().max(0.0).min(seg.duration());
            tracing::debug!("Snapping {:?} to segment {:.2}-{:.2}", line.text, seg.start, seg.end);
            line.start = seg.start;
            line.end = seg.start + duration;
            line.confidence *= SNAP_PENALTY;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn test_distribute_last_absorbs_remainder() {
        assert_eq!(distribute(7, 3), vec![0..2, 2..4, 4..7]);
        assert_eq!(distribute(2, 5), vec![0..1, 1..2]);
        assert_eq!(distribute(3, 1), vec![0..3]);
    }

    #[test]
    fn test_beat_quantized_boundaries() {
        let beats = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let placed = SegmentTimingPlacer::new()
            .place(&lines(3), &[VocalSegment::new(1.0, 6.0)], &beats)
            .unwrap();

        let starts: Vec<f64> = placed.iter().map(|l| l.start).collect();
        assert_eq!(starts, vec![1.0, 3.0, 4.0]);
        assert!((placed[2].end - 6.0).abs() < f64::EPSILON);
        assert!(placed.windows(2).all(|w| w[0].end <= w[1].start));
        assert!(placed.iter().all(|l| l.method == SyncMethod::SegmentPlaced));
    }

    #[test]
    fn test_few_beats_interpolate() {
        let placed = SegmentTimingPlacer::new()
            .place(&lines(4), &[VocalSegment::new(0.0, 10.0)], &[2.0, 8.0])
            .unwrap();
        let starts: Vec<f64> = placed.iter().map(|l| l.start).collect();
        assert_eq!(starts, vec![2.0, 3.5, 5.0, 6.5]);
        assert!(placed.iter().all(|l| l.duration() > 0.0));
    }

    #[test]
    fn test_even_split_without_beats() {
        let placed = SegmentTimingPlacer::new()
            .place(&lines(4), &[VocalSegment::new(20.0, 180.0)], &[])
            .unwrap();
        assert_eq!(placed.len(), 4);
        assert!((placed[0].start - 20.0).abs() < f64::EPSILON);
        assert!((placed[3].end - 180.0).abs() < 1e-9);
        assert!(placed.iter().all(|l| (l.duration() - 40.0).abs() < 1e-9));
        assert!(placed.iter().all(|l| (l.confidence - EVEN_CONFIDENCE).abs() < f64::EPSILON));
    }

    #[test]
    fn test_lines_follow_segment_order() {
        let segments = [VocalSegment::new(5.0, 15.0), VocalSegment::new(30.0, 40.0)];
        let placed = SegmentTimingPlacer::new().place(&lines(5), &segments, &[]).unwrap();
        assert_eq!(placed.len(), 5);
        assert!(placed[..2].iter().all(|l| l.end <= 15.0));
        assert!(placed[2..].iter().all(|l| l.start >= 30.0));
    }

    #[test]
    fn test_snap_moves_stray_line() {
        let segments = [VocalSegment::new(10.0, 12.0), VocalSegment::new(50.0, 60.0)];
        let mut placed = vec![SyncedLine::new("stray", 20.0, 24.0, 0.5, SyncMethod::SegmentPlaced)];
        snap_to_segments(&mut placed, &segments);
        assert!((placed[0].start - 10.0).abs() < f64::EPSILON);
        assert!((placed[0].end - 12.0).abs() < f64::EPSILON);
        assert!((placed[0].confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_no_segments_is_none() {
        assert!(SegmentTimingPlacer::new().place(&lines(2), &[], &[1.0]).is_none());
    }
}
