//! End-to-end checks of the synchronization guarantees.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use lyricsync::audio::{AudioFeatures, VocalSegmentDetector};
use lyricsync::config::SyncConfig;
use lyricsync::sync::{AttemptOutcome, Capabilities, SegmentTimingPlacer, SyncInputs, SynchronizationOrchestrator};
use lyricsync::transcript::TranscriptAligner;
use lyricsync::{Strategy, SyncMethod, SyncedLine, TranscriptWord, VocalSegment};

fn orchestrator() -> SynchronizationOrchestrator {
    SynchronizationOrchestrator::new(SyncConfig::default(), Capabilities::all())
}

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| (*s).to_string()).collect()
}

fn numbered(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("this is lyric line number {i}")).collect()
}

/// Words spaced 0.4s apart from `offset`.
fn transcript(text: &str, offset: f64) -> Vec<TranscriptWord> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| {
            let t = offset + i as f64 * 0.4;
            TranscriptWord::new(w, t, t + 0.3)
        })
        .collect()
}

fn features(segments: Vec<VocalSegment>, beats: Vec<f64>, duration: f64) -> AudioFeatures {
    AudioFeatures {
        vocal_segments: segments,
        beat_times: beats,
        duration,
        ..AudioFeatures::default()
    }
}

fn assert_guarantees(input: &[String], output: &[SyncedLine], duration: f64) {
    assert_eq!(output.len(), input.len(), "one output per input line");
    for (line, text) in output.iter().zip(input) {
        assert_eq!(&line.text, text, "input order preserved");
        assert!(line.start >= 0.0, "{line:?} starts before zero");
        assert!(line.end <= duration, "{line:?} ends after {duration}");
        assert!(line.start <= line.end, "{line:?} runs backwards");
        assert!((0.0..=1.0).contains(&line.confidence), "{line:?} confidence out of range");
    }
    for pair in output.windows(2) {
        assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
}

#[test]
fn heuristic_guarantees_hold_across_sizes() {
    for n in [1, 2, 5, 20, 80] {
        for duration in [5.0, 30.0, 200.0] {
            let input = numbered(n);
            let outcome = orchestrator()
                .synchronize(&SyncInputs {
                    lines: &input,
                    duration: Some(duration),
                    lead_in: Some(3.0),
                    ..SyncInputs::default()
                })
                .unwrap();
            assert_eq!(outcome.strategy, Strategy::Heuristic);
            assert_guarantees(&input, &outcome.lines, duration);
        }
    }
}

#[test]
fn segment_guarantees_hold_with_crowded_segments() {
    let segments = vec![VocalSegment::new(2.0, 4.0), VocalSegment::new(10.0, 11.5), VocalSegment::new(40.0, 59.9)];
    let beats: Vec<f64> = (0..120).map(|i| f64::from(i) * 0.5).collect();
    for n in [1, 3, 7, 30] {
        let input = numbered(n);
        let feats = features(segments.clone(), beats.clone(), 60.0);
        let outcome = orchestrator()
            .synchronize(&SyncInputs {
                lines: &input,
                features: Some(&feats),
                duration: Some(60.0),
                ..SyncInputs::default()
            })
            .unwrap();
        assert_eq!(outcome.strategy, Strategy::AudioFeature);
        assert_guarantees(&input, &outcome.lines, 60.0);
    }
}

#[test]
fn transcript_overrunning_the_track_is_repaired() {
    let input = lines(&["we will we will rock you", "buddy you're a boy make a big noise"]);
    let words = transcript("we will we will rock you buddy youre boy make big noise", 55.0);
    let outcome = orchestrator()
        .synchronize(&SyncInputs {
            lines: &input,
            transcript: Some(&words),
            duration: Some(58.0),
            ..SyncInputs::default()
        })
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::Transcript);
    assert_guarantees(&input, &outcome.lines, 58.0);
    assert!(outcome.lines.iter().any(|l| l.method == SyncMethod::Adjusted));
}

#[test]
fn beat_quantized_scenario() {
    let input = numbered(3);
    let placed = SegmentTimingPlacer::new()
        .place(&input, &[VocalSegment::new(1.0, 6.0)], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        .unwrap();
    let bounds: Vec<f64> = placed.iter().map(|l| l.start).chain(placed.last().map(|l| l.end)).collect();
    assert_eq!(bounds, vec![1.0, 3.0, 4.0, 6.0]);
    assert!(placed.iter().all(|l| l.start >= 1.0 && l.end <= 6.0));
    assert!(placed.windows(2).all(|w| w[0].end <= w[1].start));
}

#[test]
fn heuristic_two_line_scenario() {
    let input = lines(&["Hi", "This is a longer line of lyrics"]);
    let outcome = orchestrator()
        .synchronize(&SyncInputs {
            lines: &input,
            duration: Some(30.0),
            lead_in: Some(5.0),
            ..SyncInputs::default()
        })
        .unwrap();
    let [first, second] = outcome.lines.as_slice() else {
        panic!("expected two lines");
    };
    assert!(first.duration() >= 1.5);
    assert!(second.duration() > first.duration());
    for line in &outcome.lines {
        assert!(line.start >= 5.0 && line.end <= 28.0);
    }
}

#[test]
fn half_matched_transcript_falls_through_to_segments() {
    let input = lines(&[
        "hello darkness my old friend",
        "ive come to talk with you again",
        "zebra quantum xylophone marmalade",
        "purple monkey dishwasher fortnight",
    ]);
    let words = transcript("hello darkness my old friend ive come to talk with you again", 12.0);
    let feats = features(vec![VocalSegment::new(10.0, 50.0)], vec![], 60.0);
    let outcome = orchestrator()
        .synchronize(&SyncInputs {
            lines: &input,
            features: Some(&feats),
            transcript: Some(&words),
            duration: Some(60.0),
            ..SyncInputs::default()
        })
        .unwrap();

    assert_eq!(outcome.strategy, Strategy::AudioFeature);
    assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Rejected { .. }));
    assert!((outcome.coverage(SyncMethod::SegmentPlaced) - 1.0).abs() < f64::EPSILON);
    assert_guarantees(&input, &outcome.lines, 60.0);
}

#[test]
fn no_segments_no_beats_uses_fallback_segment() {
    let duration = 100.0;
    let silence = vec![false; 400];
    let segments = VocalSegmentDetector::new(1.0).detect(&silence, 0.25, duration);
    assert_eq!(segments, vec![VocalSegment::new(10.0, 90.0)]);

    let input = numbered(6);
    let feats = features(segments, vec![], duration);
    let outcome = orchestrator()
        .synchronize(&SyncInputs {
            lines: &input,
            features: Some(&feats),
            duration: Some(duration),
            ..SyncInputs::default()
        })
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::AudioFeature);
    assert_guarantees(&input, &outcome.lines, duration);
    assert!(outcome.lines.iter().all(|l| l.start >= 10.0 && l.end <= 90.0));
}

#[test]
fn transcript_cursor_never_moves_backwards() {
    let input = lines(&["row row row your boat", "gently down the stream", "row row row your boat", "merrily merrily merrily"]);
    let words = transcript(
        "row row row your boat gently down the stream row row row your boat merrily merrily merrily",
        0.0,
    );
    let alignment = TranscriptAligner::new(&SyncConfig::default()).align(&input, &words).unwrap();
    let spans: Vec<_> = alignment.spans.iter().flatten().collect();
    assert_eq!(spans.len(), 4);
    for pair in spans.windows(2) {
        assert!(pair[1].start >= pair[0].end, "{:?} then {:?}", pair[0], pair[1]);
    }
}

#[test]
fn detector_is_idempotent() {
    let pattern: Vec<bool> = (0..500).map(|i| (i / 17) % 3 != 0).collect();
    let detector = VocalSegmentDetector::new(1.0);
    let first = detector.detect(&pattern, 0.05, 25.0);
    let second = detector.detect(&pattern, 0.05, 25.0);
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0].end <= w[1].start));
}
