//! Strategy selection.
//!
//! [`SynchronizationOrchestrator`] walks a fixed plan of strategies, from the
//! most precise to the least, and validates the first acceptable result.
//! The plan is built once from the capabilities available at construction.

use serde::Serialize;

use super::heuristic::HeuristicTimingEstimator;
use super::placer::SegmentTimingPlacer;
use super::validate::TimingValidator;
use crate::audio::AudioFeatures;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::transcript::TranscriptAligner;
use crate::types::{Strategy, SyncMethod, SyncedLine, TranscriptWord};

/// Which optional collaborators are wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// A transcription service is configured.
    pub transcription: bool,
    /// A signal analyzer is configured.
    pub signal_analysis: bool,
}

impl Capabilities {
    /// Every collaborator present.
    pub const fn all() -> Self {
        Self {
            transcription: true,
            signal_analysis: true,
        }
    }

    /// The ordered strategies these capabilities allow.
    ///
    /// The heuristic needs nothing and always closes the plan.
    pub fn plan(self) -> Vec<Strategy> {
        Strategy::all()
            .iter()
            .copied()
            .filter(|s| match s {
                Strategy::Transcript => self.transcription,
                Strategy::AudioFeature => self.signal_analysis,
                Strategy::Heuristic => true,
            })
            .collect()
    }
}

/// Everything one synchronization call reads. All of it is borrowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncInputs<'a> {
    /// Lyric lines in display order.
    pub lines: &'a [String],
    /// Extracted audio features, if extraction succeeded.
    pub features: Option<&'a AudioFeatures>,
    /// Word-level transcript, if one was obtained.
    pub transcript: Option<&'a [TranscriptWord]>,
    /// Track duration in seconds, if known.
    pub duration: Option<f64>,
    /// Duration floor applied when the duration is unknown.
    pub duration_floor: Option<f64>,
    /// Time of the first sung line, if known.
    pub lead_in: Option<f64>,
}

/// How a strategy fared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum AttemptOutcome {
    /// The strategy produced the final timing.
    Accepted,
    /// The strategy's inputs were missing.
    Unavailable,
    /// The strategy ran but matched too few lines.
    Rejected {
        /// Fraction of lines the strategy matched.
        coverage: f64,
    },
}

/// One step of the strategy plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyAttempt {
    /// The strategy tried.
    pub strategy: Strategy,
    /// What happened.
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Result of a synchronization call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    /// One validated line per non-empty input line, in input order.
    pub lines: Vec<SyncedLine>,
    /// The strategy that produced the timing.
    pub strategy: Strategy,
    /// Duration used for bounds, in seconds.
    pub duration: f64,
    /// Whether the duration had to be substituted.
    pub degraded: bool,
    /// Every strategy tried, in order.
    pub attempts: Vec<StrategyAttempt>,
}

impl SyncOutcome {
    /// Average line confidence.
    pub fn mean_confidence(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.lines.iter().map(|l| l.confidence).sum::<f64>() / self.lines.len() as f64
    }

    /// Fraction of lines timed by `method`.
    pub fn coverage(&self, method: SyncMethod) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.lines.iter().filter(|l| l.method == method).count() as f64 / self.lines.len() as f64
    }
}

enum SyncState {
    TryTranscript,
    TryAudioFeatures,
    TryHeuristic,
    Validated {
        strategy: Strategy,
        lines: Vec<SyncedLine>,
    },
}

/// Runs the strategy plan and validates the winner.
#[derive(Debug, Clone)]
pub struct SynchronizationOrchestrator {
    config: SyncConfig,
    plan: Vec<Strategy>,
    aligner: TranscriptAligner,
    placer: SegmentTimingPlacer,
    heuristic: HeuristicTimingEstimator,
    validator: TimingValidator,
}

impl SynchronizationOrchestrator {
    /// Create an orchestrator for the given capabilities.
    pub fn new(config: SyncConfig, capabilities: Capabilities) -> Self {
        let plan = capabilities.plan();
        tracing::debug!("Strategy plan: {:?}", plan);
        Self {
            aligner: TranscriptAligner::new(&config),
            placer: SegmentTimingPlacer::new(),
            heuristic: HeuristicTimingEstimator::new(&config),
            validator: TimingValidator::new(&config),
            config,
            plan,
        }
    }

    /// The strategies this orchestrator will try, in order.
    pub fn plan(&self) -> &[Strategy] {
        &self.plan
    }

    /// The engine configuration.
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronize lines to audio.
    ///
    /// Fails only with [`Error::EmptyInput`]; every other problem degrades
    /// the result instead.
    pub fn synchronize(&self, inputs: &SyncInputs<'_>) -> Result<SyncOutcome> {
        let lines: Vec<String> = inputs
            .lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .cloned()
            .collect();
        if lines.is_empty() {
            return Err(Error::EmptyInput);
        }

        let (duration, degraded) = self.resolve_duration(inputs);
        let mut attempts = Vec::new();
        let mut state = SyncState::TryTranscript;

        let (strategy, timed) = loop {
            state = match state {
                SyncState::TryTranscript => self.try_transcript(&lines, inputs, &mut attempts),
                SyncState::TryAudioFeatures => self.try_audio_features(&lines, inputs, &mut attempts),
                SyncState::TryHeuristic => {
                    let timed = self.heuristic.estimate(&lines, duration, inputs.lead_in);
                    attempts.push(StrategyAttempt {
                        strategy: Strategy::Heuristic,
                        outcome: AttemptOutcome::Accepted,
                    });
                    SyncState::Validated {
                        strategy: Strategy::Heuristic,
                        lines: timed,
                    }
                }
                SyncState::Validated { strategy, lines } => break (strategy, lines),
            };
        };

        let lines = self.validator.validate(timed, duration);
        let outcome = SyncOutcome {
            lines,
            strategy,
            duration,
            degraded,
            attempts,
        };
        tracing::info!(
            "Synchronized {} lines with {} strategy (mean confidence {:.2}{})",
            outcome.lines.len(),
            strategy,
            outcome.mean_confidence(),
            if degraded { ", degraded duration" } else { "" }
        );
        Ok(outcome)
    }

    fn planned(&self, strategy: Strategy) -> bool {
        self.plan.contains(&strategy)
    }

    fn try_transcript(&self, lines: &[String], inputs: &SyncInputs<'_>, attempts: &mut Vec<StrategyAttempt>) -> SyncState {
        if !self.planned(Strategy::Transcript) {
            return SyncState::TryAudioFeatures;
        }
        let alignment = inputs
            .transcript
            .and_then(|words| self.aligner.align(lines, words));
        let Some(alignment) = alignment else {
            attempts.push(StrategyAttempt {
                strategy: Strategy::Transcript,
                outcome: AttemptOutcome::Unavailable,
            });
            return SyncState::TryAudioFeatures;
        };

        let coverage = alignment.coverage();
        if coverage >= self.config.transcript_acceptance {
            attempts.push(StrategyAttempt {
                strategy: Strategy::Transcript,
                outcome: AttemptOutcome::Accepted,
            });
            return SyncState::Validated {
                strategy: Strategy::Transcript,
                lines: alignment.lines,
            };
        }

        tracing::warn!(
            "Transcript matched {:.0}% of lines, below the {:.0}% needed; trying audio features",
            coverage * 100.0,
            self.config.transcript_acceptance * 100.0
        );
        attempts.push(StrategyAttempt {
            strategy: Strategy::Transcript,
            outcome: AttemptOutcome::Rejected { coverage },
        });
        SyncState::TryAudioFeatures
    }

    fn try_audio_features(&self, lines: &[String], inputs: &SyncInputs<'_>, attempts: &mut Vec<StrategyAttempt>) -> SyncState {
        if !self.planned(Strategy::AudioFeature) {
            return SyncState::TryHeuristic;
        }
        let placed = inputs
            .features
            .and_then(|f| self.placer.place(lines, &f.vocal_segments, &f.beat_times));
        match placed {
            Some(timed) => {
                attempts.push(StrategyAttempt {
                    strategy: Strategy::AudioFeature,
                    outcome: AttemptOutcome::Accepted,
                });
                SyncState::Validated {
                    strategy: Strategy::AudioFeature,
                    lines: timed,
                }
            }
            None => {
                attempts.push(StrategyAttempt {
                    strategy: Strategy::AudioFeature,
                    outcome: AttemptOutcome::Unavailable,
                });
                SyncState::TryHeuristic
            }
        }
    }

    /// Pick the bounds duration, substituting a default when unknown.
    fn resolve_duration(&self, inputs: &SyncInputs<'_>) -> (f64, bool) {
        let known = inputs
            .duration
            .or_else(|| inputs.features.map(|f| f.duration))
            .filter(|d| d.is_finite() && *d > 0.0);
        if let Some(d) = known {
            return (d, false);
        }
        let fallback = inputs
            .duration_floor
            .filter(|d| d.is_finite() && *d > 0.0)
            .map_or(self.config.default_duration, |floor| floor.max(self.config.default_duration));
        tracing::warn!("{}; assuming {fallback:.0}s", Error::DurationUnknown);
        (fallback, true)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::types::VocalSegment;

    fn orchestrator() -> SynchronizationOrchestrator {
        SynchronizationOrchestrator::new(SyncConfig::default(), Capabilities::all())
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn transcript(text: &str) -> Vec<TranscriptWord> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| TranscriptWord::new(w, 10.0 + i as f64 * 0.5, 10.4 + i as f64 * 0.5))
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

    #[test]
    fn test_plan_follows_capabilities() {
        assert_eq!(Capabilities::all().plan(), Strategy::all());
        assert_eq!(Capabilities::default().plan(), vec![Strategy::Heuristic]);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let input = lines(&["", "   "]);
        let result = orchestrator().synchronize(&SyncInputs {
            lines: &input,
            duration: Some(60.0),
            ..SyncInputs::default()
        });
        assert!(matches!(result, Err(Error::EmptyInput)));
    }

    #[test]
    fn test_transcript_wins_when_it_covers_enough() {
        let input = lines(&["hello darkness my old friend", "ive come to talk with you again"]);
        let words = transcript("hello darkness my old friend ive come to talk with you again");
        let outcome = orchestrator()
            .synchronize(&SyncInputs {
                lines: &input,
                transcript: Some(&words),
                duration: Some(120.0),
                ..SyncInputs::default()
            })
            .unwrap();
        assert_eq!(outcome.strategy, Strategy::Transcript);
        assert!((outcome.coverage(SyncMethod::Transcript) - 1.0).abs() < f64::EPSILON);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[test]
    fn test_half_covered_transcript_falls_through() {
        let input = lines(&[
            "hello darkness my old friend",
            "ive come to talk with you again",
            "zebra quantum xylophone marmalade",
            "purple monkey dishwasher fortnight",
        ]);
        let words = transcript("hello darkness my old friend ive come to talk with you again");
        let feats = features(vec![VocalSegment::new(10.0, 50.0)], vec![], 60.0);
        let outcome = orchestrator()
            .synchronize(&SyncInputs {
                lines: &input,
                transcript: Some(&words),
                features: Some(&feats),
                duration: Some(60.0),
                ..SyncInputs::default()
            })
            .unwrap();

        assert_eq!(outcome.strategy, Strategy::AudioFeature);
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Rejected { coverage } if (coverage - 0.5).abs() < f64::EPSILON
        ));
        assert!(outcome.lines.iter().all(|l| l.method == SyncMethod::SegmentPlaced));
    }

    #[test]
    fn test_heuristic_when_nothing_else() {
        let input = lines(&["one", "two", "three"]);
        let outcome = orchestrator()
            .synchronize(&SyncInputs {
                lines: &input,
                duration: Some(90.0),
                lead_in: Some(8.0),
                ..SyncInputs::default()
            })
            .unwrap();
        assert_eq!(outcome.strategy, Strategy::Heuristic);
        assert!((outcome.lines[0].start - 8.0).abs() < f64::EPSILON);
        assert_eq!(outcome.attempts.len(), 3);
        assert!(!outcome.degraded);
    }

    #[test]
    fn test_unknown_duration_is_degraded() {
        let input = lines(&["only line"]);
        let outcome = orchestrator()
            .synchronize(&SyncInputs {
                lines: &input,
                ..SyncInputs::default()
            })
            .unwrap();
        assert!(outcome.degraded);
        assert!((outcome.duration - 180.0).abs() < f64::EPSILON);

        let outcome = orchestrator()
            .synchronize(&SyncInputs {
                lines: &input,
                duration_floor: Some(300.0),
                ..SyncInputs::default()
            })
            .unwrap();
        assert!((outcome.duration - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = lines(&["first", "", "second"]);
        let outcome = orchestrator()
            .synchronize(&SyncInputs {
                lines: &input,
                duration: Some(60.0),
                ..SyncInputs::default()
            })
            .unwrap();
        let texts: Vec<_> = outcome.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_outcome_serializes_attempts() {
        let attempt = StrategyAttempt {
            strategy: Strategy::Transcript,
            outcome: AttemptOutcome::Rejected { coverage: 0.5 },
        };
        let json = serde_json::to_value(attempt).unwrap();
        assert_eq!(json["strategy"], "transcript");
        assert_eq!(json["result"], "rejected");
        assert_eq!(json["coverage"], 0.5);
    }
}
