//! Windowed fuzzy alignment of lyric lines against a word transcript.
//!
//! Lines are matched in order against a monotonic cursor into the
//! transcript. Each line searches a bounded window ahead of the cursor for
//! the contiguous word span whose joined tokens best resemble the line.

use std::ops::Range;

use crate::config::SyncConfig;
use crate::constants::alignment::{
    FALLBACK_MIN_DURATION, FALLBACK_SECONDS_PER_CHAR, LENGTH_WEIGHT, MAX_SPAN_FACTOR, TEXT_WEIGHT,
};
use crate::lyrics::tokenize;
use crate::types::{SyncMethod, SyncedLine, TranscriptWord};

/// Result of aligning every line against a transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptAlignment {
    /// One timed line per input line, in input order.
    pub lines: Vec<SyncedLine>,
    /// Transcript word range matched by each line, if any.
    pub spans: Vec<Option<Range<usize>>>,
}

impl TranscriptAlignment {
    /// Number of lines matched against the transcript.
    pub fn matched(&self) -> usize {
        self.spans.iter().filter(|s| s.is_some()).count()
    }

    /// Fraction of lines matched against the transcript.
    pub fn coverage(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.matched() as f64 / self.lines.len() as f64
    }
}

/// Best candidate span found for one line.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    span: Range<usize>,
    score: f64,
}

/// Per-word tokens, precomputed once per transcript.
struct WordTokens {
    joined: String,
    count: usize,
}

/// Matches lyric lines to transcript words.
#[derive(Debug, Clone)]
pub struct TranscriptAligner {
    match_threshold: f64,
    search_window: usize,
    unmatched_gap: f64,
    unmatched_confidence: f64,
}

impl TranscriptAligner {
    /// Create an aligner from the engine configuration.
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            match_threshold: config.match_threshold,
            search_window: config.search_window,
            unmatched_gap: config.unmatched_gap,
            unmatched_confidence: config.unmatched_confidence,
        }
    }

    /// Align `lines` against `words`.
    ///
    /// Returns `None` when there is nothing to align against. Unmatched lines
    /// are chained after their predecessor with [`SyncMethod::Heuristic`].
    pub fn align(&self, lines: &[String], words: &[TranscriptWord]) -> Option<TranscriptAlignment> {
        if lines.is_empty() || words.is_empty() {
            return None;
        }

        let tokens: Vec<WordTokens> = words
            .iter()
            .map(|w| {
                let t = tokenize(&w.text);
                WordTokens {
                    count: t.len(),
                    joined: t.join(" "),
                }
            })
            .collect();

        let mut cursor = 0usize;
        let mut prev_end = 0.0_f64;
        let mut out = Vec::with_capacity(lines.len());
        let mut spans = Vec::with_capacity(lines.len());

        for line in lines {
            let target = tokenize(line);
            let found = self.best_candidate(&target, &tokens, cursor);

            let synced = match &found {
                Some(c) => {
                    let start = words[c.span.start].start;
                    let end = words[c.span.end - 1].end.max(start);
                    tracing::debug!("Matched {line:?} to words {:?} (score {:.3})", c.span, c.score);
                    cursor = c.span.end;
                    SyncedLine::new(line.as_str(), start, end, c.score.clamp(0.0, 1.0), SyncMethod::Transcript)
                }
                None => {
                    tracing::debug!("No transcript match for {line:?}");
                    let start = prev_end + self.unmatched_gap;
                    let duration = FALLBACK_MIN_DURATION.max(FALLBACK_SECONDS_PER_CHAR * line.chars().count() as f64);
                    SyncedLine::new(line.as_str(), start, start + duration, self.unmatched_confidence, SyncMethod::Heuristic)
                }
            };

            prev_end = synced.end;
            spans.push(found.map(|c| c.span));
            out.push(synced);
        }

        Some(TranscriptAlignment { lines: out, spans })
    }

    /// Search the window after `cursor` for the best span above threshold.
    fn best_candidate(&self, target: &[String], tokens: &[WordTokens], cursor: usize) -> Option<Candidate> {
        if target.is_empty() || cursor >= tokens.len() {
            return None;
        }

        let joined_target: Vec<char> = target.join(" ").chars().collect();
        let target_len = target.len();
        let max_span = MAX_SPAN_FACTOR * target_len;
        let window_end = (cursor + self.search_window).min(tokens.len());

        let mut best: Option<Candidate> = None;
        for start in cursor..window_end {
            let mut joined = String::new();
            let mut count = 0usize;

            for end in start + 1..=(start + max_span).min(window_end) {
                let word = &tokens[end - 1];
                if word.count > 0 {
                    if !joined.is_empty() {
                        joined.push(' ');
                    }
                    joined.push_str(&word.joined);
                    count += word.count;
                }
                if count == 0 {
                    continue;
                }

                let length_term = length_similarity(target_len, count);
                let candidate_chars = joined.chars().count();
                let bound = TEXT_WEIGHT * ratio_bound(joined_target.len(), candidate_chars) + LENGTH_WEIGHT * length_term;
                let best_score = best.as_ref().map_or(f64::NEG_INFINITY, |b| b.score);
                if bound <= best_score {
                    continue;
                }

                let candidate: Vec<char> = joined.chars().collect();
                let score = TEXT_WEIGHT * similarity(&joined_target, &candidate) + LENGTH_WEIGHT * length_term;
                if score > best_score {
                    best = Some(Candidate { span: start..end, score });
                }
            }
        }

        best.filter(|c| c.score > self.match_threshold)
    }
}

/// `1 - |a - b| / max(a, b)`, the token-count agreement of two spans.
fn length_similarity(a: usize, b: usize) -> f64 {
    let max = a.max(b);
    if max == 0 {
        return 1.0;
    }
    1.0 - a.abs_diff(b) as f64 / max as f64
}

/// Upper bound of [`similarity`] given only the two lengths.
fn ratio_bound(a: usize, b: usize) -> f64 {
    if a + b == 0 {
        return 1.0;
    }
    2.0 * a.min(b) as f64 / (a + b) as f64
}

/// Normalized similarity `2 * LCS / (|a| + |b|)` over characters.
pub fn similarity(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    2.0 * lcs_len(a, b) as f64 / (a.len() + b.len()) as f64
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb { prev[j] + 1 } else { prev[j + 1].max(cur[j]) };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
