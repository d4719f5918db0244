//! Lyric text processing.
//!
//! Turns raw lyric text into display lines and provides the token and
//! syllable measures used by the alignment and heuristic strategies.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::heuristic::{CLAUSE_PAUSE, PLAIN_PAUSE, SENTENCE_PAUSE};

/// Regex matching a line that is only a bracketed tag, e.g. `[Chorus]` or `(x2)`.
#[allow(clippy::expect_used)]
static RE_BRACKET_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\[[^\]]*\]|\([^)]*\))\s*$").expect("valid regex: RE_BRACKET_TAG")
});

/// Regex matching a bare section label such as `Chorus:` or `Verse 2`.
#[allow(clippy::expect_used)]
static RE_SECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(verse|chorus|pre-chorus|prechorus|bridge|intro|outro|hook|refrain|interlude)(\s*\d+)?\s*:?\s*$")
        .expect("valid regex: RE_SECTION_LABEL")
});

/// Regex matching anything that is neither a word character nor whitespace.
#[allow(clippy::expect_used)]
static RE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex: RE_PUNCTUATION"));

/// Regex matching parenthesized or bracketed qualifiers in titles.
#[allow(clippy::expect_used)]
static RE_TITLE_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid regex: RE_TITLE_QUALIFIER")
});

/// Regex matching `- Remastered 2011` style title suffixes.
#[allow(clippy::expect_used)]
static RE_TITLE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+-\s+.*\b(remaster(ed)?|live|version|edit|mix|mono|stereo)\b.*$")
        .expect("valid regex: RE_TITLE_SUFFIX")
});

/// Regex matching trailing featured-artist credits.
#[allow(clippy::expect_used)]
static RE_TITLE_FEAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(feat\.?|ft\.?|featuring)\s+.*$").expect("valid regex: RE_TITLE_FEAT")
});

/// Regex collapsing whitespace runs.
#[allow(clippy::expect_used)]
static RE_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex: RE_SPACES"));

/// Split raw lyric text into display lines.
///
/// Blank lines and section markers (`[Chorus]`, `Verse 2:`) are dropped.
pub fn prepare_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !RE_BRACKET_TAG.is_match(line) && !RE_SECTION_LABEL.is_match(line))
        .map(String::from)
        .collect()
}

/// Tokenize text for transcript matching.
///
/// Lowercases, strips punctuation and drops single-character tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    RE_PUNCTUATION
        .replace_all(&lower, "")
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(String::from)
        .collect()
}

/// Normalize a track title for override lookup.
pub fn normalize_title(title: &str) -> String {
    let s = RE_TITLE_QUALIFIER.replace_all(title, " ");
    let s = RE_TITLE_FEAT.replace(&s, "");
    let s = RE_TITLE_SUFFIX.replace(&s, "");
    let s = RE_PUNCTUATION.replace_all(&s, "");
    RE_SPACES.replace_all(&s, " ").trim().to_lowercase()
}

const fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Estimate the syllables in a single word.
///
/// Counts consonant-to-vowel transitions, then discounts a silent trailing
/// `e` and silent `-ed`/`-es` endings. Never returns less than one.
pub fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 1;
    }

    let mut count = 0usize;
    let mut prev_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }

    let n = letters.len();
    let before = |back: usize| (n > back).then(|| letters[n - 1 - back]);
    let ends_with = |suffix: &str| {
        n >= suffix.len() && letters[n - suffix.len()..].iter().copied().eq(suffix.chars())
    };

    if count > 1 {
        if ends_with("ed") {
            // "-ted" and "-ded" keep their syllable
            if !matches!(before(2), Some('t' | 'd')) {
                count -= 1;
            }
        } else if ends_with("es") {
            let sibilant = matches!(before(2), Some('s' | 'x' | 'z' | 'c' | 'g'))
                || ends_with("ches")
                || ends_with("shes");
            if !sibilant {
                count -= 1;
            }
        } else if ends_with("e") && !ends_with("le") && !ends_with("ee") {
            count -= 1;
        }
    }

    count.max(1)
}

/// Estimate the syllables in a lyric line (at least one).
pub fn line_syllables(line: &str) -> usize {
    line.split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
        .map(count_syllables)
        .sum::<usize>()
        .max(1)
}

/// Pause multiplier implied by a line's trailing punctuation.
pub fn pause_multiplier(line: &str) -> f64 {
    match line.trim_end().chars().last() {
        Some('.' | '!' | '?') => SENTENCE_PAUSE,
        Some(',' | ';' | ':') => CLAUSE_PAUSE,
        _ => PLAIN_PAUSE,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_prepare_lines_drops_markers() {
        let text = "[Verse 1]\nHello darkness, my old friend\n\n  Chorus:\nI've come to talk\n(x2)\n";
        let lines = prepare_lines(text);
        assert_eq!(lines, vec!["Hello darkness, my old friend", "I've come to talk"]);
    }

    #[test]
    fn test_prepare_lines_keeps_parenthetical_lyrics() {
        let lines = prepare_lines("Shout (shout) let it all out");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("I can't stop, a Feeling!"),
            vec!["cant", "stop", "feeling"]
        );
        assert!(tokenize("I a").is_empty());
    }

    #[test]
    fn test_count_syllables() {
        assert_eq!(count_syllables("hi"), 1);
        assert_eq!(count_syllables("line"), 1);
        assert_eq!(count_syllables("longer"), 2);
        assert_eq!(count_syllables("lyrics"), 2);
        assert_eq!(count_syllables("jumped"), 1);
        assert_eq!(count_syllables("wanted"), 2);
        assert_eq!(count_syllables("makes"), 1);
        assert_eq!(count_syllables("boxes"), 2);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("123"), 1);
    }

    #[test]
    fn test_line_syllables() {
        assert_eq!(line_syllables("Hi"), 1);
        assert_eq!(line_syllables("This is a longer line of lyrics"), 9);
        assert_eq!(line_syllables("..."), 1);
    }

    #[test]
    fn test_pause_multiplier() {
        assert!((pause_multiplier("The end.") - SENTENCE_PAUSE).abs() < f64::EPSILON);
        assert!((pause_multiplier("and then,") - CLAUSE_PAUSE).abs() < f64::EPSILON);
        assert!((pause_multiplier("no stop") - PLAIN_PAUSE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Bohemian Rhapsody - Remastered 2011"), "bohemian rhapsody");
        assert_eq!(normalize_title("Stay (feat. Justin Bieber)"), "stay");
        assert_eq!(normalize_title("Señorita [Live]"), "señorita");
        assert_eq!(normalize_title("Don't Stop Me Now ft. Nobody"), "dont stop me now");
    }
}
