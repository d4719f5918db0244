//! `lyricsync` - line-level lyric to audio synchronization.
//!
//! Aligns lyric lines to a recording using a word transcript when one is
//! available, detected vocal segments and beats when not, and syllable
//! counts as a last resort. Every line always gets an in-bounds,
//! non-overlapping timing.

pub mod audio;
pub mod config;
pub mod constants;
pub mod error;
pub mod lyrics;
pub mod overrides;
pub mod sync;
pub mod transcript;
pub mod types;

pub use error::{Error, Result};
pub use sync::{SyncOutcome, SyncRequest, Synchronizer};
pub use types::{Strategy, SyncMethod, SyncedLine, TranscriptWord, VocalSegment};
