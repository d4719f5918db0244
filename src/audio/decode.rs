//! Audio file decoding.
//!
//! Decodes with `rodio` and downmixes to mono. The duration comes from the
//! container metadata via `lofty`, falling back to the decoded sample count.

use lofty::file::AudioFile;
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// A decoded mono signal.
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    /// Mono samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    /// Samples per second.
    pub sample_rate: u32,
    /// Track duration in seconds, when it could be determined.
    pub duration: Option<f64>,
}

impl DecodedAudio {
    /// Wrap an already-decoded mono signal, deriving the duration from it.
    #[must_use]
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration = sample_duration(samples.len(), sample_rate);
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Whether any samples were decoded.
    #[must_use]
    pub fn has_samples(&self) -> bool {
        !self.samples.is_empty() && self.sample_rate > 0
    }
}

/// Decode an audio file to mono samples.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Audio(format!("cannot decode '{}': {e}", path.display())))?;

    let channels = usize::from(source.channels().max(1));
    let sample_rate = source.sample_rate();
    let interleaved: Vec<f32> = source.convert_samples::<f32>().collect();
    let samples = downmix(&interleaved, channels);

    let duration = probe_duration(path).or_else(|| sample_duration(samples.len(), sample_rate));
    tracing::debug!(
        "Decoded {} ({} ch, {} Hz, {} samples, duration {:?})",
        path.display(),
        channels,
        sample_rate,
        samples.len(),
        duration
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        duration,
    })
}

/// Read the container duration without decoding.
pub fn probe_duration(path: &Path) -> Option<f64> {
    match lofty::read_from_path(path) {
        Ok(tagged) => {
            let d = tagged.properties().duration();
            (d > Duration::ZERO).then(|| d.as_secs_f64())
        }
        Err(e) => {
            tracing::debug!("No container duration for {}: {e}", path.display());
            None
        }
    }
}

fn sample_duration(len: usize, sample_rate: u32) -> Option<f64> {
    (len > 0 && sample_rate > 0).then(|| len as f64 / f64::from(sample_rate))
}

/// Average interleaved channels into one.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
