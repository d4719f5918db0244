//! Signal-processing capability.
//!
//! [`SignalAnalyzer`] is the seam between the synchronization core and the DSP
//! primitives it needs. [`SpectralAnalyzer`] is the built-in implementation:
//! framewise RMS, a Hann-windowed magnitude spectrum, spectral-flux onsets,
//! autocorrelation tempo and dynamic-programming beat tracking.

use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::constants::analysis::{
    BEAT_TIGHTNESS, MAX_TEMPO_BPM, MIN_TEMPO_BPM, ONSET_AVG_WINDOW, ONSET_DELTA, ONSET_PRE_MAX,
    ONSET_WAIT, PRIOR_TEMPO_BPM, PRIOR_TEMPO_OCTAVES,
};
use crate::error::{Error, Result};

/// DSP primitives consumed by feature extraction.
///
/// Implementations must be usable from a blocking worker thread.
pub trait SignalAnalyzer: Send + Sync {
    /// Estimate the tempo in BPM and the beat positions in seconds.
    ///
    /// A signal without periodicity yields a tempo of zero and no beats.
    fn detect_tempo_and_beats(&self, samples: &[f32], sample_rate: u32) -> Result<(f64, Vec<f64>)>;

    /// Detect onset positions in seconds, strictly increasing.
    fn detect_onsets(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f64>>;

    /// RMS energy per frame.
    fn frame_energy(&self, samples: &[f32], sample_rate: u32, frame_len: usize, hop_len: usize) -> Result<Vec<f64>>;

    /// Spectral centroid in Hz per frame.
    fn spectral_centroid(&self, samples: &[f32], sample_rate: u32, frame_len: usize, hop_len: usize) -> Result<Vec<f64>>;

    /// Fraction of sign changes per frame.
    fn zero_crossing_rate(&self, samples: &[f32], frame_len: usize, hop_len: usize) -> Result<Vec<f64>>;

    /// Get the name of this analyzer (for debugging/logging).
    fn name(&self) -> &'static str;

    /// Run every primitive over one signal.
    ///
    /// The per-frame series use `frame_len`/`hop_len`. Implementations that
    /// can share intermediate results between primitives should override this.
    fn analyze(&self, samples: &[f32], sample_rate: u32, frame_len: usize, hop_len: usize) -> Result<SignalAnalysis> {
        let (tempo_bpm, beats) = self.detect_tempo_and_beats(samples, sample_rate)?;
        Ok(SignalAnalysis {
            tempo_bpm,
            beats,
            onsets: self.detect_onsets(samples, sample_rate)?,
            energy: self.frame_energy(samples, sample_rate, frame_len, hop_len)?,
            centroid: self.spectral_centroid(samples, sample_rate, frame_len, hop_len)?,
            zcr: self.zero_crossing_rate(samples, frame_len, hop_len)?,
        })
    }
}

/// Output of [`SignalAnalyzer::analyze`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalAnalysis {
    /// Tempo in BPM, zero without periodicity.
    pub tempo_bpm: f64,
    /// Beat positions in seconds.
    pub beats: Vec<f64>,
    /// Onset positions in seconds.
    pub onsets: Vec<f64>,
    /// RMS energy per frame.
    pub energy: Vec<f64>,
    /// Spectral centroid in Hz per frame.
    pub centroid: Vec<f64>,
    /// Zero-crossing rate per frame.
    pub zcr: Vec<f64>,
}

/// FFT-based analyzer built on `rustfft`.
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer {
    /// Frame length used for onset and beat analysis.
    pub frame_len: usize,
    /// Hop size used for onset and beat analysis.
    pub hop_len: usize,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self {
            frame_len: 2048,
            hop_len: 512,
        }
    }
}

impl SpectralAnalyzer {
    /// Create an analyzer with the given onset/beat framing.
    #[must_use]
    pub const fn new(frame_len: usize, hop_len: usize) -> Self {
        Self { frame_len, hop_len }
    }

    fn frames_per_second(&self, sample_rate: u32) -> f64 {
        f64::from(sample_rate) / self.hop_len as f64
    }

    /// Spectral-flux onset strength per frame.
    fn onset_strength(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f64>> {
        check_input(samples, sample_rate, self.frame_len, self.hop_len)?;
        Ok(flux_envelope(&magnitude_spectrogram(samples, self.frame_len, self.hop_len)))
    }

    fn tempo_and_beats(&self, envelope: &[f64], sample_rate: u32) -> (f64, Vec<f64>) {
        let fps = self.frames_per_second(sample_rate);
        let Some(period) = estimate_period(envelope, fps) else {
            return (0.0, Vec::new());
        };

        let bpm = 60.0 * fps / period;
        let beats = track_beats(envelope, period)
            .into_iter()
            .map(|frame| frame as f64 / fps)
            .collect();
        (bpm, beats)
    }

    fn onsets(&self, envelope: &[f64], sample_rate: u32) -> Vec<f64> {
        let fps = self.frames_per_second(sample_rate);
        pick_peaks(envelope, fps)
            .into_iter()
            .map(|frame| frame as f64 / fps)
            .collect()
    }
}

impl SignalAnalyzer for SpectralAnalyzer {
    fn detect_tempo_and_beats(&self, samples: &[f32], sample_rate: u32) -> Result<(f64, Vec<f64>)> {
        let envelope = self.onset_strength(samples, sample_rate)?;
        Ok(self.tempo_and_beats(&envelope, sample_rate))
    }

    fn detect_onsets(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f64>> {
        let envelope = self.onset_strength(samples, sample_rate)?;
        Ok(self.onsets(&envelope, sample_rate))
    }

    fn frame_energy(&self, samples: &[f32], sample_rate: u32, frame_len: usize, hop_len: usize) -> Result<Vec<f64>> {
        check_input(samples, sample_rate, frame_len, hop_len)?;
        let n = frame_count(samples.len(), frame_len, hop_len);
        Ok((0..n)
            .into_par_iter()
            .map(|i| {
                let frame = &samples[i * hop_len..i * hop_len + frame_len];
                let sum_sq: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
                (sum_sq / frame_len as f64).sqrt()
            })
            .collect())
    }

    fn spectral_centroid(&self, samples: &[f32], sample_rate: u32, frame_len: usize, hop_len: usize) -> Result<Vec<f64>> {
        check_input(samples, sample_rate, frame_len, hop_len)?;
        let spectrum = magnitude_spectrogram(samples, frame_len, hop_len);
        Ok(centroids(&spectrum, sample_rate, frame_len))
    }

    fn zero_crossing_rate(&self, samples: &[f32], frame_len: usize, hop_len: usize) -> Result<Vec<f64>> {
        // Sample rate is irrelevant for crossings; any non-zero value passes the check.
        check_input(samples, 1, frame_len, hop_len)?;
        let n = frame_count(samples.len(), frame_len, hop_len);
        Ok((0..n)
            .into_par_iter()
            .map(|i| {
                let frame = &samples[i * hop_len..i * hop_len + frame_len];
                let crossings = frame
                    .windows(2)
                    .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                    .count();
                crossings as f64 / frame_len as f64
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "SpectralAnalyzer"
    }

    /// One STFT feeds onsets, tempo and beats; the centroid reuses it when
    /// the framings agree.
    fn analyze(&self, samples: &[f32], sample_rate: u32, frame_len: usize, hop_len: usize) -> Result<SignalAnalysis> {
        check_input(samples, sample_rate, self.frame_len, self.hop_len)?;
        check_input(samples, sample_rate, frame_len, hop_len)?;

        let spectrum = magnitude_spectrogram(samples, self.frame_len, self.hop_len);
        let envelope = flux_envelope(&spectrum);
        let (tempo_bpm, beats) = self.tempo_and_beats(&envelope, sample_rate);
        let onsets = self.onsets(&envelope, sample_rate);

        let centroid = if (frame_len, hop_len) == (self.frame_len, self.hop_len) {
            centroids(&spectrum, sample_rate, frame_len)
        } else {
            centroids(&magnitude_spectrogram(samples, frame_len, hop_len), sample_rate, frame_len)
        };

        Ok(SignalAnalysis {
            tempo_bpm,
            beats,
            onsets,
            energy: self.frame_energy(samples, sample_rate, frame_len, hop_len)?,
            centroid,
            zcr: self.zero_crossing_rate(samples, frame_len, hop_len)?,
        })
    }
}

fn check_input(samples: &[f32], sample_rate: u32, frame_len: usize, hop_len: usize) -> Result<()> {
    if samples.is_empty() {
        return Err(Error::FeatureExtractionUnavailable("empty signal".into()));
    }
    if sample_rate == 0 {
        return Err(Error::FeatureExtractionUnavailable("sample rate is zero".into()));
    }
    if frame_len == 0 || hop_len == 0 {
        return Err(Error::FeatureExtractionUnavailable("frame and hop must be positive".into()));
    }
    if samples.len() < frame_len {
        return Err(Error::FeatureExtractionUnavailable(format!(
            "signal of {} samples is shorter than one {frame_len}-sample frame",
            samples.len()
        )));
    }
    Ok(())
}

/// Number of whole frames; callers guarantee `len >= frame_len`.
const fn frame_count(len: usize, frame_len: usize, hop_len: usize) -> usize {
    1 + (len - frame_len) / hop_len
}

/// Periodic Hann window.
fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Magnitudes of bins `0..=frame_len/2` for every frame.
fn magnitude_spectrogram(samples: &[f32], frame_len: usize, hop_len: usize) -> Vec<Vec<f32>> {
    let fft = FftPlanner::<f32>::new().plan_fft_forward(frame_len);
    let window = hann(frame_len);
    let bins = frame_len / 2 + 1;
    let n = frame_count(samples.len(), frame_len, hop_len);

    (0..n)
        .into_par_iter()
        .map(|i| {
            let start = i * hop_len;
            let mut buf: Vec<Complex<f32>> = samples[start..start + frame_len]
                .iter()
                .zip(&window)
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            fft.process(&mut buf);
            buf[..bins].iter().map(|c| c.norm()).collect()
        })
        .collect()
}

/// Half-wave rectified log-magnitude flux between consecutive frames.
fn flux_envelope(spectrum: &[Vec<f32>]) -> Vec<f64> {
    let mut envelope = Vec::with_capacity(spectrum.len());
    envelope.push(0.0);
    for pair in spectrum.windows(2) {
        let flux: f64 = pair[1]
            .iter()
            .zip(&pair[0])
            .map(|(&cur, &prev)| (f64::from(cur).ln_1p() - f64::from(prev).ln_1p()).max(0.0))
            .sum();
        envelope.push(flux);
    }
    envelope
}

/// Magnitude-weighted mean frequency of each frame.
fn centroids(spectrum: &[Vec<f32>], sample_rate: u32, frame_len: usize) -> Vec<f64> {
    let bin_hz = f64::from(sample_rate) / frame_len as f64;
    spectrum
        .par_iter()
        .map(|mags| {
            let total: f64 = mags.iter().map(|&m| f64::from(m)).sum();
            if total <= f64::EPSILON {
                return 0.0;
            }
            let weighted: f64 = mags
                .iter()
                .enumerate()
                .map(|(k, &m)| k as f64 * bin_hz * f64::from(m))
                .sum();
            weighted / total
        })
        .collect()
}

/// Adaptive peak picking over an onset envelope; returns frame indices.
fn pick_peaks(envelope: &[f64], fps: f64) -> Vec<usize> {
    let peak = envelope.iter().copied().fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let env: Vec<f64> = envelope.iter().map(|v| v / peak).collect();
    let n = env.len();

    let pre_max = (ONSET_PRE_MAX * fps).ceil() as usize;
    let avg = (ONSET_AVG_WINDOW * fps).ceil() as usize;
    let wait = (ONSET_WAIT * fps).ceil() as usize;

    let mut onsets = Vec::new();
    let mut last: Option<usize> = None;
    for t in 0..n {
        let value = env[t];
        if value <= 0.0 {
            continue;
        }
        let local_max = env[t.saturating_sub(pre_max)..=t].iter().copied().fold(0.0_f64, f64::max);
        if value < local_max || (t + 1 < n && value < env[t + 1]) {
            continue;
        }
        let lo = t.saturating_sub(avg);
        let hi = (t + avg + 1).min(n);
        let mean = env[lo..hi].iter().sum::<f64>() / (hi - lo) as f64;
        if value < mean + ONSET_DELTA {
            continue;
        }
        if last.is_some_and(|l| t - l <= wait) {
            continue;
        }
        onsets.push(t);
        last = Some(t);
    }
    onsets
}

/// Beat period in frames from a prior-weighted autocorrelation of the envelope.
fn estimate_period(envelope: &[f64], fps: f64) -> Option<f64> {
    let n = envelope.len();
    let min_lag = ((60.0 * fps / MAX_TEMPO_BPM).floor() as usize).max(1);
    let max_lag = ((60.0 * fps / MIN_TEMPO_BPM).ceil() as usize).min(n.saturating_sub(2));
    if max_lag <= min_lag {
        return None;
    }

    let mean = envelope.iter().sum::<f64>() / n as f64;
    let centred: Vec<f64> = envelope.iter().map(|v| v - mean).collect();

    // Index 0 is lag min_lag - 1 so the interpolation below always has a left neighbour.
    let weighted: Vec<f64> = (min_lag - 1..=max_lag + 1)
        .map(|lag| {
            if lag == 0 || lag >= n {
                return 0.0;
            }
            let ac = centred[lag..]
                .iter()
                .zip(&centred)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / (n - lag) as f64;
            let bpm = 60.0 * fps / lag as f64;
            let octaves = (bpm / PRIOR_TEMPO_BPM).log2() / PRIOR_TEMPO_OCTAVES;
            ac * (-0.5 * octaves * octaves).exp()
        })
        .collect();

    let (best_idx, &best) = weighted[1..weighted.len() - 1]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, v)| (i + 1, v))?;
    if best <= 0.0 {
        return None;
    }

    let lag = (min_lag - 1 + best_idx) as f64;
    let (y0, y1, y2) = (weighted[best_idx - 1], best, weighted[best_idx + 1]);
    let denom = y0 - 2.0 * y1 + y2;
    let offset = if denom.abs() > f64::EPSILON {
        (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    Some(lag + offset)
}

/// Dynamic-programming beat tracker; returns increasing frame indices.
fn track_beats(envelope: &[f64], period: f64) -> Vec<usize> {
    let n = envelope.len();
    let mean = envelope.iter().sum::<f64>() / n.max(1) as f64;
    let std = (envelope.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n.max(1) as f64).sqrt();
    if n == 0 || std <= f64::EPSILON || period < 1.0 {
        return Vec::new();
    }
    let local: Vec<f64> = envelope.iter().map(|v| v / std).collect();

    let min_back = ((period / 2.0).round() as usize).max(1);
    let max_back = ((period * 2.0).round() as usize).max(min_back);

    let mut score = vec![0.0_f64; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];
    for t in 0..n {
        let mut best: Option<(usize, f64)> = None;
        if t >= min_back {
            for p in t.saturating_sub(max_back)..=t - min_back {
                let gap = (t - p) as f64 / period;
                let candidate = score[p] - BEAT_TIGHTNESS * gap.ln().powi(2);
                if best.is_none_or(|(_, b)| candidate > b) {
                    best = Some((p, candidate));
                }
            }
        }
        match best {
            Some((p, b)) if b > 0.0 => {
                score[t] = local[t] + b;
                backlink[t] = Some(p);
            }
            _ => score[t] = local[t],
        }
    }

    let tail = n.saturating_sub(period.ceil() as usize);
    let Some(last) = (tail..n).max_by(|&a, &b| score[a].total_cmp(&score[b])) else {
        return Vec::new();
    };

    let mut beats = vec![last];
    let mut cursor = last;
    while let Some(prev) = backlink[cursor] {
        beats.push(prev);
        cursor = prev;
    }
    beats.reverse();
    beats
}
