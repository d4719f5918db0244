//! Dump per-frame audio features as CSV for analysis.
//!
//! Usage: cargo run --bin dump_features -- <audio file> [--hop 512]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use lyricsync::audio::{decode_file, FeatureExtractor, SpectralAnalyzer};
use lyricsync::config::SyncConfig;

fn main() -> anyhow::Result<()> {
    let path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: dump_features <audio file> [--hop N]")?;
    let hop: usize = std::env::args()
        .position(|a| a == "--hop")
        .and_then(|i| std::env::args().nth(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(512);

    let config = SyncConfig {
        hop_len: hop,
        ..SyncConfig::default()
    };
    config.validate()?;

    let audio = decode_file(&path)?;
    let extractor = FeatureExtractor::new(
        Arc::new(SpectralAnalyzer::new(config.frame_len, config.hop_len)),
        config,
    );
    let features = extractor.try_extract(&audio.samples, audio.sample_rate)?;

    eprintln!(
        "# {} | {:.2}s | {:.1} BPM | {} beats | {} segments",
        path.display(),
        features.duration,
        features.tempo_bpm,
        features.beat_times.len(),
        features.vocal_segments.len()
    );

    println!("time,energy,centroid,zcr,vocal");
    for i in 0..features.frame_count() {
        println!(
            "{:.4},{:.6},{:.1},{:.4},{}",
            features.frame_time(i),
            features.energy_profile[i],
            features.spectral_centroid[i],
            features.zero_crossing_rate[i],
            u8::from(features.vocal_activity[i]),
        );
    }
    Ok(())
}
