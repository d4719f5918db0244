//! `lyricsync` command-line tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lyricsync::audio::{decode_file, FeatureExtractor, SignalAnalyzer, SpectralAnalyzer};
use lyricsync::config::Config;
use lyricsync::lyrics::prepare_lines;
use lyricsync::overrides::{OverrideLookup, OverrideTable};
use lyricsync::transcript::{FileTranscriber, HttpTranscriber, Transcriber};
use lyricsync::{Error, SyncRequest, Synchronizer};

#[derive(Parser)]
#[command(name = "lyricsync", version, about = "Synchronize lyric lines to an audio recording")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Time every lyric line against the audio
    Sync {
        /// Audio file (wav, flac, ogg, mp3)
        #[arg(long)]
        audio: PathBuf,
        /// Lyrics text file, one line per display line
        #[arg(long)]
        lyrics: PathBuf,
        /// Pre-computed word transcript (JSON) instead of the service
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Track title, for the override table
        #[arg(long)]
        title: Option<String>,
        /// Track artist, for the override table
        #[arg(long)]
        artist: Option<String>,
        /// Seconds before the first sung line
        #[arg(long)]
        lead_in: Option<f64>,
        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the extracted audio features
    Analyze {
        /// Audio file (wav, flac, ogg, mp3)
        #[arg(long)]
        audio: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    tracing::debug!("{} {}", config.app_name(), config.app_version());

    match cli.command {
        Command::Sync {
            audio,
            lyrics,
            transcript,
            title,
            artist,
            lead_in,
            output,
        } => {
            run_sync(
                &config,
                SyncArgs {
                    audio,
                    lyrics,
                    transcript,
                    title,
                    artist,
                    lead_in,
                    output,
                },
            )
            .await
        }
        Command::Analyze { audio } => run_analyze(&config, &audio).await,
    }
}

struct SyncArgs {
    audio: PathBuf,
    lyrics: PathBuf,
    transcript: Option<PathBuf>,
    title: Option<String>,
    artist: Option<String>,
    lead_in: Option<f64>,
    output: Option<PathBuf>,
}

async fn run_sync(config: &Config, args: SyncArgs) -> anyhow::Result<()> {
    let text = fs_err::read_to_string(&args.lyrics)?;
    let lines = prepare_lines(&text);
    if lines.is_empty() {
        bail!("{}: {}", args.lyrics.display(), Error::EmptyInput);
    }

    let audio_path = args.audio.clone();
    let decoded = tokio::task::spawn_blocking(move || decode_file(&audio_path)).await??;

    let transcriber: Option<Arc<dyn Transcriber>> = match &args.transcript {
        Some(path) => Some(Arc::new(FileTranscriber::new(path))),
        None if config.has_transcription_service() => Some(Arc::new(HttpTranscriber::new(config))),
        None => None,
    };
    let audio_bytes = if transcriber.is_some() && args.transcript.is_none() {
        Some(fs_err::read(&args.audio)?)
    } else {
        None
    };

    let overrides: Option<Arc<dyn OverrideLookup>> = match &config.overrides_path {
        Some(path) => Some(Arc::new(OverrideTable::load(path)?)),
        None => None,
    };
    let analyzer: Arc<dyn SignalAnalyzer> = Arc::new(SpectralAnalyzer::new(config.sync.frame_len, config.sync.hop_len));

    let synchronizer = Synchronizer::new(config.sync.clone(), Some(analyzer), transcriber, overrides)
        .with_transcript_timeout(config.transcript_timeout);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling");
            on_ctrl_c.cancel();
        }
    });

    let request = SyncRequest {
        lines,
        audio: Some(decoded),
        audio_bytes,
        title: args.title,
        artist: args.artist,
        lead_in: args.lead_in,
    };
    let outcome = synchronizer.run(request, cancel).await?;

    let json = serde_json::to_string_pretty(&outcome)?;
    match &args.output {
        Some(path) => {
            fs_err::write(path, json)?;
            tracing::info!("Wrote {} lines to {}", outcome.lines.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn run_analyze(config: &Config, path: &Path) -> anyhow::Result<()> {
    let owned = path.to_path_buf();
    let decoded = tokio::task::spawn_blocking(move || decode_file(&owned)).await??;

    let analyzer: Arc<dyn SignalAnalyzer> = Arc::new(SpectralAnalyzer::new(config.sync.frame_len, config.sync.hop_len));
    let extractor = FeatureExtractor::new(analyzer, config.sync.clone());
    let features = tokio::task::spawn_blocking(move || extractor.try_extract(&decoded.samples, decoded.sample_rate))
        .await?
        .with_context(|| format!("analyzing {}", path.display()))?;

    println!("File:      {}", path.display());
    println!("Duration:  {:.2}s", features.duration);
    println!("Tempo:     {:.1} BPM", features.tempo_bpm);
    println!("Beats:     {}", features.beat_times.len());
    println!("Onsets:    {}", features.onset_times.len());
    println!("Frames:    {} ({:.1} ms hop)", features.frame_count(), features.hop_seconds * 1000.0);
    println!("Segments:  {}", features.vocal_segments.len());
    for seg in &features.vocal_segments {
        println!("  {:>8.2} - {:>8.2}  ({:.2}s)", seg.start, seg.end, seg.duration());
    }
    Ok(())
}
