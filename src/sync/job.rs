//! One synchronization job.
//!
//! Feature extraction runs on the blocking pool while the transcript is
//! fetched; both feed the orchestrator once they finish. A transcript call
//! that fails or times out is treated as no transcript.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::orchestrator::{Capabilities, SyncInputs, SyncOutcome, SynchronizationOrchestrator};
use crate::audio::{AudioFeatures, DecodedAudio, FeatureExtractor, SignalAnalyzer};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::overrides::{NoOverrides, OverrideLookup};
use crate::transcript::Transcriber;
use crate::types::TranscriptWord;

/// Default upper bound on a transcription call.
const DEFAULT_TRANSCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Input to [`Synchronizer::run`].
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// Lyric lines in display order.
    pub lines: Vec<String>,
    /// Decoded audio, when available.
    pub audio: Option<DecodedAudio>,
    /// Encoded audio sent to the transcription service.
    pub audio_bytes: Option<Vec<u8>>,
    /// Track title, for override lookup.
    pub title: Option<String>,
    /// Track artist, for override lookup.
    pub artist: Option<String>,
    /// Known time of the first sung line.
    pub lead_in: Option<f64>,
}

/// Runs synchronization jobs against a fixed set of collaborators.
pub struct Synchronizer {
    config: SyncConfig,
    analyzer: Option<Arc<dyn SignalAnalyzer>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    overrides: Arc<dyn OverrideLookup>,
    transcript_timeout: Duration,
    orchestrator: SynchronizationOrchestrator,
}

impl Synchronizer {
    /// Create a synchronizer with the given collaborators.
    ///
    /// The strategy plan is fixed here from what is present.
    pub fn new(
        config: SyncConfig,
        analyzer: Option<Arc<dyn SignalAnalyzer>>,
        transcriber: Option<Arc<dyn Transcriber>>,
        overrides: Option<Arc<dyn OverrideLookup>>,
    ) -> Self {
        let capabilities = Capabilities {
            transcription: transcriber.is_some(),
            signal_analysis: analyzer.is_some(),
        };
        if let Some(a) = &analyzer {
            tracing::debug!("Signal analysis via {}", a.name());
        }
        if let Some(t) = &transcriber {
            tracing::debug!("Transcription via {}", t.name());
        }
        Self {
            orchestrator: SynchronizationOrchestrator::new(config.clone(), capabilities),
            config,
            analyzer,
            transcriber,
            overrides: overrides.unwrap_or_else(|| Arc::new(NoOverrides)),
            transcript_timeout: DEFAULT_TRANSCRIPT_TIMEOUT,
        }
    }

    /// Bound transcription calls by `timeout`.
    #[must_use]
    pub const fn with_transcript_timeout(mut self, timeout: Duration) -> Self {
        self.transcript_timeout = timeout;
        self
    }

    /// The orchestrator this synchronizer drives.
    pub const fn orchestrator(&self) -> &SynchronizationOrchestrator {
        &self.orchestrator
    }

    /// Synchronize one track.
    ///
    /// Fails with [`Error::EmptyInput`] when no line has text, and with
    /// [`Error::Cancelled`] when `cancel` fires first.
    pub async fn run(&self, request: SyncRequest, cancel: CancellationToken) -> Result<SyncOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if request.lines.iter().all(|l| l.trim().is_empty()) {
            return Err(Error::EmptyInput);
        }

        let SyncRequest {
            lines,
            audio,
            audio_bytes,
            title,
            artist,
            lead_in,
        } = request;
        let duration = audio.as_ref().and_then(|a| a.duration);

        let found = title
            .as_deref()
            .and_then(|t| self.overrides.lookup(t, artist.as_deref()));
        if let Some(found) = found {
            tracing::info!(
                "Override for {:?}: vocals start at {:.1}s, skipping analysis",
                title.as_deref().unwrap_or_default(),
                found.forced_vocal_start
            );
            let inputs = SyncInputs {
                lines: &lines,
                duration,
                duration_floor: found.min_duration,
                lead_in: Some(found.forced_vocal_start),
                ..SyncInputs::default()
            };
            return self.orchestrator.synchronize(&inputs);
        }

        let gathered = futures::future::join(
            self.extract_features(audio),
            self.fetch_transcript(audio_bytes.as_deref()),
        );
        let (features, transcript) = tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Synchronization cancelled");
                return Err(Error::Cancelled);
            }
            gathered = gathered => gathered,
        };

        let inputs = SyncInputs {
            lines: &lines,
            features: features.as_ref(),
            transcript: transcript.as_deref(),
            duration,
            duration_floor: None,
            lead_in,
        };
        self.orchestrator.synchronize(&inputs)
    }

    /// Extract features on the blocking pool.
    async fn extract_features(&self, audio: Option<DecodedAudio>) -> Option<AudioFeatures> {
        let analyzer = self.analyzer.as_ref()?;
        let audio = audio.filter(DecodedAudio::has_samples)?;
        let extractor = FeatureExtractor::new(Arc::clone(analyzer), self.config.clone());

        match tokio::task::spawn_blocking(move || extractor.extract(&audio.samples, audio.sample_rate)).await {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!("{}", Error::FeatureExtractionUnavailable(e.to_string()));
                None
            }
        }
    }

    /// Fetch the transcript, giving up after the configured timeout.
    async fn fetch_transcript(&self, audio: Option<&[u8]>) -> Option<Vec<TranscriptWord>> {
        let transcriber = self.transcriber.as_ref()?;
        let audio = audio.unwrap_or_default();

        match tokio::time::timeout(self.transcript_timeout, transcriber.transcribe(audio)).await {
            Ok(Ok(words)) if words.is_empty() => {
                tracing::warn!("{}", Error::TranscriptUnavailable("service returned no words".into()));
                None
            }
            Ok(Ok(words)) => {
                tracing::info!("Transcript from {} has {} words", transcriber.name(), words.len());
                Some(words)
            }
            Ok(Err(e)) => {
                tracing::warn!("{}", Error::TranscriptUnavailable(e.to_string()));
                None
            }
            Err(_) => {
                tracing::warn!(
                    "{}",
                    Error::TranscriptUnavailable(format!("no response within {:?}", self.transcript_timeout))
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::audio::SpectralAnalyzer;
    use crate::overrides::{OverrideEntry, OverrideTable};
    use crate::types::{Strategy, SyncMethod};
    use async_trait::async_trait;

    struct StaticTranscriber(Vec<TranscriptWord>);

    #[async_trait]
    impl Transcriber for StaticTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<Vec<TranscriptWord>> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &'static str {
            "static"
        }
    }

    struct SlowTranscriber;

    #[async_trait]
    impl Transcriber for SlowTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<Vec<TranscriptWord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl Transcriber for FailingTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<Vec<TranscriptWord>> {
            Err(Error::transcription_status("Unauthorized", 401))
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn request(lines: &[&str]) -> SyncRequest {
        SyncRequest {
            lines: lines.iter().map(|s| (*s).to_string()).collect(),
            audio: Some(DecodedAudio::from_samples(vec![0.0; 22050 * 20], 22050)),
            ..SyncRequest::default()
        }
    }

    fn words(text: &str) -> Vec<TranscriptWord> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| TranscriptWord::new(w, 1.0 + i as f64 * 0.5, 1.4 + i as f64 * 0.5))
            .collect()
    }

    #[tokio::test]
    async fn test_transcript_strategy_end_to_end() {
        let transcriber: Arc<dyn Transcriber> = Arc::new(StaticTranscriber(words("twinkle twinkle little star how wonder what you are")));
        let sync = Synchronizer::new(SyncConfig::default(), None, Some(transcriber), None);
        let outcome = sync
            .run(request(&["Twinkle twinkle little star", "How I wonder what you are"]), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.strategy, Strategy::Transcript);
        assert!((outcome.duration - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failing_transcriber_falls_back() {
        let analyzer: Arc<dyn SignalAnalyzer> = Arc::new(SpectralAnalyzer::default());
        let transcriber: Arc<dyn Transcriber> = Arc::new(FailingTranscriber);
        let sync = Synchronizer::new(SyncConfig::default(), Some(analyzer), Some(transcriber), None);
        let outcome = sync.run(request(&["a line", "another line"]), CancellationToken::new()).await.unwrap();
        assert_ne!(outcome.strategy, Strategy::Transcript);
        assert_eq!(outcome.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_transcript_timeout_is_treated_as_missing() {
        let transcriber: Arc<dyn Transcriber> = Arc::new(SlowTranscriber);
        let sync = Synchronizer::new(SyncConfig::default(), None, Some(transcriber), None)
            .with_transcript_timeout(Duration::from_millis(100));
        let outcome = sync.run(request(&["just one line"]), CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::Heuristic);
    }

    #[tokio::test]
    async fn test_cancel_aborts_transcript() {
        let transcriber: Arc<dyn Transcriber> = Arc::new(SlowTranscriber);
        let sync = Synchronizer::new(SyncConfig::default(), None, Some(transcriber), None);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let result = sync.run(request(&["line"]), cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_override_forces_lead_in() {
        let table = OverrideTable::new(vec![OverrideEntry {
            title: "Slow Burner".into(),
            artist: None,
            forced_vocal_start: 9.0,
            min_duration: None,
        }]);
        let transcriber: Arc<dyn Transcriber> = Arc::new(StaticTranscriber(words("first line second line")));
        let sync = Synchronizer::new(SyncConfig::default(), None, Some(transcriber), Some(Arc::new(table)));
        let mut req = request(&["first line", "second line"]);
        req.title = Some("Slow Burner (Remastered)".into());
        let outcome = sync.run(req, CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.strategy, Strategy::Heuristic);
        assert!((outcome.lines[0].start - 9.0).abs() < f64::EPSILON);
        assert!(outcome.lines.iter().all(|l| l.method == SyncMethod::Heuristic));
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let sync = Synchronizer::new(SyncConfig::default(), None, None, None);
        let result = sync.run(request(&["", " "]), CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::EmptyInput)));
    }
}
