//! Integration tests for the HTTP transcription client.

// Only runs with the integration_test feature; skips itself without an endpoint.
#![cfg(feature = "integration_test")]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use lyricsync::config::Config;
use lyricsync::transcript::{HttpTranscriber, Transcriber};
use std::path::PathBuf;
use std::time::Instant;

// Helper function to set up the client for tests
fn setup_client() -> Option<HttpTranscriber> {
    match Config::load() {
        Ok(config) => {
            if config.has_transcription_service() {
                Some(HttpTranscriber::new(&config))
            } else {
                println!(r#"Skipping integration test: LYRICSYNC_TRANSCRIBE_URL not found in environment/".env" file."#);
                None
            }
        }
        Err(e) => {
            println!("Skipping integration test: Failed to load config: {e}");
            None
        }
    }
}

// Sample audio named by LYRICSYNC_TEST_AUDIO
fn sample_audio() -> Option<Vec<u8>> {
    let Some(path) = std::env::var_os("LYRICSYNC_TEST_AUDIO").map(PathBuf::from) else {
        println!("Skipping integration test: LYRICSYNC_TEST_AUDIO not set.");
        return None;
    };
    Some(std::fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display())))
}

#[tokio::test]
async fn test_transcribe_sample_audio() {
    let (Some(client), Some(audio)) = (setup_client(), sample_audio()) else {
        return;
    };

    let started = Instant::now();
    match client.transcribe(&audio).await {
        Ok(words) => {
            println!("Transcribed {} words in {:?}", words.len(), started.elapsed());
            assert!(!words.is_empty(), "Expected at least one word from the sample.");
            assert!(
                words.windows(2).all(|w| w[0].start <= w[1].start && w[0].end <= w[1].start),
                "Words should be ordered and non-overlapping."
            );
        }
        Err(e) => panic!("transcribe failed: {e}"),
    }
}

#[tokio::test]
async fn test_rejects_empty_audio() {
    if let Some(client) = setup_client() {
        assert!(client.transcribe(&[]).await.is_err());
    }
}
