//! HTTP transcription service client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{sanitize_words, Transcriber};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::TranscriptWord;

/// Client for an HTTP speech-to-text service with word timestamps.
///
/// Sends the audio base64-encoded in a JSON body and reads words from either
/// a top-level `words` array or `segments[].words`.
#[derive(Clone)]
pub struct HttpTranscriber {
    url: String,
    api_key: String,
    client: Client,
}

impl HttpTranscriber {
    /// Create a new transcriber from config
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(
            config.transcribe_url.clone().unwrap_or_default(),
            config.transcribe_key.clone(),
            config.transcript_timeout,
        )
    }

    /// Create a transcriber for an explicit endpoint
    pub fn with_endpoint(url: impl Into<String>, api_key: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
        }
    }

    /// Check if an endpoint is configured
    fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    /// POST the audio and return the raw JSON response
    async fn post(&self, audio: &[u8]) -> Result<Value> {
        let body = json!({
            "audio": base64::encode(audio),
            "timestamps": "word",
        });

        let mut request = self.client.post(&self.url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request to {} failed: {}", self.url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::transcription_status(
                format!("Request to {} returned {}", self.url, status),
                status.as_u16(),
            ));
        }

        resp.json()
            .await
            .map_err(|e| Error::parse(format!("Invalid JSON from {}: {}", self.url, e), None))
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<Vec<TranscriptWord>> {
        if !self.is_configured() {
            return Err(Error::config(
                "Transcription service not configured",
                "Set the LYRICSYNC_TRANSCRIBE_URL environment variable",
            ));
        }
        if audio.is_empty() {
            return Err(Error::transcription("no audio bytes to transcribe"));
        }

        let json = self.post(audio).await?;
        let words = parse_words(&json)?;
        tracing::debug!("Transcription service returned {} words", words.len());
        Ok(words)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Extract timestamped words from a service response.
pub(crate) fn parse_words(json: &Value) -> Result<Vec<TranscriptWord>> {
    let word_values: Vec<&Value> = if let Some(words) = json["words"].as_array() {
        words.iter().collect()
    } else if let Some(segments) = json["segments"].as_array() {
        segments
            .iter()
            .filter_map(|s| s["words"].as_array())
            .flatten()
            .collect()
    } else {
        return Err(Error::parse("Missing 'words' or 'segments' array in transcript response", None));
    };

    let words = word_values
        .into_iter()
        .filter_map(|w| {
            let text = w["word"].as_str().or_else(|| w["text"].as_str())?.trim().to_string();
            let start = w["start"].as_f64()?;
            let end = w["end"].as_f64()?;
            Some(TranscriptWord { text, start, end })
        })
        .collect();

    Ok(sanitize_words(words))
}
