//! HTTP text-to-speech client.
//!
//! The endpoint contract is a single POST of `{"text": ...}` answered with
//! the audio bytes (MP3). Markdown is stripped before sending.

use std::time::Duration;

use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::config::VoiceConfig;
use crate::error::{LensError, Result};
use crate::markdown::to_speech_text;

#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
}

pub struct SpeechClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SpeechClient {
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(SpeechClient { client, endpoint: config.tts_url.clone() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Exchange `text` for audio bytes.
    ///
    /// # Returns
    /// - `Err(LensError::NothingToSpeak)` when stripping leaves nothing.
    /// - `Err(LensError::Synthesis)` on a non-2xx reply, with the body as detail.
    /// - `Err(LensError::Http)` on transport failure.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let speech = to_speech_text(text);
        if speech.is_empty() {
            return Err(LensError::NothingToSpeak);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&SpeechRequest { text: &speech })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LensError::Synthesis { status: status.as_u16(), detail });
        }

        let mut audio = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }
        debug!(bytes = audio.len(), chars = speech.len(), "speech synthesized");
        Ok(audio)
    }
}
