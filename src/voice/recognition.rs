//! # Stage: Speech recognition
//!
//! ## Responsibility
//! Own the push-to-talk listening flag. The controller is the only writer;
//! callers learn about changes through [`RecognitionController::subscribe`].
//!
//! ## Guarantees
//! - No recognizer capability: toggling emits a notice and changes nothing
//! - Microphone permission denied: toggling emits an actionable notice and
//!   never starts the recognizer
//! - Any recognizer error forces the state to `Idle`
//! - Final segments accumulate into the transcript; interim text is kept
//!   separately and replaced on every result
//!
//! ## NOT Responsible For
//! - Audio capture or the recognizer itself (see [`SpeechRecognizer`])

use serde::Serialize;
use tracing::{debug, warn};

use super::{Listeners, Notice};
use crate::config::VoiceConfig;
use crate::error::{LensError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub continuous: bool,
    pub interim_results: bool,
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        RecognitionConfig { continuous: true, interim_results: true, language: "en-US".to_string() }
    }
}

impl From<&VoiceConfig> for RecognitionConfig {
    fn from(voice: &VoiceConfig) -> Self {
        RecognitionConfig { language: voice.language.clone(), ..RecognitionConfig::default() }
    }
}

/// Platform speech recognizer. Results and lifecycle events are fed back via
/// [`RecognitionController::on_result`], [`RecognitionController::on_end`]
/// and [`RecognitionController::on_error`].
pub trait SpeechRecognizer {
    fn start(&mut self, config: &RecognitionConfig) -> Result<()>;
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Prompt,
    /// The platform cannot report a status.
    Unknown,
}

pub trait PermissionProbe {
    fn microphone(&self) -> PermissionStatus;
}

/// Probe for platforms without a permissions API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPermissionApi;

impl PermissionProbe for NoPermissionApi {
    fn microphone(&self) -> PermissionStatus {
        PermissionStatus::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListeningState {
    #[default]
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        TranscriptSegment { text: text.into(), is_final: false }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        TranscriptSegment { text: text.into(), is_final: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    State(ListeningState),
    Transcript { final_text: String, interim: String },
    Notice(Notice),
}

const PERMISSION_HELP: &str =
    "Microphone access is blocked. Allow microphone access in your system or browser settings, then try again.";

pub struct RecognitionController<R: SpeechRecognizer, P: PermissionProbe = NoPermissionApi> {
    recognizer: Option<R>,
    probe: P,
    config: RecognitionConfig,
    state: ListeningState,
    final_text: String,
    interim: String,
    listeners: Listeners<RecognitionEvent>,
}

impl<R: SpeechRecognizer, P: PermissionProbe> RecognitionController<R, P> {
    pub fn new(recognizer: Option<R>, probe: P, config: RecognitionConfig) -> Self {
        RecognitionController {
            recognizer,
            probe,
            config,
            state: ListeningState::Idle,
            final_text: String::new(),
            interim: String::new(),
            listeners: Listeners::default(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn state(&self) -> ListeningState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListeningState::Listening
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    pub fn subscribe(&mut self, f: impl FnMut(&RecognitionEvent) + Send + 'static) {
        self.listeners.subscribe(f);
    }

    /// Start listening when idle, stop when listening. Returns the new state.
    pub fn toggle(&mut self) -> ListeningState {
        match self.state {
            ListeningState::Listening => {
                if let Some(r) = self.recognizer.as_mut() {
                    r.stop();
                }
                self.transition(ListeningState::Idle);
            }
            ListeningState::Idle => self.start(),
        }
        self.state
    }

    fn start(&mut self) {
        if self.recognizer.is_none() {
            self.report(&LensError::Unsupported("speech recognition".to_string()));
            return;
        }
        if self.probe.microphone() == PermissionStatus::Denied {
            self.report(&LensError::PermissionDenied);
            return;
        }
        let started = match self.recognizer.as_mut() {
            Some(r) => r.start(&self.config),
            None => return,
        };
        match started {
            Ok(()) => {
                self.interim.clear();
                self.transition(ListeningState::Listening);
            }
            Err(e) => self.report(&e),
        }
    }

    /// Feed one batch of recognizer results.
    pub fn on_result(&mut self, segments: &[TranscriptSegment]) {
        let mut interim = String::new();
        for seg in segments {
            let text = seg.text.trim();
            if text.is_empty() {
                continue;
            }
            let target = if seg.is_final { &mut self.final_text } else { &mut interim };
            if !target.is_empty() {
                target.push(' ');
            }
            target.push_str(text);
        }
        self.interim = interim;
        self.listeners.emit(&RecognitionEvent::Transcript {
            final_text: self.final_text.clone(),
            interim: self.interim.clone(),
        });
    }

    /// The recognizer stopped on its own.
    pub fn on_end(&mut self) {
        self.interim.clear();
        self.transition(ListeningState::Idle);
    }

    /// The recognizer reported an error code such as `not-allowed` or `network`.
    pub fn on_error(&mut self, code: &str) {
        let error = match code {
            "not-allowed" | "service-not-allowed" => LensError::PermissionDenied,
            other => LensError::Recognition(other.to_string()),
        };
        if let Some(r) = self.recognizer.as_mut() {
            r.stop();
        }
        self.report(&error);
    }

    pub fn transcript(&self) -> &str {
        &self.final_text
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Hand the accumulated transcript to the caller and start a fresh one.
    pub fn take_transcript(&mut self) -> String {
        self.interim.clear();
        std::mem::take(&mut self.final_text)
    }

    fn report(&mut self, error: &LensError) {
        warn!(error = %error, "speech recognition failed");
        let notice = match error {
            LensError::PermissionDenied => Notice::error("Microphone blocked", PERMISSION_HELP),
            LensError::Unsupported(_) => {
                Notice::warning("Voice input unavailable", "Speech recognition is not supported here.")
            }
            other => Notice::error("Voice input error", other.to_string()),
        };
        self.listeners.emit(&RecognitionEvent::Notice(notice));
        self.transition(ListeningState::Idle);
    }

    fn transition(&mut self, next: ListeningState) {
        if self.state == next {
            return;
        }
        debug!(from = ?self.state, to = ?next, "listening state");
        self.state = next;
        self.listeners.emit(&RecognitionEvent::State(next));
    }
}
