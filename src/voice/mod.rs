//! # Voice controls
//!
//! Speech output and input as explicit state machines. Platform pieces (the
//! audio device, the speech recognizer, the microphone permission check) are
//! injected through traits, so the controllers run without a browser or a
//! sound card and their transitions can be observed through subscriptions.
//!
//! - [`synthesis`]: HTTP client exchanging text for audio bytes
//! - [`playback`]: idle → playing → muted → stopped cycle over an [`playback::AudioSink`]
//! - [`recognition`]: push-to-talk transcription over a [`recognition::SpeechRecognizer`]

pub mod playback;
pub mod recognition;
pub mod synthesis;

pub use playback::{
    AudioSink, ClickOutcome, FileSink, PlaybackController, PlaybackEvent, PlaybackState, SpeechTicket,
};
pub use recognition::{
    ListeningState, NoPermissionApi, PermissionProbe, PermissionStatus, RecognitionConfig, RecognitionController,
    RecognitionEvent, SpeechRecognizer, TranscriptSegment,
};
pub use synthesis::SpeechClient;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice { level, title: title.into(), message: message.into() }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::new(NoticeLevel::Error, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::new(NoticeLevel::Warning, title, message)
    }
}

type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Subscriber list for controller events.
pub struct Listeners<E> {
    subs: Vec<Listener<E>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Listeners { subs: Vec::new() }
    }
}

impl<E> Listeners<E> {
    pub fn subscribe(&mut self, f: impl FnMut(&E) + Send + 'static) {
        self.subs.push(Box::new(f));
    }

    pub fn emit(&mut self, event: &E) {
        for sub in self.subs.iter_mut() {
            sub(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_listeners_receive_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut ls: Listeners<u32> = Listeners::default();
        let a = Arc::clone(&seen);
        ls.subscribe(move |e| a.lock().unwrap().push(("a", *e)));
        let b = Arc::clone(&seen);
        ls.subscribe(move |e| b.lock().unwrap().push(("b", *e)));
        ls.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
        assert_eq!(ls.len(), 2);
    }

    #[test]
    fn test_notice_constructors() {
        let n = Notice::warning("Mic", "blocked");
        assert_eq!(n.level, NoticeLevel::Warning);
        assert_eq!(Notice::error("x", "y").level, NoticeLevel::Error);
    }
}
