//! # Stage: Speech playback
//!
//! ## Responsibility
//! Drive a single speak button through idle → playing → muted → stopped.
//! A click while idle (or stopped) asks the caller to synthesize audio; a
//! click while playing mutes; a click while muted stops and releases the
//! clip.
//!
//! ## Guarantees
//! - At most one clip is loaded; the previous clip is released before a new
//!   one takes its place, and on stop, end, error and drop
//! - Stale synthesis results (from a request superseded by a later click)
//!   are discarded; in-flight requests themselves are not cancelled
//! - Every state change and notice is pushed to subscribers; there is no
//!   polling
//! - Errors force the state back to `Idle` and drop any pending request;
//!   nothing is retried

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::{Listeners, Notice};
use crate::error::{LensError, Result};
use crate::markdown::to_speech_text;

/// The platform audio output.
pub trait AudioSink {
    /// Handle to a loaded clip. Must be passed back to [`AudioSink::release`].
    type Clip;

    fn load(&mut self, audio: Vec<u8>) -> Result<Self::Clip>;
    fn play(&mut self, clip: &Self::Clip) -> Result<()>;
    fn set_muted(&mut self, clip: &Self::Clip, muted: bool);
    fn pause(&mut self, clip: &Self::Clip);
    fn release(&mut self, clip: Self::Clip);
}

/// Sink that "plays" a clip by writing it to a file. The clip handle is the
/// number of bytes written.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for FileSink {
    type Clip = usize;

    fn load(&mut self, audio: Vec<u8>) -> Result<usize> {
        std::fs::write(&self.path, &audio)?;
        Ok(audio.len())
    }

    fn play(&mut self, clip: &usize) -> Result<()> {
        debug!(bytes = *clip, path = %self.path.display(), "audio written");
        Ok(())
    }

    fn set_muted(&mut self, _clip: &usize, _muted: bool) {}

    fn pause(&mut self, _clip: &usize) {}

    fn release(&mut self, _clip: usize) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    /// Waiting for synthesized audio.
    Loading,
    Playing,
    Muted,
    Stopped,
}

/// A synthesis request the caller should perform and answer with
/// [`PlaybackController::audio_ready`] or [`PlaybackController::synthesis_failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechTicket {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Synthesize(SpeechTicket),
    Cancelled,
    Muted,
    Stopped,
    /// Nothing to say; a notice was emitted.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    State(PlaybackState),
    Notice(Notice),
}

pub struct PlaybackController<S: AudioSink> {
    sink: S,
    state: PlaybackState,
    clip: Option<S::Clip>,
    text: String,
    next_ticket: u64,
    awaiting: Option<u64>,
    listeners: Listeners<PlaybackEvent>,
}

impl<S: AudioSink> PlaybackController<S> {
    pub fn new(sink: S) -> Self {
        PlaybackController {
            sink,
            state: PlaybackState::Idle,
            clip: None,
            text: String::new(),
            next_ticket: 0,
            awaiting: None,
            listeners: Listeners::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn has_clip(&self) -> bool {
        self.clip.is_some()
    }

    /// Text spoken on the next click from idle.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn subscribe(&mut self, f: impl FnMut(&PlaybackEvent) + Send + 'static) {
        self.listeners.subscribe(f);
    }

    pub fn click(&mut self) -> ClickOutcome {
        match self.state {
            PlaybackState::Idle | PlaybackState::Stopped => {
                let speech = to_speech_text(&self.text);
                if speech.is_empty() {
                    self.notify(Notice::warning("Nothing to read", "There is no text to speak."));
                    return ClickOutcome::Ignored;
                }
                let id = self.next_ticket;
                self.next_ticket += 1;
                self.awaiting = Some(id);
                self.transition(PlaybackState::Loading);
                ClickOutcome::Synthesize(SpeechTicket { id, text: speech })
            }
            PlaybackState::Loading => {
                self.awaiting = None;
                self.transition(PlaybackState::Idle);
                ClickOutcome::Cancelled
            }
            PlaybackState::Playing => {
                if let Some(clip) = &self.clip {
                    self.sink.set_muted(clip, true);
                }
                self.transition(PlaybackState::Muted);
                ClickOutcome::Muted
            }
            PlaybackState::Muted => {
                self.release_clip();
                self.transition(PlaybackState::Stopped);
                ClickOutcome::Stopped
            }
        }
    }

    /// Audio for `ticket` arrived. Results for superseded tickets are dropped.
    pub fn audio_ready(&mut self, ticket: u64, audio: Vec<u8>) {
        if self.awaiting != Some(ticket) {
            warn!(ticket, "discarding audio for superseded speech request");
            return;
        }
        self.awaiting = None;
        self.release_clip();

        let started = match self.sink.load(audio) {
            Ok(clip) => {
                let played = self.sink.play(&clip);
                self.clip = Some(clip);
                played
            }
            Err(e) => Err(e),
        };
        match started {
            Ok(()) => self.transition(PlaybackState::Playing),
            Err(e) => self.fail(&e),
        }
    }

    pub fn synthesis_failed(&mut self, ticket: u64, error: &LensError) {
        if self.awaiting != Some(ticket) {
            debug!(ticket, "ignoring failure of superseded speech request");
            return;
        }
        self.awaiting = None;
        self.fail(error);
    }

    /// The sink finished playing the clip.
    pub fn ended(&mut self) {
        self.awaiting = None;
        self.release_clip();
        self.transition(PlaybackState::Idle);
    }

    /// The sink reported a playback error.
    pub fn playback_error(&mut self, message: &str) {
        self.fail(&LensError::Playback(message.to_string()));
    }

    /// Drive one click end to end, performing synthesis with `client` when
    /// the click asks for it.
    pub async fn click_and_speak(&mut self, client: &super::SpeechClient) -> ClickOutcome {
        let outcome = self.click();
        if let ClickOutcome::Synthesize(ticket) = &outcome {
            match client.synthesize(&ticket.text).await {
                Ok(audio) => self.audio_ready(ticket.id, audio),
                Err(e) => self.synthesis_failed(ticket.id, &e),
            }
        }
        outcome
    }

    /// Speak the current text once from idle. Unlike [`Self::click_and_speak`]
    /// this reports a run that ends without audio playing as an error, for
    /// callers that have no button to press again.
    pub async fn speak_once(&mut self, client: &super::SpeechClient) -> Result<()> {
        match self.click_and_speak(client).await {
            ClickOutcome::Ignored => Err(LensError::NothingToSpeak),
            ClickOutcome::Synthesize(_) if self.state == PlaybackState::Playing => Ok(()),
            ClickOutcome::Synthesize(_) => {
                Err(LensError::Playback("speech ended without playing audio".to_string()))
            }
            other => Err(LensError::Playback(format!("speech did not start ({:?})", other))),
        }
    }

    fn fail(&mut self, error: &LensError) {
        warn!(error = %error, "speech playback failed");
        self.awaiting = None;
        self.release_clip();
        self.notify(Notice::error("Speech error", error.to_string()));
        self.transition(PlaybackState::Idle);
    }

    fn release_clip(&mut self) {
        if let Some(clip) = self.clip.take() {
            self.sink.pause(&clip);
            self.sink.release(clip);
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state == next {
            return;
        }
        debug!(from = ?self.state, to = ?next, "playback state");
        self.state = next;
        self.listeners.emit(&PlaybackEvent::State(next));
    }

    fn notify(&mut self, notice: Notice) {
        self.listeners.emit(&PlaybackEvent::Notice(notice));
    }
}

impl<S: AudioSink> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        self.release_clip();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every sink call; can be told to fail `load`/`play`.
    #[derive(Default, Clone)]
    struct FakeSink {
        log: Arc<Mutex<Vec<String>>>,
        fail_load: bool,
        fail_play: bool,
        next: u32,
    }

    impl FakeSink {
        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl AudioSink for FakeSink {
        type Clip = u32;

        fn load(&mut self, audio: Vec<u8>) -> Result<u32> {
            if self.fail_load {
                return Err(LensError::Playback("decode failed".into()));
            }
            self.next += 1;
            self.log.lock().unwrap().push(format!("load {} {}", self.next, audio.len()));
            Ok(self.next)
        }
        fn play(&mut self, clip: &u32) -> Result<()> {
            self.log.lock().unwrap().push(format!("play {}", clip));
            if self.fail_play {
                return Err(LensError::Playback("device busy".into()));
            }
            Ok(())
        }
        fn set_muted(&mut self, clip: &u32, muted: bool) {
            self.log.lock().unwrap().push(format!("mute {} {}", clip, muted));
        }
        fn pause(&mut self, clip: &u32) {
            self.log.lock().unwrap().push(format!("pause {}", clip));
        }
        fn release(&mut self, clip: u32) {
            self.log.lock().unwrap().push(format!("release {}", clip));
        }
    }

    fn controller() -> (PlaybackController<FakeSink>, FakeSink) {
        let sink = FakeSink::default();
        let mut c = PlaybackController::new(sink.clone());
        c.set_text("**Hello** world");
        (c, sink)
    }

    fn ticket(outcome: ClickOutcome) -> SpeechTicket {
        match outcome {
            ClickOutcome::Synthesize(t) => t,
            other => panic!("expected synthesize, got {:?}", other),
        }
    }

    #[test]
    fn test_full_cycle() {
        let (mut c, sink) = controller();
        let t = ticket(c.click());
        assert_eq!(t.text, "Hello world");
        assert_eq!(c.state(), PlaybackState::Loading);

        c.audio_ready(t.id, vec![1, 2, 3]);
        assert_eq!(c.state(), PlaybackState::Playing);

        assert_eq!(c.click(), ClickOutcome::Muted);
        assert_eq!(c.state(), PlaybackState::Muted);

        assert_eq!(c.click(), ClickOutcome::Stopped);
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert!(!c.has_clip());
        assert_eq!(sink.calls(), vec!["load 1 3", "play 1", "mute 1 true", "pause 1", "release 1"]);
    }

    #[test]
    fn test_click_after_stop_starts_again() {
        let (mut c, _) = controller();
        let t = ticket(c.click());
        c.audio_ready(t.id, vec![0]);
        c.click();
        c.click();
        let t2 = ticket(c.click());
        assert!(t2.id > t.id);
    }

    #[test]
    fn test_stale_audio_discarded() {
        let (mut c, sink) = controller();
        let first = ticket(c.click());
        assert_eq!(c.click(), ClickOutcome::Cancelled);
        assert_eq!(c.state(), PlaybackState::Idle);
        let second = ticket(c.click());

        c.audio_ready(first.id, vec![9]);
        assert_eq!(c.state(), PlaybackState::Loading);
        assert!(sink.calls().is_empty());

        c.audio_ready(second.id, vec![9]);
        assert_eq!(c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_ended_releases_clip() {
        let (mut c, sink) = controller();
        let t = ticket(c.click());
        c.audio_ready(t.id, vec![1]);
        c.ended();
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(sink.calls().contains(&"release 1".to_string()));
    }

    #[test]
    fn test_play_failure_releases_and_notifies() {
        let sink = FakeSink { fail_play: true, ..FakeSink::default() };
        let mut c = PlaybackController::new(sink.clone());
        c.set_text("hi");
        let events = Arc::new(Mutex::new(Vec::new()));
        let ev = Arc::clone(&events);
        c.subscribe(move |e| ev.lock().unwrap().push(e.clone()));

        let t = ticket(c.click());
        c.audio_ready(t.id, vec![1]);
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(!c.has_clip());
        assert!(sink.calls().contains(&"release 1".to_string()));

        let events = events.lock().unwrap();
        assert_eq!(events[0], PlaybackEvent::State(PlaybackState::Loading));
        assert!(matches!(&events[1], PlaybackEvent::Notice(n) if n.message.contains("device busy")));
        assert_eq!(events[2], PlaybackEvent::State(PlaybackState::Idle));
    }

    #[test]
    fn test_load_failure_goes_idle() {
        let sink = FakeSink { fail_load: true, ..FakeSink::default() };
        let mut c = PlaybackController::new(sink);
        c.set_text("hi");
        let t = ticket(c.click());
        c.audio_ready(t.id, vec![1]);
        assert_eq!(c.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_synthesis_failure() {
        let (mut c, _) = controller();
        let t = ticket(c.click());
        c.synthesis_failed(t.id, &LensError::Synthesis { status: 500, detail: "boom".into() });
        assert_eq!(c.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_empty_text_ignored_with_notice() {
        let mut c = PlaybackController::new(FakeSink::default());
        let notices = Arc::new(Mutex::new(0));
        let n = Arc::clone(&notices);
        c.subscribe(move |e| {
            if matches!(e, PlaybackEvent::Notice(_)) {
                *n.lock().unwrap() += 1;
            }
        });
        assert_eq!(c.click(), ClickOutcome::Ignored);
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_eq!(*notices.lock().unwrap(), 1);
    }

    #[test]
    fn test_playback_error_event() {
        let (mut c, _) = controller();
        let t = ticket(c.click());
        c.audio_ready(t.id, vec![1]);
        c.playback_error("stream interrupted");
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(!c.has_clip());
    }

    #[test]
    fn test_late_audio_after_error_stays_idle() {
        let (mut c, sink) = controller();
        let t = ticket(c.click());
        c.playback_error("device lost");
        assert_eq!(c.state(), PlaybackState::Idle);

        c.audio_ready(t.id, vec![1]);
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(!c.has_clip());
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_late_audio_after_end_stays_idle() {
        let (mut c, _) = controller();
        let t = ticket(c.click());
        c.ended();
        c.audio_ready(t.id, vec![1]);
        assert_eq!(c.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_file_sink_writes_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.mp3");
        let mut c = PlaybackController::new(FileSink::new(&path));
        c.set_text("read me");
        let t = ticket(c.click());
        c.audio_ready(t.id, b"ID3data".to_vec());
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3data");
    }

    #[test]
    fn test_file_sink_write_failure_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = PlaybackController::new(FileSink::new(dir.path().join("missing").join("x.mp3")));
        c.set_text("read me");
        let t = ticket(c.click());
        c.audio_ready(t.id, vec![1]);
        assert_eq!(c.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_drop_releases_clip() {
        let (mut c, sink) = controller();
        let t = ticket(c.click());
        c.audio_ready(t.id, vec![1]);
        drop(c);
        assert_eq!(sink.calls().last().map(String::as_str), Some("release 1"));
    }
}
