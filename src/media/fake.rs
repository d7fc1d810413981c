//! Scripted in-memory media handle for exercising the feed core without a
//! real backend.

use super::handle::{MediaHandle, PlaybackError, Preload};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Attach(String),
    Play,
    Pause,
    Seek(f64),
    SetMuted(bool),
    SetPreload(Preload),
}

#[derive(Debug)]
pub struct FakeMedia {
    source: Option<String>,
    playing: bool,
    muted: bool,
    position: f64,
    duration: Option<f64>,
    ended: bool,
    preload: Preload,
    /// When set, the next `play` call fails with a start rejection.
    pub reject_play: bool,
    /// Every mutating call in order, for asserting sequences.
    pub calls: Vec<Call>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self {
            source: None,
            playing: false,
            muted: false,
            position: 0.0,
            duration: None,
            ended: false,
            preload: Preload::None,
            reject_play: false,
            calls: Vec::new(),
        }
    }

    pub fn with_duration(duration: f64) -> Self {
        let mut media = Self::new();
        media.duration = Some(duration);
        media
    }

    /// Test setup: pretend playback advanced to `position`.
    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    /// Test setup: simulate the backend reporting end of media.
    pub fn finish(&mut self) {
        self.ended = true;
        self.playing = false;
        if let Some(duration) = self.duration {
            self.position = duration;
        }
    }

    pub fn preload(&self) -> Preload {
        self.preload
    }
}

impl Default for FakeMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaHandle for FakeMedia {
    fn attach_source(&mut self, url: &str) {
        self.calls.push(Call::Attach(url.to_string()));
        self.source = Some(url.to_string());
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_muted(&mut self, muted: bool) {
        self.calls.push(Call::SetMuted(muted));
        self.muted = muted;
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.calls.push(Call::Play);
        if self.source.is_none() {
            return Err(PlaybackError::NoSource);
        }
        if self.reject_play {
            return Err(PlaybackError::StartRejected("scripted rejection".into()));
        }
        self.playing = true;
        self.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.push(Call::Pause);
        self.playing = false;
    }

    fn seek(&mut self, position: f64) {
        self.calls.push(Call::Seek(position));
        self.position = position;
        self.ended = false;
    }

    fn set_preload(&mut self, preload: Preload) {
        self.calls.push(Call::SetPreload(preload));
        self.preload = preload;
    }

    fn reached_end(&self) -> bool {
        self.ended
    }
}
