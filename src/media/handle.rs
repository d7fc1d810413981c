use thiserror::Error;

/// Errors a media backend can report. Playback-start rejection is expected
/// and recoverable; the controller logs and swallows it.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback start rejected: {0}")]
    StartRejected(String),
    #[error("no playable source attached")]
    NoSource,
}

/// Buffering aggressiveness for a slide's media element.
///
/// `Auto` only while the slide is active or adjacent; slides that fall
/// outside the window are downgraded to `None` to bound concurrent
/// connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preload {
    Auto,
    None,
}

/// Contract between the feed core and a playable media element.
///
/// Implemented by the libmpv surface in production and by a scripted fake in
/// tests. `duration` is `None` until the backend has resolved it; callers
/// must not seek before then.
pub trait MediaHandle {
    /// Attach a playable URL. The element must stay paused until `play`.
    fn attach_source(&mut self, url: &str);

    fn has_source(&self) -> bool;

    fn is_playing(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn muted(&self) -> bool;

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    /// Total duration in seconds, once known.
    fn duration(&self) -> Option<f64>;

    /// Start playback. Fallible; a rejection is not fatal.
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    /// Seek to an absolute position in seconds.
    fn seek(&mut self, position: f64);

    fn set_preload(&mut self, preload: Preload);

    /// Whether playback has run off the end of the media. Cleared by `seek`.
    fn reached_end(&self) -> bool;
}
