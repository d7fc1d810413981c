//! Playback coordination across the whole feed.
//!
//! The controller owns the slides, the viewport tracker, and the shared
//! `FeedState`, and is the only writer of any of them. Every externally
//! triggered change (visibility batch, gesture, media event) funnels into a
//! state mutation followed by one reconciliation pass.

use tracing::{debug, trace, warn};

use crate::feed::load_window::{preload_for, window_around};
use crate::feed::state::FeedState;
use crate::feed::visibility::{ActivationOutcome, SlideVisibility, ViewportTracker};
use crate::media::MediaHandle;
use crate::models::VideoItem;

/// One feed entry: the listing record plus its media element.
pub struct Slide<H> {
    item: VideoItem,
    media: H,
}

impl<H> Slide<H> {
    pub fn item(&self) -> &VideoItem {
        &self.item
    }

    pub fn media(&self) -> &H {
        &self.media
    }
}

pub struct FeedController<H: MediaHandle> {
    slides: Vec<Slide<H>>,
    tracker: ViewportTracker,
    state: FeedState,
}

impl<H: MediaHandle> FeedController<H> {
    pub fn new(slides: Vec<(VideoItem, H)>, activation_threshold: f64) -> Self {
        let slides = slides
            .into_iter()
            .map(|(item, media)| Slide { item, media })
            .collect();
        Self {
            slides,
            tracker: ViewportTracker::new(activation_threshold),
            state: FeedState::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn slide(&self, index: usize) -> Option<&Slide<H>> {
        self.slides.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.item.id == id)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.tracker.active_index()
    }

    /// Slide after the active one, if any. The shell scrolls there; the
    /// activation itself arrives through the next visibility batch.
    pub fn next_index(&self) -> Option<usize> {
        let active = self.tracker.active_index()?;
        (active + 1 < self.slides.len()).then(|| active + 1)
    }

    pub fn prev_index(&self) -> Option<usize> {
        self.tracker.active_index()?.checked_sub(1)
    }

    /// Feed one visibility batch through the tracker and react to the
    /// outcome. This is the entry point for scroll-driven control flow.
    pub fn observe_visibility(&mut self, batch: &[SlideVisibility]) -> ActivationOutcome {
        let outcome = self.tracker.observe(batch, self.slides.len());
        if let ActivationOutcome::Activated(index) = outcome {
            self.activate(index);
        }
        outcome
    }

    fn activate(&mut self, index: usize) {
        let Some(id) = self.slides.get(index).map(|s| s.item.id.clone()) else {
            return;
        };
        debug!(index, id = %id, "Active slide changed");
        // A fresh arrival always gets an autoplay attempt, even if the user
        // paused this item the last time it was active.
        self.state.clear_user_paused(&id);
        self.state.set_active(Some(id));
        self.apply_load_window(index);
        self.reconcile();
    }

    /// Attach sources for the active±1 window and update preload modes.
    /// Loaded state is sticky: a slide keeps its source forever once
    /// attached, only its buffering mode is downgraded outside the window.
    fn apply_load_window(&mut self, position: usize) {
        let Some(window) = window_around(position, self.slides.len()) else {
            return;
        };
        for (index, slide) in self.slides.iter_mut().enumerate() {
            let Slide { item, media } = slide;
            if window.contains(index) && self.state.mark_loaded(&item.id) {
                match item.playable_source() {
                    Some(url) => {
                        trace!(id = %item.id, url, "Attaching media source");
                        media.attach_source(url);
                    }
                    None => warn!(id = %item.id, "Record has no playable source"),
                }
            }
            media.set_preload(preload_for(index, window));
        }
    }

    /// The central reconciliation pass. Pauses every non-active slide
    /// (rewinding it for a clean restart), then starts the active one if
    /// policy allows. Pause always runs first so two slides are never
    /// audible at once.
    fn reconcile(&mut self) {
        let active_id = self.state.active_id().map(str::to_owned);

        for slide in &mut self.slides {
            let is_active = active_id.as_deref() == Some(slide.item.id.as_str());
            if !is_active && slide.media.is_playing() {
                slide.media.pause();
                rewind(&mut slide.media);
            }
        }

        let Some(id) = active_id else {
            return;
        };
        let user_paused = self.state.is_user_paused(&id);
        let muted = self.state.is_muted();
        let Some(slide) = self.slides.iter_mut().find(|s| s.item.id == id) else {
            return;
        };

        if user_paused {
            if slide.media.is_playing() {
                slide.media.pause();
            }
            return;
        }
        if !slide.media.has_source() {
            trace!(id = %id, "Active slide has no resolved source; not starting playback");
            return;
        }
        slide.media.set_muted(muted);
        if !slide.media.is_playing() {
            if let Err(err) = slide.media.play() {
                // Expected and recoverable; the next user gesture resolves it.
                debug!(id = %id, error = %err, "Playback start rejected");
            }
        }
    }

    /// Play/pause toggle for the active slide (click or space).
    ///
    /// Two-phase: the very first interaction with any playback control
    /// permanently clears the global mute flag and attempts playback; it is
    /// never interpreted as a pause. Every later interaction is a pure
    /// toggle that leaves the mute flag alone.
    pub fn toggle_active_playback(&mut self) {
        let Some(id) = self.state.active_id().map(str::to_owned) else {
            return;
        };

        if !self.state.sound_unlocked() {
            debug!("First playback gesture; unlocking sound");
            self.state.unlock_sound();
            self.state.set_user_paused(&id, false);
            self.reconcile();
            return;
        }

        let playing = self
            .slides
            .iter()
            .find(|s| s.item.id == id)
            .map(|s| s.media.is_playing())
            .unwrap_or(false);
        self.state.set_user_paused(&id, !playing);
        self.reconcile();
    }

    /// Flip the global mute flag, independent of play state and of the
    /// first-gesture latch.
    pub fn toggle_mute(&mut self) {
        let muted = !self.state.is_muted();
        self.state.set_muted(muted);
        self.reconcile();
    }

    /// Step the active slide's position by `delta` seconds, wrapping
    /// circularly at the duration boundaries: stepping before zero lands at
    /// `duration + overshoot`, stepping past the end at
    /// `overshoot - duration`. Wrap, not clamp.
    pub fn step_seek(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let Some(slide) = self.active_slide_mut() else {
            return;
        };
        if !slide.media.has_source() {
            return;
        }
        let Some(duration) = valid_duration(&slide.media) else {
            return;
        };
        let mut target = slide.media.position() + delta;
        if target < 0.0 {
            target += duration;
        } else if target > duration {
            target -= duration;
        }
        slide.media.seek(target.clamp(0.0, duration));
    }

    /// Restart the active slide from zero. Requires a resolved source and a
    /// known duration.
    pub fn restart_active(&mut self) {
        let Some(slide) = self.active_slide_mut() else {
            return;
        };
        if slide.media.has_source() && valid_duration(&slide.media).is_some() {
            slide.media.seek(0.0);
        }
    }

    /// Seek the active slide to a fraction of its duration (scrub gesture
    /// and progress-bar clicks).
    pub fn seek_active_to_fraction(&mut self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let Some(slide) = self.active_slide_mut() else {
            return;
        };
        if !slide.media.has_source() {
            return;
        }
        let Some(duration) = valid_duration(&slide.media) else {
            return;
        };
        slide.media.seek(fraction.clamp(0.0, 1.0) * duration);
    }

    /// Restart a slide that ran off its end, but only while it is still the
    /// active item, still has a source, and the user has not paused it;
    /// the notification may land after the user already navigated away.
    pub fn handle_media_ended(&mut self, index: usize) {
        let Some(slide) = self.slides.get_mut(index) else {
            return;
        };
        let is_active = self.state.active_id() == Some(slide.item.id.as_str());
        if !is_active || !slide.media.has_source() {
            return;
        }
        if self.state.is_user_paused(&slide.item.id) {
            return;
        }
        trace!(id = %slide.item.id, "Looping active slide");
        slide.media.seek(0.0);
        if let Err(err) = slide.media.play() {
            debug!(id = %slide.item.id, error = %err, "Restart after end rejected");
        }
    }

    /// Poll every slide's end-of-media flag. The shell calls this from its
    /// progress tick.
    pub fn poll_media_ended(&mut self) {
        let ended: Vec<usize> = self
            .slides
            .iter()
            .enumerate()
            .filter(|(_, s)| s.media.reached_end())
            .map(|(i, _)| i)
            .collect();
        for index in ended {
            self.handle_media_ended(index);
        }
    }

    fn active_slide_mut(&mut self) -> Option<&mut Slide<H>> {
        let id = self.state.active_id()?.to_owned();
        self.slides.iter_mut().find(|s| s.item.id == id)
    }

    #[cfg(test)]
    pub(crate) fn media_mut(&mut self, index: usize) -> Option<&mut H> {
        self.slides.get_mut(index).map(|s| &mut s.media)
    }
}

/// A duration usable for seeking: finite and positive.
fn valid_duration<H: MediaHandle>(media: &H) -> Option<f64> {
    media.duration().filter(|d| d.is_finite() && *d > 0.0)
}

fn rewind<H: MediaHandle>(media: &mut H) {
    if media.duration().is_some_and(|d| d.is_finite() && d > 0.0) {
        media.seek(0.0);
    }
}
