//! Pure per-slide view computation. The widgets only mirror what this
//! module derives from feed state and the media handle.

use crate::feed::FeedState;
use crate::media::MediaHandle;
use crate::models::VideoItem;

/// What one slide should be showing right now.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideView {
    /// Playback progress in 0..=1; zero while the duration is unknown.
    pub progress: f64,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    /// Paused-state icon: only for the active, user-paused slide.
    pub show_pause_overlay: bool,
    /// Poster fallback until a source is attached.
    pub show_poster: bool,
    pub caption: String,
    pub attribution: Option<String>,
}

pub fn slide_view<H: MediaHandle>(state: &FeedState, item: &VideoItem, media: &H) -> SlideView {
    let duration = media.duration().filter(|d| d.is_finite() && *d > 0.0);
    let position = media.position();
    let progress = duration
        .map(|d| (position / d).clamp(0.0, 1.0))
        .unwrap_or(0.0);
    let is_active = state.active_id() == Some(item.id.as_str());

    SlideView {
        progress,
        position_secs: position,
        duration_secs: duration,
        show_pause_overlay: is_active && state.is_user_paused(&item.id),
        show_poster: !media.has_source(),
        caption: item.title.clone(),
        attribution: attribution_of(item),
    }
}

/// Map a click x within the progress bar to a playback fraction.
pub fn seek_fraction(x: f64, width: f64) -> f64 {
    if width <= 0.0 || !width.is_finite() {
        return 0.0;
    }
    (x / width).clamp(0.0, 1.0)
}

/// "m:ss" for the time label.
pub fn format_timestamp(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let total = secs as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn attribution_of(item: &VideoItem) -> Option<String> {
    match (item.category.as_deref(), item.source_url.as_deref()) {
        (Some(category), Some(source)) => Some(format!("{category} · {source}")),
        (Some(category), None) => Some(category.to_string()),
        (None, Some(source)) => Some(source.to_string()),
        (None, None) => None,
    }
}
