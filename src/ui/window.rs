// Feed window: a vertical strip of full-viewport slides behind a hidden
// scrollbar. Scroll-adjustment changes become visibility batches for the
// controller; everything else is wiring between gestures, keys, posters,
// and the per-slide widgets.

use gdk4::Display;
use gtk4::prelude::*;
use gtk4::{
    Application, ApplicationWindow, Box as GtkBox, CssProvider, GestureClick, GestureDrag,
    Orientation, PolicyType, ScrolledWindow, STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::Tuning;
use crate::feed::{ActivationOutcome, FeedController, SlideVisibility};
use crate::input::{FeedCommand, FeedKeys, ScrubConfig, ScrubGesture};
use crate::media::mpv::MpvSurface;
use crate::models::VideoItem;
use crate::posters::{PosterQueue, PosterRequest};
use crate::ui::slide::SlideWidget;
use crate::ui::surface::{self, seek_fraction};

/// Ease-out tween length for keyboard navigation.
const SCROLL_ANIMATION_MS: u64 = 240;
const SCROLL_ANIMATION_TICK_MS: u64 = 16;

/// View-model refresh and end-of-media poll cadence.
const TICK_INTERVAL_MS: u64 = 250;

/// Posters are fetched for slides this far from the active one.
const POSTER_RADIUS: usize = 3;

const CSS: &str = r#"
window {
    background-color: #000000;
    color: #f0f0f0;
}

.feed-slide {
    background-color: #000000;
}

.slide-title {
    color: #ffffff;
    font-weight: bold;
    text-shadow: 0 1px 2px rgba(0, 0, 0, 0.8);
}

.slide-attribution {
    color: #c0c0c0;
    font-size: 11px;
}

.slide-time {
    color: #c0c0c0;
    font-size: 11px;
}

.slide-progress progress {
    background-color: #ffffff;
}

.slide-pause-icon {
    color: rgba(255, 255, 255, 0.85);
}
"#;

fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(CSS);
    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

type Feed = Rc<RefCell<FeedController<MpvSurface>>>;

pub struct FeedWindow {
    window: ApplicationWindow,
}

impl FeedWindow {
    pub fn new(app: &Application, items: Vec<VideoItem>, tuning: Tuning) -> Self {
        load_css();

        let posters = Rc::new(PosterQueue::new(
            tuning.poster_workers,
            tuning.poster_cache_capacity,
        ));

        let slides_box = GtkBox::new(Orientation::Vertical, 0);
        let mut widgets = Vec::with_capacity(items.len());
        let mut pairs = Vec::with_capacity(items.len());
        for item in items {
            let media = MpvSurface::new();
            let widget = SlideWidget::new(&item, media.widget());
            slides_box.append(widget.widget());
            widgets.push(widget);
            pairs.push((item, media));
        }
        let slides: Rc<Vec<SlideWidget>> = Rc::new(widgets);
        let controller: Feed = Rc::new(RefCell::new(FeedController::new(
            pairs,
            tuning.activation_threshold,
        )));

        let scroller = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::External)
            .kinetic_scrolling(true)
            .child(&slides_box)
            .build();

        let window = ApplicationWindow::builder()
            .application(app)
            .title("flickd")
            .default_width(480)
            .default_height(854)
            .child(&scroller)
            .build();

        let vadj = scroller.vadjustment();
        let requested_posters: Rc<RefCell<HashSet<String>>> =
            Rc::new(RefCell::new(HashSet::new()));
        let scroll_anim: Rc<RefCell<Option<glib::SourceId>>> = Rc::new(RefCell::new(None));

        // Slides always fill the viewport; re-observe when it resizes.
        {
            let slides = slides.clone();
            let controller = controller.clone();
            let posters = posters.clone();
            let requested = requested_posters.clone();
            vadj.connect_page_size_notify(move |adj| {
                let height = adj.page_size() as i32;
                if height <= 0 {
                    return;
                }
                for slide in slides.iter() {
                    slide.widget().set_size_request(-1, height);
                }
                observe(&controller, adj, &posters, &requested);
            });
        }

        {
            let controller = controller.clone();
            let posters = posters.clone();
            let requested = requested_posters.clone();
            vadj.connect_value_changed(move |adj| {
                observe(&controller, adj, &posters, &requested);
            });
        }

        let keys = FeedKeys::new();
        keys.attach(&window);
        {
            let controller = controller.clone();
            let vadj = vadj.clone();
            let scroll_anim = scroll_anim.clone();
            let window_weak = window.downgrade();
            let seek_step = tuning.seek_step_secs;
            keys.connect_command(move |command| match command {
                FeedCommand::NextItem => {
                    if let Some(index) = controller.borrow().next_index() {
                        animate_scroll_to(&vadj, index, &scroll_anim);
                    }
                }
                FeedCommand::PrevItem => {
                    if let Some(index) = controller.borrow().prev_index() {
                        animate_scroll_to(&vadj, index, &scroll_anim);
                    }
                }
                FeedCommand::TogglePlayback => controller.borrow_mut().toggle_active_playback(),
                FeedCommand::ToggleMute => controller.borrow_mut().toggle_mute(),
                FeedCommand::Restart => controller.borrow_mut().restart_active(),
                FeedCommand::SeekBack => controller.borrow_mut().step_seek(-seek_step),
                FeedCommand::SeekForward => controller.borrow_mut().step_seek(seek_step),
                FeedCommand::ToggleFullscreen => {
                    if let Some(window) = window_weak.upgrade() {
                        if window.is_fullscreen() {
                            window.unfullscreen();
                        } else {
                            window.fullscreen();
                        }
                    }
                }
            });
        }

        for (index, slide) in slides.iter().enumerate() {
            wire_slide_gestures(index, slide, &controller, tuning.scrub_config());
        }

        // Periodic tick: mirror state onto widgets, poll end-of-media,
        // drain decoded posters.
        {
            let slides = slides.clone();
            let controller = controller.clone();
            let posters = posters.clone();
            glib::timeout_add_local(Duration::from_millis(TICK_INTERVAL_MS), move || {
                tick(&slides, &controller, &posters);
                glib::ControlFlow::Continue
            });
        }

        info!(slides = slides.len(), "Feed window ready");

        Self { window }
    }

    pub fn present(&self) {
        self.window.present();
    }
}

/// Turn the adjustment state into a visibility batch and feed it through
/// the controller. New activations kick off poster prefetch.
fn observe(
    controller: &Feed,
    adj: &gtk4::Adjustment,
    posters: &Rc<PosterQueue>,
    requested: &Rc<RefCell<HashSet<String>>>,
) {
    let count = controller.borrow().len();
    let batch = visibility_batch(adj.value(), adj.page_size(), count);
    let outcome = controller.borrow_mut().observe_visibility(&batch);
    if let ActivationOutcome::Activated(active) = outcome {
        queue_posters(controller, posters, requested, active);
    }
}

/// Per-slide visible fraction, derived from the scroll position. Every
/// slide is exactly one viewport tall, so slide `i` spans
/// `[i * page, (i + 1) * page)`.
fn visibility_batch(value: f64, page: f64, count: usize) -> Vec<SlideVisibility> {
    if page <= 0.0 || !page.is_finite() || !value.is_finite() {
        return Vec::new();
    }
    let viewport_top = value;
    let viewport_bottom = value + page;

    let mut batch = Vec::new();
    for index in 0..count {
        let top = index as f64 * page;
        let bottom = top + page;
        let overlap = (bottom.min(viewport_bottom) - top.max(viewport_top)).max(0.0);
        if overlap > 0.0 {
            batch.push(SlideVisibility {
                index,
                fraction: overlap / page,
            });
        }
    }
    batch
}

/// Queue poster fetches around the active slide, nearest first. Each item
/// is requested at most once per session; the queue itself dedups cached
/// and in-flight ids.
fn queue_posters(
    controller: &Feed,
    posters: &Rc<PosterQueue>,
    requested: &Rc<RefCell<HashSet<String>>>,
    active: usize,
) {
    let mut batch = Vec::new();
    {
        let feed = controller.borrow();
        if feed.is_empty() {
            return;
        }
        let start = active.saturating_sub(POSTER_RADIUS);
        let end = (active + POSTER_RADIUS).min(feed.len() - 1);
        let mut requested = requested.borrow_mut();
        for index in start..=end {
            let Some(slide) = feed.slide(index) else {
                continue;
            };
            let item = slide.item();
            let Some(url) = item.thumbnail_url.as_deref() else {
                continue;
            };
            if !requested.insert(item.id.clone()) {
                continue;
            }
            batch.push(PosterRequest {
                id: item.id.clone(),
                url: url.to_string(),
                priority: index.abs_diff(active) as u32,
            });
        }
    }
    if !batch.is_empty() {
        posters.request_batch(batch);
    }
}

fn tick(slides: &Rc<Vec<SlideWidget>>, controller: &Feed, posters: &Rc<PosterQueue>) {
    controller.borrow_mut().poll_media_ended();

    for result in posters.poll_results() {
        let Some(pixels) = result.pixels else {
            continue;
        };
        // Results for ids no longer in the feed are dropped.
        let index = controller.borrow().index_of(&result.id);
        if let Some(widget) = index.and_then(|i| slides.get(i)) {
            widget.set_poster(&pixels);
        }
    }

    let feed = controller.borrow();
    for (index, widget) in slides.iter().enumerate() {
        if let Some(slide) = feed.slide(index) {
            widget.apply(&surface::slide_view(
                feed.state(),
                slide.item(),
                slide.media(),
            ));
        }
    }
}

fn wire_slide_gestures(index: usize, slide: &SlideWidget, controller: &Feed, config: ScrubConfig) {
    let scrub = Rc::new(RefCell::new(ScrubGesture::new(config)));
    let press_origin: Rc<Cell<(f64, f64)>> = Rc::new(Cell::new((0.0, 0.0)));

    // Tap toggles play/pause, unless it terminates a scrub.
    let click = GestureClick::new();
    {
        let controller = controller.clone();
        let scrub = scrub.clone();
        click.connect_released(move |_, _n, _x, _y| {
            if scrub.borrow().suppresses_click(Instant::now()) {
                return;
            }
            controller.borrow_mut().toggle_active_playback();
        });
    }
    slide.widget().add_controller(click);

    // Horizontal drag scrubs; vertical stays with the feed scroll.
    let drag = GestureDrag::new();
    {
        let controller = controller.clone();
        let scrub = scrub.clone();
        let origin = press_origin.clone();
        drag.connect_drag_begin(move |_, x, y| {
            origin.set((x, y));
            let position = controller
                .borrow()
                .slide(index)
                .map(|s| s.media().position())
                .unwrap_or(0.0);
            scrub.borrow_mut().begin(x, y, position);
        });
    }
    {
        let controller = controller.clone();
        let scrub = scrub.clone();
        let origin = press_origin.clone();
        let widget = slide.widget().clone();
        drag.connect_drag_update(move |_, dx, dy| {
            let (start_x, start_y) = origin.get();
            let width = widget.width() as f64;
            if let Some(fraction) = scrub.borrow_mut().motion(start_x + dx, start_y + dy, width) {
                controller.borrow_mut().seek_active_to_fraction(fraction);
            }
        });
    }
    {
        let scrub = scrub.clone();
        drag.connect_drag_end(move |_, _dx, _dy| {
            scrub.borrow_mut().end(Instant::now());
        });
    }
    slide.widget().add_controller(drag);

    // Progress bar: proportional seek. Claim the sequence so the tap does
    // not double as a play/pause toggle on the slide underneath.
    let progress_click = GestureClick::new();
    progress_click.connect_pressed(|gesture, _n, _x, _y| {
        gesture.set_state(gtk4::EventSequenceState::Claimed);
    });
    {
        let controller = controller.clone();
        let bar = slide.progress_widget().clone();
        progress_click.connect_released(move |_, _n, x, _y| {
            let fraction = seek_fraction(x, bar.width() as f64);
            controller.borrow_mut().seek_active_to_fraction(fraction);
        });
    }
    slide.progress_widget().add_controller(progress_click);
}

/// Tween the scroll position to a slide with an ease-out curve. A new
/// navigation cancels the one in flight.
fn animate_scroll_to(
    adj: &gtk4::Adjustment,
    index: usize,
    anim: &Rc<RefCell<Option<glib::SourceId>>>,
) {
    if let Some(id) = anim.borrow_mut().take() {
        id.remove();
    }
    let page = adj.page_size();
    if page <= 0.0 {
        return;
    }
    let start = adj.value();
    let upper_limit = (adj.upper() - page).max(adj.lower());
    let target = (index as f64 * page).clamp(adj.lower(), upper_limit);
    if (target - start).abs() < 0.5 {
        return;
    }

    let begun = Instant::now();
    let adj = adj.clone();
    let anim_slot = anim.clone();
    let id = glib::timeout_add_local(Duration::from_millis(SCROLL_ANIMATION_TICK_MS), move || {
        let t = begun.elapsed().as_millis() as f64 / SCROLL_ANIMATION_MS as f64;
        if t >= 1.0 {
            adj.set_value(target);
            *anim_slot.borrow_mut() = None;
            return glib::ControlFlow::Break;
        }
        let eased = 1.0 - (1.0 - t).powi(3);
        adj.set_value(start + (target - start) * eased);
        glib::ControlFlow::Continue
    });
    *anim.borrow_mut() = Some(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_batch_fractions() {
        // Viewport parked exactly on slide 1 of three.
        let batch = visibility_batch(800.0, 800.0, 3);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].index, 1);
        assert!((batch[0].fraction - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_visibility_batch_mid_scroll() {
        // A quarter of the way between slide 0 and slide 1.
        let batch = visibility_batch(200.0, 800.0, 3);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].index, 0);
        assert!((batch[0].fraction - 0.75).abs() < 1e-9);
        assert_eq!(batch[1].index, 1);
        assert!((batch[1].fraction - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_visibility_batch_degenerate_page() {
        assert!(visibility_batch(0.0, 0.0, 3).is_empty());
        assert!(visibility_batch(0.0, f64::NAN, 3).is_empty());
    }

    #[test]
    fn test_visibility_batch_empty_feed() {
        assert!(visibility_batch(0.0, 800.0, 0).is_empty());
    }
}
