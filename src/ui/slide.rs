// Per-item slide composition: video surface with poster fallback, caption
// block, pause icon, and a clickable progress bar.

use gtk4::prelude::*;
use gtk4::{
    Align, Box as GtkBox, ContentFit, GLArea, Image, Label, Orientation, Overlay, Picture,
    ProgressBar,
};

use crate::models::VideoItem;
use crate::posters::PosterPixels;
use crate::ui::surface::{format_timestamp, SlideView};

pub struct SlideWidget {
    root: Overlay,
    poster: Picture,
    pause_icon: Image,
    progress: ProgressBar,
    time_label: Label,
    attribution_label: Label,
}

impl SlideWidget {
    pub fn new(item: &VideoItem, video_widget: &GLArea) -> Self {
        let root = Overlay::new();
        root.add_css_class("feed-slide");
        root.set_child(Some(video_widget));

        // Poster covers the surface until a source resolves.
        let poster = Picture::new();
        poster.set_content_fit(ContentFit::Cover);
        poster.set_hexpand(true);
        poster.set_vexpand(true);
        poster.add_css_class("slide-poster");
        root.add_overlay(&poster);

        let pause_icon = Image::from_icon_name("media-playback-pause-symbolic");
        pause_icon.set_pixel_size(72);
        pause_icon.set_halign(Align::Center);
        pause_icon.set_valign(Align::Center);
        pause_icon.add_css_class("slide-pause-icon");
        pause_icon.set_visible(false);
        root.add_overlay(&pause_icon);

        let caption_box = GtkBox::new(Orientation::Vertical, 4);
        caption_box.set_valign(Align::End);
        caption_box.set_margin_start(12);
        caption_box.set_margin_end(12);
        caption_box.set_margin_bottom(12);
        caption_box.add_css_class("slide-captions");

        let title_label = Label::new(Some(&item.title));
        title_label.set_halign(Align::Start);
        title_label.set_wrap(true);
        title_label.add_css_class("slide-title");
        caption_box.append(&title_label);

        let attribution_label = Label::new(None);
        attribution_label.set_halign(Align::Start);
        attribution_label.add_css_class("slide-attribution");
        attribution_label.set_visible(false);
        caption_box.append(&attribution_label);

        let time_label = Label::new(Some("0:00"));
        time_label.set_halign(Align::Start);
        time_label.add_css_class("slide-time");
        caption_box.append(&time_label);

        let progress = ProgressBar::new();
        progress.set_hexpand(true);
        progress.add_css_class("slide-progress");
        caption_box.append(&progress);

        root.add_overlay(&caption_box);

        Self {
            root,
            poster,
            pause_icon,
            progress,
            time_label,
            attribution_label,
        }
    }

    pub fn widget(&self) -> &Overlay {
        &self.root
    }

    pub fn progress_widget(&self) -> &ProgressBar {
        &self.progress
    }

    /// Mirror the computed view state onto the widgets.
    pub fn apply(&self, view: &SlideView) {
        self.progress.set_fraction(view.progress);
        self.pause_icon.set_visible(view.show_pause_overlay);
        self.poster.set_visible(view.show_poster && self.poster.paintable().is_some());

        let time = match view.duration_secs {
            Some(duration) => format!(
                "{} / {}",
                format_timestamp(view.position_secs),
                format_timestamp(duration)
            ),
            None => format_timestamp(view.position_secs),
        };
        self.time_label.set_text(&time);

        match view.attribution.as_deref() {
            Some(text) => {
                self.attribution_label.set_text(text);
                self.attribution_label.set_visible(true);
            }
            None => self.attribution_label.set_visible(false),
        }
    }

    /// Install a decoded poster.
    pub fn set_poster(&self, pixels: &PosterPixels) {
        let bytes = glib::Bytes::from(pixels.rgba.as_slice());
        let texture = gdk4::MemoryTexture::new(
            pixels.width as i32,
            pixels.height as i32,
            gdk4::MemoryFormat::R8g8b8a8,
            &bytes,
            (pixels.width as usize) * 4,
        );
        self.poster.set_paintable(Some(&texture));
    }
}
