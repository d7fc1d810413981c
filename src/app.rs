use gtk4::prelude::*;
use gtk4::{gio, Application};
use tracing::{error, info, warn};

use crate::config::Tuning;
use crate::models::{self, VideoItem};
use crate::ui::FeedWindow;

const APP_ID: &str = "dev.flickd.Feed";

pub struct FlickdApp {
    app: Application,
}

impl FlickdApp {
    pub fn new() -> Self {
        let app = Application::builder()
            .application_id(APP_ID)
            .flags(gio::ApplicationFlags::HANDLES_OPEN)
            .build();

        app.connect_activate(Self::on_activate);
        app.connect_open(Self::on_open);

        Self { app }
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }

    fn on_activate(app: &Application) {
        warn!("No listing document given; opening an empty feed");
        Self::present(app, Vec::new());
    }

    fn on_open(app: &Application, files: &[gio::File], _hint: &str) {
        let items = match files.first().and_then(|f| f.path()) {
            Some(path) => match models::load_listing(&path) {
                Ok(items) => items,
                Err(err) => {
                    error!(error = ?err, "Failed to load listing document");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Self::present(app, items);
    }

    fn present(app: &Application, items: Vec<VideoItem>) {
        let tuning = Tuning::load_default();
        info!(items = items.len(), "Opening feed");
        let window = FeedWindow::new(app, items, tuning);
        window.present();
        // Keep the window alive by storing it on the Application.
        unsafe {
            app.set_data("feed-window", window);
        }
    }
}

impl Default for FlickdApp {
    fn default() -> Self {
        Self::new()
    }
}
