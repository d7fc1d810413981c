pub mod controller;
pub mod load_window;
pub mod state;
pub mod visibility;

pub use controller::{FeedController, Slide};
pub use state::FeedState;
pub use visibility::{ActivationOutcome, SlideVisibility, ViewportTracker};
