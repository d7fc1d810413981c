pub mod keys;
pub mod scrub;

pub use keys::{command_for_key, FeedCommand, FeedKeys};
pub use scrub::{ScrubConfig, ScrubGesture};
