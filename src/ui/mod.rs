pub mod slide;
pub mod surface;
pub mod window;

pub use window::FeedWindow;
