pub mod handle;
pub mod mpv;

#[cfg(test)]
pub mod fake;

pub use handle::{MediaHandle, PlaybackError, Preload};
