//! Load window: which slides around the active one get a source attached
//! and aggressive buffering.

use crate::media::Preload;

/// Slides this many positions on either side of the active slide are part
/// of the attach/preload window.
pub const WINDOW_RADIUS: usize = 1;

/// Inclusive index range around the active slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadWindow {
    pub start: usize,
    pub end: usize,
}

impl LoadWindow {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }
}

/// The window {pos−1, pos, pos+1} clipped to list bounds.
pub fn window_around(position: usize, item_count: usize) -> Option<LoadWindow> {
    if item_count == 0 || position >= item_count {
        return None;
    }
    Some(LoadWindow {
        start: position.saturating_sub(WINDOW_RADIUS),
        end: (position + WINDOW_RADIUS).min(item_count - 1),
    })
}

/// Buffering mode for a slide given the current window. Previously loaded
/// slides keep their source but stop buffering once they drift out of the
/// window, bounding concurrent connections.
pub fn preload_for(index: usize, window: LoadWindow) -> Preload {
    if window.contains(index) {
        Preload::Auto
    } else {
        Preload::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_in_the_middle() {
        let window = window_around(2, 5).unwrap();
        assert_eq!(window.start, 1);
        assert_eq!(window.end, 3);
        assert_eq!(window.indices().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_window_clipped_at_start() {
        let window = window_around(0, 5).unwrap();
        assert_eq!((window.start, window.end), (0, 1));
    }

    #[test]
    fn test_window_clipped_at_end() {
        let window = window_around(4, 5).unwrap();
        assert_eq!((window.start, window.end), (3, 4));
    }

    #[test]
    fn test_single_item_list() {
        let window = window_around(0, 1).unwrap();
        assert_eq!((window.start, window.end), (0, 0));
    }

    #[test]
    fn test_empty_or_out_of_range() {
        assert!(window_around(0, 0).is_none());
        assert!(window_around(5, 5).is_none());
    }

    #[test]
    fn test_preload_modes() {
        let window = window_around(2, 10).unwrap();
        assert_eq!(preload_for(1, window), Preload::Auto);
        assert_eq!(preload_for(2, window), Preload::Auto);
        assert_eq!(preload_for(3, window), Preload::Auto);
        assert_eq!(preload_for(0, window), Preload::None);
        assert_eq!(preload_for(4, window), Preload::None);
    }
}
