//! Viewport tracking: turn per-slide visible-fraction batches into at most
//! one activation per batch.

use std::cmp::Ordering;

use tracing::trace;

/// One slide's visible fraction within the viewport at an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideVisibility {
    pub index: usize,
    pub fraction: f64,
}

/// Result of processing one visibility batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// A different slide crossed the threshold and is now active.
    Activated(usize),
    /// The already-active slide is still the best candidate.
    Unchanged,
    /// Nothing meets the threshold. The previous active slide is kept:
    /// clearing it would detach a soon-to-return slide's source and stutter.
    NoneVisible,
}

pub struct ViewportTracker {
    threshold: f64,
    active: Option<usize>,
}

impl ViewportTracker {
    /// `threshold` is the visible fraction a slide must reach to activate.
    /// Higher values reduce flicker during fast scrolls at the cost of
    /// slower activation.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            active: None,
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Process one batch of observations. Picks the highest-fraction slide
    /// meeting the threshold; indices outside `item_count` are ignored (the
    /// list may have changed size while a batch was pending).
    pub fn observe(&mut self, batch: &[SlideVisibility], item_count: usize) -> ActivationOutcome {
        let best = batch
            .iter()
            .filter(|v| v.index < item_count)
            .filter(|v| v.fraction.is_finite() && v.fraction >= self.threshold)
            .max_by(|a, b| {
                a.fraction
                    .partial_cmp(&b.fraction)
                    .unwrap_or(Ordering::Equal)
            });

        match best {
            Some(candidate) if self.active != Some(candidate.index) => {
                trace!(
                    index = candidate.index,
                    fraction = candidate.fraction,
                    "Slide activated"
                );
                self.active = Some(candidate.index);
                ActivationOutcome::Activated(candidate.index)
            }
            Some(_) => ActivationOutcome::Unchanged,
            None => ActivationOutcome::NoneVisible,
        }
    }

    /// Forget the active slide when the item list changes identity.
    pub fn reset(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: &[(usize, f64)]) -> Vec<SlideVisibility> {
        entries
            .iter()
            .map(|&(index, fraction)| SlideVisibility { index, fraction })
            .collect()
    }

    #[test]
    fn test_highest_fraction_above_threshold_wins() {
        let mut tracker = ViewportTracker::new(0.75);
        let outcome = tracker.observe(&batch(&[(0, 0.2), (1, 0.8), (2, 0.9)]), 5);
        assert_eq!(outcome, ActivationOutcome::Activated(2));
        assert_eq!(tracker.active_index(), Some(2));
    }

    #[test]
    fn test_below_threshold_preserves_previous() {
        let mut tracker = ViewportTracker::new(0.75);
        tracker.observe(&batch(&[(1, 0.9)]), 5);

        let outcome = tracker.observe(&batch(&[(1, 0.4), (2, 0.5)]), 5);
        assert_eq!(outcome, ActivationOutcome::NoneVisible);
        assert_eq!(tracker.active_index(), Some(1));
    }

    #[test]
    fn test_same_slide_is_unchanged() {
        let mut tracker = ViewportTracker::new(0.6);
        tracker.observe(&batch(&[(3, 0.95)]), 5);
        let outcome = tracker.observe(&batch(&[(3, 0.8)]), 5);
        assert_eq!(outcome, ActivationOutcome::Unchanged);
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let mut tracker = ViewportTracker::new(0.6);
        let outcome = tracker.observe(&batch(&[(7, 1.0)]), 5);
        assert_eq!(outcome, ActivationOutcome::NoneVisible);
        assert_eq!(tracker.active_index(), None);
    }

    #[test]
    fn test_non_finite_fraction_ignored() {
        let mut tracker = ViewportTracker::new(0.6);
        let outcome = tracker.observe(&batch(&[(0, f64::NAN), (1, f64::INFINITY)]), 5);
        assert_eq!(outcome, ActivationOutcome::NoneVisible);
    }

    #[test]
    fn test_threshold_boundary_activates() {
        let mut tracker = ViewportTracker::new(0.75);
        let outcome = tracker.observe(&batch(&[(0, 0.75)]), 1);
        assert_eq!(outcome, ActivationOutcome::Activated(0));
    }

    #[test]
    fn test_reset_forgets_active() {
        let mut tracker = ViewportTracker::new(0.6);
        tracker.observe(&batch(&[(2, 0.9)]), 5);
        tracker.reset();
        assert_eq!(tracker.active_index(), None);
        let outcome = tracker.observe(&batch(&[(2, 0.9)]), 5);
        assert_eq!(outcome, ActivationOutcome::Activated(2));
    }
}
