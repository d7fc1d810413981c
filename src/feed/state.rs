//! Shared feed state: which item is active, what has been loaded, who the
//! user paused, and the global mute policy.
//!
//! Single-writer: only the controller mutates this, inside one
//! reconciliation pass. Everything else reads.

use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct FeedState {
    /// Id of the item in focus, if any.
    active: Option<String>,
    /// Global mute flag. Starts true; autoplay must be silent until a user
    /// gesture says otherwise.
    muted: bool,
    /// One-way latch set by the first interaction with a playback control.
    sound_unlocked: bool,
    /// Ids whose media source has been attached. Sticky: never shrinks, so
    /// scrolling back never re-fetches a manifest.
    loaded: HashSet<String>,
    /// Explicit per-item pause intent. Cleared when an item becomes newly
    /// active.
    user_paused: HashMap<String, bool>,
}

impl FeedState {
    pub fn new() -> Self {
        Self {
            active: None,
            muted: true,
            sound_unlocked: false,
            loaded: HashSet::new(),
            user_paused: HashMap::new(),
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn sound_unlocked(&self) -> bool {
        self.sound_unlocked
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.contains(id)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Absent means not paused; a fresh arrival autoplays.
    pub fn is_user_paused(&self, id: &str) -> bool {
        self.user_paused.get(id).copied().unwrap_or(false)
    }

    pub(crate) fn set_active(&mut self, id: Option<String>) {
        self.active = id;
    }

    /// Returns true when the id was not loaded before.
    pub(crate) fn mark_loaded(&mut self, id: &str) -> bool {
        self.loaded.insert(id.to_string())
    }

    pub(crate) fn set_user_paused(&mut self, id: &str, paused: bool) {
        self.user_paused.insert(id.to_string(), paused);
    }

    pub(crate) fn clear_user_paused(&mut self, id: &str) {
        self.user_paused.remove(id);
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// First playback gesture: permanently clear the mute flag. The latch
    /// never resets.
    pub(crate) fn unlock_sound(&mut self) {
        self.sound_unlocked = true;
        self.muted = false;
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_muted_and_locked() {
        let state = FeedState::new();
        assert!(state.is_muted());
        assert!(!state.sound_unlocked());
        assert!(state.active_id().is_none());
    }

    #[test]
    fn test_unlock_sound_is_one_way() {
        let mut state = FeedState::new();
        state.unlock_sound();
        assert!(!state.is_muted());
        assert!(state.sound_unlocked());

        // A later mute-toggle does not re-lock.
        state.set_muted(true);
        assert!(state.is_muted());
        assert!(state.sound_unlocked());
    }

    #[test]
    fn test_loaded_set_grows() {
        let mut state = FeedState::new();
        assert!(state.mark_loaded("a"));
        assert!(!state.mark_loaded("a"));
        assert!(state.is_loaded("a"));
        assert_eq!(state.loaded_count(), 1);
    }

    #[test]
    fn test_user_paused_defaults_to_false() {
        let mut state = FeedState::new();
        assert!(!state.is_user_paused("a"));
        state.set_user_paused("a", true);
        assert!(state.is_user_paused("a"));
        state.clear_user_paused("a");
        assert!(!state.is_user_paused("a"));
    }
}
