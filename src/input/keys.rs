// Keyboard layer for the feed window.
//
// Keybindings:
// - j / Down: next slide
// - k / Up: previous slide
// - Space: play/pause the active slide (two-phase unmute on first use)
// - f: toggle fullscreen
// - m: toggle mute
// - r: restart the active slide
// - Left / Right: step-seek backward / forward (circular)

use gdk4::Key;
use gtk4::prelude::*;
use gtk4::{ApplicationWindow, EventControllerKey, PropagationPhase};
use std::cell::RefCell;
use std::rc::Rc;

/// User intent expressed through the keyboard. The window routes these to
/// the controller and the scroll surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCommand {
    NextItem,
    PrevItem,
    TogglePlayback,
    ToggleFullscreen,
    ToggleMute,
    Restart,
    SeekBack,
    SeekForward,
}

/// Pure key → command mapping.
pub fn command_for_key(key: Key) -> Option<FeedCommand> {
    match key {
        Key::j | Key::J | Key::Down => Some(FeedCommand::NextItem),
        Key::k | Key::K | Key::Up => Some(FeedCommand::PrevItem),
        Key::space => Some(FeedCommand::TogglePlayback),
        Key::f | Key::F => Some(FeedCommand::ToggleFullscreen),
        Key::m | Key::M => Some(FeedCommand::ToggleMute),
        Key::r | Key::R => Some(FeedCommand::Restart),
        Key::Left => Some(FeedCommand::SeekBack),
        Key::Right => Some(FeedCommand::SeekForward),
        _ => None,
    }
}

/// Callback type for translated commands.
pub type CommandCallback = Box<dyn Fn(FeedCommand)>;

/// Keybinding manager for the feed window.
pub struct FeedKeys {
    controller: EventControllerKey,
    window: Rc<RefCell<Option<glib::WeakRef<ApplicationWindow>>>>,
    on_command: Rc<RefCell<Option<CommandCallback>>>,
}

impl FeedKeys {
    pub fn new() -> Self {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);

        let window: Rc<RefCell<Option<glib::WeakRef<ApplicationWindow>>>> =
            Rc::new(RefCell::new(None));
        let on_command: Rc<RefCell<Option<CommandCallback>>> = Rc::new(RefCell::new(None));

        let window_clone = window.clone();
        let on_command_clone = on_command.clone();
        controller.connect_key_pressed(move |_controller, keyval, _keycode, _state| {
            // Keys belong to text widgets while one has focus.
            if focus_is_editable(&window_clone) {
                return glib::Propagation::Proceed;
            }

            let Some(command) = command_for_key(keyval) else {
                return glib::Propagation::Proceed;
            };

            if let Some(ref callback) = *on_command_clone.borrow() {
                callback(command);
                return glib::Propagation::Stop;
            }
            glib::Propagation::Proceed
        });

        Self {
            controller,
            window,
            on_command,
        }
    }

    /// Attach to the feed window. The window reference is kept weakly for
    /// the editable-focus check.
    pub fn attach(&self, window: &ApplicationWindow) {
        *self.window.borrow_mut() = Some(window.downgrade());
        window.add_controller(self.controller.clone());
    }

    pub fn connect_command<F>(&self, callback: F)
    where
        F: Fn(FeedCommand) + 'static,
    {
        *self.on_command.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for FeedKeys {
    fn default() -> Self {
        Self::new()
    }
}

fn focus_is_editable(
    window: &Rc<RefCell<Option<glib::WeakRef<ApplicationWindow>>>>,
) -> bool {
    let Some(window) = window.borrow().as_ref().and_then(|w| w.upgrade()) else {
        return false;
    };
    let Some(focus) = window.focus_widget() else {
        return false;
    };
    focus.is::<gtk4::Editable>() || focus.is::<gtk4::TextView>() || focus.is::<gtk4::Text>()
}
