//! Seams between the shield and its host environment
//!
//! The shield owns its state machine; everything it needs from the display
//! server, the renderer and the session lives behind these traits.

use std::fmt;
use std::time::Duration;

use crate::shared::geometry::{Monitor, monitor_at_point, primary_monitor};
use crate::shared::Geometry;

use super::events::Key;

/// Which key bindings stay active while the shield holds the modal grab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    LockScreen,
    UnlockScreen,
}

/// Handle of a live widget in the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

/// Identifies one inhibitor request so late grants can be matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InhibitTicket(pub u64);

/// Display server: monitors, pointer, input grabs, cursor, selections
pub trait Compositor {
    /// Current monitor layout
    fn monitors(&self) -> Vec<Monitor>;

    /// Pointer position in root coordinates
    fn pointer_position(&self) -> (i32, i32);

    /// Index of the monitor under the pointer
    fn pointer_monitor(&self) -> usize {
        let monitors = self.monitors();
        let (x, y) = self.pointer_position();
        monitor_at_point(&monitors, x, y).unwrap_or_else(|| primary_monitor(&monitors))
    }

    /// Take exclusive keyboard and pointer input. False when denied.
    fn push_modal(&mut self, mode: ActionMode) -> bool;

    /// Give exclusive input back
    fn pop_modal(&mut self);

    fn set_cursor_visible(&mut self, visible: bool);

    /// Desktop icons / desklets layer, when the host has one
    fn set_desklets_visible(&mut self, _visible: bool) {}

    /// Empty the primary and clipboard selections
    fn clear_clipboards(&mut self);
}

/// Everything the shield puts on screen
pub trait ShieldView {
    /// Window identifier handed to the lock backend
    fn stage_window(&self) -> u32;

    /// One darkened background per monitor
    fn set_backgrounds(&mut self, monitors: &[Monitor]);

    fn clear_backgrounds(&mut self);

    fn set_visible(&mut self, visible: bool);

    /// Animate shield opacity (0..=255)
    fn fade_shield(&mut self, opacity: u8, duration: Duration);

    fn show_unlock_dialog(&mut self, monitor: &Monitor, fade: Duration);

    fn move_unlock_dialog(&mut self, monitor: &Monitor);

    fn fade_out_unlock_dialog(&mut self, duration: Duration);

    fn hide_unlock_dialog(&mut self);

    /// Echo a password editing key in the dialog (masked)
    fn forward_to_password(&mut self, key: Key);

    fn open_away_prompt(&mut self);

    fn close_away_prompt(&mut self);

    fn set_away_message(&mut self, message: Option<&str>);

    /// Auxiliary info panel (notifications, power) follows the pointer monitor
    fn place_info_panel(&mut self, monitor: &Monitor);

    fn place_widget(&mut self, id: WidgetId, rect: Geometry, label: &str);

    fn remove_widget(&mut self, id: WidgetId);
}

/// Session and power manager, plus the lock backend
///
/// All calls are fire-and-forget. Inhibitor grants come back later as
/// [`ShieldEvent::InhibitorReady`](super::ShieldEvent::InhibitorReady).
pub trait SessionBridge {
    fn lock(&mut self, stage_window: u32);

    fn unlock(&mut self);

    fn release_grabs(&mut self);

    /// Keystroke for the password entry of the backend's unlock dialog.
    /// Keys must reach the backend in the order given.
    fn forward_key(&mut self, key: Key);

    fn request_inhibitor(&mut self, reason: &str, ticket: InhibitTicket);
}

/// Persisted "session was locked" flag, survives shell restarts
pub trait LockFlagStore {
    fn load(&self) -> bool;

    fn store(&mut self, locked: bool);
}

/// A held sleep inhibitor; released on close or drop
pub struct Inhibitor {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Inhibitor {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn close(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Inhibitor {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Inhibitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inhibitor")
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Host implementations handed to the shield at construction
pub struct ShieldHost {
    pub compositor: Box<dyn Compositor>,
    pub view: Box<dyn ShieldView>,
    pub session: Box<dyn SessionBridge>,
    pub store: Box<dyn LockFlagStore>,
}
