//! Messages into and out of the shield
//!
//! The event loop turns every host notification into a [`ShieldEvent`] and
//! feeds it to [`ScreenShield::handle_event`](super::ScreenShield::handle_event);
//! the shield is the only thing that mutates its state.

use crate::config::ShieldSettings;

use super::host::{InhibitTicket, Inhibitor};
use super::state::State;

/// Raw input captured while the shield is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Motion { x: i32, y: i32 },
    Button,
    Key(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    /// Printable character
    Char(char),
    Backspace,
    /// Return or keypad Enter
    Enter,
    Other,
}

impl Key {
    /// Whether the unlock dialog's password entry takes this key
    pub fn edits_password(self) -> bool {
        matches!(self, Key::Char(_) | Key::Backspace | Key::Enter)
    }
}

#[derive(Debug)]
pub enum ShieldEvent {
    Input(InputEvent),
    MonitorsChanged,
    /// The session went idle
    IdleActivated,
    /// logind PrepareForSleep: true before suspend, false after resume
    PrepareForSleep(bool),
    /// logind asked the session to lock
    SessionLock,
    /// logind asked the session to unlock
    SessionUnlock,
    SessionActive(bool),
    InhibitorReady {
        ticket: InhibitTicket,
        inhibitor: Option<Inhibitor>,
    },
    /// Away message prompt dismissed, with whatever was typed
    AwayMessageEntered(Option<String>),
    DialogAuthenticated,
    DialogCancelled,
    SettingsChanged(ShieldSettings),
    /// Lock request from the rest of the shell
    LockRequested { ask_for_away_message: bool },
    /// Screensaver on/off request from the rest of the shell
    SetActive(bool),
}

/// Notifications emitted by the shield
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShieldSignal {
    StateChanged { old: State, new: State },
    Locked,
    Unlocked,
}
