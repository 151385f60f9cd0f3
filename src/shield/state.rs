//! Shield states and the transition table

use thiserror::Error;

/// Screen shield state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Nothing shown, no grab
    Hidden,
    /// Dimming after the session went idle; any input cancels
    Fading,
    /// Screensaver up, session not locked yet
    Shown,
    /// Screensaver up and locked
    Locked,
    /// Locked, unlock dialog on screen
    Unlocking,
}

impl State {
    pub const ALL: [State; 5] = [
        State::Hidden,
        State::Fading,
        State::Shown,
        State::Locked,
        State::Unlocking,
    ];

    /// Locked for the purpose of external queries and the persisted flag
    pub fn is_locked(self) -> bool {
        matches!(self, State::Locked | State::Unlocking)
    }

    pub fn can_transition_to(self, next: State) -> bool {
        use State::*;

        matches!(
            (self, next),
            (Hidden, Fading | Shown | Locked)
                | (Fading, Shown | Hidden)
                | (Shown, Locked | Hidden)
                | (Locked, Unlocking | Hidden)
                | (Unlocking, Locked | Hidden)
        )
    }

    /// Name used on D-Bus
    pub fn as_str(self) -> &'static str {
        match self {
            State::Hidden => "hidden",
            State::Fading => "fading",
            State::Shown => "shown",
            State::Locked => "locked",
            State::Unlocking => "unlocking",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid screen shield transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: State,
    pub to: State,
}
