//! Input captured while the shield holds the modal grab

use tracing::debug;

use super::events::{InputEvent, Key};
use super::timers::TimerKind;
use super::{MOTION_THRESHOLD, ScreenShield, State};

impl ScreenShield {
    pub(super) fn handle_input(&mut self, event: InputEvent) {
        if self.state == State::Hidden {
            return;
        }
        if self.modal.is_none() {
            self.retry_modal();
        }

        if let InputEvent::Motion { x, y } = event {
            self.update_pointer_monitor(x, y);
        }

        // The dialog owns input while it is up
        if self.state == State::Unlocking {
            match event {
                InputEvent::Key(Key::Escape) => self.hide_unlock_dialog(),
                InputEvent::Key(key) if key.edits_password() => self.forward_to_password(key),
                _ => {}
            }
            return;
        }

        if let InputEvent::Motion { x, y } = event {
            if !self.accept_motion(x, y) {
                return;
            }
        }

        if event == InputEvent::Key(Key::Escape) && !self.is_locked() {
            self.deactivate();
            return;
        }

        match self.state {
            State::Locked => {
                self.show_unlock_dialog();
                // The keystroke that woke the dialog is the first password character
                if let InputEvent::Key(key @ Key::Char(_)) = event {
                    if self.state == State::Unlocking {
                        self.forward_to_password(key);
                    }
                }
            }
            State::Shown | State::Fading => self.deactivate(),
            State::Hidden | State::Unlocking => {}
        }
    }

    fn forward_to_password(&mut self, key: Key) {
        if self.timers.is_armed(TimerKind::DialogFade) {
            return;
        }
        self.view.forward_to_password(key);
        self.session.forward_key(key);
    }

    /// Small pointer jitter does not wake the shield
    fn accept_motion(&mut self, x: i32, y: i32) -> bool {
        let Some((ax, ay)) = self.motion_anchor else {
            self.motion_anchor = Some((x, y));
            return false;
        };

        let dx = f64::from(x - ax);
        let dy = f64::from(y - ay);
        if dx.hypot(dy) < MOTION_THRESHOLD {
            return false;
        }

        debug!("Pointer moved from ({}, {}) to ({}, {})", ax, ay, x, y);
        self.motion_anchor = Some((x, y));
        true
    }
}
