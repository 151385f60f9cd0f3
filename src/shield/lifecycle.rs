//! Activate / lock / unlock / deactivate and the unlock dialog

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ShieldSettings;

use super::timers::TimerKind;
use super::{
    ActionMode, DIALOG_FADE_TIME, SHIELD_FADE_TIME, ScreenShield, ShieldSignal, State,
    WIDGET_LOAD_DELAY,
};

impl ScreenShield {
    /// Show the screensaver.
    ///
    /// No-op unless hidden. Fails without any visible change when the
    /// modal grab is denied.
    pub fn activate(&mut self, immediate: bool) {
        if self.state != State::Hidden {
            debug!("Screen shield already active ({:?})", self.state);
            return;
        }

        info!("Activating screen shield");
        if !self.raise_shield(State::Shown) {
            return;
        }

        if immediate {
            self.view.fade_shield(255, Duration::ZERO);
            self.on_shield_shown();
        } else {
            self.view.fade_shield(255, SHIELD_FADE_TIME);
            self.timers.arm(TimerKind::ShieldFade, SHIELD_FADE_TIME);
        }
    }

    /// Start dimming after the session went idle; input during the fade cancels it
    pub fn begin_idle_fade(&mut self) {
        if self.state != State::Hidden {
            return;
        }

        info!("Session idle, fading out over {:?}", self.settings.idle_fade);
        if !self.raise_shield(State::Fading) {
            return;
        }

        self.view.fade_shield(255, self.settings.idle_fade);
        self.timers.arm(TimerKind::IdleFade, self.settings.idle_fade);
    }

    pub(super) fn idle_activated(&mut self) {
        if self.settings.idle_fade.is_zero() {
            self.activate(false);
        } else {
            self.begin_idle_fade();
        }
    }

    /// Grab input and put the shield on screen in `state`
    fn raise_shield(&mut self, state: State) -> bool {
        if !self.compositor.push_modal(ActionMode::LockScreen) {
            error!("Failed to grab input, not showing the screen shield");
            return false;
        }
        self.modal = Some(ActionMode::LockScreen);

        if !self.transition(state) {
            self.release_modal();
            return false;
        }

        self.motion_anchor = Some(self.compositor.pointer_position());
        self.rebuild_backgrounds();
        self.compositor.set_cursor_visible(false);
        self.compositor.set_desklets_visible(false);
        self.view.set_visible(true);
        true
    }

    pub(super) fn on_shield_shown(&mut self) {
        if self.state == State::Hidden {
            return;
        }
        self.timers.arm(TimerKind::WidgetLoad, WIDGET_LOAD_DELAY);
    }

    pub(super) fn finish_idle_fade(&mut self) {
        if self.state != State::Fading {
            return;
        }

        self.timers.cancel(TimerKind::IdleFade);
        if !self.transition(State::Shown) {
            return;
        }
        self.view.fade_shield(255, Duration::ZERO);
        self.on_shield_shown();
    }

    /// Lock the session, activating the shield first when needed.
    ///
    /// With `ask_for_away_message` (and the setting enabled) a prompt opens
    /// instead; locking resumes once it is dismissed.
    pub fn lock(&mut self, ask_for_away_message: bool, immediate: bool) {
        if self.is_locked() {
            debug!("Screen shield already locked");
            return;
        }

        if self.away_prompt.is_some() {
            if ask_for_away_message {
                debug!("Away message prompt already open");
                return;
            }
            // Suspend, logind and the lock delay lock without waiting for the user
            info!("Locking with the away message prompt still open");
            self.away_prompt = None;
            self.view.close_away_prompt();
        }

        if ask_for_away_message && self.settings.ask_for_away_message {
            info!("Asking for an away message before locking");
            self.away_prompt = Some(immediate);
            self.view.open_away_prompt();
            return;
        }

        match self.state {
            State::Hidden => self.activate(immediate),
            State::Fading => self.finish_idle_fade(),
            _ => {}
        }

        if self.state != State::Shown {
            error!("Cannot lock: screen shield could not be shown");
            return;
        }

        self.stop_lock_delay();
        if !self.transition(State::Locked) {
            return;
        }

        info!("Screen locked");
        self.view.set_away_message(self.away_message.as_deref());
        self.session.lock(self.view.stage_window());
        self.signals.push(ShieldSignal::Locked);
    }

    pub(super) fn away_message_entered(&mut self, message: Option<String>) {
        let Some(immediate) = self.away_prompt.take() else {
            warn!("Away message received without an open prompt");
            return;
        };

        self.away_message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        self.lock(false, immediate);
    }

    /// Unlock and hide everything. No-op unless locked.
    pub fn unlock(&mut self) {
        if !self.is_locked() {
            debug!("Screen shield not locked, nothing to unlock");
            return;
        }

        info!("Unlocking screen shield");
        if self.state == State::Unlocking {
            self.close_unlock_dialog();
        }

        self.hide_shield();
        if !self.transition(State::Hidden) {
            return;
        }

        self.away_message = None;
        self.view.set_away_message(None);
        self.session.unlock();
        self.signals.push(ShieldSignal::Unlocked);
    }

    /// Hide an unlocked screensaver. Refuses while locked.
    pub fn deactivate(&mut self) {
        if self.state == State::Hidden {
            return;
        }

        if self.is_locked() {
            warn!("Refusing to deactivate a locked screen shield");
            return;
        }

        info!("Deactivating screen shield");
        self.hide_shield();
        self.transition(State::Hidden);
    }

    /// Teardown shared by unlock and deactivate
    fn hide_shield(&mut self) {
        self.stop_lock_delay();
        self.timers.cancel(TimerKind::ShieldFade);
        self.timers.cancel(TimerKind::IdleFade);
        self.timers.cancel(TimerKind::GrabRetry);

        if self.away_prompt.take().is_some() {
            self.view.close_away_prompt();
        }

        self.view.fade_shield(0, SHIELD_FADE_TIME);
        self.release_modal();
        self.view.set_visible(false);
        self.destroy_widgets();
        self.clear_backgrounds();
        self.compositor.set_cursor_visible(true);
        self.compositor.set_desklets_visible(true);
        self.motion_anchor = None;
    }

    /// Bring up the unlock dialog on the pointer's monitor. No-op unless locked.
    pub fn show_unlock_dialog(&mut self) {
        if self.state != State::Locked {
            debug!("Not showing unlock dialog in {:?}", self.state);
            return;
        }

        self.compositor.clear_clipboards();
        if !self.transition(State::Unlocking) {
            return;
        }

        if !self.retag_modal(ActionMode::UnlockScreen) {
            warn!("Unlock dialog needs its own grab, staying locked");
            self.transition(State::Locked);
            return;
        }
        self.compositor.set_cursor_visible(true);

        let index = self.compositor.pointer_monitor();
        self.pointer_monitor = Some(index);
        let index = self.awake_monitor_index();
        match self.monitors.get(index) {
            Some(monitor) => {
                self.view.show_unlock_dialog(monitor, DIALOG_FADE_TIME);
                self.dialog_visible = true;
            }
            None => warn!("No monitor to show the unlock dialog on"),
        }

        self.wake_widgets();
    }

    /// Fade the unlock dialog out and go back to locked. No-op unless unlocking.
    pub fn hide_unlock_dialog(&mut self) {
        if self.state != State::Unlocking || self.timers.is_armed(TimerKind::DialogFade) {
            return;
        }

        self.compositor.clear_clipboards();
        self.view.fade_out_unlock_dialog(DIALOG_FADE_TIME);
        self.timers.arm(TimerKind::DialogFade, DIALOG_FADE_TIME);
    }

    pub(super) fn finish_hide_unlock_dialog(&mut self) {
        if self.state != State::Unlocking {
            return;
        }

        self.close_unlock_dialog();
        if !self.transition(State::Locked) {
            return;
        }

        self.retag_modal(ActionMode::LockScreen);
        self.compositor.set_cursor_visible(false);
        self.motion_anchor = Some(self.compositor.pointer_position());
        self.sleep_widgets();
    }

    fn close_unlock_dialog(&mut self) {
        self.timers.cancel(TimerKind::DialogFade);
        if self.dialog_visible {
            self.view.hide_unlock_dialog();
            self.dialog_visible = false;
        }
    }

    pub(super) fn start_lock_delay(&mut self) {
        if self.state != State::Shown || !self.settings.lock_enabled {
            return;
        }

        if self.settings.lock_delay.is_zero() {
            self.lock(false, false);
        } else {
            debug!("Locking in {:?}", self.settings.lock_delay);
            self.timers.arm(TimerKind::LockDelay, self.settings.lock_delay);
        }
    }

    pub(super) fn stop_lock_delay(&mut self) {
        self.timers.cancel(TimerKind::LockDelay);
    }

    /// logind PrepareForSleep
    pub fn prepare_for_sleep(&mut self, about_to_suspend: bool) {
        if about_to_suspend {
            if self.settings.lock_on_suspend && !self.is_locked() {
                info!("System is suspending, locking first");
                self.lock(false, true);
            }
        } else if self.state == State::Locked {
            info!("Resumed from suspend, showing unlock dialog");
            self.show_unlock_dialog();
        }
    }

    pub(super) fn session_active(&mut self, active: bool) {
        debug!("Session active: {}", active);
        if active && self.state == State::Locked {
            self.show_unlock_dialog();
        }
    }

    pub(super) fn apply_settings(&mut self, settings: ShieldSettings) {
        info!("Applying new screen shield settings");
        let floating_changed = settings.floating_widgets != self.settings.floating_widgets;
        self.settings = settings;

        // Past the load phase the countdown restarts with the new delay
        let loading = self.timers.is_armed(TimerKind::ShieldFade)
            || self.timers.is_armed(TimerKind::WidgetLoad);
        if self.state == State::Shown && !loading {
            self.stop_lock_delay();
            self.start_lock_delay();
        }

        self.sync_inhibitor();

        if floating_changed {
            self.sync_widget_mode();
        }
    }
}
