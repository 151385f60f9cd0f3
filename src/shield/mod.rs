//! Screen Shield
//!
//! The lock screen: a full-screen overlay that coordinates idle-triggered
//! screensaving, locking, the unlock dialog, screensaver widgets and the
//! sleep inhibitor negotiated with logind.
//!
//! The shield is a single-owner state machine. The event loop feeds it
//! [`ShieldEvent`]s and fires its timers; it talks back to the host only
//! through the traits in [`host`].

mod capture;
pub mod events;
pub mod host;
mod inhibit;
mod lifecycle;
mod monitors;
mod placement;
pub mod state;
pub mod store;
mod timers;

#[cfg(test)]
mod testing;

use std::mem;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::ShieldSettings;
use crate::shared::Monitor;
use crate::widgets::{Occupancy, WidgetClass, WidgetRegistry};

pub use events::{InputEvent, Key, ShieldEvent, ShieldSignal};
pub use host::{
    ActionMode, Compositor, InhibitTicket, Inhibitor, LockFlagStore, SessionBridge, ShieldHost,
    ShieldView, WidgetId,
};
pub use state::{InvalidTransition, State};

use inhibit::InhibitorSlot;
use placement::LiveWidget;
use timers::{TimerKind, Timers};

/// Shield fade-in after activation
pub const SHIELD_FADE_TIME: Duration = Duration::from_millis(300);

/// Unlock dialog fade-out
pub const DIALOG_FADE_TIME: Duration = Duration::from_millis(200);

/// Delay between the shield appearing and widgets being created
pub const WIDGET_LOAD_DELAY: Duration = Duration::from_millis(500);

/// Pointer travel needed to wake the shield, in pixels
pub const MOTION_THRESHOLD: f64 = 100.0;

/// How often a lost modal grab is retried
pub const GRAB_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Reason given to logind for the sleep inhibitor
pub const INHIBIT_REASON: &str = "Screensaver is up, waiting for lock";

pub struct ScreenShield {
    state: State,
    settings: ShieldSettings,

    compositor: Box<dyn Compositor>,
    view: Box<dyn ShieldView>,
    session: Box<dyn SessionBridge>,
    store: Box<dyn LockFlagStore>,

    /// Action mode of the modal grab, when held
    modal: Option<ActionMode>,
    timers: Timers,
    inhibitor: InhibitorSlot,

    /// Monitors the background actors were built for
    monitors: Vec<Monitor>,
    /// Last monitor the pointer was seen on
    pointer_monitor: Option<usize>,
    /// Last accepted pointer position, for the wake threshold
    motion_anchor: Option<(i32, i32)>,
    dialog_visible: bool,

    registry: WidgetRegistry,
    widgets: Vec<LiveWidget>,
    occupancy: Occupancy,
    next_widget_id: u64,
    /// Next registry index to build while widgets load
    load_index: Option<usize>,
    rng: fastrand::Rng,

    away_message: Option<String>,
    /// Pending away message prompt; holds the `immediate` flag of the lock call
    away_prompt: Option<bool>,

    signals: Vec<ShieldSignal>,
}

impl ScreenShield {
    /// Create the shield.
    ///
    /// Built-in widgets are registered when `registry` is empty. If the
    /// previous shell instance left the session locked, the shield re-locks
    /// right away without animation.
    pub fn new(settings: ShieldSettings, host: ShieldHost, mut registry: WidgetRegistry) -> Self {
        registry.register_builtins();

        let ShieldHost {
            compositor,
            view,
            session,
            store,
        } = host;

        let mut shield = Self {
            state: State::Hidden,
            settings,
            compositor,
            view,
            session,
            store,
            modal: None,
            timers: Timers::new(),
            inhibitor: InhibitorSlot::default(),
            monitors: Vec::new(),
            pointer_monitor: None,
            motion_anchor: None,
            dialog_visible: false,
            registry,
            widgets: Vec::new(),
            occupancy: Occupancy::new(),
            next_widget_id: 1,
            load_index: None,
            rng: fastrand::Rng::new(),
            away_message: None,
            away_prompt: None,
            signals: Vec::new(),
        };

        if shield.store.load() {
            info!("Session was locked before restart, locking again");
            shield.session.release_grabs();
            shield.lock(false, true);
        }

        shield
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// Unlock dialog is up
    pub fn is_awake(&self) -> bool {
        self.state == State::Unlocking
    }

    pub fn modal_mode(&self) -> Option<ActionMode> {
        self.modal
    }

    pub fn holds_inhibitor(&self) -> bool {
        self.inhibitor.is_held()
    }

    pub fn settings(&self) -> &ShieldSettings {
        &self.settings
    }

    pub fn register_widget(&mut self, class: WidgetClass) -> bool {
        self.registry.register(class)
    }

    pub fn deregister_widget(&mut self, class: &WidgetClass) -> bool {
        self.registry.deregister(class)
    }

    /// Drain queued notifications
    pub fn take_signals(&mut self) -> Vec<ShieldSignal> {
        mem::take(&mut self.signals)
    }

    /// Dispatch one event from the host
    pub fn handle_event(&mut self, event: ShieldEvent) {
        match event {
            ShieldEvent::Input(input) => self.handle_input(input),
            ShieldEvent::MonitorsChanged => self.monitors_changed(),
            ShieldEvent::IdleActivated => self.idle_activated(),
            ShieldEvent::PrepareForSleep(about_to_suspend) => self.prepare_for_sleep(about_to_suspend),
            ShieldEvent::SessionLock => self.lock(false, false),
            ShieldEvent::SessionUnlock => self.unlock(),
            ShieldEvent::SessionActive(active) => self.session_active(active),
            ShieldEvent::InhibitorReady { ticket, inhibitor } => self.inhibitor_ready(ticket, inhibitor),
            ShieldEvent::AwayMessageEntered(message) => self.away_message_entered(message),
            ShieldEvent::DialogAuthenticated => self.unlock(),
            ShieldEvent::DialogCancelled => self.hide_unlock_dialog(),
            ShieldEvent::SettingsChanged(settings) => self.apply_settings(settings),
            ShieldEvent::LockRequested { ask_for_away_message } => self.lock(ask_for_away_message, false),
            ShieldEvent::SetActive(true) => self.activate(false),
            ShieldEvent::SetActive(false) => self.deactivate(),
        }
    }

    /// Nearest timer deadline, if any timer is armed
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fire every timer that is due.
    ///
    /// Each timer is disarmed before its handler runs. A handler that
    /// cancels or re-arms another due timer is respected; a timer re-armed
    /// by its own handler waits for the next call.
    pub fn dispatch_timers(&mut self) {
        let now = Instant::now();
        for kind in self.timers.due(now) {
            if !self.timers.take_if_due(kind, now) {
                continue;
            }

            debug!("Timer fired: {:?}", kind);
            match kind {
                TimerKind::ShieldFade => self.on_shield_shown(),
                TimerKind::IdleFade => self.finish_idle_fade(),
                TimerKind::WidgetLoad => self.on_widget_load(),
                TimerKind::WidgetIdle => self.load_next_widget(),
                TimerKind::LockDelay => self.lock(false, false),
                TimerKind::FloatTick => self.on_float_tick(),
                TimerKind::DialogFade => self.finish_hide_unlock_dialog(),
                TimerKind::GrabRetry => self.retry_modal(),
            }
        }
    }

    /// Move to `next`, persisting the locked flag and re-evaluating the inhibitor
    fn set_state(&mut self, next: State) -> Result<(), InvalidTransition> {
        let old = self.state;
        if !old.can_transition_to(next) {
            return Err(InvalidTransition { from: old, to: next });
        }

        info!("Screen shield: {:?} -> {:?}", old, next);
        self.state = next;
        self.store.store(next.is_locked());
        self.signals.push(ShieldSignal::StateChanged { old, new: next });
        self.sync_inhibitor();
        Ok(())
    }

    /// `set_state` for callers that only log the failure
    fn transition(&mut self, next: State) -> bool {
        match self.set_state(next) {
            Ok(()) => true,
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    fn release_modal(&mut self) {
        if self.modal.take().is_some() {
            self.compositor.pop_modal();
        }
    }

    /// Switch the action mode without leaving the grab to anyone else.
    ///
    /// Returns false when the new mode could not be taken. If the old mode
    /// could not be restored either, the grab is retried on a timer.
    fn retag_modal(&mut self, mode: ActionMode) -> bool {
        let Some(current) = self.modal else {
            error!("Cannot switch action mode to {:?}: no modal grab held", mode);
            return false;
        };
        if current == mode {
            return true;
        }

        self.compositor.pop_modal();
        if self.compositor.push_modal(mode) {
            self.modal = Some(mode);
            return true;
        }

        error!("Failed to re-grab input in {:?} mode, restoring {:?}", mode, current);
        if !self.compositor.push_modal(current) {
            error!(
                "Failed to restore modal grab; input is not captured while {:?}, retrying",
                self.state
            );
            self.modal = None;
            self.timers.arm(TimerKind::GrabRetry, GRAB_RETRY_INTERVAL);
        }
        false
    }

    /// Action mode matching the current state
    fn wanted_modal(&self) -> ActionMode {
        match self.state {
            State::Unlocking => ActionMode::UnlockScreen,
            _ => ActionMode::LockScreen,
        }
    }

    pub(super) fn retry_modal(&mut self) {
        if self.state == State::Hidden || self.modal.is_some() {
            return;
        }

        let mode = self.wanted_modal();
        if self.compositor.push_modal(mode) {
            info!("Modal grab recovered ({:?})", mode);
            self.modal = Some(mode);
            self.timers.cancel(TimerKind::GrabRetry);
        } else {
            debug!("Modal grab still unavailable");
            self.timers.arm(TimerKind::GrabRetry, GRAB_RETRY_INTERVAL);
        }
    }
}
