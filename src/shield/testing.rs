//! Recording host for shield tests

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::ShieldSettings;
use crate::shared::{Geometry, Monitor};
use crate::widgets::{Cell, ScreensaverWidget, WidgetClass, WidgetRegistry};

use super::host::{
    ActionMode, Compositor, InhibitTicket, Inhibitor, LockFlagStore, SessionBridge, ShieldHost,
    ShieldView, WidgetId,
};
use super::{Key, ScreenShield, ShieldEvent};

#[derive(Debug)]
pub struct HostState {
    pub monitors: Vec<Monitor>,
    pub pointer: (i32, i32),
    pub deny_modal: bool,
    pub modal_stack: Vec<ActionMode>,
    pub cursor_visible: bool,
    pub desklets_visible: bool,
    pub clipboard_clears: usize,

    pub backgrounds: usize,
    pub visible: bool,
    pub opacity: u8,
    /// Monitor name the unlock dialog is on
    pub dialog: Option<String>,
    pub dialog_fading: bool,
    pub password: String,
    pub away_prompt_open: bool,
    pub away_message: Option<String>,
    pub info_panel: Option<String>,
    pub widgets: BTreeMap<WidgetId, (Geometry, String)>,

    pub backend_locks: Vec<u32>,
    pub backend_unlocks: usize,
    pub grab_releases: usize,
    /// Keys handed to the backend's password entry, in order
    pub forwarded_keys: Vec<Key>,
    pub inhibit_requests: Vec<InhibitTicket>,

    pub persisted: bool,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            monitors: vec![Monitor::new("DP-1", Geometry::new(0, 0, 1920, 1080), true)],
            pointer: (960, 540),
            deny_modal: false,
            modal_stack: Vec::new(),
            cursor_visible: true,
            desklets_visible: true,
            clipboard_clears: 0,
            backgrounds: 0,
            visible: false,
            opacity: 0,
            dialog: None,
            dialog_fading: false,
            password: String::new(),
            away_prompt_open: false,
            away_message: None,
            info_panel: None,
            widgets: BTreeMap::new(),
            backend_locks: Vec::new(),
            backend_unlocks: 0,
            grab_releases: 0,
            forwarded_keys: Vec::new(),
            inhibit_requests: Vec::new(),
            persisted: false,
        }
    }
}

#[derive(Clone)]
struct Recorder(Rc<RefCell<HostState>>);

impl Compositor for Recorder {
    fn monitors(&self) -> Vec<Monitor> {
        self.0.borrow().monitors.clone()
    }

    fn pointer_position(&self) -> (i32, i32) {
        self.0.borrow().pointer
    }

    fn push_modal(&mut self, mode: ActionMode) -> bool {
        let mut host = self.0.borrow_mut();
        if host.deny_modal {
            return false;
        }
        host.modal_stack.push(mode);
        true
    }

    fn pop_modal(&mut self) {
        self.0.borrow_mut().modal_stack.pop();
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.0.borrow_mut().cursor_visible = visible;
    }

    fn set_desklets_visible(&mut self, visible: bool) {
        self.0.borrow_mut().desklets_visible = visible;
    }

    fn clear_clipboards(&mut self) {
        self.0.borrow_mut().clipboard_clears += 1;
    }
}

impl ShieldView for Recorder {
    fn stage_window(&self) -> u32 {
        0x0140_0001
    }

    fn set_backgrounds(&mut self, monitors: &[Monitor]) {
        self.0.borrow_mut().backgrounds = monitors.len();
    }

    fn clear_backgrounds(&mut self) {
        self.0.borrow_mut().backgrounds = 0;
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }

    fn fade_shield(&mut self, opacity: u8, _duration: Duration) {
        self.0.borrow_mut().opacity = opacity;
    }

    fn show_unlock_dialog(&mut self, monitor: &Monitor, _fade: Duration) {
        let mut host = self.0.borrow_mut();
        host.dialog = Some(monitor.name.clone());
        host.dialog_fading = false;
    }

    fn move_unlock_dialog(&mut self, monitor: &Monitor) {
        self.0.borrow_mut().dialog = Some(monitor.name.clone());
    }

    fn fade_out_unlock_dialog(&mut self, _duration: Duration) {
        self.0.borrow_mut().dialog_fading = true;
    }

    fn hide_unlock_dialog(&mut self) {
        let mut host = self.0.borrow_mut();
        host.dialog = None;
        host.dialog_fading = false;
        host.password.clear();
    }

    fn forward_to_password(&mut self, key: Key) {
        let mut host = self.0.borrow_mut();
        match key {
            Key::Char(ch) => host.password.push(ch),
            Key::Backspace => {
                host.password.pop();
            }
            _ => {}
        }
    }

    fn open_away_prompt(&mut self) {
        self.0.borrow_mut().away_prompt_open = true;
    }

    fn close_away_prompt(&mut self) {
        self.0.borrow_mut().away_prompt_open = false;
    }

    fn set_away_message(&mut self, message: Option<&str>) {
        self.0.borrow_mut().away_message = message.map(str::to_string);
    }

    fn place_info_panel(&mut self, monitor: &Monitor) {
        self.0.borrow_mut().info_panel = Some(monitor.name.clone());
    }

    fn place_widget(&mut self, id: WidgetId, rect: Geometry, label: &str) {
        self.0.borrow_mut().widgets.insert(id, (rect, label.to_string()));
    }

    fn remove_widget(&mut self, id: WidgetId) {
        self.0.borrow_mut().widgets.remove(&id);
    }
}

impl SessionBridge for Recorder {
    fn lock(&mut self, stage_window: u32) {
        self.0.borrow_mut().backend_locks.push(stage_window);
    }

    fn unlock(&mut self) {
        self.0.borrow_mut().backend_unlocks += 1;
    }

    fn release_grabs(&mut self) {
        self.0.borrow_mut().grab_releases += 1;
    }

    fn forward_key(&mut self, key: Key) {
        self.0.borrow_mut().forwarded_keys.push(key);
    }

    fn request_inhibitor(&mut self, _reason: &str, ticket: InhibitTicket) {
        self.0.borrow_mut().inhibit_requests.push(ticket);
    }
}

impl LockFlagStore for Recorder {
    fn load(&self) -> bool {
        self.0.borrow().persisted
    }

    fn store(&mut self, locked: bool) {
        self.0.borrow_mut().persisted = locked;
    }
}

/// Widget with a fixed anchor and label
struct TestWidget {
    cell: Cell,
    label: &'static str,
}

impl ScreensaverWidget for TestWidget {
    fn awake_position(&self) -> Cell {
        self.cell
    }

    fn preferred_width(&self) -> u32 {
        200
    }

    fn preferred_height(&self, _width: u32) -> u32 {
        50
    }

    fn label(&self) -> String {
        self.label.to_string()
    }
}

fn top_left() -> Result<Box<dyn ScreensaverWidget>> {
    Ok(Box::new(TestWidget {
        cell: Cell::TOP_LEFT,
        label: "top-left",
    }))
}

fn top_right() -> Result<Box<dyn ScreensaverWidget>> {
    Ok(Box::new(TestWidget {
        cell: Cell::TOP_RIGHT,
        label: "top-right",
    }))
}

pub const TOP_LEFT_WIDGET: WidgetClass = WidgetClass::new("test-top-left", top_left);
pub const TOP_RIGHT_WIDGET: WidgetClass = WidgetClass::new("test-top-right", top_right);

fn broken() -> Result<Box<dyn ScreensaverWidget>> {
    bail!("widget assets missing")
}

pub const BROKEN_WIDGET: WidgetClass = WidgetClass::new("test-broken", broken);

/// Settings with a long lock delay so tests control when locking happens
pub fn settings() -> ShieldSettings {
    ShieldSettings {
        lock_delay: Duration::from_secs(60),
        ..ShieldSettings::default()
    }
}

pub struct Harness {
    pub host: Rc<RefCell<HostState>>,
    released: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            host: Rc::new(RefCell::new(HostState::default())),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        let harness = Self::new();
        harness.host.borrow_mut().monitors = monitors;
        harness
    }

    fn host_impls(&self) -> ShieldHost {
        let recorder = Recorder(self.host.clone());
        ShieldHost {
            compositor: Box::new(recorder.clone()),
            view: Box::new(recorder.clone()),
            session: Box::new(recorder.clone()),
            store: Box::new(recorder),
        }
    }

    /// Shield with the two fixed-anchor test widgets
    pub fn shield(&self, settings: ShieldSettings) -> ScreenShield {
        let mut registry = WidgetRegistry::new();
        registry.register(TOP_LEFT_WIDGET);
        registry.register(TOP_RIGHT_WIDGET);
        self.shield_with(settings, registry)
    }

    pub fn shield_with(&self, settings: ShieldSettings, registry: WidgetRegistry) -> ScreenShield {
        ScreenShield::new(settings, self.host_impls(), registry)
    }

    /// Answer the oldest outstanding inhibitor request
    pub fn grant_inhibitor(&self, shield: &mut ScreenShield) -> bool {
        let ticket = {
            let mut host = self.host.borrow_mut();
            if host.inhibit_requests.is_empty() {
                return false;
            }
            host.inhibit_requests.remove(0)
        };

        let released = self.released.clone();
        let inhibitor = Inhibitor::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        });
        shield.handle_event(ShieldEvent::InhibitorReady {
            ticket,
            inhibitor: Some(inhibitor),
        });
        true
    }

    /// Inhibitors closed so far
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn set_pointer(&self, x: i32, y: i32) {
        self.host.borrow_mut().pointer = (x, y);
    }
}

/// Fire every timer that is already due, including ones armed with no delay
pub fn settle(shield: &mut ScreenShield) {
    for _ in 0..32 {
        match shield.next_deadline() {
            Some(deadline) if deadline <= tokio::time::Instant::now() => shield.dispatch_timers(),
            _ => return,
        }
    }
}

/// Move the paused clock forward and run whatever came due
pub async fn advance(shield: &mut ScreenShield, duration: Duration) {
    tokio::time::advance(duration).await;
    settle(shield);
}
