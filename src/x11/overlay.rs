//! Shield windows on X11
//!
//! One override-redirect stage window spans every monitor; each monitor gets
//! a darkened child window as its background. Shield opacity goes through
//! `_NET_WM_WINDOW_OPACITY`, so fades are left to the compositing manager.
//! The dialog, widgets and info panel are tracked here and rendered by the
//! lock backend that owns the stage window.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, PropMode, StackMode,
    Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::shared::{Geometry, Monitor};
use crate::shield::{Key, ShieldView, WidgetId};

use super::Atoms;

/// Background fill of each monitor
const BACKGROUND_PIXEL: u32 = 0x0010_1010;

const STAGE_NAME: &str = "area-lock";

#[derive(Debug)]
struct DialogState {
    monitor: String,
    fading: bool,
    password_len: usize,
}

impl DialogState {
    /// Track the masked entry; the characters themselves go to the lock backend
    fn echo(&mut self, key: Key) {
        match key {
            Key::Char(_) => self.password_len += 1,
            Key::Backspace => self.password_len = self.password_len.saturating_sub(1),
            Key::Enter => debug!("Password submitted ({} chars)", self.password_len),
            Key::Escape | Key::Other => {}
        }
    }
}

pub struct X11Overlay {
    conn: Arc<RustConnection>,
    depth: u8,
    atoms: Atoms,

    stage: Window,
    /// Top-left of the stage in root coordinates
    origin: (i32, i32),
    backgrounds: Vec<Window>,
    mapped: bool,

    dialog: Option<DialogState>,
    away_prompt_open: bool,
    away_message: Option<String>,
    info_panel: Option<String>,
    widgets: BTreeMap<WidgetId, (Geometry, String)>,
}

impl X11Overlay {
    pub fn new(conn: Arc<RustConnection>, screen_num: usize, atoms: Atoms) -> Result<Self> {
        let screen = &conn.setup().roots[screen_num];
        let (root, depth, black_pixel) = (screen.root, screen.root_depth, screen.black_pixel);
        let (width, height) = (screen.width_in_pixels, screen.height_in_pixels);

        let stage = conn.generate_id()?;
        conn.create_window(
            depth,
            stage,
            root,
            0,
            0,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .background_pixel(black_pixel)
                .override_redirect(1),
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            stage,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            STAGE_NAME.as_bytes(),
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            stage,
            atoms.net_wm_name,
            atoms.utf8_string,
            STAGE_NAME.as_bytes(),
        )?;
        conn.flush()?;

        info!("Created shield stage window 0x{:x}", stage);

        Ok(Self {
            conn,
            depth,
            atoms,
            stage,
            origin: (0, 0),
            backgrounds: Vec::new(),
            mapped: false,
            dialog: None,
            away_prompt_open: false,
            away_message: None,
            info_panel: None,
            widgets: BTreeMap::new(),
        })
    }

    fn destroy_backgrounds(&mut self) -> Result<()> {
        for window in self.backgrounds.drain(..) {
            self.conn.destroy_window(window)?;
        }
        Ok(())
    }

    fn build_backgrounds(&mut self, monitors: &[Monitor]) -> Result<()> {
        self.destroy_backgrounds()?;

        let Some(bounds) = bounding_box(monitors) else {
            return Ok(());
        };

        self.origin = (bounds.x, bounds.y);
        self.conn.configure_window(
            self.stage,
            &ConfigureWindowAux::new()
                .x(bounds.x)
                .y(bounds.y)
                .width(bounds.width)
                .height(bounds.height),
        )?;

        for monitor in monitors {
            let g = &monitor.geometry;
            let window = self.conn.generate_id()?;
            self.conn.create_window(
                self.depth,
                window,
                self.stage,
                (g.x - self.origin.0) as i16,
                (g.y - self.origin.1) as i16,
                g.width as u16,
                g.height as u16,
                0,
                WindowClass::INPUT_OUTPUT,
                0,
                &CreateWindowAux::new().background_pixel(BACKGROUND_PIXEL),
            )?;
            self.conn.map_window(window)?;
            self.backgrounds.push(window);
        }

        self.conn.flush()?;
        debug!("Shield backgrounds: {:?}", self.backgrounds);
        Ok(())
    }

    fn set_opacity(&self, opacity: u8) -> Result<()> {
        // 0xff -> 0xffffffff
        let value = u32::from(opacity) * 0x0101_0101;
        self.conn.change_property32(
            PropMode::REPLACE,
            self.stage,
            self.atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[value],
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn map_stage(&mut self, visible: bool) -> Result<()> {
        if visible == self.mapped {
            return Ok(());
        }

        if visible {
            self.conn.map_window(self.stage)?;
            self.conn.configure_window(
                self.stage,
                &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
            )?;
        } else {
            self.conn.unmap_window(self.stage)?;
        }
        self.conn.flush()?;
        self.mapped = visible;
        Ok(())
    }

    fn warn_on_error(what: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!("Failed to {}: {:#}", what, e);
        }
    }
}

impl Drop for X11Overlay {
    fn drop(&mut self) {
        let _ = self.destroy_backgrounds();
        let _ = self.conn.destroy_window(self.stage);
        let _ = self.conn.flush();
    }
}

/// Smallest rectangle covering every monitor
fn bounding_box(monitors: &[Monitor]) -> Option<Geometry> {
    let first = monitors.first()?;
    let mut left = first.geometry.x;
    let mut top = first.geometry.y;
    let mut right = first.geometry.x + first.geometry.width as i32;
    let mut bottom = first.geometry.y + first.geometry.height as i32;

    for m in &monitors[1..] {
        left = left.min(m.geometry.x);
        top = top.min(m.geometry.y);
        right = right.max(m.geometry.x + m.geometry.width as i32);
        bottom = bottom.max(m.geometry.y + m.geometry.height as i32);
    }

    Some(Geometry::new(left, top, (right - left) as u32, (bottom - top) as u32))
}

impl ShieldView for X11Overlay {
    fn stage_window(&self) -> u32 {
        self.stage
    }

    fn set_backgrounds(&mut self, monitors: &[Monitor]) {
        let result = self.build_backgrounds(monitors);
        Self::warn_on_error("build shield backgrounds", result);
    }

    fn clear_backgrounds(&mut self) {
        let result = self.destroy_backgrounds();
        Self::warn_on_error("destroy shield backgrounds", result);
    }

    fn set_visible(&mut self, visible: bool) {
        let result = self.map_stage(visible);
        Self::warn_on_error("change shield visibility", result);
    }

    fn fade_shield(&mut self, opacity: u8, duration: Duration) {
        debug!("Shield opacity -> {} over {:?}", opacity, duration);
        let result = self.set_opacity(opacity);
        Self::warn_on_error("set shield opacity", result);
    }

    fn show_unlock_dialog(&mut self, monitor: &Monitor, fade: Duration) {
        debug!("Unlock dialog on {} (fade {:?})", monitor.name, fade);
        self.dialog = Some(DialogState {
            monitor: monitor.name.clone(),
            fading: false,
            password_len: 0,
        });
    }

    fn move_unlock_dialog(&mut self, monitor: &Monitor) {
        if let Some(dialog) = &mut self.dialog {
            debug!(
                "Unlock dialog moves {} -> {} (fading: {})",
                dialog.monitor, monitor.name, dialog.fading
            );
            dialog.monitor = monitor.name.clone();
        }
    }

    fn fade_out_unlock_dialog(&mut self, duration: Duration) {
        if let Some(dialog) = &mut self.dialog {
            debug!("Unlock dialog fading out over {:?}", duration);
            dialog.fading = true;
        }
    }

    fn hide_unlock_dialog(&mut self) {
        if let Some(dialog) = self.dialog.take() {
            debug!("Unlock dialog closed ({} chars discarded)", dialog.password_len);
        }
    }

    fn forward_to_password(&mut self, key: Key) {
        if let Some(dialog) = &mut self.dialog {
            dialog.echo(key);
        }
    }

    fn open_away_prompt(&mut self) {
        debug!("Away message prompt opened");
        self.away_prompt_open = true;
    }

    fn close_away_prompt(&mut self) {
        if self.away_prompt_open {
            debug!("Away message prompt closed");
        }
        self.away_prompt_open = false;
    }

    fn set_away_message(&mut self, message: Option<&str>) {
        if self.away_message.as_deref() == message {
            return;
        }
        if let Some(message) = message {
            info!("Away message: {}", message);
        }
        self.away_message = message.map(str::to_string);
    }

    fn place_info_panel(&mut self, monitor: &Monitor) {
        if self.info_panel.as_deref() != Some(monitor.name.as_str()) {
            debug!("Info panel on {}", monitor.name);
            self.info_panel = Some(monitor.name.clone());
        }
    }

    fn place_widget(&mut self, id: WidgetId, rect: Geometry, label: &str) {
        debug!("Widget {:?} at {:?}: {:?}", id, rect, label);
        self.widgets.insert(id, (rect, label.to_string()));
    }

    fn remove_widget(&mut self, id: WidgetId) {
        self.widgets.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_echo_tracks_masked_length() {
        let mut dialog = DialogState {
            monitor: "DP-1".into(),
            fading: false,
            password_len: 0,
        };

        for key in [Key::Char('h'), Key::Char('i'), Key::Backspace, Key::Other] {
            dialog.echo(key);
        }
        assert_eq!(dialog.password_len, 1);

        dialog.echo(Key::Backspace);
        dialog.echo(Key::Backspace);
        assert_eq!(dialog.password_len, 0);
    }

    #[test]
    fn test_bounding_box_spans_all_monitors() {
        let monitors = vec![
            Monitor::new("DP-1", Geometry::new(0, 0, 1920, 1080), true),
            Monitor::new("HDMI-1", Geometry::new(1920, -200, 1280, 1024), false),
        ];
        assert_eq!(
            bounding_box(&monitors),
            Some(Geometry::new(0, -200, 3200, 1280))
        );
        assert_eq!(bounding_box(&[]), None);
    }
}
