//! X11 side of the shield: monitors, pointer, grabs, cursor and selections

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    AtomEnum, ConnectionExt as _, EventMask, GrabMode, GrabStatus, Window,
};
use x11rb::rust_connection::RustConnection;

use crate::shared::{Geometry, Monitor};
use crate::shield::{ActionMode, Compositor};

use super::Atoms;

pub struct X11Compositor {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: Atoms,
    have_randr: bool,
    have_xfixes: bool,
    /// Action modes pushed on top of the grab, innermost last
    modes: Vec<ActionMode>,
    cursor_hidden: bool,
}

impl X11Compositor {
    pub fn new(conn: Arc<RustConnection>, root: Window, atoms: Atoms) -> Result<Self> {
        let have_randr = conn
            .extension_information(randr::X11_EXTENSION_NAME)?
            .is_some();
        if have_randr {
            let version = conn.randr_query_version(1, 5)?.reply()?;
            info!("Initialized RandR {}.{}", version.major_version, version.minor_version);
        } else {
            warn!("RandR not available, treating the root window as the only monitor");
        }

        let have_xfixes = conn
            .extension_information(xfixes::X11_EXTENSION_NAME)?
            .is_some();
        if have_xfixes {
            // HideCursor/ShowCursor need XFixes 4
            let version = conn.xfixes_query_version(5, 0)?.reply()?;
            info!("Initialized XFixes {}.{}", version.major_version, version.minor_version);
        } else {
            warn!("XFixes not available, the cursor will stay visible");
        }

        Ok(Self {
            conn,
            root,
            atoms,
            have_randr,
            have_xfixes,
            modes: Vec::new(),
            cursor_hidden: false,
        })
    }

    fn randr_monitors(&self) -> Result<Vec<Monitor>> {
        let reply = self.conn.randr_get_monitors(self.root, true)?.reply()?;

        let mut monitors = Vec::with_capacity(reply.monitors.len());
        for info in reply.monitors {
            let name = match self.conn.get_atom_name(info.name)?.reply() {
                Ok(name) => String::from_utf8_lossy(&name.name).into_owned(),
                Err(_) => format!("monitor-{}", monitors.len()),
            };
            monitors.push(Monitor::new(
                name,
                Geometry::new(
                    info.x as i32,
                    info.y as i32,
                    info.width as u32,
                    info.height as u32,
                ),
                info.primary,
            ));
        }
        Ok(monitors)
    }

    fn root_monitor(&self) -> Monitor {
        let (width, height) = match self.conn.get_geometry(self.root).map(|c| c.reply()) {
            Ok(Ok(geometry)) => (geometry.width as u32, geometry.height as u32),
            _ => {
                let screen = &self.conn.setup().roots[0];
                (screen.width_in_pixels as u32, screen.height_in_pixels as u32)
            }
        };
        Monitor::new("screen", Geometry::new(0, 0, width, height), true)
    }

    fn grab(&self) -> Result<()> {
        let keyboard = self
            .conn
            .grab_keyboard(false, self.root, x11rb::CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()
            .context("Keyboard grab request failed")?;
        if keyboard.status != GrabStatus::SUCCESS {
            bail!("keyboard grab refused: {:?}", keyboard.status);
        }

        let pointer = self
            .conn
            .grab_pointer(
                false,
                self.root,
                EventMask::POINTER_MOTION | EventMask::BUTTON_PRESS,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                x11rb::CURRENT_TIME,
            )?
            .reply()
            .context("Pointer grab request failed")?;
        if pointer.status != GrabStatus::SUCCESS {
            self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?;
            bail!("pointer grab refused: {:?}", pointer.status);
        }

        Ok(())
    }

    /// Not flushed here, so a pop/push pair reaches the server back to back
    fn ungrab(&self) -> Result<()> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?;
        Ok(())
    }
}

impl Compositor for X11Compositor {
    fn monitors(&self) -> Vec<Monitor> {
        if self.have_randr {
            match self.randr_monitors() {
                Ok(monitors) if !monitors.is_empty() => return monitors,
                Ok(_) => debug!("RandR reported no monitors"),
                Err(e) => warn!("Failed to query RandR monitors: {:#}", e),
            }
        }
        vec![self.root_monitor()]
    }

    fn pointer_position(&self) -> (i32, i32) {
        match self.conn.query_pointer(self.root).map(|c| c.reply()) {
            Ok(Ok(reply)) => (reply.root_x as i32, reply.root_y as i32),
            _ => {
                warn!("Failed to query pointer position");
                (0, 0)
            }
        }
    }

    fn push_modal(&mut self, mode: ActionMode) -> bool {
        if self.modes.is_empty() {
            if let Err(e) = self.grab() {
                warn!("Failed to grab input for {:?}: {:#}", mode, e);
                return false;
            }
        }

        debug!("Modal grab pushed ({:?})", mode);
        self.modes.push(mode);
        true
    }

    fn pop_modal(&mut self) {
        let Some(mode) = self.modes.pop() else {
            warn!("pop_modal without a modal grab");
            return;
        };

        debug!("Modal grab popped ({:?})", mode);
        if self.modes.is_empty() {
            if let Err(e) = self.ungrab() {
                warn!("Failed to release input grab: {:#}", e);
            }
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        if !self.have_xfixes || self.cursor_hidden != visible {
            return;
        }

        let result = if visible {
            self.conn.xfixes_show_cursor(self.root)
        } else {
            self.conn.xfixes_hide_cursor(self.root)
        };
        match result.and_then(|_| self.conn.flush()) {
            Ok(()) => self.cursor_hidden = !visible,
            Err(e) => warn!("Failed to change cursor visibility: {}", e),
        }
    }

    fn clear_clipboards(&mut self) {
        for selection in [u32::from(AtomEnum::PRIMARY), self.atoms.clipboard] {
            if let Err(e) =
                self.conn
                    .set_selection_owner(x11rb::NONE, selection, x11rb::CURRENT_TIME)
            {
                warn!("Failed to clear selection {}: {}", selection, e);
            }
        }
        debug!("Cleared PRIMARY and CLIPBOARD selections");
    }
}
