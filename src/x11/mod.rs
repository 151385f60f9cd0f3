//! X11 host for the screen shield
//!
//! Connects to the X server, selects the events the shield cares about and
//! turns them into [`ShieldEvent`]s. The compositor and view halves of the
//! shield's host contract live in [`compositor`] and [`overlay`].

pub mod compositor;
pub mod keys;
pub mod overlay;
pub mod stream;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::Event;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::screensaver::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{Atom, ConnectionExt as _, Mapping, Window};
use x11rb::rust_connection::RustConnection;

use crate::shield::{InputEvent, ShieldEvent};

pub use compositor::X11Compositor;
pub use keys::Keymap;
pub use overlay::X11Overlay;
pub use stream::X11EventStream;

/// Atoms used by the shield
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub clipboard: Atom,
    pub net_wm_window_opacity: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            clipboard: intern("CLIPBOARD")?,
            net_wm_window_opacity: intern("_NET_WM_WINDOW_OPACITY")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }
}

pub struct X11Host {
    conn: Arc<RustConnection>,
    screen_num: usize,
    root: Window,
    atoms: Atoms,
    keymap: Keymap,
}

impl X11Host {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        let root = conn.setup().roots[screen_num].root;

        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;
        let keymap = Keymap::load(&conn)?;

        let host = Self {
            conn,
            screen_num,
            root,
            atoms,
            keymap,
        };
        host.select_events()?;

        info!("Connected to X server (screen {}, root 0x{:x})", screen_num, root);
        Ok(host)
    }

    /// Monitor layout changes and the server's own idle detection
    fn select_events(&self) -> Result<()> {
        if self
            .conn
            .extension_information(randr::X11_EXTENSION_NAME)?
            .is_some()
        {
            self.conn.randr_select_input(
                self.root,
                randr::NotifyMask::SCREEN_CHANGE
                    | randr::NotifyMask::CRTC_CHANGE
                    | randr::NotifyMask::OUTPUT_CHANGE,
            )?;
        }

        if self
            .conn
            .extension_information(screensaver::X11_EXTENSION_NAME)?
            .is_some()
        {
            let version = self.conn.screensaver_query_version(1, 1)?.reply()?;
            debug!(
                "MIT-SCREEN-SAVER {}.{}",
                version.server_major_version, version.server_minor_version
            );
            self.conn
                .screensaver_select_input(self.root, screensaver::Event::NOTIFY_MASK)?;
        } else {
            warn!("MIT-SCREEN-SAVER not available, idle activation disabled");
        }

        self.conn.flush()?;
        Ok(())
    }

    pub fn compositor(&self) -> Result<X11Compositor> {
        X11Compositor::new(self.conn.clone(), self.root, self.atoms)
    }

    pub fn overlay(&self) -> Result<X11Overlay> {
        X11Overlay::new(self.conn.clone(), self.screen_num, self.atoms)
    }

    pub fn event_stream(&self) -> Result<X11EventStream> {
        X11EventStream::new(self.conn.clone())
    }

    /// Map an X event to a shield event; bookkeeping events yield `None`
    pub fn translate(&mut self, event: &Event) -> Option<ShieldEvent> {
        match event {
            Event::MotionNotify(e) => Some(ShieldEvent::Input(InputEvent::Motion {
                x: e.root_x as i32,
                y: e.root_y as i32,
            })),
            Event::ButtonPress(_) => Some(ShieldEvent::Input(InputEvent::Button)),
            Event::KeyPress(e) => Some(ShieldEvent::Input(InputEvent::Key(
                self.keymap.key(e.detail, e.state),
            ))),
            Event::RandrScreenChangeNotify(_) | Event::RandrNotify(_) => {
                Some(ShieldEvent::MonitorsChanged)
            }
            Event::ScreensaverNotify(e) if e.state == screensaver::State::ON => {
                debug!("X server reports the session idle");
                Some(ShieldEvent::IdleActivated)
            }
            Event::MappingNotify(e) if e.request == Mapping::KEYBOARD => {
                match Keymap::load(&self.conn) {
                    Ok(keymap) => self.keymap = keymap,
                    Err(e) => warn!("Failed to reload keyboard mapping: {:#}", e),
                }
                None
            }
            Event::Error(e) => {
                warn!("X11 error: {:?}", e);
                None
            }
            _ => None,
        }
    }
}
