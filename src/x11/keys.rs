//! Keycode to key translation
//!
//! Uses the core keyboard mapping; only what the shield cares about is
//! recognised (Escape, the password editing keys and printable characters).

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, KeyButMask, Keycode, Keysym};
use x11rb::rust_connection::RustConnection;

use crate::shield::Key;

const XK_ESCAPE: Keysym = 0xff1b;
const XK_BACKSPACE: Keysym = 0xff08;
const XK_RETURN: Keysym = 0xff0d;
const XK_KP_ENTER: Keysym = 0xff8d;
const NO_SYMBOL: Keysym = 0;

/// Cached keyboard mapping
pub struct Keymap {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl Keymap {
    pub fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;

        let reply = conn
            .get_keyboard_mapping(min_keycode, count)?
            .reply()
            .context("Failed to get keyboard mapping")?;

        debug!(
            "Loaded keyboard mapping: {} keycodes, {} keysyms each",
            count, reply.keysyms_per_keycode
        );

        Ok(Self::from_parts(
            min_keycode,
            reply.keysyms_per_keycode as usize,
            reply.keysyms,
        ))
    }

    fn from_parts(min_keycode: Keycode, keysyms_per_keycode: usize, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    fn keysym(&self, keycode: Keycode, column: usize) -> Keysym {
        if keycode < self.min_keycode || column >= self.keysyms_per_keycode {
            return NO_SYMBOL;
        }
        let index = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode + column;
        self.keysyms.get(index).copied().unwrap_or(NO_SYMBOL)
    }

    pub fn key(&self, keycode: Keycode, state: KeyButMask) -> Key {
        let mask = u16::from(state);
        let shifted = mask & u16::from(KeyButMask::SHIFT) != 0;
        let caps = mask & u16::from(KeyButMask::LOCK) != 0;

        let base = self.keysym(keycode, 0);
        match base {
            XK_ESCAPE => return Key::Escape,
            XK_BACKSPACE => return Key::Backspace,
            XK_RETURN | XK_KP_ENTER => return Key::Enter,
            _ => {}
        }

        let mut keysym = base;
        if shifted {
            let upper = self.keysym(keycode, 1);
            if upper != NO_SYMBOL {
                keysym = upper;
            }
        }

        match keysym_to_char(keysym) {
            Some(ch) if caps && !shifted => Key::Char(ch.to_uppercase().next().unwrap_or(ch)),
            Some(ch) => Key::Char(ch),
            None => Key::Other,
        }
    }
}

/// Latin-1 and Unicode keysyms map directly to characters
fn keysym_to_char(keysym: Keysym) -> Option<char> {
    match keysym {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(keysym),
        0x0100_0000..=0x0110_ffff => char::from_u32(keysym - 0x0100_0000).filter(|c| !c.is_control()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> KeyButMask {
        KeyButMask::from(0u16)
    }

    // keycode 9 = Escape, 22 = BackSpace, 36 = Return, 38 = a/A, 50 = Shift_L
    fn keymap() -> Keymap {
        let mut keysyms = vec![NO_SYMBOL; 2 * 60];
        keysyms[(9 - 8) * 2] = XK_ESCAPE;
        keysyms[(22 - 8) * 2] = XK_BACKSPACE;
        keysyms[(36 - 8) * 2] = XK_RETURN;
        keysyms[(38 - 8) * 2] = 'a' as u32;
        keysyms[(38 - 8) * 2 + 1] = 'A' as u32;
        keysyms[(50 - 8) * 2] = 0xffe1;
        keysyms[(24 - 8) * 2] = 0x0100_20ac;
        Keymap::from_parts(8, 2, keysyms)
    }

    #[test]
    fn test_escape_and_letters() {
        let keymap = keymap();
        assert_eq!(keymap.key(9, plain()), Key::Escape);
        assert_eq!(keymap.key(38, plain()), Key::Char('a'));
        assert_eq!(keymap.key(38, KeyButMask::SHIFT), Key::Char('A'));
        assert_eq!(keymap.key(38, KeyButMask::LOCK), Key::Char('A'));
    }

    #[test]
    fn test_password_editing_keys() {
        let keymap = keymap();
        assert_eq!(keymap.key(22, plain()), Key::Backspace);
        assert_eq!(keymap.key(36, KeyButMask::SHIFT), Key::Enter);
    }

    #[test]
    fn test_non_printable_keys() {
        let keymap = keymap();
        assert_eq!(keymap.key(50, plain()), Key::Other);
        assert_eq!(keymap.key(200, plain()), Key::Other);
        assert_eq!(keymap.key(3, plain()), Key::Other);
    }

    #[test]
    fn test_unicode_keysym() {
        assert_eq!(keymap().key(24, plain()), Key::Char('€'));
    }
}
