use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;
use crate::geometry::Rect;

/// Borrowed X11 state shared by the main window and the About dialog
#[derive(Clone, Copy)]
pub struct AppContext<'a> {
    pub conn: &'a RustConnection,
    pub screen: &'a Screen,
    pub atoms: &'a CachedAtoms,
    pub keymap: &'a Keymap,
}

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub utf8_string: Atom,
    pub net_wm_name: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_modal: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_dialog: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            wm_protocols: intern(conn, b"WM_PROTOCOLS")?,
            wm_delete_window: intern(conn, b"WM_DELETE_WINDOW")?,
            utf8_string: intern(conn, b"UTF8_STRING")?,
            net_wm_name: intern(conn, b"_NET_WM_NAME")?,
            net_wm_state: intern(conn, b"_NET_WM_STATE")?,
            net_wm_state_modal: intern(conn, b"_NET_WM_STATE_MODAL")?,
            net_wm_state_maximized_vert: intern(conn, b"_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: intern(conn, b"_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_window_type: intern(conn, b"_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_dialog: intern(conn, b"_NET_WM_WINDOW_TYPE_DIALOG")?,
        })
    }

    /// True for a WM_PROTOCOLS / WM_DELETE_WINDOW client message
    pub fn is_delete_request(&self, event: &ClientMessageEvent) -> bool {
        event.type_ == self.wm_protocols
            && event.format == 32
            && event.data.as_data32()[0] == self.wm_delete_window
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom> {
    let label = String::from_utf8_lossy(name);
    Ok(conn
        .intern_atom(false, name)
        .with_context(|| format!("Failed to intern {label} atom"))?
        .reply()
        .with_context(|| format!("Failed to get reply for {label} atom"))?
        .atom)
}

/// Keycode to keysym table, fetched once at startup
#[derive(Debug, Default)]
pub struct Keymap {
    min_keycode: u8,
    keysyms_per_keycode: u8,
    keysyms: Vec<Keysym>,
}

impl Keymap {
    pub fn query(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;
        let reply = conn
            .get_keyboard_mapping(min_keycode, count)
            .context("Failed to request keyboard mapping")?
            .reply()
            .context("Failed to get reply for keyboard mapping")?;
        Ok(Self::from_parts(
            min_keycode,
            reply.keysyms_per_keycode,
            reply.keysyms,
        ))
    }

    pub fn from_parts(min_keycode: u8, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    /// Keysym for `keycode`, using the shifted column when asked and present
    pub fn keysym(&self, keycode: Keycode, shifted: bool) -> Option<Keysym> {
        let per = usize::from(self.keysyms_per_keycode);
        if per == 0 || keycode < self.min_keycode {
            return None;
        }
        let base = usize::from(keycode - self.min_keycode) * per;
        let lookup = |column: usize| {
            self.keysyms
                .get(base + column)
                .copied()
                .filter(|&sym| sym != 0)
        };
        if shifted && per > 1 {
            lookup(1).or_else(|| lookup(0))
        } else {
            lookup(0)
        }
    }
}

pub fn has_modifier(state: KeyButMask, modifier: KeyButMask) -> bool {
    u16::from(state) & u16::from(modifier) != 0
}

pub fn is_synthetic(response_type: u8) -> bool {
    response_type & x11::SYNTHETIC_EVENT_FLAG != 0
}

/// Client area of `window` in root coordinates
pub fn window_rect(conn: &RustConnection, screen: &Screen, window: Window) -> Result<Rect> {
    let geom = conn
        .get_geometry(window)
        .context("Failed to send geometry query")?
        .reply()
        .context(format!("Failed to get geometry for window {}", window))?;
    let origin = conn
        .translate_coordinates(window, screen.root, 0, 0)
        .context("Failed to send coordinate translation")?
        .reply()
        .context(format!("Failed to translate coordinates for window {}", window))?;
    Ok(Rect::new(
        i32::from(origin.dst_x),
        i32::from(origin.dst_y),
        i32::from(geom.width),
        i32::from(geom.height),
    ))
}

/// Whether any pointer button that can drive a window manager drag is down
pub fn pointer_buttons_held(conn: &RustConnection, screen: &Screen) -> Result<bool> {
    let pointer = conn
        .query_pointer(screen.root)
        .context("Failed to send pointer query")?
        .reply()
        .context("Failed to get reply for pointer query")?;
    Ok([KeyButMask::BUTTON1, KeyButMask::BUTTON2, KeyButMask::BUTTON3]
        .into_iter()
        .any(|button| has_modifier(pointer.mask, button)))
}

pub fn to_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

pub fn to_u16(value: i32) -> u16 {
    value.clamp(1, i32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two keycodes starting at 8: 'q'/'Q' and '/'/'?'
    fn test_keymap() -> Keymap {
        Keymap::from_parts(8, 2, vec![0x71, 0x51, 0x2f, 0x3f])
    }

    #[test]
    fn test_keysym_lookup() {
        let keymap = test_keymap();
        assert_eq!(keymap.keysym(8, false), Some(0x71));
        assert_eq!(keymap.keysym(8, true), Some(0x51));
        assert_eq!(keymap.keysym(9, true), Some(0x3f));
    }

    #[test]
    fn test_keysym_out_of_range() {
        let keymap = test_keymap();
        assert_eq!(keymap.keysym(7, false), None);
        assert_eq!(keymap.keysym(10, false), None);
        assert_eq!(Keymap::default().keysym(8, false), None);
    }

    #[test]
    fn test_keysym_falls_back_to_unshifted() {
        let keymap = Keymap::from_parts(8, 2, vec![0xffbe, 0]);
        assert_eq!(keymap.keysym(8, true), Some(0xffbe));
    }

    #[test]
    fn test_modifier_and_synthetic_flags() {
        let state = KeyButMask::CONTROL | KeyButMask::SHIFT;
        assert!(has_modifier(state, KeyButMask::CONTROL));
        assert!(!has_modifier(state, KeyButMask::MOD1));
        assert!(is_synthetic(CONFIGURE_NOTIFY_EVENT | 0x80));
        assert!(!is_synthetic(CONFIGURE_NOTIFY_EVENT));
    }

    #[test]
    fn test_coordinate_conversions_saturate() {
        assert_eq!(to_i16(-40_000), i16::MIN);
        assert_eq!(to_i16(123), 123);
        assert_eq!(to_u16(0), 1);
        assert_eq!(to_u16(100_000), u16::MAX);
    }
}
