//! EWMH and ICCCM atoms and properties
//!
//! Interns the atoms the manager uses and reads or writes the root and
//! client properties built from them.

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ClientMessageEvent, *};
use x11rb::wrapper::ConnectionExt as _;

use crate::wm::xconn::{ClientMessageKind, PropertyKind, StateAction};

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_state: Atom,
    pub wm_take_focus: Atom,
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_wm_name: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_window_type: Atom,
    pub net_active_window: Atom,
    pub net_client_list: Atom,
    pub net_client_list_stacking: Atom,
    pub net_number_of_desktops: Atom,
    pub net_current_desktop: Atom,
    pub net_desktop_names: Atom,
    pub net_desktop_viewport: Atom,
    pub motif_wm_hints: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_state: intern("WM_STATE")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            net_supported: intern("_NET_SUPPORTED")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_number_of_desktops: intern("_NET_NUMBER_OF_DESKTOPS")?,
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_desktop_names: intern("_NET_DESKTOP_NAMES")?,
            net_desktop_viewport: intern("_NET_DESKTOP_VIEWPORT")?,
            motif_wm_hints: intern("_MOTIF_WM_HINTS")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }

    /// Atoms announced in _NET_SUPPORTED
    pub fn supported(&self) -> [Atom; 14] {
        [
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_wm_name,
            self.net_wm_state,
            self.net_wm_state_fullscreen,
            self.net_wm_window_type,
            self.net_active_window,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_current_desktop,
            self.net_desktop_names,
            self.net_desktop_viewport,
            self.utf8_string,
        ]
    }

    /// Create the supporting window, name it and announce our hints.
    pub fn setup_supported<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        wm_name: &str,
    ) -> Result<Window> {
        let check = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            check,
            root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new(),
        )?;
        for win in [check, root] {
            conn.change_property32(
                PropMode::REPLACE,
                win,
                self.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[check],
            )?;
        }
        conn.change_property8(
            PropMode::REPLACE,
            check,
            self.net_wm_name,
            self.utf8_string,
            wm_name.as_bytes(),
        )?;
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_supported,
            AtomEnum::ATOM,
            &self.supported(),
        )?;
        debug!("Supporting window {:#x} announced as {}", check, wm_name);
        Ok(check)
    }

    /// Remove what `setup_supported` and the desktop updates left on the root.
    pub fn cleanup<C: Connection>(&self, conn: &C, root: Window, check: Window) -> Result<()> {
        conn.destroy_window(check)?;
        for atom in [
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_active_window,
            self.net_client_list,
            self.net_client_list_stacking,
        ] {
            conn.delete_property(root, atom)?;
        }
        Ok(())
    }

    /// Replace a window list property such as _NET_CLIENT_LIST.
    pub fn set_windows<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        property: Atom,
        windows: &[Window],
    ) -> Result<()> {
        conn.change_property32(PropMode::REPLACE, root, property, AtomEnum::WINDOW, windows)?;
        Ok(())
    }

    pub fn set_cardinals<C: Connection>(
        &self,
        conn: &C,
        win: Window,
        property: Atom,
        values: &[u32],
    ) -> Result<()> {
        conn.change_property32(PropMode::REPLACE, win, property, AtomEnum::CARDINAL, values)?;
        Ok(())
    }

    /// _NET_DESKTOP_NAMES as NUL separated UTF-8
    pub fn set_desktop_names<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        names: &[String],
    ) -> Result<()> {
        let mut data = Vec::new();
        for name in names {
            data.extend_from_slice(name.as_bytes());
            data.push(0);
        }
        conn.change_property8(
            PropMode::REPLACE,
            root,
            self.net_desktop_names,
            self.utf8_string,
            &data,
        )?;
        Ok(())
    }

    /// 32-bit values of a property of any type, empty when unset.
    pub fn get_u32s<C: Connection>(
        &self,
        conn: &C,
        win: Window,
        property: Atom,
    ) -> Result<Vec<u32>> {
        let reply = conn
            .get_property(false, win, property, AtomEnum::ANY, 0, 1024)?
            .reply()?;
        Ok(reply.value32().map(|v| v.collect()).unwrap_or_default())
    }

    /// Text property as UTF-8 or Latin-1, `None` when unset or empty.
    pub fn get_text<C: Connection>(
        &self,
        conn: &C,
        win: Window,
        property: Atom,
    ) -> Result<Option<String>> {
        let reply = conn
            .get_property(false, win, property, AtomEnum::ANY, 0, 1024)?
            .reply()?;
        if reply.value.is_empty() || reply.format != 8 {
            return Ok(None);
        }
        let text = if reply.type_ == self.utf8_string {
            String::from_utf8_lossy(&reply.value).into_owned()
        } else {
            reply.value.iter().map(|&b| b as char).collect()
        };
        Ok(Some(text))
    }

    /// _NET_WM_STATE lists exactly the fullscreen state, or nothing.
    pub fn set_fullscreen_state<C: Connection>(
        &self,
        conn: &C,
        win: Window,
        fullscreen: bool,
    ) -> Result<()> {
        let states: &[Atom] = if fullscreen {
            &[self.net_wm_state_fullscreen]
        } else {
            &[]
        };
        conn.change_property32(PropMode::REPLACE, win, self.net_wm_state, AtomEnum::ATOM, states)?;
        Ok(())
    }

    /// Send a WM_PROTOCOLS client message.
    pub fn send_protocol<C: Connection>(&self, conn: &C, win: Window, protocol: Atom) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            win,
            self.wm_protocols,
            [protocol, x11rb::CURRENT_TIME, 0, 0, 0],
        );
        conn.send_event(false, win, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    /// Classify a PropertyNotify atom.
    pub fn property_kind(&self, atom: Atom) -> PropertyKind {
        match atom {
            a if a == u32::from(AtomEnum::WM_NAME) => PropertyKind::WmName,
            a if a == u32::from(AtomEnum::WM_TRANSIENT_FOR) => PropertyKind::TransientFor,
            a if a == u32::from(AtomEnum::WM_NORMAL_HINTS) => PropertyKind::NormalHints,
            a if a == u32::from(AtomEnum::WM_HINTS) => PropertyKind::WmHints,
            a if a == self.net_wm_name => PropertyKind::NetWmName,
            a if a == self.motif_wm_hints => PropertyKind::MotifHints,
            a if a == self.net_wm_window_type => PropertyKind::WindowType,
            _ => PropertyKind::Other,
        }
    }

    /// Decode a client message the manager acts on.
    pub fn client_message_kind(&self, message_type: Atom, data: [u32; 5]) -> ClientMessageKind {
        if message_type == self.net_wm_state {
            let fullscreen = self.net_wm_state_fullscreen;
            if data[1] != fullscreen && data[2] != fullscreen {
                return ClientMessageKind::Other;
            }
            let action = match data[0] {
                1 => StateAction::Add,
                2 => StateAction::Toggle,
                _ => StateAction::Remove,
            };
            ClientMessageKind::Fullscreen(action)
        } else if message_type == self.net_active_window {
            ClientMessageKind::ActiveWindow
        } else {
            ClientMessageKind::Other
        }
    }
}
