//! x11rb adapter
//!
//! Implements [`XConn`] over a `RustConnection`: requests, property
//! decoding, event translation and the filter for expected protocol errors.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::res::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _, *};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE as X_NONE};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::client_flags::ConfigMask;
use crate::wm::display::{BarPainter, CoreFont, Cursors, Palette};
use crate::wm::errors::{WmError, is_benign};
use crate::wm::ewmh::Atoms;
use crate::wm::hints::{MotifHints, RawSizeHints, URGENCY_HINT, WmHints};
use crate::wm::xconn::{
    BarCell, ButtonEvent, ClassHint, ConfigureRequest, Cursor, IcccmState, Keysym, MotionEvent,
    NONE, Protocol, Scheme, Window, WindowAttributes, XConn, XEvent,
};

const NUM_LOCK: Keysym = 0xff7f;

/// Keysym table as returned by GetKeyboardMapping
#[derive(Debug, Default, Clone)]
struct KeyboardMap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyboardMap {
    /// First keysym of a keycode
    fn keysym(&self, keycode: u8) -> Keysym {
        if keycode < self.min_keycode || self.per_keycode == 0 {
            return 0;
        }
        let i = usize::from(keycode - self.min_keycode) * self.per_keycode;
        self.keysyms.get(i).copied().unwrap_or(0)
    }

    /// Keycodes whose first keysym is `keysym`
    fn keycodes(&self, keysym: Keysym) -> Vec<u8> {
        if self.per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.first() == Some(&keysym))
            .filter_map(|(i, _)| u8::try_from(usize::from(self.min_keycode) + i).ok())
            .collect()
    }
}

/// Modifier bit carrying one of `keycodes` in a GetModifierMapping table.
fn modifier_bit(mapping: &[u8], per_modifier: usize, keycodes: &[u8]) -> u16 {
    if per_modifier == 0 {
        return 0;
    }
    mapping
        .chunks(per_modifier)
        .take(8)
        .position(|mods| mods.iter().any(|kc| *kc != 0 && keycodes.contains(kc)))
        .map_or(0, |i| 1 << i)
}

pub struct X11Conn {
    conn: RustConnection,
    root: Window,
    depth: u8,
    width: i32,
    height: i32,
    atoms: Atoms,
    cursors: Cursors,
    palette: Palette,
    font: CoreFont,
    painter: BarPainter,
    check_win: Cell<Window>,
    keymap: RefCell<KeyboardMap>,
    /// Events read while discarding EnterNotify, served first
    stash: RefCell<VecDeque<Event>>,
}

impl X11Conn {
    /// Connect to `$DISPLAY` and allocate cursors, colors and the bar font.
    pub fn connect(config: &Config) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let screen = &conn.setup().roots[screen_num];
        let (root, depth, colormap) = (screen.root, screen.root_depth, screen.default_colormap);
        let (width, height) = (
            i32::from(screen.width_in_pixels),
            i32::from(screen.height_in_pixels),
        );
        info!("Connected to X server, screen {} ({}x{})", screen_num, width, height);

        let atoms = Atoms::new(&conn)?;
        let cursors = Cursors::new(&conn)?;
        let palette = Palette::new(&conn, colormap, &config.appearance.colors)?;
        let font = CoreFont::open(&conn, &config.appearance.font)?;
        let painter = BarPainter::new(&conn, root, depth, &font)?;

        let x = Self {
            conn,
            root,
            depth,
            width,
            height,
            atoms,
            cursors,
            palette,
            font,
            painter,
            check_win: Cell::new(NONE),
            keymap: RefCell::new(KeyboardMap::default()),
            stash: RefCell::new(VecDeque::new()),
        };
        x.refresh_keyboard_mapping()?;
        Ok(x)
    }

    fn wait_event(&self) -> Result<Event> {
        if let Some(event) = self.stash.borrow_mut().pop_front() {
            return Ok(event);
        }
        Ok(self.conn.wait_for_event()?)
    }

    /// Translate a protocol event, `None` for events the manager ignores.
    fn translate(&self, event: Event) -> Result<Option<XEvent>> {
        let event = match event {
            Event::Error(err) => {
                if is_benign(err.major_opcode, err.error_kind) {
                    debug!(
                        "Ignoring {:?} from request {} on {:#x}",
                        err.error_kind, err.major_opcode, err.bad_value
                    );
                    return Ok(None);
                }
                return Err(WmError::Protocol {
                    request: err.major_opcode,
                    error: format!("{:?}", err.error_kind),
                }
                .into());
            }
            Event::ButtonPress(e) => XEvent::ButtonPress(ButtonEvent {
                window: e.event,
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
                x: i32::from(e.event_x),
                y: i32::from(e.event_y),
                button: e.detail,
                state: u16::from(e.state),
                time: e.time,
            }),
            Event::ButtonRelease(e) => XEvent::ButtonRelease(ButtonEvent {
                window: e.event,
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
                x: i32::from(e.event_x),
                y: i32::from(e.event_y),
                button: e.detail,
                state: u16::from(e.state),
                time: e.time,
            }),
            Event::ClientMessage(e) => XEvent::ClientMessage {
                window: e.window,
                kind: self
                    .atoms
                    .client_message_kind(e.type_, e.data.as_data32()),
            },
            Event::ConfigureRequest(e) => XEvent::ConfigureRequest(ConfigureRequest {
                window: e.window,
                x: i32::from(e.x),
                y: i32::from(e.y),
                width: i32::from(e.width),
                height: i32::from(e.height),
                border_width: i32::from(e.border_width),
                sibling: e.sibling,
                stack_mode: u8::try_from(u32::from(e.stack_mode)).unwrap_or(0),
                mask: ConfigMask::from_bits_truncate(u16::from(e.value_mask)),
            }),
            Event::ConfigureNotify(e) => XEvent::ConfigureNotify {
                window: e.window,
                width: i32::from(e.width),
                height: i32::from(e.height),
            },
            Event::DestroyNotify(e) => XEvent::DestroyNotify { window: e.window },
            Event::EnterNotify(e) => XEvent::EnterNotify {
                window: e.event,
                normal: e.mode == NotifyMode::NORMAL && e.detail != NotifyDetail::INFERIOR,
            },
            Event::Expose(e) => XEvent::Expose {
                window: e.window,
                count: e.count,
            },
            Event::FocusIn(e) => XEvent::FocusIn { window: e.event },
            Event::KeyPress(e) => XEvent::KeyPress {
                keycode: e.detail,
                state: u16::from(e.state),
            },
            Event::MappingNotify(e) => XEvent::MappingNotify {
                keyboard: e.request == Mapping::KEYBOARD,
            },
            Event::MapRequest(e) => XEvent::MapRequest { window: e.window },
            Event::MotionNotify(e) => XEvent::MotionNotify(MotionEvent {
                window: e.event,
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
                time: e.time,
            }),
            Event::PropertyNotify(e) => XEvent::PropertyNotify {
                window: e.window,
                kind: self.atoms.property_kind(e.atom),
                deleted: e.state == Property::DELETE,
            },
            Event::UnmapNotify(e) => XEvent::UnmapNotify {
                window: e.window,
                synthetic: e.response_type & 0x80 != 0,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    fn configure(&self, win: Window, aux: &ConfigureWindowAux) -> Result<()> {
        self.conn.configure_window(win, aux)?;
        Ok(())
    }

    fn protocol_atom(&self, protocol: Protocol) -> xproto::Atom {
        match protocol {
            Protocol::Delete => self.atoms.wm_delete_window,
            Protocol::TakeFocus => self.atoms.wm_take_focus,
        }
    }
}

impl XConn for X11Conn {
    fn root(&self) -> Window {
        self.root
    }

    fn screen_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn outputs(&self) -> Result<Vec<Geometry>> {
        let resources = match self
            .conn
            .randr_get_screen_resources_current(self.root)
            .map_err(anyhow::Error::from)
            .and_then(|c| c.reply().map_err(anyhow::Error::from))
        {
            Ok(r) => r,
            Err(e) => {
                warn!("RandR unavailable, using the whole screen: {:#}", e);
                return Ok(Vec::new());
            }
        };
        let mut outputs = Vec::new();
        for crtc in resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)?
                .reply()?;
            if info.mode == 0 || info.width == 0 || info.outputs.is_empty() {
                continue;
            }
            outputs.push(Geometry::new(
                i32::from(info.x),
                i32::from(info.y),
                i32::from(info.width),
                i32::from(info.height),
            ));
        }
        Ok(outputs)
    }

    fn become_wm(&self) -> Result<()> {
        self.conn
            .change_window_attributes(
                self.root,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_REDIRECT),
            )?
            .check()
            .map_err(|_| WmError::AnotherWmRunning)?;
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::POINTER_MOTION
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE;
        self.conn.change_window_attributes(
            self.root,
            &ChangeWindowAttributesAux::new().event_mask(mask),
        )?;
        self.conn.flush()?;
        debug!("Selected substructure redirection on root {:#x}", self.root);
        Ok(())
    }

    fn next_event(&self) -> Result<XEvent> {
        loop {
            self.conn.flush()?;
            let event = self.wait_event()?;
            if let Some(event) = self.translate(event)? {
                return Ok(event);
            }
        }
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn discard_enter_events(&self) -> Result<()> {
        // a round trip makes every event caused so far readable
        self.conn.get_input_focus()?.reply()?;
        let mut stash = self.stash.borrow_mut();
        while let Some(event) = self.conn.poll_for_event()? {
            if !matches!(event, Event::EnterNotify(_)) {
                stash.push_back(event);
            }
        }
        Ok(())
    }

    fn set_root_cursor(&self, cursor: Cursor) -> Result<()> {
        self.conn.change_window_attributes(
            self.root,
            &ChangeWindowAttributesAux::new().cursor(self.cursors.get(cursor)),
        )?;
        Ok(())
    }

    fn map_window(&self, win: Window) -> Result<()> {
        self.conn.map_window(win)?;
        Ok(())
    }

    fn unmap_window(&self, win: Window) -> Result<()> {
        self.conn.unmap_window(win)?;
        Ok(())
    }

    fn move_window(&self, win: Window, x: i32, y: i32) -> Result<()> {
        self.configure(win, &ConfigureWindowAux::new().x(x).y(y))
    }

    fn move_resize(&self, win: Window, g: Geometry, border_width: i32) -> Result<()> {
        self.configure(
            win,
            &ConfigureWindowAux::new()
                .x(g.x)
                .y(g.y)
                .width(g.width.max(1) as u32)
                .height(g.height.max(1) as u32)
                .border_width(border_width.max(0) as u32),
        )
    }

    fn configure_unmanaged(&self, req: &ConfigureRequest) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        if req.mask.contains(ConfigMask::X) {
            aux = aux.x(req.x);
        }
        if req.mask.contains(ConfigMask::Y) {
            aux = aux.y(req.y);
        }
        if req.mask.contains(ConfigMask::WIDTH) {
            aux = aux.width(req.width.max(1) as u32);
        }
        if req.mask.contains(ConfigMask::HEIGHT) {
            aux = aux.height(req.height.max(1) as u32);
        }
        if req.mask.contains(ConfigMask::BORDER_WIDTH) {
            aux = aux.border_width(req.border_width.max(0) as u32);
        }
        if req.mask.contains(ConfigMask::SIBLING) {
            aux = aux.sibling(req.sibling);
        }
        if req.mask.contains(ConfigMask::STACK_MODE) {
            aux = aux.stack_mode(StackMode::from(req.stack_mode));
        }
        self.configure(req.window, &aux)
    }

    fn raise_window(&self, win: Window) -> Result<()> {
        self.configure(win, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
    }

    fn stack_below(&self, win: Window, sibling: Window) -> Result<()> {
        let mut aux = ConfigureWindowAux::new().stack_mode(StackMode::BELOW);
        if sibling != NONE {
            aux = aux.sibling(sibling);
        }
        self.configure(win, &aux)
    }

    fn set_border_width(&self, win: Window, width: i32) -> Result<()> {
        self.configure(
            win,
            &ConfigureWindowAux::new().border_width(width.max(0) as u32),
        )
    }

    fn set_border_color(&self, win: Window, scheme: Scheme) -> Result<()> {
        self.conn.change_window_attributes(
            win,
            &ChangeWindowAttributesAux::new().border_pixel(self.palette.get(scheme).border),
        )?;
        Ok(())
    }

    fn send_configure_notify(&self, win: Window, g: Geometry, border_width: i32) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: win,
            window: win,
            above_sibling: X_NONE,
            x: g.x as i16,
            y: g.y as i16,
            width: g.width.max(1) as u16,
            height: g.height.max(1) as u16,
            border_width: border_width.max(0) as u16,
            override_redirect: false,
        };
        self.conn
            .send_event(false, win, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn select_client_input(&self, win: Window) -> Result<()> {
        let mask = EventMask::ENTER_WINDOW
            | EventMask::FOCUS_CHANGE
            | EventMask::PROPERTY_CHANGE
            | EventMask::STRUCTURE_NOTIFY;
        self.conn
            .change_window_attributes(win, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        Ok(())
    }

    fn set_input_focus(&self, win: Window) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, win, CURRENT_TIME)?;
        Ok(())
    }

    fn focus_root(&self) -> Result<()> {
        self.set_input_focus(self.root)
    }

    fn send_protocol(&self, win: Window, protocol: Protocol) -> Result<()> {
        self.atoms
            .send_protocol(&self.conn, win, self.protocol_atom(protocol))
    }

    fn kill_client(&self, win: Window) -> Result<()> {
        self.conn.grab_server()?;
        self.conn.set_close_down_mode(CloseDown::DESTROY_ALL)?;
        self.conn.kill_client(win)?;
        self.conn.ungrab_server()?;
        self.conn.flush()?;
        Ok(())
    }

    fn query_tree(&self) -> Result<Vec<Window>> {
        Ok(self.conn.query_tree(self.root)?.reply()?.children)
    }

    fn window_attributes(&self, win: Window) -> Result<Option<WindowAttributes>> {
        let attrs = self.conn.get_window_attributes(win)?.reply();
        let geometry = self.conn.get_geometry(win)?.reply();
        let (Ok(attrs), Ok(g)) = (attrs, geometry) else {
            return Ok(None);
        };
        Ok(Some(WindowAttributes {
            geometry: Geometry::new(
                i32::from(g.x),
                i32::from(g.y),
                i32::from(g.width),
                i32::from(g.height),
            ),
            border_width: i32::from(g.border_width),
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
        }))
    }

    fn transient_for(&self, win: Window) -> Result<Option<Window>> {
        let values = self
            .atoms
            .get_u32s(&self.conn, win, AtomEnum::WM_TRANSIENT_FOR.into())?;
        Ok(values.first().copied().filter(|&w| w != NONE))
    }

    fn class_hint(&self, win: Window) -> Result<Option<ClassHint>> {
        let reply = self
            .conn
            .get_property(false, win, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)?
            .reply()?;
        if reply.value.is_empty() {
            return Ok(None);
        }
        let mut parts = reply
            .value
            .split(|&b| b == 0)
            .map(|s| String::from_utf8_lossy(s).into_owned());
        Ok(Some(ClassHint {
            instance: parts.next().unwrap_or_default(),
            class: parts.next().unwrap_or_default(),
        }))
    }

    fn title(&self, win: Window) -> Result<Option<String>> {
        if let Some(name) = self.atoms.get_text(&self.conn, win, self.atoms.net_wm_name)? {
            return Ok(Some(name));
        }
        self.atoms
            .get_text(&self.conn, win, AtomEnum::WM_NAME.into())
    }

    fn root_name(&self) -> Result<Option<String>> {
        self.atoms
            .get_text(&self.conn, self.root, AtomEnum::WM_NAME.into())
    }

    fn size_hints(&self, win: Window) -> Result<Option<RawSizeHints>> {
        let values = self
            .atoms
            .get_u32s(&self.conn, win, AtomEnum::WM_NORMAL_HINTS.into())?;
        Ok(RawSizeHints::from_values(&values))
    }

    fn wm_hints(&self, win: Window) -> Result<Option<WmHints>> {
        let values = self
            .atoms
            .get_u32s(&self.conn, win, AtomEnum::WM_HINTS.into())?;
        Ok(WmHints::from_values(&values))
    }

    fn motif_hints(&self, win: Window) -> Result<Option<MotifHints>> {
        let values = self
            .atoms
            .get_u32s(&self.conn, win, self.atoms.motif_wm_hints)?;
        Ok(MotifHints::from_values(&values))
    }

    fn window_type(&self, win: Window) -> Result<Option<String>> {
        let values = self
            .atoms
            .get_u32s(&self.conn, win, self.atoms.net_wm_window_type)?;
        let Some(&atom) = values.first() else {
            return Ok(None);
        };
        let name = self.conn.get_atom_name(atom)?.reply()?.name;
        Ok(Some(String::from_utf8_lossy(&name).into_owned()))
    }

    fn wants_fullscreen(&self, win: Window) -> Result<bool> {
        let states = self
            .atoms
            .get_u32s(&self.conn, win, self.atoms.net_wm_state)?;
        Ok(states.contains(&self.atoms.net_wm_state_fullscreen))
    }

    fn wm_state(&self, win: Window) -> Result<Option<IcccmState>> {
        let values = self.atoms.get_u32s(&self.conn, win, self.atoms.wm_state)?;
        Ok(match values.first() {
            Some(0) => Some(IcccmState::Withdrawn),
            Some(1) => Some(IcccmState::Normal),
            Some(3) => Some(IcccmState::Iconic),
            _ => None,
        })
    }

    fn supports_protocol(&self, win: Window, protocol: Protocol) -> Result<bool> {
        let protocols = self
            .atoms
            .get_u32s(&self.conn, win, self.atoms.wm_protocols)?;
        Ok(protocols.contains(&self.protocol_atom(protocol)))
    }

    fn window_pid(&self, win: Window) -> Result<Option<u32>> {
        let spec = res::ClientIdSpec {
            client: win,
            mask: res::ClientIdMask::LOCAL_CLIENT_PID,
        };
        let reply = match self.conn.res_query_client_ids(&[spec]) {
            Ok(cookie) => cookie.reply(),
            Err(e) => {
                debug!("X-Resource unavailable: {}", e);
                return Ok(None);
            }
        };
        let Ok(reply) = reply else {
            return Ok(None);
        };
        Ok(reply
            .ids
            .iter()
            .find(|id| u32::from(id.spec.mask) & u32::from(res::ClientIdMask::LOCAL_CLIENT_PID) != 0)
            .and_then(|id| id.value.first().copied()))
    }

    fn set_wm_state(&self, win: Window, state: IcccmState) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            win,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state as u32, NONE],
        )?;
        Ok(())
    }

    fn set_fullscreen_state(&self, win: Window, fullscreen: bool) -> Result<()> {
        self.atoms
            .set_fullscreen_state(&self.conn, win, fullscreen)
    }

    fn clear_urgency(&self, win: Window) -> Result<()> {
        let mut values = self
            .atoms
            .get_u32s(&self.conn, win, AtomEnum::WM_HINTS.into())?;
        let Some(flags) = values.first_mut() else {
            return Ok(());
        };
        *flags &= !URGENCY_HINT;
        self.conn.change_property32(
            PropMode::REPLACE,
            win,
            AtomEnum::WM_HINTS,
            AtomEnum::WM_HINTS,
            &values,
        )?;
        Ok(())
    }

    fn set_active_window(&self, win: Option<Window>) -> Result<()> {
        match win {
            Some(win) => {
                self.atoms
                    .set_windows(&self.conn, self.root, self.atoms.net_active_window, &[win])
            }
            None => {
                self.conn
                    .delete_property(self.root, self.atoms.net_active_window)?;
                Ok(())
            }
        }
    }

    fn set_client_list(&self, windows: &[Window]) -> Result<()> {
        self.atoms
            .set_windows(&self.conn, self.root, self.atoms.net_client_list, windows)
    }

    fn set_client_list_stacking(&self, windows: &[Window]) -> Result<()> {
        self.atoms.set_windows(
            &self.conn,
            self.root,
            self.atoms.net_client_list_stacking,
            windows,
        )
    }

    fn set_number_of_desktops(&self, n: u32) -> Result<()> {
        self.atoms
            .set_cardinals(&self.conn, self.root, self.atoms.net_number_of_desktops, &[n])
    }

    fn set_current_desktop(&self, index: u32) -> Result<()> {
        self.atoms.set_cardinals(
            &self.conn,
            self.root,
            self.atoms.net_current_desktop,
            &[index],
        )
    }

    fn set_desktop_names(&self, names: &[String]) -> Result<()> {
        self.atoms.set_desktop_names(&self.conn, self.root, names)
    }

    fn set_desktop_viewport(&self, n: u32) -> Result<()> {
        let origins = vec![0; 2 * n as usize];
        self.atoms.set_cardinals(
            &self.conn,
            self.root,
            self.atoms.net_desktop_viewport,
            &origins,
        )
    }

    fn init_ewmh(&self, wm_name: &str) -> Result<()> {
        let check = self.atoms.setup_supported(&self.conn, self.root, wm_name)?;
        self.check_win.set(check);
        Ok(())
    }

    fn cleanup_ewmh(&self) -> Result<()> {
        self.atoms
            .cleanup(&self.conn, self.root, self.check_win.replace(NONE))?;
        self.cursors.free(&self.conn)?;
        self.painter.free(&self.conn)?;
        self.conn.close_font(self.font.id)?;
        Ok(())
    }

    fn numlock_mask(&self) -> Result<u16> {
        let mapping = self.conn.get_modifier_mapping()?.reply()?;
        let numlock = self.keymap.borrow().keycodes(NUM_LOCK);
        Ok(modifier_bit(
            &mapping.keycodes,
            usize::from(mapping.keycodes_per_modifier()),
            &numlock,
        ))
    }

    fn refresh_keyboard_mapping(&self) -> Result<()> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = self
            .conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()?;
        *self.keymap.borrow_mut() = KeyboardMap {
            min_keycode: min,
            per_keycode: usize::from(reply.keysyms_per_keycode),
            keysyms: reply.keysyms,
        };
        Ok(())
    }

    fn keycode_to_keysym(&self, keycode: u8) -> Result<Keysym> {
        Ok(self.keymap.borrow().keysym(keycode))
    }

    fn ungrab_keys(&self) -> Result<()> {
        self.conn.ungrab_key(Grab::ANY, self.root, ModMask::ANY)?;
        Ok(())
    }

    fn grab_key(&self, keysym: Keysym, modifiers: u16) -> Result<()> {
        for keycode in self.keymap.borrow().keycodes(keysym) {
            self.conn.grab_key(
                true,
                self.root,
                ModMask::from(modifiers),
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?;
        }
        Ok(())
    }

    fn ungrab_buttons(&self, win: Window) -> Result<()> {
        self.conn
            .ungrab_button(ButtonIndex::ANY, win, ModMask::ANY)?;
        Ok(())
    }

    fn grab_any_button(&self, win: Window) -> Result<()> {
        self.conn.grab_button(
            false,
            win,
            EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
            GrabMode::SYNC,
            GrabMode::SYNC,
            X_NONE,
            X_NONE,
            ButtonIndex::ANY,
            ModMask::ANY,
        )?;
        Ok(())
    }

    fn grab_button(&self, win: Window, button: u8, modifiers: u16) -> Result<()> {
        self.conn.grab_button(
            false,
            win,
            EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
            GrabMode::ASYNC,
            GrabMode::SYNC,
            X_NONE,
            X_NONE,
            ButtonIndex::from(button),
            ModMask::from(modifiers),
        )?;
        Ok(())
    }

    fn replay_pointer(&self) -> Result<()> {
        self.conn.allow_events(Allow::REPLAY_POINTER, CURRENT_TIME)?;
        Ok(())
    }

    fn grab_pointer(&self, cursor: Cursor) -> Result<bool> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                X_NONE,
                self.cursors.get(cursor),
                CURRENT_TIME,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        Ok(())
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn warp_pointer(&self, win: Window, x: i32, y: i32) -> Result<()> {
        self.conn
            .warp_pointer(X_NONE, win, 0, 0, 0, 0, x as i16, y as i16)?;
        Ok(())
    }

    fn create_bar_window(&self, g: Geometry) -> Result<Window> {
        let win = self.conn.generate_id()?;
        self.conn.create_window(
            self.depth,
            win,
            self.root,
            g.x as i16,
            g.y as i16,
            g.width.max(1) as u16,
            g.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .override_redirect(1)
                .background_pixmap(BackPixmap::PARENT_RELATIVE)
                .event_mask(EventMask::BUTTON_PRESS | EventMask::EXPOSURE)
                .cursor(self.cursors.normal),
        )?;
        self.conn.change_property8(
            PropMode::REPLACE,
            win,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            b"tagwm\0tagwm\0",
        )?;
        self.conn.map_window(win)?;
        self.raise_window(win)?;
        Ok(win)
    }

    fn destroy_window(&self, win: Window) -> Result<()> {
        self.conn.destroy_window(win)?;
        Ok(())
    }

    fn draw_bar(&self, win: Window, width: i32, height: i32, cells: &[BarCell]) -> Result<()> {
        self.painter
            .draw(&self.conn, win, width, height, cells, &self.palette, &self.font)
    }

    fn text_width(&self, text: &str) -> i32 {
        self.font.text_width(&self.conn, text)
    }

    fn font_height(&self) -> i32 {
        self.font.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keymap() -> KeyboardMap {
        // keycodes 8..=11, two keysyms each
        KeyboardMap {
            min_keycode: 8,
            per_keycode: 2,
            keysyms: vec![0x61, 0x41, NUM_LOCK, 0, 0x62, 0x42, 0x61, 0],
        }
    }

    #[test]
    fn test_keysym_uses_first_column() {
        let map = keymap();
        assert_eq!(map.keysym(8), 0x61);
        assert_eq!(map.keysym(9), NUM_LOCK);
        assert_eq!(map.keysym(7), 0);
        assert_eq!(map.keysym(200), 0);
    }

    #[test]
    fn test_keycodes_for_keysym() {
        let map = keymap();
        assert_eq!(map.keycodes(0x61), vec![8, 11]);
        assert!(map.keycodes(0x41).is_empty());
    }

    #[test]
    fn test_modifier_bit_of_numlock() {
        // shift, lock, control, mod1, mod2 ... two keycodes each
        let mut mapping = vec![0u8; 16];
        mapping[8] = 9;
        assert_eq!(modifier_bit(&mapping, 2, &[9]), 1 << 4);
        assert_eq!(modifier_bit(&mapping, 2, &[10]), 0);
    }
}
