//! Window Manager Module
//!
//! The tagging state machine: clients, monitors, focus and layouts, driven
//! by protocol events and bound commands.

pub mod bar;
pub mod client;
pub mod client_flags;
pub mod commands;
pub mod display;
pub mod errors;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod gaps;
pub mod hints;
pub mod keyboard;
pub mod layout;
pub mod moveresize;
pub mod placement;
pub mod process;
pub mod rules;
pub mod screen;
pub mod stacking;
pub mod state;
pub mod swallow;
pub mod terminate;
pub mod workspace;
pub mod x11;
pub mod xconn;

#[cfg(test)]
pub(crate) mod mock;

use std::collections::VecDeque;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::bar::StatusText;
use crate::wm::client::{Client, ClientId, SavedState};
use crate::wm::client_flags::ClientFlags;
use crate::wm::hints::{HintContext, SizeHints, apply_size_hints};
use crate::wm::keyboard::Bindings;
use crate::wm::layout::LayoutKind;
use crate::wm::state::WmState;
use crate::wm::xconn::{Cursor, IcccmState, Scheme, Window, WindowAttributes, XConn, XEvent};

pub struct WindowManager<X: XConn> {
    pub(crate) conn: X,
    pub(crate) config: Config,
    pub(crate) state: WmState,
    pub(crate) bindings: Bindings,
    /// Modifier bit NumLock is mapped to
    pub(crate) numlock: u16,
    pub(crate) status: StatusText,
    /// Bar height
    pub(crate) bh: i32,
    /// Horizontal text padding of bar cells
    pub(crate) lrpad: i32,
    pub(crate) screen_width: i32,
    pub(crate) screen_height: i32,
    pub(crate) running: bool,
    /// Events read but not serviced by a drag loop
    pub(crate) pending: VecDeque<XEvent>,
    /// Monitor the pointer was last seen on
    pub(crate) motion_mon: Option<usize>,
    pub(crate) status_pid: Option<i32>,
    /// Signal byte of the last clicked status block
    pub(crate) status_signal: i32,
}

impl<X: XConn> WindowManager<X> {
    pub fn new(conn: X, config: Config) -> Self {
        let font_h = conn.font_height();
        let (screen_width, screen_height) = conn.screen_size();
        let bindings = Bindings::new(&config.keys, &config.buttons);
        Self {
            bh: font_h + config.appearance.vert_pad_bar,
            lrpad: font_h + config.appearance.horiz_pad_bar,
            conn,
            config,
            state: WmState::new(),
            bindings,
            numlock: 0,
            status: StatusText::default(),
            screen_width,
            screen_height,
            running: true,
            pending: VecDeque::new(),
            motion_mon: None,
            status_pid: None,
            status_signal: 0,
        }
    }

    /// Take over the root window and publish the initial state.
    pub fn setup(&mut self) -> Result<()> {
        self.conn.become_wm()?;
        info!("WM: Screen {}x{}, bar height {}", self.screen_width, self.screen_height, self.bh);

        self.update_geometry()?;
        self.conn.set_root_cursor(Cursor::Normal)?;
        self.update_bars()?;
        for m in &self.state.monitors {
            for bar in &m.bars {
                self.conn.move_resize(bar.win, bar.geometry, 0)?;
            }
        }
        self.update_status()?;

        self.conn.init_ewmh("tagwm")?;
        let ntags = self.config.ntags() as u32;
        self.conn.set_number_of_desktops(ntags)?;
        self.conn.set_desktop_names(&self.config.tags)?;
        self.conn.set_desktop_viewport(ntags)?;
        self.update_current_desktop()?;
        self.conn.set_client_list(&[])?;
        self.conn.set_client_list_stacking(&[])?;

        self.grab_keys()?;
        self.focus(None)?;
        self.conn.flush()
    }

    /// Manage windows that existed before we started, transients last.
    pub fn scan(&mut self) -> Result<()> {
        let windows = self.conn.query_tree()?;
        let mut transients = Vec::new();
        for &win in &windows {
            let Some(attrs) = self.conn.window_attributes(win)? else {
                continue;
            };
            if attrs.override_redirect {
                continue;
            }
            if self.conn.transient_for(win)?.is_some() {
                transients.push((win, attrs));
                continue;
            }
            if self.is_mappable(win, &attrs)? {
                self.manage(win, attrs)?;
            }
        }
        for (win, attrs) in transients {
            if self.is_mappable(win, &attrs)? {
                self.manage(win, attrs)?;
            }
        }
        info!("WM: Scanned {} existing windows", windows.len());
        Ok(())
    }

    fn is_mappable(&self, win: Window, attrs: &WindowAttributes) -> Result<bool> {
        Ok(attrs.viewable || self.conn.wm_state(win)? == Some(IcccmState::Iconic))
    }

    /// Main event loop
    pub fn run(&mut self) -> Result<()> {
        info!("WM: Entering event loop");
        while self.running {
            process::reap_children();
            let event = match self.pending.pop_front() {
                Some(event) => event,
                None => self.conn.next_event()?,
            };
            self.handle_event(event)?;
        }
        info!("WM: Event loop finished");
        Ok(())
    }

    /// Manage a new window (called when MapRequest is received)
    pub(crate) fn manage(&mut self, win: Window, attrs: WindowAttributes) -> Result<()> {
        debug!("WM: Managing window {:#x}", win);
        let id = self.state.next_client_id();
        let mut c = Client::new(id, win, attrs.geometry, attrs.border_width);
        c.pid = self.conn.window_pid(win)?;
        c.mon = self.state.selmon;
        self.state.clients.insert(id, c);
        self.update_title(id)?;

        let parent = self
            .conn
            .transient_for(win)?
            .and_then(|t| self.state.win_to_client(t));
        let mut terminal = None;
        if let Some(parent) = parent {
            let (mon, tags) = (self.state[parent].mon, self.state[parent].tags);
            let c = &mut self.state[id];
            c.mon = mon;
            c.tags = tags;
        } else {
            if let Some(class) = self.conn.class_hint(win)? {
                let c = &mut self.state[id];
                c.class = class.class;
                c.instance = class.instance;
            }
            self.apply_rules(id)?;
            terminal = self.term_for_win(id);
        }

        // keep the window on its monitor and off a top bar
        let bw = self.config.appearance.border_px;
        let mon = self.state[id].mon;
        let m = &self.state.monitors[mon];
        let (mg, wa) = (m.geometry, m.work_area);
        let bar_on_top = m.bars.iter().any(|b| b.geometry.y == mg.y && m.showbar);
        let bh = self.bh;
        let c = &mut self.state[id];
        c.bw = bw;
        if c.geometry.x + c.width() > mg.right() {
            c.geometry.x = mg.right() - c.width();
        }
        if c.geometry.y + c.height() > mg.bottom() {
            c.geometry.y = mg.bottom() - c.height();
        }
        c.geometry.x = c.geometry.x.max(mg.x);
        let center_x = c.geometry.x + c.geometry.width / 2;
        let top = if bar_on_top && center_x >= wa.x && center_x < wa.right() {
            mg.y + bh
        } else {
            mg.y
        };
        c.geometry.y = c.geometry.y.max(top);

        self.conn.set_border_width(win, bw)?;
        self.conn.set_border_color(win, self.border_scheme(id))?;
        self.configure(id)?;
        self.update_window_type(id)?;
        self.update_size_hints(id)?;
        self.update_wm_hints(id)?;
        self.update_motif_hints(id)?;
        self.conn.select_client_input(win)?;
        self.grab_buttons(id, false)?;

        let c = &mut self.state[id];
        if !c.is_floating() {
            let floating = parent.is_some() || c.flags.contains(ClientFlags::FIXED);
            c.flags.set(ClientFlags::FLOATING, floating);
            c.flags.set(ClientFlags::OLD_FLOATING, floating);
        }
        if c.is_floating() {
            self.conn.raise_window(win)?;
        }
        self.state.attach(id);
        self.state.attach_stack(id);
        self.update_client_list()?;

        // map offscreen first, arrange moves it into place
        let c = &self.state[id];
        let mut offscreen = c.geometry;
        offscreen.x += 2 * self.screen_width;
        self.conn.move_resize(win, offscreen, c.bw)?;
        self.set_client_state(win, IcccmState::Normal)?;

        let mon = self.state[id].mon;
        if mon == self.state.selmon {
            if let Some(sel) = self.state.sel() {
                self.lose_fullscreen(sel, id)?;
                self.unfocus(sel, false)?;
            }
        }
        self.state.monitors[mon].sel = Some(id);
        self.arrange(Some(mon))?;
        self.conn.map_window(win)?;
        if let Some(terminal) = terminal {
            self.swallow(terminal, id)?;
        }
        self.focus(None)?;
        info!("WM: Managed window {:#x} ({})", win, self.state[id].name);
        Ok(())
    }

    /// Forget a client. `destroyed` is set when its window no longer exists.
    pub(crate) fn unmanage(&mut self, id: ClientId, destroyed: bool) -> Result<()> {
        debug!("WM: Unmanaging window {:#x}", self.state[id].win);
        if self.is_swallowing(id) {
            self.unswallow(id)?;
            return self.update_client_list();
        }
        if self.state.swallows.iter().any(|o| o.terminal == id) {
            return self.drop_swallowed(id);
        }

        let c = &self.state[id];
        let (win, mon, old_bw) = (c.win, c.mon, c.old_bw);
        self.state.detach(id);
        self.state.detach_stack(id);
        if !destroyed {
            self.conn.set_border_width(win, old_bw)?;
            self.conn.ungrab_buttons(win)?;
            self.set_client_state(win, IcccmState::Withdrawn)?;
        }
        self.state.remove(id);
        self.arrange(Some(mon))?;
        self.focus(None)?;
        self.update_client_list()
    }

    /// Publish _NET_CLIENT_LIST in tiling order and
    /// _NET_CLIENT_LIST_STACKING in focus order.
    pub(crate) fn update_client_list(&self) -> Result<()> {
        let windows: Vec<Window> = self
            .state
            .all_clients()
            .into_iter()
            .map(|id| self.state[id].win)
            .collect();
        self.conn.set_client_list(&windows)?;
        let stacking: Vec<Window> = self
            .state
            .monitors
            .iter()
            .flat_map(|m| m.stack.iter())
            .map(|&id| self.state[id].win)
            .collect();
        self.conn.set_client_list_stacking(&stacking)
    }

    pub(crate) fn hint_context(&self, mon: usize, interact: bool) -> HintContext {
        let m = &self.state.monitors[mon];
        HintContext {
            interact,
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            work_area: m.work_area,
            bar_height: self.bh,
            resize_hints: self.config.behavior.resize_hints,
            floating_layout: m.layout().is_floating(),
        }
    }

    /// Resize through the size-hint solver.
    pub(crate) fn resize(&mut self, id: ClientId, rect: Geometry, interact: bool) -> Result<()> {
        let c = &self.state[id];
        let ctx = self.hint_context(c.mon, interact);
        let (geometry, dirty) = apply_size_hints(c, rect, &ctx);
        if dirty {
            self.resize_client(id, geometry)?;
        }
        Ok(())
    }

    /// Set the geometry and configure the window as is.
    pub(crate) fn resize_client(&mut self, id: ClientId, geometry: Geometry) -> Result<()> {
        let c = &mut self.state[id];
        c.set_geometry(geometry);
        if c.flags.contains(ClientFlags::BEING_MOVED) {
            return Ok(());
        }
        let (win, mon, mut bw) = (c.win, c.mon, c.bw);
        let tiled = !c.is_floating() && !c.is_fullscreen();
        let layout = self.state.monitors[mon].layout();

        // a lone tiled client or a monocle client drops its border
        let mut g = geometry;
        if tiled
            && !layout.is_floating()
            && (layout == LayoutKind::Monocle || self.state.tiled(mon).len() == 1)
        {
            g.width += 2 * bw;
            g.height += 2 * bw;
            bw = 0;
        }
        self.conn.move_resize(win, g, bw)?;
        self.conn.send_configure_notify(win, g, bw)
    }

    /// Tell the client its current geometry with a synthetic ConfigureNotify.
    pub(crate) fn configure(&self, id: ClientId) -> Result<()> {
        let c = &self.state[id];
        self.conn.send_configure_notify(c.win, c.geometry, c.bw)
    }

    pub(crate) fn set_client_state(&self, win: Window, state: IcccmState) -> Result<()> {
        self.conn.set_wm_state(win, state)
    }

    /// Border color for a client that is not being focused.
    pub(crate) fn border_scheme(&self, id: ClientId) -> Scheme {
        let c = &self.state[id];
        if c.is_urgent() {
            Scheme::Urg
        } else if self.state.monitors[c.mon].sel == Some(id) {
            Scheme::Sel
        } else {
            Scheme::Norm
        }
    }

    pub(crate) fn update_title(&mut self, id: ClientId) -> Result<()> {
        let title = self.conn.title(self.state[id].win)?;
        self.state[id].set_title(title);
        Ok(())
    }

    pub(crate) fn update_size_hints(&mut self, id: ClientId) -> Result<()> {
        let raw = self.conn.size_hints(self.state[id].win)?;
        let hints = SizeHints::from_raw(raw);
        let c = &mut self.state[id];
        c.flags.set(ClientFlags::FIXED, hints.is_fixed());
        c.hints = hints;
        Ok(())
    }

    pub(crate) fn update_wm_hints(&mut self, id: ClientId) -> Result<()> {
        let win = self.state[id].win;
        let Some(hints) = self.conn.wm_hints(win)? else {
            return Ok(());
        };
        if self.state.sel() == Some(id) && hints.is_urgent() {
            self.conn.clear_urgency(win)?;
        } else {
            self.state[id]
                .flags
                .set(ClientFlags::URGENT, hints.is_urgent());
            self.conn.set_border_color(win, self.border_scheme(id))?;
        }
        let never_focus = hints.accepts_input().is_some_and(|input| !input);
        self.state[id]
            .flags
            .set(ClientFlags::NEVER_FOCUS, never_focus);
        Ok(())
    }

    /// Follow a Motif request to drop or keep decorations.
    pub(crate) fn update_motif_hints(&mut self, id: ClientId) -> Result<()> {
        if !self.config.behavior.decor_hints {
            return Ok(());
        }
        let Some(hints) = self.conn.motif_hints(self.state[id].win)? else {
            return Ok(());
        };
        let Some(border) = hints.wants_border() else {
            return Ok(());
        };
        let c = &mut self.state[id];
        let (outer_w, outer_h) = (c.width(), c.height());
        let bw = if border { self.config.appearance.border_px } else { 0 };
        c.bw = bw;
        c.old_bw = bw;
        let g = Geometry::new(c.geometry.x, c.geometry.y, outer_w - 2 * bw, outer_h - 2 * bw);
        self.resize(id, g, false)
    }

    pub(crate) fn update_window_type(&mut self, id: ClientId) -> Result<()> {
        if self.conn.wants_fullscreen(self.state[id].win)? {
            self.set_fullscreen(id, true)?;
        }
        Ok(())
    }

    pub(crate) fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) -> Result<()> {
        let c = &self.state[id];
        let win = c.win;
        if fullscreen && !c.is_fullscreen() {
            self.conn.set_fullscreen_state(win, true)?;
            let c = &mut self.state[id];
            c.saved = Some(SavedState {
                geometry: c.geometry,
                border_width: c.bw,
                floating: c.is_floating(),
            });
            let floating = c.is_floating();
            c.flags.set(ClientFlags::OLD_FLOATING, floating);
            c.flags.insert(ClientFlags::FULLSCREEN | ClientFlags::FLOATING);
            c.bw = 0;
            let mon = c.mon;
            let mg = self.state.monitors[mon].geometry;
            self.resize_client(id, mg)?;
            self.conn.raise_window(win)?;
            debug!("WM: Window {:#x} entered fullscreen", win);
        } else if !fullscreen && c.is_fullscreen() {
            self.conn.set_fullscreen_state(win, false)?;
            let c = &mut self.state[id];
            c.flags.remove(ClientFlags::FULLSCREEN);
            let mon = c.mon;
            if let Some(saved) = c.saved.take() {
                c.flags.set(ClientFlags::FLOATING, saved.floating);
                c.bw = saved.border_width;
                self.resize_client(id, saved.geometry)?;
            }
            self.arrange(Some(mon))?;
            debug!("WM: Window {:#x} left fullscreen", win);
        }
        Ok(())
    }

    /// Drop fullscreen on `sel` when `next` is about to tile over it.
    pub(crate) fn lose_fullscreen(&mut self, sel: ClientId, next: ClientId) -> Result<()> {
        let (s, n) = (&self.state[sel], &self.state[next]);
        if s.is_fullscreen() && self.state.is_visible(sel) && s.mon == n.mon && !n.is_floating() {
            self.set_fullscreen(sel, false)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::mock::{MockConn, test_wm};

    #[test]
    fn test_manage_maps_and_focuses() {
        let mut wm = test_wm(MockConn::new());
        let id = wm.map_new_window(0x400001);
        assert_eq!(wm.state.sel(), Some(id));
        assert!(wm.conn.mapped(0x400001));
        assert_eq!(wm.conn.focused(), Some(0x400001));
        assert_eq!(wm.state[id].tags, 1);
        // a lone tiled client fills the work area without border
        let wa = wm.state.monitors[0].work_area;
        assert_eq!(wm.conn.last_geometry(0x400001), Some((wa, 0)));
    }

    #[test]
    fn test_manage_transient_inherits_tags() {
        let mut wm = test_wm(MockConn::new());
        let parent = wm.map_new_window(0x400001);
        wm.state[parent].tags = 4;
        wm.state.monitors[0].tagset[0] = 5;
        wm.conn.set_transient(0x400002, 0x400001);
        let child = wm.map_new_window(0x400002);
        assert_eq!(wm.state[child].tags, 4);
        assert!(wm.state[child].is_floating());
    }

    #[test]
    fn test_unmanage_restores_focus() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        let b = wm.map_new_window(0x400002);
        assert_eq!(wm.state.sel(), Some(b));
        wm.unmanage(b, true).unwrap();
        assert_eq!(wm.state.sel(), Some(a));
        assert!(!wm.state.clients.contains_key(&b));
        assert_eq!(wm.conn.client_list(), vec![0x400001]);
    }

    #[test]
    fn test_fullscreen_round_trip() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        let b = wm.map_new_window(0x400002);
        let before = wm.state[a].geometry;
        wm.set_fullscreen(a, true).unwrap();
        assert_eq!(wm.state[a].geometry, wm.state.monitors[0].geometry);
        assert_eq!(wm.state[a].bw, 0);
        wm.set_fullscreen(a, false).unwrap();
        assert!(!wm.state[a].is_fullscreen());
        assert!(!wm.state[a].is_floating());
        assert_eq!(wm.state[a].bw, wm.config.appearance.border_px);
        assert_eq!(wm.state[a].geometry, before);
        let _ = b;
    }

    #[test]
    fn test_new_tiled_client_drops_fullscreen() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        wm.set_fullscreen(a, true).unwrap();
        wm.map_new_window(0x400002);
        assert!(!wm.state[a].is_fullscreen());
    }
}
