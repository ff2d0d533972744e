//! Events Module
//!
//! Routes decoded protocol events to their handlers. Every handler leaves
//! the state consistent on its own, so events can be replayed in any order
//! the server delivers them.

use anyhow::Result;
use tracing::{debug, trace};

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::bar::ClickTarget;
use crate::wm::client_flags::{ClientFlags, ConfigMask};
use crate::wm::xconn::{
    ButtonEvent, ClientMessageKind, ConfigureRequest, IcccmState, MotionEvent, PropertyKind,
    StateAction, Window, XConn, XEvent,
};

impl<X: XConn> WindowManager<X> {
    /// Dispatch one event to its handler.
    pub fn handle_event(&mut self, event: XEvent) -> Result<()> {
        trace!("WM: {:?}", event);
        match event {
            XEvent::ButtonPress(e) => self.button_press(e),
            XEvent::ButtonRelease(_) => Ok(()),
            XEvent::ClientMessage { window, kind } => self.client_message(window, kind),
            XEvent::ConfigureRequest(req) => self.configure_request(req),
            XEvent::ConfigureNotify {
                window,
                width,
                height,
            } => self.configure_notify(window, width, height),
            XEvent::DestroyNotify { window } => self.destroy_notify(window),
            XEvent::EnterNotify { window, normal } => self.enter_notify(window, normal),
            XEvent::Expose { window, count } => self.expose(window, count),
            XEvent::FocusIn { window } => self.focus_in(window),
            XEvent::KeyPress { keycode, state } => self.key_press(keycode, state),
            XEvent::MappingNotify { keyboard } => {
                self.conn.refresh_keyboard_mapping()?;
                if keyboard {
                    self.grab_keys()?;
                }
                Ok(())
            }
            XEvent::MapRequest { window } => self.map_request(window),
            XEvent::MotionNotify(e) => self.motion_notify(e),
            XEvent::PropertyNotify {
                window,
                kind,
                deleted,
            } => self.property_notify(window, kind, deleted),
            XEvent::UnmapNotify { window, synthetic } => self.unmap_notify(window, synthetic),
        }
    }

    fn button_press(&mut self, e: ButtonEvent) -> Result<()> {
        let m = self.win_to_mon(e.window)?;
        if m != self.state.selmon {
            if let Some(sel) = self.state.sel() {
                self.unfocus(sel, true)?;
            }
            self.state.selmon = m;
            self.focus(None)?;
        }

        let mut click = ClickTarget::RootWin;
        let mut arg = 0;
        if let Some(hit) = self.bar_click(e.window, e.x) {
            click = hit.target;
            arg = hit.arg;
            if click == ClickTarget::StatusText {
                self.status_signal = arg as i32;
            }
        } else if let Some(id) = self.state.win_to_client(e.window) {
            self.focus(Some(id))?;
            self.restack(self.state.selmon)?;
            self.conn.replay_pointer()?;
            click = ClickTarget::ClientWin;
        }

        let actions = self
            .bindings
            .button_actions(click, e.button, e.state, self.numlock);
        for action in actions {
            let action = if click == ClickTarget::TagBar {
                action.with_clicked_tag(arg)
            } else {
                action
            };
            debug!("WM: Button {} on {:?}: {:?}", e.button, click, action);
            self.execute(&action)?;
        }
        Ok(())
    }

    fn client_message(&mut self, window: Window, kind: ClientMessageKind) -> Result<()> {
        let Some(id) = self.state.win_to_client(window) else {
            return Ok(());
        };
        match kind {
            ClientMessageKind::Fullscreen(action) => {
                let fullscreen = match action {
                    StateAction::Add => true,
                    StateAction::Remove => false,
                    StateAction::Toggle => !self.state[id].is_fullscreen(),
                };
                self.set_fullscreen(id, fullscreen)
            }
            ClientMessageKind::ActiveWindow => {
                let tags = self.state[id].tags;
                let Some(i) = (0..self.config.ntags()).find(|i| tags & (1 << i) != 0) else {
                    return Ok(());
                };
                self.focus_or_view(1 << i)?;
                self.focus(Some(id))?;
                self.restack(self.state.selmon)
            }
            ClientMessageKind::Other => Ok(()),
        }
    }

    fn configure_request(&mut self, req: ConfigureRequest) -> Result<()> {
        let Some(id) = self.state.win_to_client(req.window) else {
            return self.conn.configure_unmanaged(&req);
        };
        let floating_layout = self.state.selmon().layout().is_floating();
        let mg = self.state.monitors[self.state[id].mon].geometry;
        let c = &mut self.state[id];
        if req.mask.contains(ConfigMask::BORDER_WIDTH) {
            c.bw = req.border_width;
        } else if c.is_floating() || floating_layout {
            if req.mask.contains(ConfigMask::X) {
                c.old_geometry.x = c.geometry.x;
                c.geometry.x = mg.x + req.x;
            }
            if req.mask.contains(ConfigMask::Y) {
                c.old_geometry.y = c.geometry.y;
                c.geometry.y = mg.y + req.y;
            }
            if req.mask.contains(ConfigMask::WIDTH) {
                c.old_geometry.width = c.geometry.width;
                c.geometry.width = req.width;
            }
            if req.mask.contains(ConfigMask::HEIGHT) {
                c.old_geometry.height = c.geometry.height;
                c.geometry.height = req.height;
            }
            if c.is_floating() {
                if c.geometry.x + c.geometry.width > mg.right() {
                    c.geometry.x = mg.x + (mg.width / 2 - c.width() / 2);
                }
                if c.geometry.y + c.geometry.height > mg.bottom() {
                    c.geometry.y = mg.y + (mg.height / 2 - c.height() / 2);
                }
            }
            let (win, geometry, bw) = (c.win, c.geometry, c.bw);
            if req.mask.moves() && !req.mask.resizes() {
                self.configure(id)?;
            }
            if self.state.is_visible(id) {
                self.conn.move_resize(win, geometry, bw)?;
            }
        } else {
            self.configure(id)?;
        }
        Ok(())
    }

    fn configure_notify(&mut self, window: Window, width: i32, height: i32) -> Result<()> {
        if window != self.conn.root() {
            return Ok(());
        }
        let dirty = self.screen_width != width || self.screen_height != height;
        self.screen_width = width;
        self.screen_height = height;
        if self.update_geometry()? || dirty {
            debug!("WM: Screen changed to {}x{}", width, height);
            self.update_bars()?;
            for m in 0..self.state.monitors.len() {
                let mg = self.state.monitors[m].geometry;
                let fullscreen: Vec<_> = self.state.monitors[m]
                    .clients
                    .iter()
                    .copied()
                    .filter(|&id| self.state[id].is_fullscreen())
                    .collect();
                for id in fullscreen {
                    self.resize_client(id, mg)?;
                }
                for bar in &self.state.monitors[m].bars {
                    self.conn.move_resize(bar.win, bar.geometry, 0)?;
                }
            }
            self.focus(None)?;
            self.arrange(None)?;
        }
        Ok(())
    }

    fn destroy_notify(&mut self, window: Window) -> Result<()> {
        if let Some(id) = self.state.win_to_client(window) {
            self.unmanage(id, true)
        } else if let Some(terminal) = self.swallowed_terminal(window) {
            self.drop_swallowed(terminal)
        } else {
            Ok(())
        }
    }

    /// Focus follows the pointer across clients and monitors.
    fn enter_notify(&mut self, window: Window, normal: bool) -> Result<()> {
        if !normal && window != self.conn.root() {
            return Ok(());
        }
        let c = self.state.win_to_client(window);
        let m = match c {
            Some(id) => self.state[id].mon,
            None => self.win_to_mon(window)?,
        };
        if m != self.state.selmon {
            if let Some(sel) = self.state.sel() {
                self.unfocus(sel, true)?;
            }
            self.state.selmon = m;
        } else if c.is_none() || c == self.state.sel() {
            return Ok(());
        }
        self.focus(c)
    }

    fn expose(&mut self, window: Window, count: u16) -> Result<()> {
        if count != 0 {
            return Ok(());
        }
        match self
            .state
            .monitors
            .iter()
            .position(|m| m.bars.iter().any(|b| b.win == window))
        {
            Some(m) => self.draw_bar(m),
            None => Ok(()),
        }
    }

    /// Some clients steal focus; hand it back to the selection.
    fn focus_in(&mut self, window: Window) -> Result<()> {
        if let Some(sel) = self.state.sel() {
            if self.state[sel].win != window {
                self.set_focus(sel)?;
            }
        }
        Ok(())
    }

    fn map_request(&mut self, window: Window) -> Result<()> {
        let Some(attrs) = self.conn.window_attributes(window)? else {
            return Ok(());
        };
        if attrs.override_redirect {
            return Ok(());
        }
        if self.state.win_to_client(window).is_none() {
            self.manage(window, attrs)?;
        }
        Ok(())
    }

    fn motion_notify(&mut self, e: MotionEvent) -> Result<()> {
        if e.window != self.conn.root() {
            return Ok(());
        }
        let m = self.rect_to_mon(Geometry::new(e.root_x, e.root_y, 1, 1));
        if self.motion_mon.is_some_and(|prev| prev != m) {
            if let Some(sel) = self.state.sel() {
                self.unfocus(sel, true)?;
            }
            self.state.selmon = m;
            self.focus(None)?;
        }
        self.motion_mon = Some(m);
        Ok(())
    }

    fn property_notify(&mut self, window: Window, kind: PropertyKind, deleted: bool) -> Result<()> {
        if window == self.conn.root() && kind == PropertyKind::WmName {
            return self.update_status();
        }
        if deleted {
            return Ok(());
        }
        let Some(id) = self.state.win_to_client(window) else {
            return Ok(());
        };
        match kind {
            PropertyKind::TransientFor => {
                if self.state[id].is_floating() {
                    return Ok(());
                }
                let parent = self.conn.transient_for(window)?;
                if parent.and_then(|p| self.state.win_to_client(p)).is_some() {
                    self.state[id].flags.insert(ClientFlags::FLOATING);
                    self.arrange(Some(self.state[id].mon))?;
                }
                Ok(())
            }
            PropertyKind::NormalHints => self.update_size_hints(id),
            PropertyKind::WmHints => {
                self.update_wm_hints(id)?;
                self.draw_bars()
            }
            PropertyKind::WmName | PropertyKind::NetWmName => {
                self.update_title(id)?;
                let mon = self.state[id].mon;
                if self.state.monitors[mon].sel == Some(id) {
                    self.draw_bar(mon)?;
                }
                Ok(())
            }
            PropertyKind::MotifHints => self.update_motif_hints(id),
            PropertyKind::WindowType => self.update_window_type(id),
            PropertyKind::Other => Ok(()),
        }
    }

    fn unmap_notify(&mut self, window: Window, synthetic: bool) -> Result<()> {
        let Some(id) = self.state.win_to_client(window) else {
            return Ok(());
        };
        if synthetic {
            self.set_client_state(window, IcccmState::Withdrawn)
        } else {
            self.unmanage(id, false)
        }
    }
}
