//! User commands
//!
//! Everything a key or button binding can trigger. Commands act on the
//! selected monitor and its selected client.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::wm::WindowManager;
use crate::wm::client_flags::ClientFlags;
use crate::wm::layout::LayoutKind;
use crate::wm::placement::{FloatPos, format_placement};
use crate::wm::process;
use crate::wm::xconn::XConn;

/// Position in the visible client list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackPos {
    /// Relative to the selected client, wrapping around
    Inc(i32),
    /// The previously selected client
    PrevSel,
    /// Absolute index, negative values count from the end
    Index(i32),
}

/// How `place_mouse` picks the hovered slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceMode {
    /// Slot under the pointer
    Pointer,
    /// Slot under the center of the dragged window
    Center,
    /// Like `Pointer`, after warping the pointer to the window center
    Warp,
}

/// Bindable commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Show a tag mask; 0 switches back to the previous view
    View(u32),
    ToggleView(u32),
    Tag(u32),
    ToggleTag(u32),
    /// Focus the monitor showing the tags, or view them here
    FocusOrView(u32),
    FocusStack(StackPos),
    PushStack(StackPos),
    IncNMaster(i32),
    /// Below 1.0 relative, otherwise absolute after subtracting 1.0
    SetMFact(f64),
    Zoom,
    KillClient,
    SetLayout(LayoutKind),
    /// Flip between the two layouts of the monitor
    ToggleLayout,
    ToggleFloating,
    ToggleFullscreen,
    ToggleScratch(usize),
    FocusMon(i32),
    TagMon(i32),
    ToggleBar,
    FloatPos(String),
    Spawn(Vec<String>),
    Quit,
    MoveMouse,
    ResizeMouse,
    PlaceMouse(PlaceMode),
    MoveOrPlace(PlaceMode),
    /// Forward a status bar click to the status process
    SignalStatus(i32),
}

impl Action {
    /// Tag commands bound on the tag bar with a zero mask act on the
    /// clicked tag.
    pub fn with_clicked_tag(&self, tag: u32) -> Action {
        match *self {
            Action::View(0) => Action::View(tag),
            Action::ToggleView(0) => Action::ToggleView(tag),
            Action::Tag(0) => Action::Tag(tag),
            Action::ToggleTag(0) => Action::ToggleTag(tag),
            Action::FocusOrView(0) => Action::FocusOrView(tag),
            _ => self.clone(),
        }
    }
}

impl<X: XConn> WindowManager<X> {
    pub fn execute(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::View(tags) => self.view(*tags),
            Action::ToggleView(tags) => self.toggle_view(*tags),
            Action::Tag(tags) => self.tag(*tags),
            Action::ToggleTag(tags) => self.toggle_tag(*tags),
            Action::FocusOrView(tags) => self.focus_or_view(*tags),
            Action::FocusStack(pos) => self.focus_stack(*pos),
            Action::PushStack(pos) => self.push_stack(*pos),
            Action::IncNMaster(delta) => self.inc_nmaster(*delta),
            Action::SetMFact(f) => self.set_mfact(*f),
            Action::Zoom => self.zoom(),
            Action::KillClient => self.kill_client(),
            Action::SetLayout(layout) => self.set_layout(Some(*layout)),
            Action::ToggleLayout => self.set_layout(None),
            Action::ToggleFloating => self.toggle_floating(),
            Action::ToggleFullscreen => self.toggle_fullscreen(),
            Action::ToggleScratch(i) => self.toggle_scratch(*i),
            Action::FocusMon(dir) => self.focus_mon(*dir),
            Action::TagMon(dir) => self.tag_mon(*dir),
            Action::ToggleBar => self.toggle_bar(),
            Action::FloatPos(desc) => self.float_pos(desc),
            Action::Spawn(cmd) => {
                self.spawn(cmd);
                Ok(())
            }
            Action::Quit => {
                info!("Quit requested");
                self.running = false;
                Ok(())
            }
            Action::MoveMouse => self.move_mouse(),
            Action::ResizeMouse => self.resize_mouse(),
            Action::PlaceMouse(mode) => self.place_mouse(*mode),
            Action::MoveOrPlace(mode) => self.move_or_place(*mode),
            Action::SignalStatus(button) => {
                self.signal_status(*button);
                Ok(())
            }
        }
    }

    pub(crate) fn spawn(&self, cmd: &[String]) {
        if let Err(e) = process::spawn(cmd) {
            tracing::error!("Failed to spawn {:?}: {:#}", cmd, e);
        }
    }

    pub(crate) fn inc_nmaster(&mut self, delta: i32) -> Result<()> {
        let mon = self.state.selmon_mut();
        mon.nmaster = (mon.nmaster as i32 + delta).max(0) as usize;
        self.arrange(Some(self.state.selmon))
    }

    pub(crate) fn set_mfact(&mut self, value: f64) -> Result<()> {
        let mon = self.state.selmon_mut();
        if mon.layout().is_floating() {
            return Ok(());
        }
        let f = if value < 1.0 {
            value + mon.mfact
        } else {
            value - 1.0
        };
        if !(0.05..=0.95).contains(&f) {
            debug!("Rejecting mfact {}", f);
            return Ok(());
        }
        mon.mfact = f;
        self.arrange(Some(self.state.selmon))
    }

    /// `None` flips to the other layout slot. `Some` flips unless the
    /// layout is already current, then puts it in the selected slot.
    pub(crate) fn set_layout(&mut self, layout: Option<LayoutKind>) -> Result<()> {
        let mon = self.state.selmon_mut();
        if layout.is_none_or(|l| l != mon.layout()) {
            mon.sellt ^= 1;
        }
        if let Some(layout) = layout {
            mon.layouts[mon.sellt] = layout;
        }
        mon.ltsymbol = mon.layout().symbol().to_string();
        if mon.sel.is_some() {
            self.arrange(Some(self.state.selmon))
        } else {
            self.draw_bar(self.state.selmon)
        }
    }

    pub(crate) fn toggle_bar(&mut self) -> Result<()> {
        let selmon = self.state.selmon;
        let bh = self.bh;
        let mon = self.state.selmon_mut();
        mon.showbar = !mon.showbar;
        mon.update_bar_pos(bh);
        for bar in &self.state.monitors[selmon].bars {
            self.conn.move_resize(bar.win, bar.geometry, 0)?;
        }
        self.arrange(Some(selmon))
    }

    pub(crate) fn toggle_floating(&mut self) -> Result<()> {
        let Some(id) = self.state.sel() else {
            return Ok(());
        };
        let c = &mut self.state[id];
        if c.is_fullscreen() {
            return Ok(());
        }
        let floating = !c.is_floating() || c.flags.contains(ClientFlags::FIXED);
        c.flags.set(ClientFlags::FLOATING, floating);
        if floating {
            let g = c.geometry;
            self.resize(id, g, false)?;
        }
        self.arrange(Some(self.state.selmon))
    }

    pub(crate) fn toggle_fullscreen(&mut self) -> Result<()> {
        if let Some(id) = self.state.sel() {
            let fullscreen = self.state[id].is_fullscreen();
            self.set_fullscreen(id, !fullscreen)?;
        }
        Ok(())
    }

    /// Re-place the selected floating client with a placement descriptor.
    pub(crate) fn float_pos(&mut self, desc: &str) -> Result<()> {
        let Some(id) = self.state.sel() else {
            return Ok(());
        };
        if !self.state.selmon().layout().is_floating() && !self.state[id].is_floating() {
            return Ok(());
        }
        if !self.set_float_pos(id, desc)? {
            warn!("Unparsable placement {:?}", desc);
            return Ok(());
        }
        let c = &self.state[id];
        let (win, g) = (c.win, c.geometry);
        let (w, h) = (g.width, g.height);
        debug!("WM: Window {:#x} placed at {}", win, format_placement(g, c.bw));
        self.resize_client(id, g)?;
        self.conn.raise_window(win)?;
        self.conn.warp_pointer(win, w / 2, h / 2)
    }

    /// Apply a placement descriptor to a client's geometry without
    /// configuring the window. Returns false for unparsable descriptors.
    pub(crate) fn set_float_pos(
        &mut self,
        id: crate::wm::client::ClientId,
        desc: &str,
    ) -> Result<bool> {
        let layout = self.state.monitors[self.state[id].mon].layout();
        if !layout.is_floating() && !self.state[id].is_floating() {
            return Ok(true);
        }
        let Some(pos) = FloatPos::parse(desc) else {
            return Ok(false);
        };
        let pointer = if pos.uses_pointer() {
            self.conn.query_pointer()?
        } else {
            (0, 0)
        };
        let grid = (
            self.config.appearance.floatpos_grid_x,
            self.config.appearance.floatpos_grid_y,
        );
        let c = &self.state[id];
        let area = self.state.monitors[c.mon].work_area;
        let geometry = pos.apply(c.geometry, c.bw, area, grid, pointer);
        let c = &mut self.state[id];
        c.flags.insert(ClientFlags::IGNORE_SIZE_HINTS);
        c.geometry = geometry;
        Ok(true)
    }

    pub(crate) fn signal_status(&mut self, button: i32) {
        if self.status_signal == 0 {
            return;
        }
        if self.status_pid.is_none() {
            self.status_pid = process::find_process(&self.config.status.process);
        }
        let Some(pid) = self.status_pid else {
            debug!("Status process {:?} not running", self.config.status.process);
            return;
        };
        if let Err(e) = process::signal_status(pid, self.status_signal, button) {
            warn!("Failed to signal status process {}: {:#}", pid, e);
            self.status_pid = None;
        }
    }
}
