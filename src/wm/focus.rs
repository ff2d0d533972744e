//! Focus Module
//!
//! Input focus, the focus stack commands and pointer warping.

use anyhow::Result;
use tracing::debug;

use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::client_flags::ClientFlags;
use crate::wm::commands::StackPos;
use crate::wm::xconn::{Protocol, Scheme, XConn};

impl<X: XConn> WindowManager<X> {
    /// Focus `c`, or the most recently focused visible client of the
    /// selected monitor when `c` is `None` or hidden.
    pub(crate) fn focus(&mut self, c: Option<ClientId>) -> Result<()> {
        let mut c = c;
        if let Some(id) = c {
            let mon = self.state[id].mon;
            if mon != self.state.selmon {
                self.state.selmon = mon;
            }
        }
        if c.is_none_or(|id| !self.state.is_visible(id)) {
            c = self
                .state
                .selmon()
                .stack
                .iter()
                .copied()
                .find(|&id| self.state.is_visible(id));
        }
        if let Some(sel) = self.state.sel() {
            if Some(sel) != c {
                self.unfocus(sel, false)?;
            }
        }
        match c {
            Some(id) => {
                self.state.selmon = self.state[id].mon;
                if self.state[id].is_urgent() {
                    self.state[id].flags.remove(ClientFlags::URGENT);
                    self.conn.clear_urgency(self.state[id].win)?;
                }
                self.state.detach_stack(id);
                self.state.attach_stack(id);
                self.grab_buttons(id, true)?;
                self.conn.set_border_color(self.state[id].win, Scheme::Sel)?;
                self.set_focus(id)?;
            }
            None => {
                self.conn.focus_root()?;
                self.conn.set_active_window(None)?;
            }
        }
        self.state.selmon_mut().sel = c;
        self.draw_bars()
    }

    pub(crate) fn unfocus(&mut self, id: ClientId, set_focus: bool) -> Result<()> {
        self.grab_buttons(id, false)?;
        let c = &self.state[id];
        let scheme = if c.is_urgent() { Scheme::Urg } else { Scheme::Norm };
        self.conn.set_border_color(c.win, scheme)?;
        if set_focus {
            self.conn.focus_root()?;
            self.conn.set_active_window(None)?;
        }
        Ok(())
    }

    pub(crate) fn set_focus(&self, id: ClientId) -> Result<()> {
        let c = &self.state[id];
        if !c.flags.contains(ClientFlags::NEVER_FOCUS) {
            self.conn.set_input_focus(c.win)?;
            self.conn.set_active_window(Some(c.win))?;
        }
        if self.conn.supports_protocol(c.win, Protocol::TakeFocus)? {
            self.conn.send_protocol(c.win, Protocol::TakeFocus)?;
        }
        Ok(())
    }

    /// Index into the visible clients of the selected monitor, -1 when
    /// there is none.
    pub(crate) fn stack_pos(&self, pos: StackPos) -> i32 {
        let m = self.state.selmon();
        if m.clients.is_empty() {
            return -1;
        }
        let visible = self.state.visible(self.state.selmon);
        let n = visible.len() as i32;
        match pos {
            StackPos::PrevSel => {
                let Some(prev) = m
                    .stack
                    .iter()
                    .copied()
                    .find(|&id| Some(id) != m.sel && self.state.is_visible(id))
                else {
                    return -1;
                };
                visible.iter().position(|&id| id == prev).map_or(-1, |i| i as i32)
            }
            StackPos::Inc(inc) => {
                let Some(sel) = m.sel else {
                    return -1;
                };
                if n == 0 {
                    return -1;
                }
                let i = m
                    .clients
                    .iter()
                    .take_while(|&&id| id != sel)
                    .filter(|&&id| self.state.is_visible(id))
                    .count() as i32;
                (i + inc).rem_euclid(n)
            }
            StackPos::Index(i) if i < 0 => (n + i).max(0),
            StackPos::Index(i) => i,
        }
    }

    pub(crate) fn focus_stack(&mut self, pos: StackPos) -> Result<()> {
        let Some(sel) = self.state.sel() else {
            return Ok(());
        };
        if self.state[sel].is_fullscreen() && self.config.behavior.lock_fullscreen {
            return Ok(());
        }
        let i = self.stack_pos(pos);
        if i < 0 {
            return Ok(());
        }
        let visible = self.state.visible(self.state.selmon);
        let target = visible.get(i as usize).or(visible.last()).copied();
        if let Some(target) = target {
            self.focus(Some(target))?;
            self.restack(self.state.selmon)?;
        }
        Ok(())
    }

    /// Move the selected client to a position in the tiling order.
    pub(crate) fn push_stack(&mut self, pos: StackPos) -> Result<()> {
        let Some(sel) = self.state.sel() else {
            return Ok(());
        };
        let i = self.stack_pos(pos);
        if i < 0 {
            return Ok(());
        }
        let m = self.state.selmon;
        if i == 0 {
            self.state.detach(sel);
            self.state.attach(sel);
        } else {
            let clients = self.state.monitors[m].clients.clone();
            let mut left = i;
            let mut target = clients.last().copied();
            for &id in &clients {
                if id != sel && self.state.is_visible(id) {
                    left -= 1;
                }
                if left == 0 {
                    target = Some(id);
                    break;
                }
            }
            let Some(target) = target.filter(|&t| t != sel) else {
                return Ok(());
            };
            self.state.detach(sel);
            let list = &mut self.state.monitors[m].clients;
            let at = list.iter().position(|&id| id == target).map_or(list.len(), |p| p + 1);
            list.insert(at, sel);
        }
        self.arrange(Some(m))
    }

    pub(crate) fn focus_mon(&mut self, dir: i32) -> Result<()> {
        if self.state.monitors.len() <= 1 {
            return Ok(());
        }
        let m = self.dir_to_mon(dir);
        if m == self.state.selmon {
            return Ok(());
        }
        if let Some(sel) = self.state.sel() {
            self.unfocus(sel, false)?;
        }
        debug!("Focusing monitor {}", m);
        self.state.selmon = m;
        self.focus(None)?;
        self.warp(self.state.sel())
    }

    /// Put the pointer on a client, or on the work area center for `None`.
    /// A pointer already inside the client or on a bar stays.
    pub(crate) fn warp(&self, c: Option<ClientId>) -> Result<()> {
        let Some(id) = c else {
            let wa = self.state.selmon().work_area;
            return self.conn.warp_pointer(
                self.conn.root(),
                wa.x + wa.width / 2,
                wa.y + wa.height / 2,
            );
        };
        let (x, y) = self.conn.query_pointer()?;
        let c = &self.state[id];
        let (g, bw) = (c.geometry, c.bw);
        if x > g.x - bw && y > g.y - bw && x < g.x + g.width + 2 * bw && y < g.y + g.height + 2 * bw {
            return Ok(());
        }
        let on_bar = self
            .state
            .monitors
            .iter()
            .flat_map(|m| m.bars.iter().filter(move |_| m.showbar))
            .any(|b| b.geometry.contains(x, y));
        if on_bar {
            return Ok(());
        }
        self.conn.warp_pointer(c.win, g.width / 2, g.height / 2)
    }

    /// Swap the selection into the master area, or the next tiled client
    /// when the selection already is master.
    pub(crate) fn zoom(&mut self) -> Result<()> {
        let Some(sel) = self.state.sel() else {
            return Ok(());
        };
        let m = self.state.selmon;
        if self.state.monitors[m].layout().is_floating() || self.state[sel].is_floating() {
            return Ok(());
        }
        let mut c = sel;
        if self.state.next_tiled(m, 0) == Some(sel) {
            let after = self.state.monitors[m]
                .clients
                .iter()
                .position(|&id| id == sel)
                .map_or(0, |p| p + 1);
            match self.state.next_tiled(m, after) {
                Some(next) => c = next,
                None => return Ok(()),
            }
        }
        self.pop(c)
    }

    fn pop(&mut self, id: ClientId) -> Result<()> {
        self.state.detach(id);
        self.state.attach(id);
        self.focus(Some(id))?;
        self.arrange(Some(self.state[id].mon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::mock::{MockConn, test_wm};

    #[test]
    fn test_stack_pos_variants() {
        let mut wm = test_wm(MockConn::new());
        // tiling order: d c b a
        let ids: Vec<_> = (0..4).map(|i| wm.map_new_window(0x400001 + i)).collect();
        assert_eq!(wm.state.sel(), Some(ids[3]));
        assert_eq!(wm.stack_pos(StackPos::Inc(1)), 1);
        assert_eq!(wm.stack_pos(StackPos::Inc(-1)), 3);
        assert_eq!(wm.stack_pos(StackPos::Index(-1)), 3);
        assert_eq!(wm.stack_pos(StackPos::Index(-9)), 0);
        // previously selected client c sits at index 1
        assert_eq!(wm.stack_pos(StackPos::PrevSel), 1);
    }

    #[test]
    fn test_focus_stack_wraps() {
        let mut wm = test_wm(MockConn::new());
        let ids: Vec<_> = (0..3).map(|i| wm.map_new_window(0x400001 + i)).collect();
        wm.focus_stack(StackPos::Inc(-1)).unwrap();
        assert_eq!(wm.state.sel(), Some(ids[0]));
        wm.focus_stack(StackPos::Inc(1)).unwrap();
        assert_eq!(wm.state.sel(), Some(ids[2]));
        assert_eq!(wm.conn.focused(), Some(0x400003));
    }

    #[test]
    fn test_push_stack_moves_selection() {
        let mut wm = test_wm(MockConn::new());
        let ids: Vec<_> = (0..3).map(|i| wm.map_new_window(0x400001 + i)).collect();
        // order c b a with c selected; push c after b
        wm.push_stack(StackPos::Index(1)).unwrap();
        assert_eq!(wm.state.monitors[0].clients, vec![ids[1], ids[2], ids[0]]);
        wm.push_stack(StackPos::Index(0)).unwrap();
        assert_eq!(wm.state.monitors[0].clients, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn test_zoom_swaps_master() {
        let mut wm = test_wm(MockConn::new());
        let ids: Vec<_> = (0..3).map(|i| wm.map_new_window(0x400001 + i)).collect();
        // selected c already is master: b gets promoted
        wm.zoom().unwrap();
        assert_eq!(wm.state.monitors[0].clients[0], ids[1]);
        assert_eq!(wm.state.sel(), Some(ids[1]));
    }

    #[test]
    fn test_hidden_selection_falls_back() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        let b = wm.map_new_window(0x400002);
        wm.state[b].tags = 1 << 3;
        wm.focus(Some(b)).unwrap();
        assert_eq!(wm.state.sel(), Some(a));
    }

    #[test]
    fn test_urgency_cleared_on_focus() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        wm.map_new_window(0x400002);
        wm.state[a].flags.insert(ClientFlags::URGENT);
        wm.focus(Some(a)).unwrap();
        assert!(!wm.state[a].is_urgent());
        assert!(wm.conn.urgency_cleared(0x400001));
    }
}
