//! Stacking Module
//!
//! Showing and hiding clients by tag, running the monitor layout and
//! restacking tiled windows below the bar.

use anyhow::Result;
use tracing::debug;

use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::layout::LayoutParams;
use crate::wm::xconn::XConn;

impl<X: XConn> WindowManager<X> {
    /// Re-layout one monitor, or every monitor for `None`.
    pub(crate) fn arrange(&mut self, mon: Option<usize>) -> Result<()> {
        match mon {
            Some(m) => {
                self.show_hide(m)?;
                self.arrange_mon(m)?;
                self.restack(m)
            }
            None => {
                for m in 0..self.state.monitors.len() {
                    self.show_hide(m)?;
                }
                for m in 0..self.state.monitors.len() {
                    self.arrange_mon(m)?;
                }
                Ok(())
            }
        }
    }

    /// Run the current layout of a monitor.
    pub(crate) fn arrange_mon(&mut self, m: usize) -> Result<()> {
        let tiled: Vec<(ClientId, i32)> = self
            .state
            .tiled(m)
            .into_iter()
            .map(|id| (id, self.state[id].bw))
            .collect();
        let mon = &self.state.monitors[m];
        let layout = mon.layout();
        let params = LayoutParams {
            area: mon.work_area,
            clients: &tiled,
            visible: self.state.visible(m).len(),
            mfact: mon.mfact,
            nmaster: mon.nmaster,
            gaps: mon.gaps,
            smartgaps: self.config.appearance.smartgaps,
            bar_height: self.bh,
        };
        let arrangement = layout.arrange(&params);
        self.state.monitors[m].ltsymbol = arrangement
            .symbol
            .unwrap_or_else(|| layout.symbol().to_string());
        debug!(
            "Arranged monitor {} with {:?}: {} tiled",
            m,
            layout,
            arrangement.placements.len()
        );
        for (id, geometry) in arrangement.placements {
            self.resize(id, geometry, false)?;
        }
        Ok(())
    }

    /// Move visible clients on screen and hidden ones off to the left.
    pub(crate) fn show_hide(&mut self, m: usize) -> Result<()> {
        let stack = self.state.monitors[m].stack.clone();
        let floating_layout = self.state.monitors[m].layout().is_floating();
        let sptagmask = self.config.sptagmask();
        for &id in &stack {
            if !self.state.is_visible(id) {
                continue;
            }
            let c = &self.state[id];
            if c.tags & sptagmask != 0 && c.is_floating() {
                self.center(id);
            }
            let c = &self.state[id];
            self.conn.move_window(c.win, c.geometry.x, c.geometry.y)?;
            if (floating_layout || c.is_floating()) && !c.is_fullscreen() {
                let g = c.geometry;
                self.resize(id, g, false)?;
            }
        }
        for &id in stack.iter().rev() {
            if self.state.is_visible(id) {
                continue;
            }
            let c = &self.state[id];
            self.conn.move_window(c.win, -2 * c.width(), c.geometry.y)?;
        }
        Ok(())
    }

    /// Raise the selection if it floats and put tiled clients below the bar
    /// in focus order.
    pub(crate) fn restack(&mut self, m: usize) -> Result<()> {
        self.draw_bar(m)?;
        let Some(sel) = self.state.monitors[m].sel else {
            return Ok(());
        };
        let floating_layout = self.state.monitors[m].layout().is_floating();
        if self.state[sel].is_floating() || floating_layout {
            self.conn.raise_window(self.state[sel].win)?;
        }
        if !floating_layout {
            let mut sibling = self.state.monitors[m].stacking_sibling();
            for &id in &self.state.monitors[m].stack {
                let c = &self.state[id];
                if c.is_floating() || !self.state.is_visible(id) {
                    continue;
                }
                self.conn.stack_below(c.win, sibling)?;
                sibling = c.win;
            }
        }
        self.conn.discard_enter_events()?;
        if m == self.state.selmon && self.state.is_visible(sel) {
            self.warp(Some(sel))?;
        }
        Ok(())
    }
}
