//! Workspace Module
//!
//! Tag views and tag membership. Monitors never show overlapping
//! tagsets: viewing a tagset shown elsewhere swaps the two monitors'
//! views instead.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::client_flags::ClientFlags;
use crate::wm::xconn::XConn;

/// Lowest tag bit below `1 << ntags` not in `occupied`, 0 when all are taken.
pub fn find_first_unused_tag(occupied: u32, ntags: usize) -> u32 {
    (0..ntags)
        .map(|i| 1u32 << i)
        .find(|bit| occupied & bit == 0)
        .unwrap_or(0)
}

/// Desktop index published for a tagset: its highest tag.
pub fn desktop_index(tagset: u32) -> u32 {
    if tagset == 0 { 0 } else { 31 - tagset.leading_zeros() }
}

impl<X: XConn> WindowManager<X> {
    fn other_tagsets(&self, mon: usize) -> u32 {
        self.state
            .monitors
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != mon)
            .fold(0, |acc, (_, m)| acc | m.tagset())
    }

    /// Monitor other than the selected one showing any of `tags`.
    fn monitor_showing(&self, tags: u32) -> Option<usize> {
        let sm = self.state.selmon;
        self.state
            .monitors
            .iter()
            .enumerate()
            .position(|(i, m)| i != sm && m.tagset() & tags != 0)
    }

    pub(crate) fn view(&mut self, arg: u32) -> Result<()> {
        let tagmask = self.config.tagmask();
        let sm = self.state.selmon;
        let cur = self.state.monitors[sm].tagset();
        let mon = &self.state.monitors[sm];
        let mut newtagset = mon.tagset[mon.seltags ^ 1];
        if arg != 0 && arg & tagmask == cur {
            return Ok(());
        }
        if arg & tagmask != 0 {
            newtagset = arg & tagmask;
        }

        if let Some(m) = self.monitor_showing(newtagset) {
            if newtagset & cur != 0 {
                debug!("View {:#x} overlaps monitor {}", newtagset, m);
                return Ok(());
            }
            // swap views with the monitor showing the tags
            let sel = self.state.monitors[sm].sel;
            let other = &mut self.state.monitors[m];
            other.sel = sel;
            other.seltags ^= 1;
            other.tagset[other.seltags] = cur;
            self.attach_clients(m)?;
            self.arrange(Some(m))?;
        }

        let mon = &mut self.state.monitors[sm];
        mon.seltags ^= 1;
        if arg & tagmask != 0 {
            mon.tagset[mon.seltags] = arg & tagmask;
        }

        // a single fullscreen client survives the switch
        let fullscreen: Vec<ClientId> = self.state.monitors[sm]
            .clients
            .iter()
            .copied()
            .filter(|&id| {
                let c = &self.state[id];
                c.is_fullscreen() && c.tags & newtagset != 0
            })
            .collect();
        let survivor = match fullscreen.as_slice() {
            [one] => Some(*one),
            _ => None,
        };
        for &id in fullscreen.iter().filter(|&&id| Some(id) != survivor) {
            self.set_fullscreen(id, false)?;
        }

        self.attach_clients(sm)?;
        self.arrange(Some(sm))?;
        if let Some(id) = survivor {
            let mg = self.state.monitors[self.state[id].mon].geometry;
            self.resize_client(id, mg)?;
            self.conn.raise_window(self.state[id].win)?;
        }
        self.focus(None)?;
        self.update_current_desktop()?;
        self.warp(self.state.sel())
    }

    pub(crate) fn toggle_view(&mut self, arg: u32) -> Result<()> {
        let toggled = arg & self.config.tagmask();
        let sm = self.state.selmon;
        let newtagset = self.state.monitors[sm].tagset() ^ toggled;
        if newtagset == 0 {
            debug!("Refusing to hide every tag");
            return Ok(());
        }

        // strip the toggled tags from other monitors, refill emptied ones
        let ntags = self.config.ntags();
        let mut occupied = newtagset | self.other_tagsets(sm);
        let mut updates = Vec::new();
        for (i, m) in self.state.monitors.iter().enumerate() {
            if i == sm || m.tagset() & newtagset == 0 {
                continue;
            }
            let mut tagset = m.tagset() & !toggled;
            occupied = (occupied & !m.tagset()) | tagset | newtagset;
            if tagset == 0 {
                tagset = find_first_unused_tag(occupied, ntags);
                if tagset == 0 {
                    warn!("No free tag left for monitor {}", i);
                    return Ok(());
                }
                occupied |= tagset;
            }
            updates.push((i, tagset));
        }
        for (i, tagset) in updates {
            let m = &mut self.state.monitors[i];
            m.tagset[m.seltags] = tagset;
            m.sel = None;
            self.attach_clients(i)?;
            self.arrange(Some(i))?;
        }

        let m = &mut self.state.monitors[sm];
        m.tagset[m.seltags] = newtagset;
        self.attach_clients(sm)?;
        self.arrange(Some(sm))?;
        self.focus(None)?;
        self.update_current_desktop()
    }

    /// Pull every client visible under monitor `m`'s tagset onto `m`.
    /// Tags also shown elsewhere are trimmed to `m`'s tagset.
    pub(crate) fn attach_clients(&mut self, m: usize) -> Result<()> {
        let tagset = self.state.monitors[m].tagset();
        let utags = self.other_tagsets(m);
        let mut trimmed = false;
        let clients: Vec<ClientId> = self
            .state
            .all_clients()
            .into_iter()
            .filter(|&id| self.state[id].tags & tagset != 0)
            .collect();
        // reversed so head insertion keeps the order
        for &id in clients.iter().rev() {
            if self.state[id].tags & utags != 0 {
                self.state[id].tags &= tagset;
                trimmed = true;
            }
            self.unfocus(id, true)?;
            if self.state[id].mon != m {
                self.state.move_to_mon(id, m);
            }
        }
        if trimmed {
            for other in (0..self.state.monitors.len()).filter(|&i| i != m) {
                self.arrange(Some(other))?;
            }
        }
        Ok(())
    }

    pub(crate) fn tag(&mut self, arg: u32) -> Result<()> {
        let Some(sel) = self.state.sel() else {
            return Ok(());
        };
        let newtags = arg & self.config.tagmask();
        if newtags == 0 {
            return Ok(());
        }
        let sm = self.state.selmon;
        if let Some(m) = self.monitor_showing(newtags) {
            if newtags & self.state.monitors[sm].tagset() != 0 {
                debug!("Tags {:#x} overlap monitor {}", newtags, m);
                return Ok(());
            }
            self.state[sel].tags = newtags;
            self.state.move_to_mon(sel, m);
            self.state.monitors[m].sel = Some(sel);
            self.arrange(Some(m))?;
        }
        self.state[sel].tags = newtags;
        self.focus(None)?;
        self.arrange(Some(sm))
    }

    pub(crate) fn toggle_tag(&mut self, arg: u32) -> Result<()> {
        let Some(sel) = self.state.sel() else {
            return Ok(());
        };
        let newtags = self.state[sel].tags ^ (arg & self.config.tagmask());
        if newtags != 0 {
            if let Some(m) = self.monitor_showing(newtags) {
                debug!("Tags {:#x} are shown on monitor {}", newtags, m);
                return Ok(());
            }
            self.state[sel].tags = newtags;
            self.focus(None)?;
            self.arrange(Some(self.state.selmon))?;
        }
        self.update_current_desktop()
    }

    /// Focus the monitor already showing `arg`, otherwise view it here.
    pub(crate) fn focus_or_view(&mut self, arg: u32) -> Result<()> {
        let Some(m) = self
            .state
            .monitors
            .iter()
            .position(|m| m.tagset() & arg != 0)
        else {
            return self.view(arg);
        };
        if let Some(sel) = self.state.sel() {
            self.unfocus(sel, false)?;
        }
        self.state.selmon = m;
        self.focus(None)?;
        self.warp(self.state.sel())
    }

    pub(crate) fn toggle_scratch(&mut self, i: usize) -> Result<()> {
        let sptag = self.config.sptag(i);
        let sm = self.state.selmon;
        let found = self
            .state
            .all_clients()
            .into_iter()
            .find(|&id| self.state[id].tags & sptag != 0);
        let Some(id) = found else {
            let m = &mut self.state.monitors[sm];
            m.tagset[m.seltags] |= sptag;
            if let Some(sp) = self.config.scratchpads.get(i) {
                info!("Starting scratchpad {}", sp.name);
                self.spawn(&sp.command);
            }
            return Ok(());
        };

        if self.state[id].mon != sm {
            self.state.move_to_mon(id, sm);
        }
        let m = &mut self.state.monitors[sm];
        let newtagset = m.tagset() ^ sptag;
        if newtagset != 0 {
            m.tagset[m.seltags] = newtagset;
            self.focus(None)?;
            self.arrange(Some(sm))?;
        }
        if self.state.is_visible(id) {
            self.focus(Some(id))?;
            self.restack(sm)?;
        }
        Ok(())
    }

    /// Move a client to monitor `m`, taking that monitor's tags.
    pub(crate) fn send_mon(&mut self, id: ClientId, m: usize) -> Result<()> {
        let old = self.state[id].mon;
        if old == m {
            return Ok(());
        }
        let had_focus = self.state.sel() == Some(id);
        self.unfocus(id, true)?;
        self.state.detach(id);
        self.state.detach_stack(id);
        self.arrange(Some(old))?;

        let tagset = self.state.monitors[m].tagset();
        let c = &mut self.state[id];
        c.mon = m;
        c.tags = if tagset != 0 { tagset } else { 1 };
        self.state.attach(id);
        self.state.attach_stack(id);
        self.arrange(Some(m))?;
        if had_focus {
            self.focus(Some(id))?;
            self.restack(m)
        } else {
            self.focus(None)
        }
    }

    pub(crate) fn tag_mon(&mut self, dir: i32) -> Result<()> {
        if self.state.monitors.len() <= 1 {
            return Ok(());
        }
        let Some(sel) = self.state.sel() else {
            return Ok(());
        };
        let m = self.dir_to_mon(dir);
        if !self.state[sel].is_fullscreen() {
            return self.send_mon(sel, m);
        }
        self.state[sel].flags.remove(ClientFlags::FULLSCREEN);
        self.send_mon(sel, m)?;
        self.state[sel].flags.insert(ClientFlags::FULLSCREEN);
        let mg = self.state.monitors[m].geometry;
        self.resize_client(sel, mg)?;
        self.conn.raise_window(self.state[sel].win)
    }

    pub(crate) fn update_current_desktop(&self) -> Result<()> {
        self.conn
            .set_current_desktop(desktop_index(self.state.selmon().tagset()))
    }
}
