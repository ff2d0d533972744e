//! Terminal swallowing
//!
//! A window spawned from a terminal takes the terminal's place in the
//! client lists while the terminal window is unmapped. Closing the window
//! brings the terminal back.

use anyhow::Result;
use tracing::{debug, info};

use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::client_flags::ClientFlags;
use crate::wm::process;
use crate::wm::xconn::{IcccmState, Window, XConn};

/// `child` occupies the list slots of the hidden `terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obscures {
    pub terminal: ClientId,
    pub child: ClientId,
}

/// Replace every occurrence of `old` by `new`.
fn replace_slot(list: &mut [ClientId], old: ClientId, new: ClientId) {
    for slot in list.iter_mut().filter(|s| **s == old) {
        *slot = new;
    }
}

impl<X: XConn> WindowManager<X> {
    /// Terminal client an ancestor process of `id` runs in.
    pub(crate) fn term_for_win(&self, id: ClientId) -> Option<ClientId> {
        let c = &self.state[id];
        let pid = c.pid?;
        if c.flags.contains(ClientFlags::TERMINAL) {
            return None;
        }
        self.state.all_clients().into_iter().find(|&t| {
            let term = &self.state[t];
            t != id
                && term.flags.contains(ClientFlags::TERMINAL)
                && term.pid.is_some_and(|tpid| process::is_descendant(tpid, pid))
        })
    }

    /// Hide `terminal` behind `child`.
    pub(crate) fn swallow(&mut self, terminal: ClientId, child: ClientId) -> Result<()> {
        let flags = self.state[child].flags;
        if flags.intersects(ClientFlags::NO_SWALLOW | ClientFlags::TERMINAL) {
            return Ok(());
        }
        info!(
            "Window {:#x} swallows terminal {:#x}",
            self.state[child].win, self.state[terminal].win
        );
        self.state.detach(child);
        self.state.detach_stack(child);
        let child_win = self.state[child].win;
        self.set_client_state(child_win, IcccmState::Withdrawn)?;
        self.conn.unmap_window(self.state[terminal].win)?;

        let t = &self.state[terminal];
        let (mon, tags, geometry, floating) = (t.mon, t.tags, t.geometry, t.is_floating());
        let m = &mut self.state.monitors[mon];
        replace_slot(&mut m.clients, terminal, child);
        replace_slot(&mut m.stack, terminal, child);
        if m.sel == Some(terminal) {
            m.sel = Some(child);
        }
        let c = &mut self.state[child];
        c.mon = mon;
        c.tags = tags;
        c.geometry = geometry;
        c.flags.set(ClientFlags::FLOATING, floating);
        self.state.swallows.push(Obscures { terminal, child });

        self.conn.move_resize(child_win, geometry, self.state[child].bw)?;
        self.arrange(Some(mon))?;
        self.configure(child)?;
        self.update_client_list()
    }

    /// Bring the terminal hidden behind `child` back into `child`'s slots.
    /// The child itself is forgotten.
    pub(crate) fn unswallow(&mut self, child: ClientId) -> Result<()> {
        let Some(pos) = self.state.swallows.iter().position(|o| o.child == child) else {
            return Ok(());
        };
        let Obscures { terminal, .. } = self.state.swallows.remove(pos);
        debug!("Restoring swallowed terminal {:#x}", self.state[terminal].win);

        let c = &self.state[child];
        let (mon, tags, geometry) = (c.mon, c.tags, c.geometry);
        let m = &mut self.state.monitors[mon];
        replace_slot(&mut m.clients, child, terminal);
        replace_slot(&mut m.stack, child, terminal);
        if m.sel == Some(child) {
            m.sel = Some(terminal);
        }
        self.state.remove(child);

        let t = &mut self.state[terminal];
        t.mon = mon;
        t.tags = tags;
        t.geometry = geometry;
        self.set_fullscreen(terminal, false)?;
        self.update_title(terminal)?;
        self.arrange(Some(mon))?;

        let t = &self.state[terminal];
        let (win, geometry, bw) = (t.win, t.geometry, t.bw);
        self.conn.map_window(win)?;
        self.conn.move_resize(win, geometry, bw)?;
        self.set_client_state(win, IcccmState::Normal)?;
        self.focus(None)?;
        self.arrange(Some(mon))
    }

    /// Hidden terminal owning `win`.
    pub(crate) fn swallowed_terminal(&self, win: Window) -> Option<ClientId> {
        self.state
            .swallows
            .iter()
            .map(|o| o.terminal)
            .find(|&t| self.state[t].win == win)
    }

    pub(crate) fn is_swallowing(&self, id: ClientId) -> bool {
        self.state.swallows.iter().any(|o| o.child == id)
    }

    /// Forget a hidden terminal whose window went away.
    pub(crate) fn drop_swallowed(&mut self, terminal: ClientId) -> Result<()> {
        let Some(pos) = self.state.swallows.iter().position(|o| o.terminal == terminal) else {
            return Ok(());
        };
        let Obscures { child, .. } = self.state.swallows.remove(pos);
        self.state.remove(terminal);
        debug!("Swallowed terminal of {:#x} is gone", self.state[child].win);
        self.arrange(Some(self.state[child].mon))?;
        self.focus(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::mock::{MockConn, test_wm_with};
    use crate::wm::rules::Rule;
    use crate::wm::xconn::XEvent;

    const OTHER: Window = 0x400001;
    const TERM: Window = 0x400002;
    const CHILD: Window = 0x400003;

    /// Manager with `St` marked as terminal and `Pinned` exempt from
    /// swallowing, plus an unrelated client and a terminal window.
    fn wm_with_terminal(term_pid: u32) -> (WindowManager<MockConn>, ClientId, ClientId) {
        let rules = vec![
            Rule {
                class: Some("St".into()),
                terminal: true,
                ..Rule::default()
            },
            Rule {
                class: Some("Pinned".into()),
                no_swallow: true,
                ..Rule::default()
            },
        ];
        let mut wm = test_wm_with(MockConn::new(), |config| config.rules = rules);
        let other = wm.map_new_window(OTHER);
        wm.conn.set_class(TERM, "St", "st");
        wm.conn.set_pid(TERM, term_pid);
        let term = wm.map_new_window(TERM);
        (wm, other, term)
    }

    fn own_pid_and_parent() -> (u32, u32) {
        let me = std::process::id();
        (me, process::parent_pid(me).unwrap())
    }

    #[test]
    fn test_replace_slot() {
        let (a, b, c) = (ClientId(1), ClientId(2), ClientId(3));
        let mut list = vec![a, b, c];
        replace_slot(&mut list, b, ClientId(9));
        assert_eq!(list, vec![a, ClientId(9), c]);
    }

    #[test]
    fn test_child_takes_terminal_slot() {
        let (me, parent) = own_pid_and_parent();
        let (mut wm, other, term) = wm_with_terminal(parent);
        let term_tags = wm.state[term].tags;
        wm.conn.set_class(CHILD, "Viewer", "viewer");
        wm.conn.set_pid(CHILD, me);
        let child = wm.map_new_window(CHILD);

        let m = &wm.state.monitors[0];
        assert_eq!(m.clients, vec![child, other]);
        assert_eq!(m.stack, vec![child, other]);
        assert_eq!(wm.state.swallows, vec![Obscures { terminal: term, child }]);
        assert!(!wm.conn.mapped(TERM));
        assert!(wm.conn.mapped(CHILD));
        assert_eq!(wm.state[child].tags, term_tags);
        assert_eq!(wm.state.sel(), Some(child));
        assert_eq!(wm.conn.client_list(), vec![CHILD, OTHER]);
    }

    #[test]
    fn test_closing_child_restores_terminal() {
        let (me, parent) = own_pid_and_parent();
        let (mut wm, other, term) = wm_with_terminal(parent);
        wm.conn.set_class(CHILD, "Viewer", "viewer");
        wm.conn.set_pid(CHILD, me);
        let child = wm.map_new_window(CHILD);
        let slot = wm.state[child].geometry;

        wm.handle_event(XEvent::DestroyNotify { window: CHILD }).unwrap();
        let m = &wm.state.monitors[0];
        assert_eq!(m.clients, vec![term, other]);
        assert_eq!(m.stack, vec![term, other]);
        assert!(wm.state.swallows.is_empty());
        assert!(!wm.state.clients.contains_key(&child));
        assert!(wm.conn.mapped(TERM));
        assert_eq!(wm.state.sel(), Some(term));
        assert_eq!(wm.conn.focused(), Some(TERM));
        assert_eq!(wm.state[term].geometry, slot);
        assert_eq!(wm.conn.client_list(), vec![TERM, OTHER]);
    }

    #[test]
    fn test_unrelated_window_not_swallowed() {
        let (me, parent) = own_pid_and_parent();
        // the terminal is the child here, so the new window does not descend from it
        let (mut wm, _, term) = wm_with_terminal(me);
        wm.conn.set_class(CHILD, "Viewer", "viewer");
        wm.conn.set_pid(CHILD, parent);
        let child = wm.map_new_window(CHILD);
        assert!(wm.state.swallows.is_empty());
        assert!(wm.conn.mapped(TERM));
        assert_eq!(wm.state.monitors[0].clients[..2], [child, term]);
    }

    #[test]
    fn test_no_swallow_rule_is_respected() {
        let (me, parent) = own_pid_and_parent();
        let (mut wm, _, term) = wm_with_terminal(parent);
        wm.conn.set_class(CHILD, "Pinned", "pinned");
        wm.conn.set_pid(CHILD, me);
        let child = wm.map_new_window(CHILD);
        assert!(wm.state.swallows.is_empty());
        assert!(wm.conn.mapped(TERM));
        assert_eq!(wm.state.monitors[0].clients[..2], [child, term]);
    }
}
