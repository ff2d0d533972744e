//! Client registry
//!
//! The client arena plus the per-monitor ordering lists. `clients` is the
//! tiling order (head is master), `stack` is the focus order (head is the
//! most recently focused client).

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::wm::client::{Client, ClientId};
use crate::wm::screen::Monitor;
use crate::wm::swallow::Obscures;
use crate::wm::xconn::Window;

#[derive(Debug, Default)]
pub struct WmState {
    pub clients: HashMap<ClientId, Client>,
    pub monitors: Vec<Monitor>,
    pub selmon: usize,
    /// Terminals hidden behind the windows they spawned
    pub swallows: Vec<Obscures>,
    next_id: u64,
}

impl Index<ClientId> for WmState {
    type Output = Client;

    fn index(&self, id: ClientId) -> &Client {
        &self.clients[&id]
    }
}

impl IndexMut<ClientId> for WmState {
    fn index_mut(&mut self, id: ClientId) -> &mut Client {
        match self.clients.get_mut(&id) {
            Some(c) => c,
            None => panic!("no client with id {:?}", id),
        }
    }
}

impl WmState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_client_id(&mut self) -> ClientId {
        self.next_id += 1;
        ClientId(self.next_id)
    }

    pub fn selmon(&self) -> &Monitor {
        &self.monitors[self.selmon]
    }

    pub fn selmon_mut(&mut self) -> &mut Monitor {
        &mut self.monitors[self.selmon]
    }

    /// Selected client of the selected monitor
    pub fn sel(&self) -> Option<ClientId> {
        self.monitors.get(self.selmon).and_then(|m| m.sel)
    }

    /// Visible on its own monitor's current tagset
    pub fn is_visible(&self, id: ClientId) -> bool {
        let c = &self[id];
        c.is_visible_on(self.monitors[c.mon].tagset())
    }

    /// Put a client at the head of its monitor's tiling list.
    pub fn attach(&mut self, id: ClientId) {
        let mon = self[id].mon;
        self.monitors[mon].clients.insert(0, id);
    }

    pub fn detach(&mut self, id: ClientId) {
        let mon = self[id].mon;
        self.monitors[mon].clients.retain(|&c| c != id);
    }

    /// Put a client at the head of its monitor's focus stack.
    pub fn attach_stack(&mut self, id: ClientId) {
        let mon = self[id].mon;
        self.monitors[mon].stack.insert(0, id);
    }

    /// Remove a client from the focus stack; a removed selection falls
    /// back to the first visible client of the stack.
    pub fn detach_stack(&mut self, id: ClientId) {
        let mon = self[id].mon;
        self.monitors[mon].stack.retain(|&c| c != id);
        if self.monitors[mon].sel == Some(id) {
            let next = self.monitors[mon]
                .stack
                .iter()
                .copied()
                .find(|&c| self.is_visible(c));
            self.monitors[mon].sel = next;
        }
    }

    /// Move a client to the head of another monitor's lists.
    pub fn move_to_mon(&mut self, id: ClientId, mon: usize) {
        self.detach(id);
        self.detach_stack(id);
        self[id].mon = mon;
        self.attach(id);
        self.attach_stack(id);
    }

    /// Visible tiled clients of a monitor in tiling order.
    pub fn tiled(&self, mon: usize) -> Vec<ClientId> {
        self.monitors[mon]
            .clients
            .iter()
            .copied()
            .filter(|&c| !self[c].is_floating() && self.is_visible(c))
            .collect()
    }

    /// First visible tiled client at or after position `from` of the tiling list.
    pub fn next_tiled(&self, mon: usize, from: usize) -> Option<ClientId> {
        self.monitors[mon]
            .clients
            .iter()
            .skip(from)
            .copied()
            .find(|&c| !self[c].is_floating() && self.is_visible(c))
    }

    /// Visible clients of a monitor in tiling order.
    pub fn visible(&self, mon: usize) -> Vec<ClientId> {
        self.monitors[mon]
            .clients
            .iter()
            .copied()
            .filter(|&c| self.is_visible(c))
            .collect()
    }

    /// Managed client owning a window
    pub fn win_to_client(&self, win: Window) -> Option<ClientId> {
        self.monitors
            .iter()
            .flat_map(|m| m.clients.iter())
            .copied()
            .find(|&c| self[c].win == win)
    }

    /// Every listed client, monitor by monitor
    pub fn all_clients(&self) -> Vec<ClientId> {
        self.monitors
            .iter()
            .flat_map(|m| m.clients.iter().copied())
            .collect()
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        self.clients.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::client_flags::ClientFlags;

    fn state_with(n: usize) -> (WmState, Vec<ClientId>) {
        let mut state = WmState::new();
        let mut mon = Monitor::new(0, Geometry::new(0, 0, 1920, 1080));
        mon.tagset = [1, 1];
        state.monitors.push(mon);
        let mut ids = Vec::new();
        for i in 0..n {
            let id = state.next_client_id();
            let mut c = Client::new(id, 100 + i as u32, Geometry::new(0, 0, 10, 10), 0);
            c.tags = 1;
            state.clients.insert(id, c);
            state.attach(id);
            state.attach_stack(id);
            ids.push(id);
        }
        (state, ids)
    }

    #[test]
    fn test_attach_puts_client_at_head() {
        let (state, ids) = state_with(3);
        assert_eq!(state.monitors[0].clients, vec![ids[2], ids[1], ids[0]]);
        assert_eq!(state.monitors[0].stack, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn test_detach_stack_repairs_selection() {
        let (mut state, ids) = state_with(3);
        state.monitors[0].sel = Some(ids[2]);
        // the next stack entry is hidden
        state[ids[1]].tags = 2;
        state.detach_stack(ids[2]);
        assert_eq!(state.monitors[0].sel, Some(ids[0]));
        assert_eq!(state.monitors[0].stack, vec![ids[1], ids[0]]);
    }

    #[test]
    fn test_visibility_predicate() {
        let (mut state, ids) = state_with(2);
        assert!(state.is_visible(ids[0]));
        state[ids[0]].tags = 4;
        assert!(!state.is_visible(ids[0]));
        state.monitors[0].tagset[0] = 5;
        assert!(state.is_visible(ids[0]));
    }

    #[test]
    fn test_tiled_skips_floating_and_hidden() {
        let (mut state, ids) = state_with(3);
        state[ids[1]].flags.insert(ClientFlags::FLOATING);
        state[ids[0]].tags = 2;
        assert_eq!(state.tiled(0), vec![ids[2]]);
        assert_eq!(state.next_tiled(0, 1), None);
        assert_eq!(state.visible(0), vec![ids[2], ids[1]]);
    }

    #[test]
    fn test_win_to_client() {
        let (state, ids) = state_with(2);
        assert_eq!(state.win_to_client(101), Some(ids[1]));
        assert_eq!(state.win_to_client(999), None);
    }
}
