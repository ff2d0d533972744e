//! Terminate Module
//!
//! Closing clients and handing the display back on exit.

use anyhow::Result;
use tracing::{debug, info};

use crate::wm::WindowManager;
use crate::wm::xconn::{Cursor, Protocol, XConn};

impl<X: XConn> WindowManager<X> {
    /// Ask the selected client to close, or kill it when it does not speak
    /// WM_DELETE_WINDOW.
    pub(crate) fn kill_client(&mut self) -> Result<()> {
        let Some(id) = self.state.sel() else {
            return Ok(());
        };
        let win = self.state[id].win;
        if self.conn.supports_protocol(win, Protocol::Delete)? {
            debug!("WM: Asking window {:#x} to close", win);
            self.conn.send_protocol(win, Protocol::Delete)
        } else {
            debug!("WM: Killing window {:#x}", win);
            self.conn.kill_client(win)
        }
    }

    /// Release every client and destroy our windows.
    pub fn cleanup(&mut self) -> Result<()> {
        info!("WM: Cleaning up");
        self.view(!0)?;
        if let Some(floating) = self.config.layouts.iter().copied().find(|l| l.is_floating()) {
            let m = self.state.selmon_mut();
            m.layouts[m.sellt] = floating;
        }
        for m in 0..self.state.monitors.len() {
            while let Some(&id) = self.state.monitors[m].stack.first() {
                self.unmanage(id, false)?;
            }
        }

        self.conn.ungrab_keys()?;
        while !self.state.monitors.is_empty() {
            self.cleanup_mon(self.state.monitors.len() - 1)?;
        }
        self.conn.set_root_cursor(Cursor::Normal)?;
        self.conn.cleanup_ewmh()?;
        self.conn.focus_root()?;
        self.conn.set_active_window(None)?;
        self.conn.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::mock::{MockConn, test_wm};

    #[test]
    fn test_kill_prefers_delete_protocol() {
        let mut wm = test_wm(MockConn::new());
        wm.map_new_window(0x400001);
        wm.conn.set_protocols(0x400001, &[Protocol::Delete]);
        wm.kill_client().unwrap();
        assert_eq!(wm.conn.sent_protocols(), vec![(0x400001, Protocol::Delete)]);
        assert!(wm.conn.killed().is_empty());

        wm.map_new_window(0x400002);
        wm.kill_client().unwrap();
        assert_eq!(wm.conn.killed(), vec![0x400002]);
    }

    #[test]
    fn test_cleanup_releases_everything() {
        let mut wm = test_wm(MockConn::new());
        wm.map_new_window(0x400001);
        wm.map_new_window(0x400002);
        let sel = wm.state.sel().unwrap();
        wm.state[sel].tags = 1 << 4;
        wm.cleanup().unwrap();
        assert!(wm.state.clients.is_empty());
        assert!(wm.state.monitors.is_empty());
        assert!(wm.conn.client_list().is_empty());
    }
}
