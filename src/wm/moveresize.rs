//! MoveResize Module
//!
//! Pointer driven moving, resizing and placing of the selected client.
//! Each drag grabs the pointer and runs a nested event loop until the
//! button is released. Only configure requests, exposures and map requests
//! are serviced meanwhile; everything else is queued for the main loop.

use anyhow::Result;
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::client_flags::ClientFlags;
use crate::wm::commands::PlaceMode;
use crate::wm::xconn::{ButtonEvent, Cursor, MotionEvent, XConn, XEvent};

/// Minimum time between two handled motion events, in milliseconds
const MOTION_INTERVAL: u32 = 1000 / 60;

enum DragEvent {
    Motion(MotionEvent),
    Release(ButtonEvent),
}

/// Drops motion events arriving faster than the refresh interval.
#[derive(Debug, Default)]
struct Throttle {
    last: u32,
}

impl Throttle {
    fn ready(&mut self, time: u32) -> bool {
        if time.wrapping_sub(self.last) <= MOTION_INTERVAL {
            return false;
        }
        self.last = time;
        true
    }
}

/// Snap a position along one axis to the edges of `[start, start + len)`.
fn snap_axis(pos: i32, size: i32, start: i32, len: i32, snap: i32) -> i32 {
    if (start - pos).abs() < snap {
        start
    } else if ((start + len) - (pos + size)).abs() < snap {
        start + len - size
    } else {
        pos
    }
}

/// Whether the pointer at `(px, py)` asks for a slot above `target`
/// rather than below it.
fn attach_above(target: Geometry, px: i32, py: i32) -> bool {
    let below_ratio = (target.bottom() - py) as f32 / target.height as f32;
    let right_ratio = (target.right() - px) as f32 / target.width as f32;
    if below_ratio > right_ratio {
        (target.y - py).abs() < target.height / 2
    } else {
        (target.x - px).abs() < target.width / 2
    }
}

impl<X: XConn> WindowManager<X> {
    fn next_drag_event(&mut self) -> Result<DragEvent> {
        loop {
            match self.conn.next_event()? {
                event @ (XEvent::ConfigureRequest(_)
                | XEvent::Expose { .. }
                | XEvent::MapRequest { .. }) => self.handle_event(event)?,
                XEvent::MotionNotify(e) => return Ok(DragEvent::Motion(e)),
                XEvent::ButtonRelease(e) => return Ok(DragEvent::Release(e)),
                other => self.pending.push_back(other),
            }
        }
    }

    /// Hand a dragged client to the monitor it ended up on.
    fn finish_drag(&mut self, id: ClientId) -> Result<()> {
        let m = self.rect_to_mon(self.state[id].geometry);
        if m != self.state.selmon {
            self.send_mon(id, m)?;
            self.state.selmon = m;
            self.focus(None)?;
        }
        Ok(())
    }

    fn floating_layout(&self) -> bool {
        self.state.selmon().layout().is_floating()
    }

    pub(crate) fn move_mouse(&mut self) -> Result<()> {
        let Some(id) = self.state.sel() else {
            return Ok(());
        };
        if self.state[id].is_fullscreen() {
            return Ok(());
        }
        self.restack(self.state.selmon)?;
        if !self.conn.grab_pointer(Cursor::Move)? {
            return Ok(());
        }
        let dragged = self.drag_move(id);
        self.conn.ungrab_pointer()?;
        dragged?;
        self.finish_drag(id)
    }

    fn drag_move(&mut self, id: ClientId) -> Result<()> {
        let origin = self.state[id].geometry;
        let (x, y) = self.conn.query_pointer()?;
        let snap = self.config.appearance.snap;
        let mut throttle = Throttle::default();
        loop {
            let ev = match self.next_drag_event()? {
                DragEvent::Release(_) => return Ok(()),
                DragEvent::Motion(ev) => ev,
            };
            if !throttle.ready(ev.time) {
                continue;
            }
            let wa = self.state.selmon().work_area;
            let c = &self.state[id];
            let nx = snap_axis(origin.x + ev.root_x - x, c.width(), wa.x, wa.width, snap);
            let ny = snap_axis(origin.y + ev.root_y - y, c.height(), wa.y, wa.height, snap);
            if !c.is_floating()
                && !self.floating_layout()
                && ((nx - c.geometry.x).abs() > snap || (ny - c.geometry.y).abs() > snap)
            {
                self.toggle_floating()?;
            }
            let c = &self.state[id];
            if self.floating_layout() || c.is_floating() {
                let g = Geometry::new(nx, ny, c.geometry.width, c.geometry.height);
                self.resize(id, g, true)?;
            }
        }
    }

    pub(crate) fn resize_mouse(&mut self) -> Result<()> {
        let Some(id) = self.state.sel() else {
            return Ok(());
        };
        if self.state[id].is_fullscreen() {
            return Ok(());
        }
        self.restack(self.state.selmon)?;
        if !self.conn.grab_pointer(Cursor::Resize)? {
            return Ok(());
        }
        self.warp_to_corner(id)?;
        let dragged = self.drag_resize(id);
        self.warp_to_corner(id)?;
        self.conn.ungrab_pointer()?;
        self.conn.discard_enter_events()?;
        dragged?;
        self.finish_drag(id)
    }

    fn warp_to_corner(&self, id: ClientId) -> Result<()> {
        let c = &self.state[id];
        self.conn.warp_pointer(
            c.win,
            c.geometry.width + c.bw - 1,
            c.geometry.height + c.bw - 1,
        )
    }

    fn drag_resize(&mut self, id: ClientId) -> Result<()> {
        let origin = self.state[id].geometry;
        let snap = self.config.appearance.snap;
        let mut throttle = Throttle::default();
        loop {
            let ev = match self.next_drag_event()? {
                DragEvent::Release(_) => return Ok(()),
                DragEvent::Motion(ev) => ev,
            };
            if !throttle.ready(ev.time) {
                continue;
            }
            let c = &self.state[id];
            let nw = (ev.root_x - origin.x - 2 * c.bw + 1).max(1);
            let nh = (ev.root_y - origin.y - 2 * c.bw + 1).max(1);
            let own = self.state.monitors[c.mon].work_area;
            let sel = self.state.selmon().work_area;
            let inside = own.x + nw >= sel.x
                && own.x + nw <= sel.right()
                && own.y + nh >= sel.y
                && own.y + nh <= sel.bottom();
            if inside
                && !c.is_floating()
                && !self.floating_layout()
                && ((nw - c.geometry.width).abs() > snap || (nh - c.geometry.height).abs() > snap)
            {
                self.toggle_floating()?;
            }
            let c = &self.state[id];
            if self.floating_layout() || c.is_floating() {
                let g = Geometry::new(c.geometry.x, c.geometry.y, nw, nh);
                self.resize(id, g, true)?;
            }
        }
    }

    /// Tiled client of the selected monitor covering the most of a rectangle.
    fn rect_to_client(&self, rect: Geometry) -> Option<ClientId> {
        let mut best = None;
        let mut area = 0;
        for id in self.state.tiled(self.state.selmon) {
            let c = &self.state[id];
            let outer = Geometry::new(c.geometry.x, c.geometry.y, c.width(), c.height());
            let a = rect.intersect_area(&outer);
            if a > area {
                area = a;
                best = Some(id);
            }
        }
        best
    }

    /// Drag a tiled client to a new slot in the tiling order, possibly on
    /// another monitor.
    pub(crate) fn place_mouse(&mut self, mode: PlaceMode) -> Result<()> {
        let Some(id) = self.state.sel() else {
            return Ok(());
        };
        let c = &self.state[id];
        if self.state.monitors[c.mon].layout().is_floating() || c.is_fullscreen() {
            return Ok(());
        }
        self.restack(self.state.selmon)?;
        if !self.conn.grab_pointer(Cursor::Move)? {
            return Ok(());
        }
        let win = self.state[id].win;
        let c = &mut self.state[id];
        c.flags.remove(ClientFlags::FLOATING);
        c.flags.insert(ClientFlags::BEING_MOVED);
        let fallback = c.geometry;

        let dragged = self.drag_place(id, mode, fallback);
        self.conn.ungrab_pointer()?;
        let (last, pointer) = match dragged {
            Ok(result) => result,
            Err(e) => {
                self.state[id].flags.remove(ClientFlags::BEING_MOVED);
                return Err(e);
            }
        };

        let m = self.rect_to_mon(Geometry::new(pointer.0, pointer.1, 1, 1));
        let old = self.state[id].mon;
        if m != old {
            self.state.detach(id);
            self.state.detach_stack(id);
            self.arrange_mon(old)?;
            let tagset = self.state.monitors[m].tagset();
            let c = &mut self.state[id];
            c.mon = m;
            c.tags = tagset;
            self.state.attach(id);
            self.state.attach_stack(id);
            self.state.selmon = m;
        }
        debug!("WM: Placed window {:#x} on monitor {}", win, self.state[id].mon);

        self.focus(Some(id))?;
        self.state[id].flags.remove(ClientFlags::BEING_MOVED);
        if let Some((nx, ny)) = last {
            let g = self.state[id].geometry;
            self.resize(id, Geometry::new(nx, ny, g.width, g.height), false)?;
        }
        self.arrange_mon(self.state[id].mon)
    }

    /// Returns the last window position and the release position.
    fn drag_place(
        &mut self,
        id: ClientId,
        mode: PlaceMode,
        fallback: Geometry,
    ) -> Result<(Option<(i32, i32)>, (i32, i32))> {
        let win = self.state[id].win;
        let start = self
            .conn
            .window_attributes(win)?
            .map_or(fallback, |a| a.geometry);
        if mode == PlaceMode::Warp {
            let c = &self.state[id];
            self.conn.warp_pointer(win, c.width() / 2, c.height() / 2)?;
        }
        let (x, y) = self.conn.query_pointer()?;
        let snap = self.config.appearance.snap;
        let mut throttle = Throttle::default();
        let mut free_move = false;
        let mut last = None;
        let mut prev_target = Some(id);
        let mut prev_above = None;
        loop {
            let ev = match self.next_drag_event()? {
                DragEvent::Release(ev) => return Ok((last, (ev.root_x, ev.root_y))),
                DragEvent::Motion(ev) => ev,
            };
            if !throttle.ready(ev.time) {
                continue;
            }
            let nx = start.x + ev.root_x - x;
            let ny = start.y + ev.root_y - y;
            if !free_move && ((nx - start.x).abs() > snap || (ny - start.y).abs() > snap) {
                free_move = true;
            }
            if free_move {
                self.conn.move_window(win, nx, ny)?;
            }
            last = Some((nx, ny));

            let m = self.rect_to_mon(Geometry::new(ev.root_x, ev.root_y, 1, 1));
            if m != self.state.selmon {
                self.state.selmon = m;
            }
            let (px, py) = match mode {
                PlaceMode::Center => (nx + start.width / 2, ny + start.height / 2),
                PlaceMode::Pointer | PlaceMode::Warp => (ev.root_x, ev.root_y),
            };
            let Some(target) = self.rect_to_client(Geometry::new(px, py, 1, 1)) else {
                continue;
            };
            if target == id {
                continue;
            }
            let above = attach_above(self.state[target].geometry, px, py);
            if Some(target) == prev_target && Some(above) == prev_above {
                continue;
            }

            self.state.detach_stack(id);
            self.state.detach(id);
            let (from, to) = (self.state[id].mon, self.state[target].mon);
            if from != to {
                self.arrange_mon(from)?;
                self.state[id].tags = self.state.monitors[to].tagset();
            }
            self.state[id].mon = to;
            let list = &mut self.state.monitors[to];
            list.sel = Some(target);
            let at = list
                .clients
                .iter()
                .position(|&c| c == target)
                .map_or(0, |p| if above { p } else { p + 1 });
            list.clients.insert(at, id);
            self.state.attach_stack(id);
            self.arrange_mon(to)?;
            prev_target = Some(target);
            prev_above = Some(above);
        }
    }

    /// Move floating clients freely, place tiled ones in the layout.
    pub(crate) fn move_or_place(&mut self, mode: PlaceMode) -> Result<()> {
        let floating = self.state.sel().is_some_and(|id| self.state[id].is_floating());
        if self.floating_layout() || floating {
            self.move_mouse()
        } else {
            self.place_mouse(mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::mock::{MockConn, test_wm};

    fn motion(root: u32, x: i32, y: i32, time: u32) -> XEvent {
        XEvent::MotionNotify(MotionEvent {
            window: root,
            root_x: x,
            root_y: y,
            time,
        })
    }

    fn release() -> XEvent {
        XEvent::ButtonRelease(ButtonEvent {
            window: 0,
            root_x: 0,
            root_y: 0,
            x: 0,
            y: 0,
            button: 1,
            state: 0,
            time: 0,
        })
    }

    #[test]
    fn test_snap_axis() {
        assert_eq!(snap_axis(10, 100, 0, 1000, 32), 0);
        assert_eq!(snap_axis(880, 100, 0, 1000, 32), 900);
        assert_eq!(snap_axis(400, 100, 0, 1000, 32), 400);
    }

    #[test]
    fn test_throttle_drops_fast_motion() {
        let mut t = Throttle::default();
        assert!(!t.ready(10));
        assert!(t.ready(100));
        assert!(!t.ready(110));
        assert!(t.ready(117));
    }

    #[test]
    fn test_attach_above() {
        let target = Geometry::new(0, 0, 100, 400);
        assert!(attach_above(target, 50, 20));
        assert!(!attach_above(target, 50, 380));
    }

    #[test]
    fn test_move_mouse_drags_floating_client() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        wm.toggle_floating().unwrap();
        wm.resize(a, Geometry::new(500, 400, 300, 200), false).unwrap();
        let root = wm.conn.root();
        wm.conn.push_event(motion(root, 100, 50, 100));
        wm.conn.push_event(XEvent::KeyPress { keycode: 38, state: 0 });
        wm.conn.push_event(release());
        wm.move_mouse().unwrap();
        assert_eq!(wm.state[a].geometry, Geometry::new(600, 450, 300, 200));
        assert!(!wm.conn.pointer_grabbed());
        // the key press waits for the main loop
        assert_eq!(wm.pending.len(), 1);
    }

    #[test]
    fn test_move_mouse_floats_tiled_client() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        wm.map_new_window(0x400002);
        wm.focus(Some(a)).unwrap();
        let root = wm.conn.root();
        wm.conn.push_event(motion(root, 200, 200, 100));
        wm.conn.push_event(release());
        wm.move_mouse().unwrap();
        assert!(wm.state[a].is_floating());
    }

    #[test]
    fn test_resize_mouse_sets_size() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        wm.toggle_floating().unwrap();
        wm.resize(a, Geometry::new(100, 100, 300, 200), false).unwrap();
        let bw = wm.state[a].bw;
        let root = wm.conn.root();
        wm.conn.push_event(motion(root, 700, 600, 100));
        wm.conn.push_event(release());
        wm.resize_mouse().unwrap();
        let g = wm.state[a].geometry;
        assert_eq!((g.width, g.height), (600 - 2 * bw + 1, 500 - 2 * bw + 1));
    }

    #[test]
    fn test_place_mouse_reorders_tiles() {
        let mut wm = test_wm(MockConn::new());
        let ids: Vec<_> = (0..3).map(|i| wm.map_new_window(0x400001 + i)).collect();
        // order c b a: c is master on the left, b and a stacked right
        let target = wm.state[ids[0]].geometry;
        let root = wm.conn.root();
        wm.conn
            .push_event(motion(root, target.x + target.width / 2, target.bottom() - 5, 100));
        wm.conn.push_event(release());
        wm.place_mouse(PlaceMode::Pointer).unwrap();
        assert_eq!(wm.state.monitors[0].clients, vec![ids[1], ids[0], ids[2]]);
        assert!(!wm.state[ids[2]].flags.contains(ClientFlags::BEING_MOVED));
        assert_eq!(wm.state.sel(), Some(ids[2]));
    }

    #[test]
    fn test_move_or_place_picks_by_floating() {
        let mut wm = test_wm(MockConn::new());
        let a = wm.map_new_window(0x400001);
        wm.toggle_floating().unwrap();
        wm.conn.push_event(release());
        wm.move_or_place(PlaceMode::Pointer).unwrap();
        // a floating client keeps floating after a move
        assert!(wm.state[a].is_floating());
    }
}
