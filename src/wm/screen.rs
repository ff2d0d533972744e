//! Screen Module
//!
//! Monitors, their bars and the output geometry bookkeeping.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::bar::MonitorSelector;
use crate::wm::client::ClientId;
use crate::wm::gaps::Gaps;
use crate::wm::layout::LayoutKind;
use crate::wm::xconn::{NONE, Window, XConn};

/// At most one bar on each edge
const MAX_BARS: usize = 2;

/// Per-monitor defaults, matched by monitor index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorRule {
    /// Monitor index, -1 matches any monitor
    pub monitor: i32,
    /// Index into the configured layouts
    pub layout: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfact: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nmaster: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_bar: Option<bool>,
    /// Initial tagset, 0 keeps the computed one
    pub tagset: u32,
}

impl Default for MonitorRule {
    fn default() -> Self {
        Self {
            monitor: -1,
            layout: 0,
            mfact: None,
            nmaster: None,
            show_bar: None,
            tagset: 0,
        }
    }
}

/// A bar window of a monitor
#[derive(Debug, Clone)]
pub struct Bar {
    pub idx: usize,
    pub topbar: bool,
    pub win: Window,
    pub geometry: Geometry,
    /// Position and width of each bar rule drawn on this bar, by rule index
    pub slots: Vec<Option<(i32, i32)>>,
}

impl Bar {
    fn new(idx: usize, topbar: bool) -> Self {
        Self {
            idx,
            topbar,
            win: NONE,
            geometry: Geometry::default(),
            slots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Monitor {
    pub num: usize,
    /// Output rectangle
    pub geometry: Geometry,
    /// Output rectangle minus the bars
    pub work_area: Geometry,
    pub layouts: [LayoutKind; 2],
    pub sellt: usize,
    pub ltsymbol: String,
    pub mfact: f64,
    pub nmaster: usize,
    pub tagset: [u32; 2],
    pub seltags: usize,
    pub showbar: bool,
    pub gaps: Gaps,
    /// Tiling order, head is master
    pub clients: Vec<ClientId>,
    /// Focus order, head is most recent
    pub stack: Vec<ClientId>,
    pub sel: Option<ClientId>,
    pub bars: Vec<Bar>,
}

impl Monitor {
    pub fn new(num: usize, geometry: Geometry) -> Self {
        Self {
            num,
            geometry,
            work_area: geometry,
            layouts: [LayoutKind::Tile, LayoutKind::Monocle],
            sellt: 0,
            ltsymbol: LayoutKind::Tile.symbol().to_string(),
            mfact: 0.55,
            nmaster: 1,
            tagset: [1, 1],
            seltags: 0,
            showbar: true,
            gaps: Gaps::zero(),
            clients: Vec::new(),
            stack: Vec::new(),
            sel: None,
            bars: Vec::new(),
        }
    }

    /// Current tagset
    pub fn tagset(&self) -> u32 {
        self.tagset[self.seltags]
    }

    pub fn layout(&self) -> LayoutKind {
        self.layouts[self.sellt]
    }

    /// Window tiled clients are stacked below
    pub fn stacking_sibling(&self) -> Window {
        self.bars.last().map_or(NONE, |b| b.win)
    }

    /// Recompute the work area and bar rectangles for bars of height `bh`.
    pub fn update_bar_pos(&mut self, bh: i32) {
        let g = self.geometry;
        self.work_area.y = g.y;
        self.work_area.height = g.height;
        for bar in &mut self.bars {
            bar.geometry.x = g.x;
            bar.geometry.width = self.work_area.width;
            bar.geometry.height = bh;
        }
        if !self.showbar {
            for bar in &mut self.bars {
                bar.geometry.y = -bh;
            }
            return;
        }
        if self.bars.iter().any(|b| b.topbar) {
            self.work_area.y = g.y + bh;
        }
        self.work_area.height -= bh * self.bars.len() as i32;
        let wa = self.work_area;
        for bar in &mut self.bars {
            bar.geometry.y = if bar.topbar {
                wa.y - bh
            } else {
                wa.y + wa.height
            };
        }
    }
}

/// Build the monitor that will become `monitors.len()`.
///
/// Returns `None` when there are not enough tags for another monitor.
/// When every tag is shown somewhere, existing monitors are reassigned to
/// one tag each.
pub fn create_monitor(monitors: &mut [Monitor], config: &Config) -> Option<Monitor> {
    let ntags = config.ntags();
    if monitors.len() + 1 > ntags {
        warn!("Failed to add monitor, number of tags exceeded");
        return None;
    }
    let tagmask = config.tagmask();
    let free = (0..ntags).find(|&i| monitors.iter().all(|m| m.tagset() & (1 << i) == 0));
    let tag = match free {
        Some(i) => i,
        None => {
            for (i, m) in monitors.iter_mut().enumerate() {
                m.seltags ^= 1;
                m.tagset[m.seltags] = (1 << i) & tagmask;
            }
            monitors.len()
        }
    };

    let index = monitors.len();
    let mut m = Monitor::new(index, Geometry::default());
    m.tagset = [(1 << tag) & tagmask; 2];
    m.mfact = config.behavior.mfact;
    m.nmaster = config.behavior.nmaster;
    m.showbar = config.appearance.show_bar;
    m.gaps = config.appearance.gaps;

    let bar_count = config
        .bar_rules
        .iter()
        .filter(|r| r.monitor.matches_any(index))
        .map(|r| r.bar + 1)
        .max()
        .unwrap_or(0)
        .min(MAX_BARS);
    let mut topbar = config.appearance.top_bar;
    for idx in 0..bar_count {
        m.bars.push(Bar::new(idx, topbar));
        topbar = !topbar;
    }

    let layouts = &config.layouts;
    m.layouts = [layouts[0], layouts[2 % layouts.len()]];
    if let Some(rule) = config
        .monitor_rules
        .iter()
        .find(|r| r.monitor == -1 || r.monitor == index as i32)
    {
        m.layouts[0] = layouts[rule.layout];
        if let Some(mfact) = rule.mfact {
            m.mfact = mfact;
        }
        if let Some(nmaster) = rule.nmaster {
            m.nmaster = nmaster;
        }
        if let Some(show_bar) = rule.show_bar {
            m.showbar = show_bar;
        }
        if rule.tagset != 0 {
            m.tagset[m.seltags] = rule.tagset;
        }
    }
    m.ltsymbol = m.layouts[0].symbol().to_string();
    Some(m)
}

/// Drop duplicate output rectangles and order them top to bottom, left to right.
pub fn unique_outputs(outputs: &[Geometry]) -> Vec<Geometry> {
    let mut unique: Vec<Geometry> = Vec::with_capacity(outputs.len());
    for g in outputs {
        if !unique.contains(g) {
            unique.push(*g);
        }
    }
    unique.sort_by_key(|g| (g.y, g.x));
    unique
}

/// Monitor next to `selmon` in direction `dir`, wrapping around.
pub fn dir_to_mon(count: usize, selmon: usize, dir: i32) -> usize {
    if dir > 0 {
        (selmon + 1) % count
    } else {
        (selmon + count - 1) % count
    }
}

/// Monitor whose work area overlaps `rect` most, `selmon` when none does.
pub fn rect_to_mon(monitors: &[Monitor], selmon: usize, rect: Geometry) -> usize {
    let mut best = selmon;
    let mut area = 0;
    for (i, m) in monitors.iter().enumerate() {
        let a = rect.intersect_area(&m.work_area);
        if a > area {
            area = a;
            best = i;
        }
    }
    best
}

impl<X: XConn> WindowManager<X> {
    /// Sync monitors with the current outputs. Returns whether anything changed.
    pub(crate) fn update_geometry(&mut self) -> Result<bool> {
        let outputs = unique_outputs(&self.conn.outputs()?);
        let mut dirty = false;

        if outputs.is_empty() {
            if self.state.monitors.is_empty() {
                let m = create_monitor(&mut self.state.monitors, &self.config)
                    .ok_or(crate::wm::errors::WmError::NoMonitors)?;
                self.state.monitors.push(m);
            }
            let screen = Geometry::new(0, 0, self.screen_width, self.screen_height);
            let m = &mut self.state.monitors[0];
            if m.geometry != screen {
                dirty = true;
                m.geometry = screen;
                m.work_area = screen;
                m.update_bar_pos(self.bh);
            }
        } else if self.state.monitors.len() <= outputs.len() {
            let existing = self.state.monitors.len();
            for _ in existing..outputs.len() {
                let Some(m) = create_monitor(&mut self.state.monitors, &self.config) else {
                    break;
                };
                self.state.monitors.push(m);
                let index = self.state.monitors.len() - 1;
                info!("Added monitor {}", index);
                if index > 0 {
                    self.attach_clients(index)?;
                }
            }
            let bh = self.bh;
            for (i, (m, g)) in self
                .state
                .monitors
                .iter_mut()
                .zip(outputs.iter())
                .enumerate()
            {
                if i >= existing || m.geometry != *g {
                    dirty = true;
                    m.num = i;
                    m.geometry = *g;
                    m.work_area = *g;
                    m.update_bar_pos(bh);
                }
            }
        } else {
            while self.state.monitors.len() > outputs.len() {
                let last = self.state.monitors.len() - 1;
                if last == self.state.selmon {
                    self.state.selmon = 0;
                }
                dirty |= self.migrate_clients(last, self.state.selmon);
                self.cleanup_mon(last)?;
                info!("Removed monitor {}", last);
            }
        }

        if dirty {
            self.state.selmon = 0;
            self.state.selmon = self.win_to_mon(self.conn.root())?;
        }
        Ok(dirty)
    }

    /// Move every client of monitor `from` to monitor `to`, keeping order.
    fn migrate_clients(&mut self, from: usize, to: usize) -> bool {
        let clients = std::mem::take(&mut self.state.monitors[from].clients);
        let stack = std::mem::take(&mut self.state.monitors[from].stack);
        self.state.monitors[from].sel = None;
        for &id in &clients {
            self.state[id].mon = to;
        }
        debug!("Migrating {} clients from monitor {} to {}", clients.len(), from, to);
        let moved = !clients.is_empty();
        self.state.monitors[to].clients.extend(clients);
        self.state.monitors[to].stack.extend(stack);
        moved
    }

    /// Destroy the bars of a monitor and drop it.
    pub(crate) fn cleanup_mon(&mut self, index: usize) -> Result<()> {
        let m = self.state.monitors.remove(index);
        for bar in m.bars.iter().filter(|b| b.win != NONE) {
            self.conn.unmap_window(bar.win)?;
            self.conn.destroy_window(bar.win)?;
        }
        Ok(())
    }

    /// Create the windows of bars that have none yet.
    pub(crate) fn update_bars(&mut self) -> Result<()> {
        for m in &mut self.state.monitors {
            for bar in m.bars.iter_mut().filter(|b| b.win == NONE) {
                bar.win = self.conn.create_bar_window(bar.geometry)?;
                debug!("Created bar window {:#x}", bar.win);
            }
        }
        Ok(())
    }

    /// Monitor a window belongs to; the root window maps to the monitor
    /// under the pointer.
    pub(crate) fn win_to_mon(&self, win: Window) -> Result<usize> {
        if win == self.conn.root() {
            let (x, y) = self.conn.query_pointer()?;
            return Ok(self.rect_to_mon(Geometry::new(x, y, 1, 1)));
        }
        if let Some(i) = self
            .state
            .monitors
            .iter()
            .position(|m| m.bars.iter().any(|b| b.win == win))
        {
            return Ok(i);
        }
        if let Some(id) = self.state.win_to_client(win) {
            return Ok(self.state[id].mon);
        }
        Ok(self.state.selmon)
    }

    pub(crate) fn rect_to_mon(&self, rect: Geometry) -> usize {
        rect_to_mon(&self.state.monitors, self.state.selmon, rect)
    }

    pub(crate) fn dir_to_mon(&self, dir: i32) -> usize {
        dir_to_mon(self.state.monitors.len(), self.state.selmon, dir)
    }
}

impl MonitorSelector {
    /// Whether a rule can place a bar on monitor `index` at all.
    pub fn matches_any(&self, index: usize) -> bool {
        match self {
            MonitorSelector::All | MonitorSelector::Active => true,
            MonitorSelector::Index(i) => *i == index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::mock::{MockConn, test_wm};
    use crate::wm::xconn::XEvent;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_create_monitor_picks_free_tag() {
        let cfg = config();
        let mut mons = Vec::new();
        let m = create_monitor(&mut mons, &cfg).unwrap();
        assert_eq!(m.tagset(), 1);
        assert_eq!(m.bars.len(), 1);
        assert!(m.bars[0].topbar);
        assert_eq!(m.layouts, [LayoutKind::Tile, LayoutKind::Monocle]);
        mons.push(m);

        // monitor 1 rule: monocle layout, tag 6
        let m = create_monitor(&mut mons, &cfg).unwrap();
        assert_eq!(m.layout(), LayoutKind::Monocle);
        assert_eq!(m.tagset(), 1 << 5);
        assert_eq!(m.ltsymbol, "[M]");
    }

    #[test]
    fn test_create_monitor_reassigns_when_no_tag_free() {
        let mut cfg = config();
        cfg.tags = vec!["a".into(), "b".into(), "c".into()];
        cfg.monitor_rules = vec![MonitorRule::default()];
        let mut mons = vec![Monitor::new(0, Geometry::default()), Monitor::new(1, Geometry::default())];
        mons[0].tagset = [0b011, 0b011];
        mons[1].tagset = [0b100, 0b100];
        let m = create_monitor(&mut mons, &cfg).unwrap();
        assert_eq!(mons[0].tagset(), 0b001);
        assert_eq!(mons[1].tagset(), 0b010);
        assert_eq!(m.tagset(), 0b100);
    }

    #[test]
    fn test_create_monitor_fails_beyond_tag_count() {
        let mut cfg = config();
        cfg.tags = vec!["a".into()];
        let mut mons = vec![Monitor::new(0, Geometry::default())];
        assert!(create_monitor(&mut mons, &cfg).is_none());
    }

    #[test]
    fn test_bar_pos_top_bar() {
        let mut m = Monitor::new(0, Geometry::new(0, 0, 1920, 1080));
        m.bars.push(Bar::new(0, true));
        m.update_bar_pos(20);
        assert_eq!(m.work_area, Geometry::new(0, 20, 1920, 1060));
        assert_eq!(m.bars[0].geometry, Geometry::new(0, 0, 1920, 20));

        m.showbar = false;
        m.update_bar_pos(20);
        assert_eq!(m.work_area, Geometry::new(0, 0, 1920, 1080));
        assert_eq!(m.bars[0].geometry.y, -20);
    }

    #[test]
    fn test_bar_pos_two_bars() {
        let mut m = Monitor::new(0, Geometry::new(0, 0, 1000, 800));
        m.bars.push(Bar::new(0, true));
        m.bars.push(Bar::new(1, false));
        m.update_bar_pos(20);
        assert_eq!(m.work_area, Geometry::new(0, 20, 1000, 760));
        assert_eq!(m.bars[0].geometry.y, 0);
        assert_eq!(m.bars[1].geometry.y, 780);
    }

    #[test]
    fn test_unique_outputs_sorted() {
        let a = Geometry::new(1920, 0, 1920, 1080);
        let b = Geometry::new(0, 0, 1920, 1080);
        let c = Geometry::new(0, 1080, 1920, 1080);
        assert_eq!(unique_outputs(&[c, a, b, a]), vec![b, a, c]);
    }

    #[test]
    fn test_dir_to_mon_wraps() {
        assert_eq!(dir_to_mon(3, 2, 1), 0);
        assert_eq!(dir_to_mon(3, 0, -1), 2);
        assert_eq!(dir_to_mon(1, 0, 1), 0);
    }

    fn root_configure<X: XConn>(wm: &WindowManager<X>, width: i32, height: i32) -> XEvent {
        XEvent::ConfigureNotify {
            window: wm.conn.root(),
            width,
            height,
        }
    }

    #[test]
    fn test_removed_monitor_hands_clients_over() {
        let mut wm = test_wm(MockConn::with_outputs(vec![
            Geometry::new(0, 0, 1920, 1080),
            Geometry::new(1920, 0, 1920, 1080),
        ]));
        let a = wm.map_new_window(0x400001);
        wm.focus_mon(1).unwrap();
        assert_eq!(wm.state.selmon, 1);
        let b = wm.map_new_window(0x400002);
        let c = wm.map_new_window(0x400003);
        let bar = wm.state.monitors[1].bars[0].win;

        wm.conn.set_outputs(vec![Geometry::new(0, 0, 1920, 1080)]);
        let event = root_configure(&wm, 1920, 1080);
        wm.handle_event(event).unwrap();

        assert_eq!(wm.state.monitors.len(), 1);
        assert_eq!(wm.state.selmon, 0);
        assert_eq!(wm.state[b].mon, 0);
        assert_eq!(wm.state[c].mon, 0);
        assert_eq!(wm.state.monitors[0].clients, vec![a, c, b]);
        assert_eq!(wm.state.monitors[0].stack.len(), 3);
        assert!(!wm.conn.mapped(bar));
    }

    #[test]
    fn test_added_monitor_gets_bar_and_free_tag() {
        let mut wm = test_wm(MockConn::new());
        wm.conn.set_outputs(vec![
            Geometry::new(0, 0, 1920, 1080),
            Geometry::new(1920, 0, 1280, 1024),
        ]);
        let event = root_configure(&wm, 3200, 1080);
        wm.handle_event(event).unwrap();

        assert_eq!(wm.state.monitors.len(), 2);
        let m = &wm.state.monitors[1];
        assert_eq!(m.geometry, Geometry::new(1920, 0, 1280, 1024));
        assert_eq!(m.tagset() & wm.state.monitors[0].tagset(), 0);
        assert!(wm.conn.mapped(m.bars[0].win));
        assert_eq!(wm.screen_width, 3200);
    }

    #[test]
    fn test_rect_to_mon_largest_overlap() {
        let mons = vec![
            Monitor::new(0, Geometry::new(0, 0, 1920, 1080)),
            Monitor::new(1, Geometry::new(1920, 0, 1920, 1080)),
        ];
        assert_eq!(rect_to_mon(&mons, 0, Geometry::new(1900, 10, 100, 100)), 1);
        assert_eq!(rect_to_mon(&mons, 1, Geometry::new(-500, -500, 10, 10)), 1);
    }
}
