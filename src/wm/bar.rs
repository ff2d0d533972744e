//! Status bar
//!
//! A bar is split between modules by bar rules. Each rule names a module
//! and an alignment; modules are laid out in rule order by a left and a
//! right cursor that share the bar width.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::wm::WindowManager;
use crate::wm::client_flags::ClientFlags;
use crate::wm::xconn::{BarCell, Scheme, Window, XConn};

/// Which monitors a bar rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorSelector {
    All,
    /// Only the selected monitor
    Active,
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarAlign {
    Left,
    Center,
    Right,
    LeftLeft,
    LeftRight,
    LeftCenter,
    None,
    RightLeft,
    RightRight,
    RightCenter,
}

impl BarAlign {
    /// Alignments taking their maximum width from the left cursor
    fn uses_left(self) -> bool {
        !matches!(
            self,
            BarAlign::RightLeft | BarAlign::RightRight | BarAlign::RightCenter
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarModuleKind {
    Tags,
    Layout,
    Status,
    WinTitle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarRule {
    pub monitor: MonitorSelector,
    pub bar: usize,
    pub alignment: BarAlign,
    pub module: BarModuleKind,
}

impl BarRule {
    pub fn new(
        monitor: MonitorSelector,
        bar: usize,
        alignment: BarAlign,
        module: BarModuleKind,
    ) -> Self {
        Self {
            monitor,
            bar,
            alignment,
            module,
        }
    }

    pub fn applies_to(&self, bar: usize, mon: usize, is_selmon: bool) -> bool {
        self.bar == bar
            && match self.monitor {
                MonitorSelector::All => true,
                MonitorSelector::Active => is_selmon,
                MonitorSelector::Index(i) => i == mon,
            }
    }
}

/// Where a button press landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickTarget {
    TagBar,
    LtSymbol,
    StatusText,
    WinTitle,
    ClientWin,
    RootWin,
}

/// Result of a click on a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarClick {
    pub target: ClickTarget,
    /// Tag mask for the tag bar, signal number for the status text
    pub arg: u32,
}

/// Root window name split into the drawn texts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusText {
    /// Main text as received, control bytes included
    pub raw: String,
    pub text: String,
    /// Text after the separator
    pub extra: String,
}

fn strip_control(s: &str) -> String {
    s.chars().filter(|&c| c >= ' ').collect()
}

impl StatusText {
    pub fn parse(name: Option<&str>, separator: char) -> Self {
        let Some(name) = name else {
            return Self {
                raw: String::new(),
                text: format!("tagwm-{}", env!("CARGO_PKG_VERSION")),
                extra: String::new(),
            };
        };
        let (main, extra) = match name.split_once(separator) {
            Some((main, extra)) => (main, strip_control(extra)),
            None => (name, String::new()),
        };
        Self {
            raw: main.to_string(),
            text: strip_control(main),
            extra,
        }
    }

    /// Signal number of the status block at `rel_x`.
    ///
    /// Blocks are introduced by a control byte carrying the block's signal.
    pub fn signal_at(&self, rel_x: i32, text_width: &dyn Fn(&str) -> i32) -> i32 {
        let mut x = 0;
        let mut signal = -1;
        let mut segment_start = 0;
        for (i, b) in self.raw.bytes().enumerate() {
            if b >= b' ' {
                continue;
            }
            x += text_width(&self.raw[segment_start..i]);
            segment_start = i + 1;
            if x >= rel_x && signal != -1 {
                break;
            }
            signal = i32::from(b);
        }
        signal.max(0)
    }
}

/// Selected client as shown in the title module
#[derive(Debug, Clone, Copy)]
pub struct TitleInfo<'a> {
    pub name: &'a str,
    pub floating: bool,
    pub fixed: bool,
}

/// Snapshot of everything the modules draw from
pub struct BarContext<'a> {
    pub tags: &'a [String],
    pub tagset: u32,
    /// Tags holding at least one client
    pub occupied: u32,
    pub urgent: u32,
    pub ltsymbol: &'a str,
    pub status: &'a StatusText,
    pub title: Option<TitleInfo<'a>>,
    pub is_selmon: bool,
    pub lrpad: i32,
    pub bh: i32,
    pub text_width: &'a dyn Fn(&str) -> i32,
}

impl BarContext<'_> {
    /// Text width plus padding
    fn textw(&self, text: &str) -> i32 {
        (self.text_width)(text) + self.lrpad
    }

    fn tag_shown(&self, i: usize) -> bool {
        (self.occupied | self.tagset) & (1 << i) != 0
    }
}

pub trait BarModule {
    fn width(&self, ctx: &BarContext, max_width: i32) -> i32;
    fn draw(&self, ctx: &BarContext, x: i32, w: i32, cells: &mut Vec<BarCell>);
    fn click(&self, ctx: &BarContext, rel_x: i32) -> BarClick;
}

pub struct TagsModule;
pub struct LayoutModule;
pub struct StatusModule;
pub struct WinTitleModule;

impl BarModuleKind {
    pub fn module(self) -> &'static dyn BarModule {
        match self {
            BarModuleKind::Tags => &TagsModule,
            BarModuleKind::Layout => &LayoutModule,
            BarModuleKind::Status => &StatusModule,
            BarModuleKind::WinTitle => &WinTitleModule,
        }
    }
}

fn cell(ctx: &BarContext, x: i32, w: i32, text: &str, scheme: Scheme) -> BarCell {
    BarCell {
        x,
        w,
        text: text.to_string(),
        pad: ctx.lrpad / 2,
        scheme,
        invert: false,
        indicator: None,
    }
}

impl BarModule for TagsModule {
    fn width(&self, ctx: &BarContext, _max_width: i32) -> i32 {
        ctx.tags
            .iter()
            .enumerate()
            .filter(|&(i, _)| ctx.tag_shown(i))
            .map(|(_, t)| ctx.textw(t))
            .sum()
    }

    fn draw(&self, ctx: &BarContext, mut x: i32, _w: i32, cells: &mut Vec<BarCell>) {
        for (i, tag) in ctx.tags.iter().enumerate() {
            if !ctx.tag_shown(i) {
                continue;
            }
            let w = ctx.textw(tag);
            let scheme = if ctx.tagset & (1 << i) != 0 {
                Scheme::Sel
            } else {
                Scheme::Norm
            };
            let mut c = cell(ctx, x, w, tag, scheme);
            c.invert = ctx.urgent & (1 << i) != 0;
            cells.push(c);
            x += w;
        }
    }

    fn click(&self, ctx: &BarContext, rel_x: i32) -> BarClick {
        let n = ctx.tags.len();
        let mut x = ctx.lrpad / 2;
        let mut i = 0;
        loop {
            if ctx.tag_shown(i) {
                x += ctx.textw(&ctx.tags[i]);
            }
            if rel_x < x {
                break;
            }
            i += 1;
            if i >= n {
                break;
            }
        }
        BarClick {
            target: ClickTarget::TagBar,
            arg: if i < n { 1 << i } else { 0 },
        }
    }
}

impl BarModule for LayoutModule {
    fn width(&self, ctx: &BarContext, _max_width: i32) -> i32 {
        ctx.textw(ctx.ltsymbol)
    }

    fn draw(&self, ctx: &BarContext, x: i32, w: i32, cells: &mut Vec<BarCell>) {
        cells.push(cell(ctx, x, w, ctx.ltsymbol, Scheme::Norm));
    }

    fn click(&self, _ctx: &BarContext, _rel_x: i32) -> BarClick {
        BarClick {
            target: ClickTarget::LtSymbol,
            arg: 0,
        }
    }
}

impl BarModule for StatusModule {
    fn width(&self, ctx: &BarContext, _max_width: i32) -> i32 {
        ctx.textw(&ctx.status.text)
    }

    fn draw(&self, ctx: &BarContext, x: i32, w: i32, cells: &mut Vec<BarCell>) {
        cells.push(cell(ctx, x, w, &ctx.status.text, Scheme::Norm));
    }

    fn click(&self, ctx: &BarContext, rel_x: i32) -> BarClick {
        BarClick {
            target: ClickTarget::StatusText,
            arg: ctx.status.signal_at(rel_x, ctx.text_width) as u32,
        }
    }
}

impl BarModule for WinTitleModule {
    /// Takes whatever is left.
    fn width(&self, _ctx: &BarContext, max_width: i32) -> i32 {
        max_width
    }

    fn draw(&self, ctx: &BarContext, x: i32, w: i32, cells: &mut Vec<BarCell>) {
        match ctx.title {
            Some(title) => {
                let scheme = if ctx.is_selmon { Scheme::Sel } else { Scheme::Norm };
                let mut c = cell(ctx, x, w, title.name, scheme);
                if title.floating {
                    c.indicator = Some(title.fixed);
                }
                cells.push(c);
            }
            None => cells.push(cell(ctx, x, w, "", Scheme::Norm)),
        }
    }

    fn click(&self, _ctx: &BarContext, _rel_x: i32) -> BarClick {
        BarClick {
            target: ClickTarget::WinTitle,
            arg: 0,
        }
    }
}

/// Left and right cursors over the bar width
#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    lx: i32,
    lw: i32,
    rx: i32,
    rw: i32,
}

impl Partitioner {
    pub fn new(width: i32) -> Self {
        Self {
            lx: 0,
            lw: width,
            rx: 0,
            rw: width,
        }
    }

    /// Space available to a module with `align`
    pub fn max_width(&self, align: BarAlign) -> i32 {
        if align.uses_left() { self.lw } else { self.rw }
    }

    /// Place a module of width `w` (already capped by `max_width`).
    /// Returns its x position.
    pub fn place(&mut self, align: BarAlign, w: i32) -> i32 {
        // an exhausted side continues on the other one
        if self.lw <= 0 {
            self.lw = self.rw;
            self.lx = self.rx;
        } else if self.rw <= 0 {
            self.rw = self.lw;
            self.rx = self.lx;
        }
        let shared = self.lx == self.rx;
        match align {
            BarAlign::None | BarAlign::LeftLeft | BarAlign::Left => {
                let x = self.lx;
                if shared {
                    self.rx += w;
                    self.rw -= w;
                }
                self.lx += w;
                self.lw -= w;
                x
            }
            BarAlign::LeftRight | BarAlign::Right => {
                let x = self.lx + self.lw - w;
                if shared {
                    self.rw -= w;
                }
                self.lw -= w;
                x
            }
            BarAlign::LeftCenter | BarAlign::Center => {
                let x = self.lx + self.lw / 2 - w / 2;
                if shared {
                    self.rw = self.rx + self.rw - x - w;
                    self.rx = x + w;
                }
                self.lw = x - self.lx;
                x
            }
            BarAlign::RightLeft => {
                let x = self.rx;
                if shared {
                    self.lx += w;
                    self.lw -= w;
                }
                self.rx += w;
                self.rw -= w;
                x
            }
            BarAlign::RightRight => {
                let x = self.rx + self.rw - w;
                if shared {
                    self.lw -= w;
                }
                self.rw -= w;
                x
            }
            BarAlign::RightCenter => {
                let x = self.rx + self.rw / 2 - w / 2;
                if shared {
                    self.lw = self.lx + self.lw - x + w;
                    self.lx = x + w;
                }
                self.rw = x - self.rx;
                x
            }
        }
    }
}

impl<X: XConn> WindowManager<X> {
    pub(crate) fn draw_bars(&mut self) -> Result<()> {
        for mon in 0..self.state.monitors.len() {
            self.draw_bar(mon)?;
        }
        Ok(())
    }

    pub(crate) fn draw_bar(&mut self, mon: usize) -> Result<()> {
        for bar in 0..self.state.monitors[mon].bars.len() {
            self.draw_bar_win(mon, bar)?;
        }
        Ok(())
    }

    fn draw_bar_win(&mut self, mon: usize, bar_pos: usize) -> Result<()> {
        let bar = &self.state.monitors[mon].bars[bar_pos];
        if bar.win == crate::wm::xconn::NONE {
            return Ok(());
        }
        let (win, idx, width) = (bar.win, bar.idx, bar.geometry.width);
        let is_selmon = mon == self.state.selmon;
        let text_width = |s: &str| self.conn.text_width(s);
        let ctx = self.bar_context(mon, &text_width);

        let mut part = Partitioner::new(width);
        let mut slots = vec![None; self.config.bar_rules.len()];
        let mut cells = vec![BarCell {
            x: 0,
            w: width,
            text: String::new(),
            pad: 0,
            scheme: Scheme::Norm,
            invert: false,
            indicator: None,
        }];
        for (r, rule) in self.config.bar_rules.iter().enumerate() {
            if !rule.applies_to(idx, mon, is_selmon) {
                continue;
            }
            let module = rule.module.module();
            let max_width = part.max_width(rule.alignment);
            let w = module.width(&ctx, max_width).min(max_width);
            let x = part.place(rule.alignment, w);
            module.draw(&ctx, x, w, &mut cells);
            slots[r] = Some((x, w));
        }
        drop(ctx);

        self.conn.draw_bar(win, width, self.bh, &cells)?;
        self.state.monitors[mon].bars[bar_pos].slots = slots;
        Ok(())
    }

    fn bar_context<'a>(
        &'a self,
        mon: usize,
        text_width: &'a dyn Fn(&str) -> i32,
    ) -> BarContext<'a> {
        let m = &self.state.monitors[mon];
        let all_tags = (1u32 << self.config.ntags()) - 1;
        let (mut occupied, mut urgent) = (0, 0);
        for &id in &m.clients {
            let c = &self.state[id];
            if c.tags & all_tags != all_tags {
                occupied |= c.tags;
            }
            if c.is_urgent() {
                urgent |= c.tags;
            }
        }
        let title = m.sel.map(|id| {
            let c = &self.state[id];
            TitleInfo {
                name: &c.name,
                floating: c.is_floating(),
                fixed: c.flags.contains(ClientFlags::FIXED),
            }
        });
        BarContext {
            tags: &self.config.tags,
            tagset: m.tagset(),
            occupied,
            urgent,
            ltsymbol: &m.ltsymbol,
            status: &self.status,
            title,
            is_selmon: mon == self.state.selmon,
            lrpad: self.lrpad,
            bh: self.bh,
            text_width,
        }
    }

    /// Resolve a press at bar-relative `x` on bar window `win`.
    pub(crate) fn bar_click(&self, win: Window, x: i32) -> Option<BarClick> {
        let mon = self.state.selmon;
        let bar = self.state.monitors[mon].bars.iter().find(|b| b.win == win)?;
        let text_width = |s: &str| self.conn.text_width(s);
        let ctx = self.bar_context(mon, &text_width);
        for (r, rule) in self.config.bar_rules.iter().enumerate() {
            if !rule.applies_to(bar.idx, mon, true) {
                continue;
            }
            let Some(&Some((rx, rw))) = bar.slots.get(r) else {
                continue;
            };
            if rx <= x && x <= rx + rw {
                let click = rule.module.module().click(&ctx, x - rx);
                debug!("Bar click on {:?}: {:?}", rule.module, click);
                return Some(click);
            }
        }
        None
    }

    pub(crate) fn update_status(&mut self) -> Result<()> {
        let name = self.conn.root_name()?;
        self.status = StatusText::parse(name.as_deref(), self.config.status.separator);
        self.draw_bars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width_of(s: &str) -> i32 {
        s.chars().count() as i32 * 10
    }

    fn ctx<'a>(tags: &'a [String], status: &'a StatusText, tw: &'a dyn Fn(&str) -> i32) -> BarContext<'a> {
        BarContext {
            tags,
            tagset: 0b0001,
            occupied: 0b0100,
            urgent: 0b0100,
            ltsymbol: "[]=",
            status,
            title: None,
            is_selmon: true,
            lrpad: 10,
            bh: 20,
            text_width: tw,
        }
    }

    fn tags() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_status_split_and_strip() {
        let s = StatusText::parse(Some("\x01vol 50%\x02bat;extra\x03x"), ';');
        assert_eq!(s.text, "vol 50%bat");
        assert_eq!(s.extra, "extrax");
        assert_eq!(s.raw, "\x01vol 50%\x02bat");
    }

    #[test]
    fn test_status_default_text() {
        let s = StatusText::parse(None, ';');
        assert!(s.text.starts_with("tagwm-"));
    }

    #[test]
    fn test_status_signal_at() {
        // block 1 "aaa" (30px), block 2 "bb" (20px)
        let s = StatusText::parse(Some("\x01aaa\x02bb\x03"), ';');
        let tw: &dyn Fn(&str) -> i32 = &width_of;
        assert_eq!(s.signal_at(5, tw), 1);
        assert_eq!(s.signal_at(35, tw), 2);
        let plain = StatusText::parse(Some("plain"), ';');
        assert_eq!(plain.signal_at(5, tw), 0);
    }

    #[test]
    fn test_tags_show_occupied_or_selected() {
        let tags = tags();
        let status = StatusText::default();
        let ctx = ctx(&tags, &status, &width_of);
        // tags a (selected) and c (occupied), 20px each
        assert_eq!(TagsModule.width(&ctx, 1000), 40);
        let mut cells = Vec::new();
        TagsModule.draw(&ctx, 0, 40, &mut cells);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].scheme, Scheme::Sel);
        assert_eq!(cells[1].text, "c");
        assert!(cells[1].invert);
    }

    #[test]
    fn test_tags_click_maps_to_shown_tag() {
        let tags = tags();
        let status = StatusText::default();
        let ctx = ctx(&tags, &status, &width_of);
        assert_eq!(TagsModule.click(&ctx, 10).arg, 1 << 0);
        assert_eq!(TagsModule.click(&ctx, 30).arg, 1 << 2);
        assert_eq!(TagsModule.click(&ctx, 300).arg, 0);
    }

    #[test]
    fn test_partition_default_rules() {
        // tags 100, layout 30, status 200, title takes the rest
        let mut p = Partitioner::new(1000);
        let x = p.place(BarAlign::Left, 100);
        assert_eq!(x, 0);
        let x = p.place(BarAlign::Left, 30);
        assert_eq!(x, 100);
        let x = p.place(BarAlign::Right, 200);
        assert_eq!(x, 800);
        let max = p.max_width(BarAlign::None);
        assert_eq!(max, 670);
        let x = p.place(BarAlign::None, max);
        assert_eq!(x, 130);
    }

    #[test]
    fn test_partition_center_splits_sides() {
        let mut p = Partitioner::new(1000);
        let x = p.place(BarAlign::Center, 100);
        assert_eq!(x, 450);
        assert_eq!(p.max_width(BarAlign::Left), 450);
        assert_eq!(p.max_width(BarAlign::RightLeft), 450);
        assert_eq!(p.place(BarAlign::RightLeft, 50), 550);
        assert_eq!(p.place(BarAlign::Left, 50), 0);
    }

    #[test]
    fn test_bar_rule_selection() {
        let active = BarRule::new(MonitorSelector::Active, 0, BarAlign::Left, BarModuleKind::Tags);
        assert!(active.applies_to(0, 3, true));
        assert!(!active.applies_to(0, 3, false));
        let indexed = BarRule::new(MonitorSelector::Index(1), 1, BarAlign::Left, BarModuleKind::Tags);
        assert!(indexed.applies_to(1, 1, false));
        assert!(!indexed.applies_to(0, 1, false));
    }
}
