//! Layout Module
//!
//! Tiling layouts. Every layout is a pure function from the work area and
//! the ordered tiled clients of a monitor to one rectangle per client.
//!
//! Rectangles are returned the way they are handed to the size-hint
//! solver: position of the outer frame, size without the border.

use serde::{Deserialize, Serialize};

use crate::shared::Geometry;
use crate::wm::client::ClientId;
use crate::wm::gaps::{Facts, Gaps};

/// Available layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Tile,
    Floating,
    Monocle,
    Deck,
    Spiral,
    Dwindle,
    Bstack,
    Bstackhoriz,
    Grid,
    Nrowgrid,
    Horizgrid,
    Gaplessgrid,
    Centeredmaster,
    Centeredfloatingmaster,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 14] = [
        LayoutKind::Tile,
        LayoutKind::Floating,
        LayoutKind::Monocle,
        LayoutKind::Deck,
        LayoutKind::Spiral,
        LayoutKind::Dwindle,
        LayoutKind::Bstack,
        LayoutKind::Bstackhoriz,
        LayoutKind::Grid,
        LayoutKind::Nrowgrid,
        LayoutKind::Horizgrid,
        LayoutKind::Gaplessgrid,
        LayoutKind::Centeredmaster,
        LayoutKind::Centeredfloatingmaster,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            LayoutKind::Tile => "[]=",
            LayoutKind::Floating => "><>",
            LayoutKind::Monocle => "[M]",
            LayoutKind::Deck => "D[]",
            LayoutKind::Spiral => "[@]",
            LayoutKind::Dwindle => "[\\]",
            LayoutKind::Bstack => "TTT",
            LayoutKind::Bstackhoriz => "===",
            LayoutKind::Grid => "HHH",
            LayoutKind::Nrowgrid => "###",
            LayoutKind::Horizgrid => "---",
            LayoutKind::Gaplessgrid => ":::",
            LayoutKind::Centeredmaster => "|M|",
            LayoutKind::Centeredfloatingmaster => ">M>",
        }
    }

    /// The floating layout leaves every client where it is.
    pub fn is_floating(self) -> bool {
        self == LayoutKind::Floating
    }

    pub fn arrange(self, params: &LayoutParams) -> Arrangement {
        let mut out = Arrangement::default();
        if self.is_floating() || params.clients.is_empty() {
            if self == LayoutKind::Monocle && params.visible > 0 {
                out.symbol = Some(format!("[{}]", params.visible));
            }
            return out;
        }
        match self {
            LayoutKind::Tile => tile(params, &mut out),
            LayoutKind::Monocle => monocle(params, &mut out),
            LayoutKind::Deck => deck(params, &mut out),
            LayoutKind::Spiral => fibonacci(params, false, &mut out),
            LayoutKind::Dwindle => fibonacci(params, true, &mut out),
            LayoutKind::Bstack => bstack(params, &mut out),
            LayoutKind::Bstackhoriz => bstackhoriz(params, &mut out),
            LayoutKind::Grid => grid(params, &mut out),
            LayoutKind::Nrowgrid => nrowgrid(params, &mut out),
            LayoutKind::Horizgrid => horizgrid(params, &mut out),
            LayoutKind::Gaplessgrid => gaplessgrid(params, &mut out),
            LayoutKind::Centeredmaster => centeredmaster(params, &mut out),
            LayoutKind::Centeredfloatingmaster => centeredfloatingmaster(params, &mut out),
            LayoutKind::Floating => {}
        }
        out
    }
}

/// Everything a layout needs to know about a monitor.
#[derive(Debug, Clone)]
pub struct LayoutParams<'a> {
    /// Work area of the monitor
    pub area: Geometry,
    /// Tiled visible clients in list order, with their border widths
    pub clients: &'a [(ClientId, i32)],
    /// Visible clients including floating ones
    pub visible: usize,
    pub mfact: f64,
    pub nmaster: usize,
    pub gaps: Gaps,
    pub smartgaps: i32,
    pub bar_height: i32,
}

impl LayoutParams<'_> {
    fn gaps(&self) -> Gaps {
        self.gaps.effective(self.clients.len(), self.smartgaps)
    }
}

/// Result of a layout pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arrangement {
    pub placements: Vec<(ClientId, Geometry)>,
    /// Replaces the layout symbol for this pass
    pub symbol: Option<String>,
}

impl Arrangement {
    /// Record an outer rectangle for a client with border `bw`.
    fn place(&mut self, id: ClientId, bw: i32, x: i32, y: i32, w: i32, h: i32) {
        self.placements
            .push((id, Geometry::new(x, y, w - 2 * bw, h - 2 * bw)));
    }
}

fn master_size(total: i32, mfact: f64) -> i32 {
    (f64::from(total) * mfact) as i32
}

fn tile(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;
    let nmaster = p.nmaster.min(n) as i32;
    let nstack = n.saturating_sub(p.nmaster) as i32;

    let (mx, mut my) = (a.x + ov, a.y + oh);
    let (mut sx, mut sy) = (mx, my);
    let mh = a.height - 2 * oh - ih * (nmaster - 1);
    let sh = a.height - 2 * oh - ih * (nstack - 1);
    let mut mw = a.width - 2 * ov;
    let mut sw = mw;

    if p.nmaster > 0 && n > p.nmaster {
        let total = mw - iv;
        mw = master_size(total, p.mfact);
        sw = total - mw;
        sx = mx + mw + iv;
    }

    let facts = Facts::new(n, p.nmaster, mh, sh);
    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        if i < p.nmaster {
            let h = facts.master_share(mh, i);
            out.place(id, bw, mx, my, mw, h);
            my += h + ih;
        } else {
            let h = facts.stack_share(sh, i - p.nmaster);
            out.place(id, bw, sx, sy, sw, h);
            sy += h + ih;
        }
    }
}

fn monocle(p: &LayoutParams, out: &mut Arrangement) {
    if p.visible > 0 {
        out.symbol = Some(format!("[{}]", p.visible));
    }
    let a = p.area;
    for &(id, bw) in p.clients {
        out.place(id, bw, a.x, a.y, a.width, a.height);
    }
}

fn deck(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;
    let nmaster = p.nmaster.min(n) as i32;

    let (mx, mut my) = (a.x + ov, a.y + oh);
    let (mut sx, sy) = (mx, my);
    let mh = a.height - 2 * oh - ih * (nmaster - 1);
    let mut sh = mh;
    let mut mw = a.width - 2 * ov;
    let mut sw = mw;

    if p.nmaster > 0 && n > p.nmaster {
        let total = mw - iv;
        mw = master_size(total, p.mfact);
        sw = total - mw;
        sx = mx + mw + iv;
        sh = a.height - 2 * oh;
    }

    if n > p.nmaster {
        out.symbol = Some(format!("D {}", n - p.nmaster));
    }

    let facts = Facts::new(n, p.nmaster, mh, sh);
    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        if i < p.nmaster {
            let h = facts.master_share(mh, i);
            out.place(id, bw, mx, my, mw, h);
            my += h + ih;
        } else {
            out.place(id, bw, sx, sy, sw, sh);
        }
    }
}

/// Spiral (`dwindle == false`) and dwindle layouts.
fn fibonacci(p: &LayoutParams, dwindle: bool, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;

    let (mut nx, mut ny) = (a.x + ov, a.y + oh);
    let (mut nw, mut nh) = (a.width - 2 * ov, a.height - 2 * oh);
    let (mut hrest, mut wrest) = (0, 0);
    let mut splitting = true;
    let mut i = 0;

    for &(id, bw) in p.clients {
        if splitting {
            let min = p.bar_height + 2 * bw;
            if (i % 2 == 1 && (nh - ih) / 2 <= min) || (i % 2 == 0 && (nw - iv) / 2 <= min) {
                splitting = false;
            }
        }
        if splitting {
            if i + 1 < n {
                if i % 2 == 1 {
                    let half = (nh - ih) / 2;
                    hrest = nh - 2 * half - ih;
                    nh = half;
                } else {
                    let half = (nw - iv) / 2;
                    wrest = nw - 2 * half - iv;
                    nw = half;
                }
                if i % 4 == 2 && !dwindle {
                    nx += nw + iv;
                } else if i % 4 == 3 && !dwindle {
                    ny += nh + ih;
                }
            }

            match i % 4 {
                0 => {
                    if dwindle {
                        ny += nh + ih;
                        nh += hrest;
                    } else {
                        nh -= hrest;
                        ny -= nh + ih;
                    }
                }
                1 => {
                    nx += nw + iv;
                    nw += wrest;
                }
                2 => {
                    ny += nh + ih;
                    nh += hrest;
                    if i + 1 < n {
                        nw += wrest;
                    }
                }
                _ => {
                    if dwindle {
                        nx += nw + iv;
                        nw -= wrest;
                    } else {
                        nw -= wrest;
                        nx -= nw + iv;
                        nh += hrest;
                    }
                }
            }

            if i == 0 {
                if n != 1 {
                    nw = master_size(a.width - iv - 2 * ov, p.mfact);
                    wrest = 0;
                }
                ny = a.y + oh;
            } else if i == 1 {
                nw = a.width - nw - iv - 2 * ov;
            }
            i += 1;
        }
        out.place(id, bw, nx, ny, nw, nh);
    }
}

fn bstack(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;
    let nmaster = p.nmaster.min(n) as i32;
    let nstack = n.saturating_sub(p.nmaster) as i32;

    let (mut mx, my) = (a.x + ov, a.y + oh);
    let (mut sx, mut sy) = (mx, my);
    let mut mh = a.height - 2 * oh;
    let mut sh = mh;
    let mw = a.width - 2 * ov - iv * (nmaster - 1);
    let sw = a.width - 2 * ov - iv * (nstack - 1);

    if p.nmaster > 0 && n > p.nmaster {
        let total = mh - ih;
        mh = master_size(total, p.mfact);
        sh = total - mh;
        sy = my + mh + ih;
    }

    let facts = Facts::new(n, p.nmaster, mw, sw);
    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        if i < p.nmaster {
            let w = facts.master_share(mw, i);
            out.place(id, bw, mx, my, w, mh);
            mx += w + iv;
        } else {
            let w = facts.stack_share(sw, i - p.nmaster);
            out.place(id, bw, sx, sy, w, sh);
            sx += w + iv;
        }
    }
}

fn bstackhoriz(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;
    let nmaster = p.nmaster.min(n) as i32;
    let nstack = n.saturating_sub(p.nmaster) as i32;

    let (mut mx, my) = (a.x + ov, a.y + oh);
    let (sx, mut sy) = (mx, my);
    let mut mh = a.height - 2 * oh;
    let mut sh = a.height - 2 * oh - ih * (nstack - 1);
    let mw = a.width - 2 * ov - iv * (nmaster - 1);
    let sw = a.width - 2 * ov;

    if p.nmaster > 0 && n > p.nmaster {
        mh = master_size(mh - ih, p.mfact);
        sy = my + mh + ih;
        sh = a.height - mh - 2 * oh - ih * nstack;
    }

    let facts = Facts::new(n, p.nmaster, mw, sh);
    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        if i < p.nmaster {
            let w = facts.master_share(mw, i);
            out.place(id, bw, mx, my, w, mh);
            mx += w + iv;
        } else {
            let h = facts.stack_share(sh, i - p.nmaster);
            out.place(id, bw, sx, sy, sw, h);
            sy += h + ih;
        }
    }
}

fn grid(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len() as i32;
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;

    let mut rows = 0;
    while rows <= n / 2 && rows * rows < n {
        rows += 1;
    }
    let cols = if rows > 0 && (rows - 1) * rows >= n {
        rows - 1
    } else {
        rows
    };

    let avail_h = a.height - 2 * oh - ih * (rows - 1);
    let avail_w = a.width - 2 * ov - iv * (cols - 1);
    let ch = avail_h / rows.max(1);
    let cw = avail_w / cols.max(1);
    let ch_rest = avail_h - ch * rows;
    let cw_rest = avail_w - cw * cols;

    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        let i = i as i32;
        let cc = i / rows;
        let cr = i % rows;
        let cx = a.x + ov + cc * (cw + iv) + cc.min(cw_rest);
        let cy = a.y + oh + cr * (ch + ih) + cr.min(ch_rest);
        out.place(
            id,
            bw,
            cx,
            cy,
            cw + i32::from(cc < cw_rest),
            ch + i32::from(cr < ch_rest),
        );
    }
}

/// Rows of `nmaster + 1`, two clients always side by side.
fn nrowgrid(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len() as i32;
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;

    let mut rows = p.nmaster as i32 + 1;
    if n == 2 {
        rows = 1;
    }
    rows = rows.min(n);

    let mut cols = n / rows;
    let mut used_clients = cols;
    let mut cy = a.y + oh;
    let ch = (a.height - 2 * oh - ih * (rows - 1)) / rows;
    let mut used_h = ch;
    let mut used_w = 0;
    let (mut ri, mut ci) = (0, 0);

    for &(id, bw) in p.clients {
        if ci == cols {
            used_w = 0;
            ci = 0;
            ri += 1;
            cols = (n - used_clients) / (rows - ri);
            used_clients += cols;
            cy = a.y + oh + used_h + ih;
            used_h += ch + ih;
        }
        let cx = a.x + ov + used_w;
        let cw = (a.width - 2 * ov - used_w) / (cols - ci);
        used_w += cw + iv;
        out.place(id, bw, cx, cy, cw, ch);
        ci += 1;
    }
}

/// Half the clients on top, the rest below.
fn horizgrid(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;

    let ntop = if n <= 2 { n } else { n / 2 };
    let nbottom = n - ntop;

    let (mut mx, my) = (a.x + ov, a.y + oh);
    let (mut sx, mut sy) = (mx, my);
    let mut mh = a.height - 2 * oh;
    let mut sh = mh;
    let mw = a.width - 2 * ov - iv * (ntop as i32 - 1);
    let mut sw = a.width - 2 * ov;

    if nbottom > 0 {
        sh = (mh - ih) / 2;
        mh = mh - ih - sh;
        sy = my + mh + ih;
        sw = a.width - 2 * ov - iv * (nbottom as i32 - 1);
    }

    let facts = Facts::new(n, ntop, mw, sw);
    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        if i < ntop {
            let w = facts.master_share(mw, i);
            out.place(id, bw, mx, my, w, mh);
            mx += w + iv;
        } else {
            let w = facts.stack_share(sw, i - ntop);
            out.place(id, bw, sx, sy, w, sh);
            sx += w + iv;
        }
    }
}

fn gaplessgrid(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len() as i32;
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;

    let mut cols = 0;
    while cols <= n / 2 && cols * cols < n {
        cols += 1;
    }
    // 2:3 instead of 1:2:2
    if n == 5 {
        cols = 2;
    }
    let mut rows = n / cols;

    let row_height = |rows: i32| {
        let avail = a.height - 2 * oh - ih * (rows - 1);
        (avail / rows, avail - avail / rows * rows)
    };
    let (mut ch, mut ch_rest) = row_height(rows);
    let avail_w = a.width - 2 * ov - iv * (cols - 1);
    let cw = avail_w / cols;
    let cw_rest = avail_w - cw * cols;

    let mut x = a.x + ov;
    let y = a.y + oh;
    let (mut cn, mut rn) = (0, 0);
    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        // trailing columns take one more row
        if i as i32 / rows + 1 > cols - n % cols {
            rows = n / cols + 1;
            (ch, ch_rest) = row_height(rows);
        }
        let extra_w = i32::from(cn < cw_rest);
        out.place(
            id,
            bw,
            x,
            y + rn * (ch + ih) + rn.min(ch_rest),
            cw + extra_w,
            ch + i32::from(rn < ch_rest),
        );
        rn += 1;
        if rn >= rows {
            rn = 0;
            x += cw + iv + extra_w;
            cn += 1;
        }
    }
}

/// Master column in the middle, stack clients alternate right and left.
fn centeredmaster(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: ih,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;
    let nstack = n.saturating_sub(p.nmaster);
    let in_master = |i: usize| p.nmaster == 0 || i < p.nmaster;

    let mut mx = a.x + ov;
    let mut my = a.y + oh;
    let masters = if p.nmaster == 0 { n } else { n.min(p.nmaster) } as i32;
    let mh = a.height - 2 * oh - ih * (masters - 1);
    let mut mw = a.width - 2 * ov;
    let left_count = (nstack / 2) as i32;
    let right_count = (nstack - nstack / 2) as i32;
    let lh = a.height - 2 * oh - ih * (left_count - 1);
    let rh = a.height - 2 * oh - ih * (right_count - 1);
    let (mut lw, mut rw) = (0, 0);
    let (mut lx, mut ly, mut rx, mut ry) = (0, 0, 0, 0);

    if p.nmaster > 0 && n > p.nmaster {
        if nstack > 1 {
            let total = a.width - 2 * ov - 2 * iv;
            mw = master_size(total, p.mfact);
            lw = (total - mw) / 2;
            rw = total - mw - lw;
            mx += lw + iv;
        } else {
            mw = master_size(mw - iv, p.mfact);
            rw = a.width - mw - iv - 2 * ov;
        }
        lx = a.x + ov;
        ly = a.y + oh;
        rx = mx + mw + iv;
        ry = a.y + oh;
    }

    let split = |size: i32, count: i32, j: i32| {
        if count == 0 {
            return size;
        }
        let rest = size - size / count * count;
        size / count + i32::from(j < rest)
    };

    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        if in_master(i) {
            let h = split(mh, masters, i as i32);
            out.place(id, bw, mx, my, mw, h);
            my += h + ih;
        } else {
            let k = i - p.nmaster;
            let j = (k / 2) as i32;
            if k % 2 == 1 {
                let h = split(lh, left_count, j);
                out.place(id, bw, lx, ly, lw, h);
                ly += h + ih;
            } else {
                let h = split(rh, right_count, j);
                out.place(id, bw, rx, ry, rw, h);
                ry += h + ih;
            }
        }
    }
}

/// Master clients float in a centered box above a horizontal stack.
fn centeredfloatingmaster(p: &LayoutParams, out: &mut Arrangement) {
    let n = p.clients.len();
    let Gaps {
        inner_h: _,
        inner_v: iv,
        outer_h: oh,
        outer_v: ov,
    } = p.gaps();
    let a = p.area;
    let nmaster = n.min(p.nmaster) as i32;
    let nstack = n.saturating_sub(p.nmaster) as i32;

    let (mut mx, mut my) = (a.x + ov, a.y + oh);
    let (mut sx, sy) = (mx, my);
    let mut mh = a.height - 2 * oh;
    let sh = mh;
    let mut mw = a.width - 2 * ov - iv * (n as i32 - 1);
    let sw = a.width - 2 * ov - iv * (nstack - 1);
    let mut master_gap = iv;

    if p.nmaster > 0 && n > p.nmaster {
        let gap = f64::from(iv) * 0.8;
        master_gap = gap as i32;
        let gaps = gap * f64::from(nmaster - 1);
        let (w, h) = (f64::from(a.width), f64::from(a.height));
        if a.width > a.height {
            mw = (w * p.mfact - gaps) as i32;
            mh = (h * 0.9) as i32;
        } else {
            mw = (w * 0.9 - gaps) as i32;
            mh = (h * p.mfact) as i32;
        }
        mx = a.x + (a.width - mw) / 2;
        my = a.y + (a.height - mh) / 2;
    }

    let facts = Facts::new(n, p.nmaster, mw, sw);
    for (i, &(id, bw)) in p.clients.iter().enumerate() {
        if i < p.nmaster {
            let w = facts.master_share(mw, i);
            out.place(id, bw, mx, my, w, mh);
            mx += w + master_gap;
        } else {
            let w = facts.stack_share(sw, i - p.nmaster);
            out.place(id, bw, sx, sy, w, sh);
            sx += w + iv;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Helpers
    // ========================================================================

    fn ids(n: usize, bw: i32) -> Vec<(ClientId, i32)> {
        (0..n).map(|i| (ClientId(i as u64), bw)).collect()
    }

    fn params(clients: &[(ClientId, i32)], gaps: Gaps) -> LayoutParams<'_> {
        LayoutParams {
            area: Geometry::new(0, 0, 1920, 1080),
            clients,
            visible: clients.len(),
            mfact: 0.55,
            nmaster: 1,
            gaps,
            smartgaps: 3,
            bar_height: 20,
        }
    }

    fn outer(g: &Geometry, bw: i32) -> Geometry {
        Geometry::new(g.x, g.y, g.width + 2 * bw, g.height + 2 * bw)
    }

    const TILING: [LayoutKind; 10] = [
        LayoutKind::Tile,
        LayoutKind::Spiral,
        LayoutKind::Dwindle,
        LayoutKind::Bstack,
        LayoutKind::Bstackhoriz,
        LayoutKind::Grid,
        LayoutKind::Nrowgrid,
        LayoutKind::Horizgrid,
        LayoutKind::Gaplessgrid,
        LayoutKind::Centeredmaster,
    ];

    // ========================================================================
    // Tile
    // ========================================================================

    #[test]
    fn test_tile_three_clients() {
        let clients = ids(3, 0);
        let out = LayoutKind::Tile.arrange(&params(&clients, Gaps::zero()));
        assert_eq!(out.placements.len(), 3);
        assert_eq!(out.placements[0].1, Geometry::new(0, 0, 1056, 1080));
        assert_eq!(out.placements[1].1, Geometry::new(1056, 0, 864, 540));
        assert_eq!(out.placements[2].1, Geometry::new(1056, 540, 864, 540));
        assert!(out.symbol.is_none());
    }

    #[test]
    fn test_tile_subtracts_border() {
        let clients = ids(1, 2);
        let out = LayoutKind::Tile.arrange(&params(&clients, Gaps::zero()));
        assert_eq!(out.placements[0].1, Geometry::new(0, 0, 1916, 1076));
    }

    #[test]
    fn test_tile_with_gaps() {
        let clients = ids(2, 0);
        let out = LayoutKind::Tile.arrange(&params(&clients, Gaps::new(20, 20, 10, 30)));
        let master = out.placements[0].1;
        let stack = out.placements[1].1;
        assert_eq!((master.x, master.y), (30, 10));
        assert_eq!(master.height, 1060);
        assert_eq!(stack.x, master.right() + 20);
        assert_eq!(stack.right(), 1920 - 30);
    }

    #[test]
    fn test_smartgaps_single_client() {
        let clients = ids(1, 0);
        let out = LayoutKind::Tile.arrange(&params(&clients, Gaps::new(20, 20, 10, 30)));
        assert_eq!(out.placements[0].1, Geometry::new(90, 30, 1920 - 180, 1080 - 60));
    }

    #[test]
    fn test_nmaster_zero_puts_everything_in_stack() {
        let clients = ids(2, 0);
        let mut p = params(&clients, Gaps::zero());
        p.nmaster = 0;
        let out = LayoutKind::Tile.arrange(&p);
        assert_eq!(out.placements[0].1, Geometry::new(0, 0, 1920, 540));
        assert_eq!(out.placements[1].1, Geometry::new(0, 540, 1920, 540));
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    #[test]
    fn test_monocle_counts_visible_clients() {
        let clients = ids(2, 2);
        let mut p = params(&clients, Gaps::new(20, 20, 10, 30));
        p.visible = 3;
        let out = LayoutKind::Monocle.arrange(&p);
        assert_eq!(out.symbol.as_deref(), Some("[3]"));
        // no gaps in monocle
        assert_eq!(out.placements[0].1, Geometry::new(0, 0, 1916, 1076));
        assert_eq!(out.placements[0].1, out.placements[1].1);
    }

    #[test]
    fn test_monocle_symbol_with_only_floating_clients() {
        let mut p = params(&[], Gaps::zero());
        p.visible = 1;
        let out = LayoutKind::Monocle.arrange(&p);
        assert_eq!(out.symbol.as_deref(), Some("[1]"));
        assert!(out.placements.is_empty());
    }

    #[test]
    fn test_deck_symbol_and_stacked_clients() {
        let clients = ids(4, 0);
        let out = LayoutKind::Deck.arrange(&params(&clients, Gaps::zero()));
        assert_eq!(out.symbol.as_deref(), Some("D 3"));
        assert_eq!(out.placements[1].1, out.placements[3].1);
        assert_eq!(out.placements[1].1.height, 1080);
    }

    #[test]
    fn test_symbols_are_distinct() {
        let mut symbols: Vec<&str> = LayoutKind::ALL.iter().map(|l| l.symbol()).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), LayoutKind::ALL.len());
    }

    #[test]
    fn test_floating_places_nothing() {
        let clients = ids(3, 0);
        let out = LayoutKind::Floating.arrange(&params(&clients, Gaps::zero()));
        assert!(out.placements.is_empty());
        assert!(LayoutKind::Floating.is_floating());
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    #[test]
    fn test_tiling_layouts_stay_inside_and_never_overlap() {
        for gaps in [Gaps::zero(), Gaps::new(20, 20, 10, 30)] {
            for layout in TILING {
                for n in 1..=7 {
                    let clients = ids(n, 1);
                    let p = params(&clients, gaps);
                    let out = layout.arrange(&p);
                    assert_eq!(out.placements.len(), n, "{layout:?} n={n}");
                    let rects: Vec<Geometry> =
                        out.placements.iter().map(|(_, g)| outer(g, 1)).collect();
                    for (i, r) in rects.iter().enumerate() {
                        assert!(r.width > 0 && r.height > 0, "{layout:?} n={n} {r:?}");
                        assert!(r.within(&p.area), "{layout:?} n={n} {r:?}");
                        for other in &rects[i + 1..] {
                            assert_eq!(
                                r.intersect_area(other),
                                0,
                                "{layout:?} n={n} {r:?} {other:?}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_layouts_are_deterministic() {
        let clients = ids(5, 2);
        for layout in LayoutKind::ALL {
            let p = params(&clients, Gaps::new(20, 20, 10, 30));
            assert_eq!(layout.arrange(&p), layout.arrange(&p), "{layout:?}");
        }
    }

    #[test]
    fn test_spiral_quarters() {
        let clients = ids(4, 0);
        let mut p = params(&clients, Gaps::zero());
        p.area = Geometry::new(0, 0, 1000, 1000);
        p.mfact = 0.5;
        let out = LayoutKind::Spiral.arrange(&p);
        let rects: Vec<Geometry> = out.placements.iter().map(|(_, g)| *g).collect();
        assert_eq!(
            rects,
            vec![
                Geometry::new(0, 0, 500, 1000),
                Geometry::new(500, 0, 500, 500),
                Geometry::new(750, 500, 250, 500),
                Geometry::new(500, 500, 250, 500),
            ]
        );

        let out = LayoutKind::Dwindle.arrange(&p);
        assert_eq!(out.placements[2].1, Geometry::new(500, 500, 250, 500));
        assert_eq!(out.placements[3].1, Geometry::new(750, 500, 250, 500));
    }

    #[test]
    fn test_serde_names() {
        let layout: LayoutKind = toml::from_str::<std::collections::HashMap<String, LayoutKind>>(
            "l = \"centeredfloatingmaster\"",
        )
        .unwrap()["l"];
        assert_eq!(layout, LayoutKind::Centeredfloatingmaster);
    }
}
