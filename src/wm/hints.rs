//! Hints Module
//!
//! ICCCM size hints, WM hints and Motif decoration hints, plus the
//! size-hint solver that clamps a requested rectangle before it is sent
//! to the server.

use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::client_flags::ClientFlags;

// WM_NORMAL_HINTS flag bits (ICCCM 4.1.2.3)
pub const P_MIN_SIZE: u32 = 1 << 4;
pub const P_MAX_SIZE: u32 = 1 << 5;
pub const P_RESIZE_INC: u32 = 1 << 6;
pub const P_ASPECT: u32 = 1 << 7;
pub const P_BASE_SIZE: u32 = 1 << 8;

// WM_HINTS flag bits
pub const INPUT_HINT: u32 = 1 << 0;
pub const URGENCY_HINT: u32 = 1 << 8;

const MWM_HINTS_DECORATIONS: u32 = 1 << 1;
const MWM_DECOR_ALL: u32 = 1 << 0;
const MWM_DECOR_BORDER: u32 = 1 << 1;
const MWM_DECOR_TITLE: u32 = 1 << 3;

/// Raw WM_NORMAL_HINTS property (XSizeHints equivalent, 18 32-bit values)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSizeHints {
    pub flags: u32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect: (i32, i32),
    pub max_aspect: (i32, i32),
    pub base_width: i32,
    pub base_height: i32,
}

impl RawSizeHints {
    /// Decode the property payload. Short payloads are rejected.
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 17 {
            return None;
        }
        let v = |i: usize| values[i] as i32;
        Some(Self {
            flags: values[0],
            min_width: v(5),
            min_height: v(6),
            max_width: v(7),
            max_height: v(8),
            width_inc: v(9),
            height_inc: v(10),
            min_aspect: (v(11), v(12)),
            max_aspect: (v(13), v(14)),
            base_width: v(15),
            base_height: v(16),
        })
    }
}

/// Size constraints of a client, normalized from WM_NORMAL_HINTS.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeHints {
    pub base_width: i32,
    pub base_height: i32,
    pub inc_width: i32,
    pub inc_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub min_width: i32,
    pub min_height: i32,
    /// Minimum aspect as height / width
    pub min_aspect: f32,
    /// Maximum aspect as width / height
    pub max_aspect: f32,
}

impl SizeHints {
    /// Normalize raw hints. Base size falls back to min size and vice versa.
    pub fn from_raw(raw: Option<RawSizeHints>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let mut hints = Self::default();
        if raw.flags & P_BASE_SIZE != 0 {
            hints.base_width = raw.base_width;
            hints.base_height = raw.base_height;
        } else if raw.flags & P_MIN_SIZE != 0 {
            hints.base_width = raw.min_width;
            hints.base_height = raw.min_height;
        }
        if raw.flags & P_RESIZE_INC != 0 {
            hints.inc_width = raw.width_inc;
            hints.inc_height = raw.height_inc;
        }
        if raw.flags & P_MAX_SIZE != 0 {
            hints.max_width = raw.max_width;
            hints.max_height = raw.max_height;
        }
        if raw.flags & P_MIN_SIZE != 0 {
            hints.min_width = raw.min_width;
            hints.min_height = raw.min_height;
        } else if raw.flags & P_BASE_SIZE != 0 {
            hints.min_width = raw.base_width;
            hints.min_height = raw.base_height;
        }
        if raw.flags & P_ASPECT != 0 {
            let (min_x, min_y) = raw.min_aspect;
            let (max_x, max_y) = raw.max_aspect;
            if min_x != 0 {
                hints.min_aspect = min_y as f32 / min_x as f32;
            }
            if max_y != 0 {
                hints.max_aspect = max_x as f32 / max_y as f32;
            }
        }
        hints
    }

    /// A client whose min and max sizes coincide cannot be resized.
    pub fn is_fixed(&self) -> bool {
        self.max_width != 0
            && self.max_height != 0
            && self.max_width == self.min_width
            && self.max_height == self.min_height
    }
}

/// WM hints (XWMHints equivalent), only the fields the manager reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WmHints {
    pub flags: u32,
    pub input: bool,
}

impl WmHints {
    pub fn from_values(values: &[u32]) -> Option<Self> {
        let flags = *values.first()?;
        Some(Self {
            flags,
            input: values.get(1).is_some_and(|v| v & 1 != 0),
        })
    }

    pub fn is_urgent(&self) -> bool {
        self.flags & URGENCY_HINT != 0
    }

    /// `None` when the client does not state whether it takes input.
    pub fn accepts_input(&self) -> Option<bool> {
        (self.flags & INPUT_HINT != 0).then_some(self.input)
    }
}

/// _MOTIF_WM_HINTS decoration request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotifHints {
    pub flags: u32,
    pub decorations: u32,
}

impl MotifHints {
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 3 {
            return None;
        }
        Some(Self {
            flags: values[0],
            decorations: values[2],
        })
    }

    /// `Some(true)` when a border is wanted, `Some(false)` when decorations
    /// are switched off, `None` when the hint says nothing about them.
    pub fn wants_border(&self) -> Option<bool> {
        if self.flags & MWM_HINTS_DECORATIONS == 0 {
            return None;
        }
        Some(self.decorations & (MWM_DECOR_ALL | MWM_DECOR_BORDER | MWM_DECOR_TITLE) != 0)
    }
}

/// Inputs of the size-hint solver that do not belong to the client.
#[derive(Debug, Clone, Copy)]
pub struct HintContext {
    /// Interactive drag in progress: clamp to the whole screen instead of the monitor.
    pub interact: bool,
    pub screen_width: i32,
    pub screen_height: i32,
    /// Work area of the client's monitor
    pub work_area: Geometry,
    pub bar_height: i32,
    /// Global "respect size hints in tiled layouts" switch
    pub resize_hints: bool,
    /// The monitor's current layout is the floating one
    pub floating_layout: bool,
}

/// Clamp `rect` for `client`.
///
/// Returns the adjusted rectangle and whether it differs from the client's
/// current geometry.
pub fn apply_size_hints(client: &Client, rect: Geometry, ctx: &HintContext) -> (Geometry, bool) {
    let Geometry {
        mut x,
        mut y,
        mut width,
        mut height,
    } = rect;
    let bw = client.bw;
    let outer_w = client.width();
    let outer_h = client.height();

    width = width.max(1);
    height = height.max(1);

    if ctx.interact {
        if x > ctx.screen_width {
            x = ctx.screen_width - outer_w;
        }
        if y > ctx.screen_height {
            y = ctx.screen_height - outer_h;
        }
        if x + width + 2 * bw < 0 {
            x = 0;
        }
        if y + height + 2 * bw < 0 {
            y = 0;
        }
    } else {
        let wa = &ctx.work_area;
        if x >= wa.right() {
            x = wa.right() - outer_w;
        }
        if y >= wa.bottom() {
            y = wa.bottom() - outer_h;
        }
        if x + width + 2 * bw <= wa.x {
            x = wa.x;
        }
        if y + height + 2 * bw <= wa.y {
            y = wa.y;
        }
    }

    height = height.max(ctx.bar_height);
    width = width.max(ctx.bar_height);

    let respect = !client.flags.contains(ClientFlags::IGNORE_SIZE_HINTS)
        && (ctx.resize_hints || client.is_floating() || ctx.floating_layout);
    if respect {
        let h = &client.hints;
        let base_is_min = h.base_width == h.min_width && h.base_height == h.min_height;
        if !base_is_min {
            width -= h.base_width;
            height -= h.base_height;
        }
        if h.min_aspect > 0.0 && h.max_aspect > 0.0 {
            if h.max_aspect < width as f32 / height as f32 {
                width = (height as f32 * h.max_aspect + 0.5) as i32;
            } else if h.min_aspect < height as f32 / width as f32 {
                height = (width as f32 * h.min_aspect + 0.5) as i32;
            }
        }
        if base_is_min {
            width -= h.base_width;
            height -= h.base_height;
        }
        if h.inc_width > 0 {
            width -= width % h.inc_width;
        }
        if h.inc_height > 0 {
            height -= height % h.inc_height;
        }
        width = (width + h.base_width).max(h.min_width);
        height = (height + h.base_height).max(h.min_height);
        if h.max_width > 0 {
            width = width.min(h.max_width);
        }
        if h.max_height > 0 {
            height = height.min(h.max_height);
        }
    }

    if !ctx.interact {
        let wa = &ctx.work_area;
        let fit_w = (wa.width - 2 * bw).max(1);
        let fit_h = (wa.height - 2 * bw).max(1);
        if width > fit_w {
            width = fit_w;
            x = wa.x;
        }
        if height > fit_h {
            height = fit_h;
            y = wa.y;
        }
    }

    let result = Geometry::new(x, y, width, height);
    (result, result != client.geometry)
}
