//! Placement Module
//!
//! Floating window placement descriptors such as `"50% 50% 90% 80%"`.
//!
//! A descriptor holds two (position only) or four whitespace separated
//! fields, each an integer followed by a one character mode. The x/width
//! pair and the y/height pair are solved independently against the
//! monitor work area.

use crate::shared::Geometry;

/// How a position field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosMode {
    /// `A`: absolute coordinate
    Absolute,
    /// `a`: offset from the current position
    Relative,
    /// `x`/`y`: offset from the current position, bounded by the monitor
    Client,
    /// `X`/`Y`: offset from the monitor origin
    Monitor,
    /// `S`: move the near edge, keep the far edge
    Sticky,
    /// `C`: move the center, keep the opposite side
    Center,
    /// `Z`: move the far edge, keep the near edge
    Edge,
    /// `G`: grid with N cells
    Grid,
    /// `%`: mid-point as a percentage of the work area
    Percent,
    /// `m`/`M`: centered on the pointer
    Pointer,
    Unchanged,
}

impl PosMode {
    fn from_char(c: char) -> Self {
        match c {
            'A' => Self::Absolute,
            'a' => Self::Relative,
            'x' | 'y' => Self::Client,
            'X' | 'Y' => Self::Monitor,
            'S' => Self::Sticky,
            'C' => Self::Center,
            'Z' => Self::Edge,
            'G' => Self::Grid,
            '%' => Self::Percent,
            'm' | 'M' => Self::Pointer,
            _ => Self::Unchanged,
        }
    }

    fn is_absolute(self) -> bool {
        matches!(self, Self::Absolute | Self::Relative)
    }
}

/// How a size field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// `A`: absolute size including borders
    Absolute,
    /// `a`: grow or shrink by the value
    Relative,
    /// `%`: percentage of the work area
    Percent,
    /// `w`/`h`: grow or shrink, position takes precedence
    Client,
    /// `W`/`H`: absolute size, position takes precedence
    Normal,
    /// `p`: move by N grid cells
    GridStep,
    /// `P`: jump to grid cell N
    GridCell,
    Unchanged,
}

impl SizeMode {
    fn from_char(c: char) -> Self {
        match c {
            'A' => Self::Absolute,
            'a' => Self::Relative,
            '%' => Self::Percent,
            'w' | 'h' => Self::Client,
            'W' | 'H' => Self::Normal,
            'p' => Self::GridStep,
            'P' => Self::GridCell,
            _ => Self::Unchanged,
        }
    }

    fn is_absolute(self) -> bool {
        matches!(self, Self::Absolute | Self::Relative)
    }
}

/// One axis of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub pos: i32,
    pub pos_mode: PosMode,
    pub size: i32,
    pub size_mode: SizeMode,
}

/// Parsed placement descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatPos {
    pub x: AxisSpec,
    pub y: AxisSpec,
}

/// Parse `"<int><mode>"` into its parts.
fn field(token: &str) -> Option<(i32, char)> {
    let mode = token.chars().last()?;
    let number = &token[..token.len() - mode.len_utf8()];
    Some((number.parse().ok()?, mode))
}

impl FloatPos {
    pub fn parse(desc: &str) -> Option<Self> {
        let fields = desc
            .split_whitespace()
            .map(field)
            .collect::<Option<Vec<_>>>()?;

        let axis = |pos: (i32, char), size: (i32, char)| AxisSpec {
            pos: pos.0,
            pos_mode: PosMode::from_char(pos.1),
            size: size.0,
            size_mode: SizeMode::from_char(size.1),
        };

        match fields.as_slice() {
            &[(x, xc), (y, yc)] => Some(match xc {
                // size only, center stays fixed
                'w' | 'W' => Self {
                    x: axis((-1, 'C'), (x, xc)),
                    y: axis((-1, 'C'), (y, yc)),
                },
                // grid cell
                'p' | 'P' => Self {
                    x: axis((0, 'G'), (x, xc)),
                    y: axis((0, 'G'), (y, yc)),
                },
                _ => Self {
                    x: axis((x, xc), (0, '\0')),
                    y: axis((y, yc), (0, '\0')),
                },
            }),
            &[x, y, w, h] => Some(Self {
                x: axis(x, w),
                y: axis(y, h),
            }),
            _ => None,
        }
    }

    /// Whether the position is taken from the pointer.
    pub fn uses_pointer(&self) -> bool {
        self.x.pos_mode == PosMode::Pointer
    }

    /// Solve the descriptor for a client with `geometry` and border `bw`.
    ///
    /// `pointer` replaces both positions when the descriptor uses pointer mode.
    pub fn apply(
        &self,
        geometry: Geometry,
        bw: i32,
        work_area: Geometry,
        grid: (i32, i32),
        pointer: (i32, i32),
    ) -> Geometry {
        let (mut x_spec, mut y_spec) = (self.x, self.y);
        if self.uses_pointer() {
            x_spec.pos = pointer.0;
            y_spec.pos = pointer.1;
        }
        let (x, width) = solve_axis(
            x_spec,
            work_area.x,
            work_area.width,
            geometry.x,
            geometry.width,
            bw,
            grid.0,
        );
        let (y, height) = solve_axis(
            y_spec,
            work_area.y,
            work_area.height,
            geometry.y,
            geometry.height,
            bw,
            grid.1,
        );
        Geometry::new(x, y, width, height)
    }
}

/// Solve one axis. `min_p`/`max_s` describe the work area, `cp`/`cs` the
/// client's current position and size without borders.
fn solve_axis(
    spec: AxisSpec,
    min_p: i32,
    max_s: i32,
    mut cp: i32,
    cs: i32,
    bw: i32,
    default_grid: i32,
) -> (i32, i32) {
    let AxisSpec {
        mut pos,
        pos_mode,
        mut size,
        mut size_mode,
    } = spec;
    let abs_p = pos_mode.is_absolute();
    let abs_s = size_mode.is_absolute();
    let mut cs = cs + 2 * bw;

    // Some position modes consume the size.
    match pos_mode {
        PosMode::Absolute => cp = pos,
        PosMode::Relative => cp += pos,
        PosMode::Client => cp = (cp + pos).min(min_p + max_s),
        PosMode::Monitor => cp = min_p + pos.min(max_s),
        PosMode::Sticky | PosMode::Center | PosMode::Edge if pos != -1 => {
            pos = pos.min(max_s).max(0);
            cs = match pos_mode {
                PosMode::Edge => ((cp + cs) - (min_p + pos)).abs(),
                PosMode::Center => ((cp + cs / 2) - (min_p + pos)).abs(),
                _ => (cp - (min_p + pos)).abs(),
            };
            cp = min_p + pos;
            size_mode = SizeMode::Unchanged;
        }
        PosMode::Grid => {
            if pos <= 0 {
                pos = default_grid;
            }
            let grid_size = matches!(size_mode, SizeMode::GridStep | SizeMode::GridCell);
            if size != 0 && pos >= 2 && grid_size {
                let delta = (max_s - cs) / (pos - 1);
                let rest = max_s - cs - delta * (pos - 1);
                let spill = |i: i32| if i > pos - rest { i + rest - pos + 1 } else { 0 };
                if size_mode == SizeMode::GridCell {
                    if (1..=pos).contains(&size) {
                        cp = min_p + delta * (size - 1);
                    }
                } else {
                    let mut i = 0;
                    while i < pos && cp >= min_p + delta * i + spill(i) {
                        i += 1;
                    }
                    cp = min_p + delta * ((i + size).min(pos).max(1) - 1) + spill(i);
                }
            }
        }
        _ => {}
    }

    let resize_to = |size: i32, cp: &mut i32, cs: &mut i32| {
        let size = if pos_mode == PosMode::Sticky && *cp + size > min_p + max_s {
            min_p + max_s - *cp
        } else {
            size.min(max_s)
        };
        match pos_mode {
            PosMode::Center => {
                let delta = size - *cs;
                if delta < 0 || *cp - delta / 2 + size <= min_p + max_s {
                    *cp -= delta / 2;
                } else if *cp - delta / 2 < min_p {
                    *cp = min_p;
                } else if delta != 0 {
                    *cp = min_p + max_s;
                }
            }
            PosMode::Edge => *cp -= size - *cs,
            _ => {}
        }
        *cs = size;
    };

    match size_mode {
        SizeMode::Absolute => cs = size,
        SizeMode::Relative => cs = (cs + size).max(1),
        SizeMode::Percent if size > 0 => {
            size = max_s * size.min(100) / 100;
            resize_to(size, &mut cp, &mut cs);
        }
        SizeMode::Client if size != 0 => {
            size += cs;
            resize_to(size, &mut cp, &mut cs);
        }
        SizeMode::Normal => resize_to(size, &mut cp, &mut cs),
        _ => {}
    }

    match pos_mode {
        PosMode::Percent => cp = min_p + max_s * pos.min(100).max(0) / 100 - cs / 2,
        PosMode::Pointer => cp = pos - cs / 2,
        _ => {}
    }

    if !abs_p && cp < min_p {
        cp = min_p;
    }
    if cp + cs > min_p + max_s && !(abs_p && abs_s) {
        if abs_p || cp == min_p {
            cs = min_p + max_s - cp;
        } else {
            cp = min_p + max_s - cs;
        }
    }

    (cp, (cs - 2 * bw).max(1))
}

/// Absolute descriptor that reproduces `geometry` when parsed and applied.
pub fn format_placement(geometry: Geometry, bw: i32) -> String {
    format!(
        "{}A {}A {}A {}A",
        geometry.x,
        geometry.y,
        geometry.width + 2 * bw,
        geometry.height + 2 * bw
    )
}
