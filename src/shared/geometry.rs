//! Window geometry shared between the state machine and the protocol adapter.
//!
//! All arithmetic is signed: layouts routinely produce intermediate
//! negative offsets (hidden clients live at `x = -2 * width`).

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// One past the right-most column.
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the bottom-most row.
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area of the intersection with `other`, zero when disjoint.
    pub fn intersect_area(&self, other: &Geometry) -> i32 {
        let w = (self.right().min(other.right()) - self.x.max(other.x)).max(0);
        let h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0);
        w * h
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether this rectangle lies entirely inside `outer`.
    #[cfg(test)]
    pub fn within(&self, outer: &Geometry) -> bool {
        self.x >= outer.x
            && self.y >= outer.y
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }
}
