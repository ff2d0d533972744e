//! Vanity gaps for layout calculations.
//!
//! Inner gaps separate windows from each other, outer gaps separate
//! windows from the edges of the work area.

use serde::{Deserialize, Serialize};

/// Gap values in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gaps {
    /// Gap between vertically stacked windows (rows).
    pub inner_h: i32,
    /// Gap between side by side windows (columns).
    pub inner_v: i32,
    /// Gap to the top and bottom edges.
    pub outer_h: i32,
    /// Gap to the left and right edges.
    pub outer_v: i32,
}

impl Gaps {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            inner_h: 0,
            inner_v: 0,
            outer_h: 0,
            outer_v: 0,
        }
    }

    #[must_use]
    pub const fn new(inner_h: i32, inner_v: i32, outer_h: i32, outer_v: i32) -> Self {
        Self {
            inner_h,
            inner_v,
            outer_h,
            outer_v,
        }
    }

    /// Gaps in effect for `tiled` clients.
    ///
    /// A single tiled client has its outer gaps multiplied by `smartgaps`;
    /// zero removes them.
    #[must_use]
    pub fn effective(self, tiled: usize, smartgaps: i32) -> Self {
        if tiled == 1 {
            Self {
                outer_h: self.outer_h * smartgaps,
                outer_v: self.outer_v * smartgaps,
                ..self
            }
        } else {
            self
        }
    }
}

/// Even split of a master and a stack area.
///
/// Each client gets `size / count` pixels, truncated; the pixels lost to
/// truncation are handed out one by one to the first clients of the area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    pub master: i32,
    pub stack: i32,
    pub master_rest: i32,
    pub stack_rest: i32,
}

impl Facts {
    pub fn new(n: usize, nmaster: usize, master_size: i32, stack_size: i32) -> Self {
        let master = n.min(nmaster) as i32;
        let stack = n.saturating_sub(nmaster) as i32;
        let master_total = if master > 0 {
            master_size / master * master
        } else {
            0
        };
        let stack_total = if stack > 0 {
            stack_size / stack * stack
        } else {
            0
        };
        Self {
            master,
            stack,
            master_rest: master_size - master_total,
            stack_rest: stack_size - stack_total,
        }
    }

    /// Size of the `i`-th master client.
    pub fn master_share(&self, size: i32, i: usize) -> i32 {
        share(size, self.master, self.master_rest, i)
    }

    /// Size of the `i`-th stack client, counted from the first stack client.
    pub fn stack_share(&self, size: i32, i: usize) -> i32 {
        share(size, self.stack, self.stack_rest, i)
    }
}

fn share(size: i32, count: i32, rest: i32, i: usize) -> i32 {
    if count == 0 {
        return size;
    }
    size / count + i32::from((i as i32) < rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smartgaps_multiplies_outer_for_single_client() {
        let gaps = Gaps::new(20, 20, 10, 30);
        let single = gaps.effective(1, 3);
        assert_eq!(single.outer_h, 30);
        assert_eq!(single.outer_v, 90);
        assert_eq!(single.inner_h, 20);

        assert_eq!(gaps.effective(2, 3), gaps);
        assert_eq!(gaps.effective(1, 0).outer_v, 0);
    }

    #[test]
    fn test_facts_distribute_remainder() {
        let facts = Facts::new(4, 1, 1000, 1000);
        assert_eq!(facts.master, 1);
        assert_eq!(facts.stack, 3);
        assert_eq!(facts.stack_rest, 1);
        let shares: Vec<i32> = (0..3).map(|i| facts.stack_share(1000, i)).collect();
        assert_eq!(shares, vec![334, 333, 333]);
        assert_eq!(shares.iter().sum::<i32>(), 1000);
    }

    #[test]
    fn test_facts_without_stack() {
        let facts = Facts::new(2, 3, 900, 900);
        assert_eq!(facts.master, 2);
        assert_eq!(facts.stack, 0);
        assert_eq!(facts.master_share(900, 0), 450);
    }
}
