//! Client Flags
//!
//! Bitfield flags for per-client state and the value mask carried by
//! configure requests.

use bitflags::bitflags;

bitflags! {
    /// CLIENT flags - window state tracked by the manager
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientFlags: u32 {
        const FLOATING          = 1 << 0;
        const URGENT            = 1 << 1;
        const FULLSCREEN        = 1 << 2;
        const NEVER_FOCUS       = 1 << 3;
        const IGNORE_SIZE_HINTS = 1 << 4;
        /// Set while `placemouse` drags the client; geometry is recorded but not sent.
        const BEING_MOVED       = 1 << 5;
        const TERMINAL          = 1 << 6;
        const NO_SWALLOW        = 1 << 7;
        /// Min size equals max size.
        const FIXED             = 1 << 8;
        /// Floating state remembered across fullscreen.
        const OLD_FLOATING      = 1 << 9;
    }
}

bitflags! {
    /// Value mask of a ConfigureRequest (X11 core protocol bit order)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigMask: u16 {
        const X            = 1 << 0;
        const Y            = 1 << 1;
        const WIDTH        = 1 << 2;
        const HEIGHT       = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING      = 1 << 5;
        const STACK_MODE   = 1 << 6;
    }
}

impl ConfigMask {
    pub fn moves(&self) -> bool {
        self.intersects(Self::X | Self::Y)
    }

    pub fn resizes(&self) -> bool {
        self.intersects(Self::WIDTH | Self::HEIGHT)
    }
}
