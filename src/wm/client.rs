use crate::shared::Geometry;
use crate::wm::client_flags::ClientFlags;
use crate::wm::hints::SizeHints;
use crate::wm::xconn::Window;

/// Placeholder used when a window exposes no usable text property.
pub const BROKEN: &str = "broken";

/// Stable handle into the client arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub(crate) u64);

/// Geometry, border and floating state captured when a client goes fullscreen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedState {
    pub geometry: Geometry,
    pub border_width: i32,
    pub floating: bool,
}

/// Window Manager client state
/// Represents a top-level window being managed by the WM
#[derive(Debug, Clone)]
pub struct Client {
    /// Arena handle
    pub id: ClientId,

    /// X11 window ID
    pub win: Window,

    /// Owning process, when the server can tell us
    pub pid: Option<u32>,

    /// Window title
    pub name: String,

    /// WM_CLASS class and instance
    pub class: String,
    pub instance: String,

    /// Current geometry, excluding the border
    pub geometry: Geometry,

    /// Geometry before the last resize
    pub old_geometry: Geometry,

    pub bw: i32,
    pub old_bw: i32,

    pub hints: SizeHints,
    pub flags: ClientFlags,

    /// Tag membership, scratchpad bits above the regular tags
    pub tags: u32,

    /// Index of the owning monitor
    pub mon: usize,

    /// Restore point while fullscreen
    pub saved: Option<SavedState>,
}

impl Client {
    pub fn new(id: ClientId, win: Window, geometry: Geometry, old_bw: i32) -> Self {
        Self {
            id,
            win,
            pid: None,
            name: String::from(BROKEN),
            class: String::from(BROKEN),
            instance: String::from(BROKEN),
            geometry,
            old_geometry: geometry,
            bw: 0,
            old_bw,
            hints: SizeHints::default(),
            flags: ClientFlags::empty(),
            tags: 0,
            mon: 0,
            saved: None,
        }
    }

    /// Outer width including both borders.
    pub fn width(&self) -> i32 {
        self.geometry.width + 2 * self.bw
    }

    /// Outer height including both borders.
    pub fn height(&self) -> i32 {
        self.geometry.height + 2 * self.bw
    }

    pub fn is_floating(&self) -> bool {
        self.flags.contains(ClientFlags::FLOATING)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.flags.contains(ClientFlags::FULLSCREEN)
    }

    pub fn is_urgent(&self) -> bool {
        self.flags.contains(ClientFlags::URGENT)
    }

    pub fn is_visible_on(&self, tagset: u32) -> bool {
        self.tags & tagset != 0
    }

    /// Move the current geometry into `old_geometry` and replace it.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.old_geometry = self.geometry;
        self.geometry = geometry;
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.name = match title {
            Some(t) if !t.is_empty() => t,
            _ => String::from(BROKEN),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_size_includes_border() {
        let mut c = Client::new(ClientId(1), 0x200001, Geometry::new(0, 0, 100, 50), 0);
        c.bw = 2;
        assert_eq!(c.width(), 104);
        assert_eq!(c.height(), 54);
    }

    #[test]
    fn test_empty_title_falls_back() {
        let mut c = Client::new(ClientId(1), 1, Geometry::default(), 0);
        c.set_title(Some(String::new()));
        assert_eq!(c.name, BROKEN);
        c.set_title(Some("xterm".into()));
        assert_eq!(c.name, "xterm");
        c.set_title(None);
        assert_eq!(c.name, BROKEN);
    }

    #[test]
    fn test_set_geometry_keeps_previous() {
        let mut c = Client::new(ClientId(1), 1, Geometry::new(1, 2, 3, 4), 0);
        c.set_geometry(Geometry::new(5, 6, 7, 8));
        assert_eq!(c.old_geometry, Geometry::new(1, 2, 3, 4));
        assert_eq!(c.geometry, Geometry::new(5, 6, 7, 8));
    }
}
