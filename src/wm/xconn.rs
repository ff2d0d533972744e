//! Protocol seam
//!
//! The window manager talks to the display server only through the
//! [`XConn`] trait. The x11rb implementation lives in `wm::x11`; tests
//! drive the state machine through a recording mock.

use anyhow::Result;

use crate::shared::Geometry;
use crate::wm::client_flags::ConfigMask;
use crate::wm::hints::{MotifHints, RawSizeHints, WmHints};

/// X11 resource ID of a window
pub type Window = u32;
pub type Keysym = u32;

/// The null window
pub const NONE: Window = 0;

/// Attributes read when deciding whether to manage a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub geometry: Geometry,
    pub border_width: i32,
    pub override_redirect: bool,
    /// Map state is `IsViewable`
    pub viewable: bool,
}

/// WM_CLASS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassHint {
    pub instance: String,
    pub class: String,
}

/// ICCCM WM_STATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcccmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

/// WM_PROTOCOLS entries the manager uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Delete,
    TakeFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Normal,
    Resize,
    Move,
}

/// Color scheme index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Norm,
    Sel,
    Urg,
}

/// One text cell of a bar, in bar-relative coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarCell {
    pub x: i32,
    pub w: i32,
    pub text: String,
    /// Left padding of the text inside the cell
    pub pad: i32,
    pub scheme: Scheme,
    /// Swap foreground and background
    pub invert: bool,
    /// Small box in the top-left corner, filled when `Some(true)`
    pub indicator: Option<bool>,
}

/// ConfigureRequest as sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub border_width: i32,
    pub sibling: Window,
    pub stack_mode: u8,
    pub mask: ConfigMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Window the event was reported on
    pub window: Window,
    pub root_x: i32,
    pub root_y: i32,
    /// Position relative to `window`
    pub x: i32,
    pub y: i32,
    pub button: u8,
    pub state: u16,
    pub time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub window: Window,
    pub root_x: i32,
    pub root_y: i32,
    pub time: u32,
}

/// _NET_WM_STATE action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessageKind {
    /// _NET_WM_STATE naming _NET_WM_STATE_FULLSCREEN in either slot
    Fullscreen(StateAction),
    ActiveWindow,
    Other,
}

/// Properties the manager reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    WmName,
    NetWmName,
    TransientFor,
    NormalHints,
    WmHints,
    MotifHints,
    WindowType,
    Other,
}

/// Events the manager handles, decoded by the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    ClientMessage {
        window: Window,
        kind: ClientMessageKind,
    },
    ConfigureRequest(ConfigureRequest),
    ConfigureNotify {
        window: Window,
        width: i32,
        height: i32,
    },
    DestroyNotify {
        window: Window,
    },
    EnterNotify {
        window: Window,
        /// Normal crossing mode and not into an inferior
        normal: bool,
    },
    Expose {
        window: Window,
        count: u16,
    },
    FocusIn {
        window: Window,
    },
    KeyPress {
        keycode: u8,
        state: u16,
    },
    MappingNotify {
        keyboard: bool,
    },
    MapRequest {
        window: Window,
    },
    MotionNotify(MotionEvent),
    PropertyNotify {
        window: Window,
        kind: PropertyKind,
        deleted: bool,
    },
    UnmapNotify {
        window: Window,
        synthetic: bool,
    },
}

/// Everything the window manager needs from the display server.
pub trait XConn {
    // --- screen ---
    fn root(&self) -> Window;
    fn screen_size(&self) -> (i32, i32);
    /// Output rectangles as reported by RandR, in server order.
    fn outputs(&self) -> Result<Vec<Geometry>>;
    /// Select substructure redirection on the root window. Fails when
    /// another window manager holds it.
    fn become_wm(&self) -> Result<()>;
    fn next_event(&self) -> Result<XEvent>;
    fn flush(&self) -> Result<()>;
    /// Sync and drop queued EnterNotify events caused by our own restacking.
    fn discard_enter_events(&self) -> Result<()>;
    fn set_root_cursor(&self, cursor: Cursor) -> Result<()>;

    // --- window operations ---
    fn map_window(&self, win: Window) -> Result<()>;
    fn unmap_window(&self, win: Window) -> Result<()>;
    fn move_window(&self, win: Window, x: i32, y: i32) -> Result<()>;
    fn move_resize(&self, win: Window, geometry: Geometry, border_width: i32) -> Result<()>;
    /// Forward a configure request of an unmanaged window verbatim.
    fn configure_unmanaged(&self, request: &ConfigureRequest) -> Result<()>;
    fn raise_window(&self, win: Window) -> Result<()>;
    fn stack_below(&self, win: Window, sibling: Window) -> Result<()>;
    fn set_border_width(&self, win: Window, width: i32) -> Result<()>;
    fn set_border_color(&self, win: Window, scheme: Scheme) -> Result<()>;
    fn send_configure_notify(&self, win: Window, geometry: Geometry, border_width: i32)
    -> Result<()>;
    fn select_client_input(&self, win: Window) -> Result<()>;
    fn set_input_focus(&self, win: Window) -> Result<()>;
    fn focus_root(&self) -> Result<()>;
    fn send_protocol(&self, win: Window, protocol: Protocol) -> Result<()>;
    fn kill_client(&self, win: Window) -> Result<()>;
    fn query_tree(&self) -> Result<Vec<Window>>;

    // --- property reads ---
    fn window_attributes(&self, win: Window) -> Result<Option<WindowAttributes>>;
    fn transient_for(&self, win: Window) -> Result<Option<Window>>;
    fn class_hint(&self, win: Window) -> Result<Option<ClassHint>>;
    /// _NET_WM_NAME, falling back to WM_NAME
    fn title(&self, win: Window) -> Result<Option<String>>;
    /// WM_NAME of the root window
    fn root_name(&self) -> Result<Option<String>>;
    fn size_hints(&self, win: Window) -> Result<Option<RawSizeHints>>;
    fn wm_hints(&self, win: Window) -> Result<Option<WmHints>>;
    fn motif_hints(&self, win: Window) -> Result<Option<MotifHints>>;
    /// Atom name of the first _NET_WM_WINDOW_TYPE entry
    fn window_type(&self, win: Window) -> Result<Option<String>>;
    /// _NET_WM_STATE contains _NET_WM_STATE_FULLSCREEN
    fn wants_fullscreen(&self, win: Window) -> Result<bool>;
    fn wm_state(&self, win: Window) -> Result<Option<IcccmState>>;
    fn supports_protocol(&self, win: Window, protocol: Protocol) -> Result<bool>;
    fn window_pid(&self, win: Window) -> Result<Option<u32>>;

    // --- property writes ---
    fn set_wm_state(&self, win: Window, state: IcccmState) -> Result<()>;
    fn set_fullscreen_state(&self, win: Window, fullscreen: bool) -> Result<()>;
    fn clear_urgency(&self, win: Window) -> Result<()>;
    fn set_active_window(&self, win: Option<Window>) -> Result<()>;
    fn set_client_list(&self, windows: &[Window]) -> Result<()>;
    fn set_client_list_stacking(&self, windows: &[Window]) -> Result<()>;
    fn set_number_of_desktops(&self, n: u32) -> Result<()>;
    fn set_current_desktop(&self, index: u32) -> Result<()>;
    fn set_desktop_names(&self, names: &[String]) -> Result<()>;
    fn set_desktop_viewport(&self, n: u32) -> Result<()>;
    /// Create the _NET_SUPPORTING_WM_CHECK window and announce _NET_SUPPORTED.
    fn init_ewmh(&self, wm_name: &str) -> Result<()>;
    /// Remove the supporting window and free cursors, colors and font.
    fn cleanup_ewmh(&self) -> Result<()>;

    // --- input ---
    fn numlock_mask(&self) -> Result<u16>;
    fn refresh_keyboard_mapping(&self) -> Result<()>;
    fn keycode_to_keysym(&self, keycode: u8) -> Result<Keysym>;
    fn ungrab_keys(&self) -> Result<()>;
    /// Grab every keycode producing `keysym` with exactly `modifiers`.
    fn grab_key(&self, keysym: Keysym, modifiers: u16) -> Result<()>;
    fn ungrab_buttons(&self, win: Window) -> Result<()>;
    /// Grab all buttons synchronously so a click can focus the window.
    fn grab_any_button(&self, win: Window) -> Result<()>;
    fn grab_button(&self, win: Window, button: u8, modifiers: u16) -> Result<()>;
    /// Release a synchronously grabbed click to the client.
    fn replay_pointer(&self) -> Result<()>;
    fn grab_pointer(&self, cursor: Cursor) -> Result<bool>;
    fn ungrab_pointer(&self) -> Result<()>;
    fn query_pointer(&self) -> Result<(i32, i32)>;
    fn warp_pointer(&self, win: Window, x: i32, y: i32) -> Result<()>;

    // --- bar ---
    fn create_bar_window(&self, geometry: Geometry) -> Result<Window>;
    fn destroy_window(&self, win: Window) -> Result<()>;
    fn draw_bar(&self, win: Window, width: i32, height: i32, cells: &[BarCell]) -> Result<()>;
    fn text_width(&self, text: &str) -> i32;
    fn font_height(&self) -> i32;
}
