//! Recording connection for tests

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Result, bail};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::gaps::Gaps;
use crate::wm::hints::{MotifHints, RawSizeHints, WmHints};
use crate::wm::xconn::{
    BarCell, ClassHint, ConfigureRequest, Cursor, IcccmState, Keysym, Protocol, Scheme, Window,
    WindowAttributes, XConn, XEvent,
};

const ROOT: Window = 0x100;
const CHAR_WIDTH: i32 = 8;
const FONT_HEIGHT: i32 = 14;

pub struct MockConn {
    outputs: RefCell<Vec<Geometry>>,
    events: RefCell<VecDeque<XEvent>>,
    attributes: RefCell<HashMap<Window, WindowAttributes>>,
    transients: RefCell<HashMap<Window, Window>>,
    titles: RefCell<HashMap<Window, String>>,
    classes: RefCell<HashMap<Window, ClassHint>>,
    pids: RefCell<HashMap<Window, u32>>,
    protocols: RefCell<HashMap<Window, Vec<Protocol>>>,
    root_name: RefCell<Option<String>>,
    mapped: RefCell<HashSet<Window>>,
    geometries: RefCell<HashMap<Window, (Geometry, i32)>>,
    positions: RefCell<HashMap<Window, (i32, i32)>>,
    raised: Cell<Option<Window>>,
    focused: Cell<Option<Window>>,
    forwarded: RefCell<Vec<ConfigureRequest>>,
    sent: RefCell<Vec<(Window, Protocol)>>,
    killed: RefCell<Vec<Window>>,
    urgency_cleared: RefCell<HashSet<Window>>,
    client_list: RefCell<Vec<Window>>,
    current_desktop: Cell<Option<u32>>,
    pointer_grabbed: Cell<bool>,
    pointer_replayed: Cell<bool>,
    next_bar: Cell<Window>,
}

impl MockConn {
    pub fn new() -> Self {
        Self::with_outputs(vec![Geometry::new(0, 0, 1920, 1080)])
    }

    pub fn with_outputs(outputs: Vec<Geometry>) -> Self {
        Self {
            outputs: RefCell::new(outputs),
            events: RefCell::default(),
            attributes: RefCell::default(),
            transients: RefCell::default(),
            titles: RefCell::default(),
            classes: RefCell::default(),
            pids: RefCell::default(),
            protocols: RefCell::default(),
            root_name: RefCell::default(),
            mapped: RefCell::default(),
            geometries: RefCell::default(),
            positions: RefCell::default(),
            raised: Cell::new(None),
            focused: Cell::new(None),
            forwarded: RefCell::default(),
            sent: RefCell::default(),
            killed: RefCell::default(),
            urgency_cleared: RefCell::default(),
            client_list: RefCell::default(),
            current_desktop: Cell::new(None),
            pointer_grabbed: Cell::new(false),
            pointer_replayed: Cell::new(false),
            next_bar: Cell::new(0x200),
        }
    }

    pub fn set_outputs(&self, outputs: Vec<Geometry>) {
        *self.outputs.borrow_mut() = outputs;
    }

    pub fn push_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn set_attributes(&self, win: Window, attrs: WindowAttributes) {
        self.attributes.borrow_mut().insert(win, attrs);
    }

    pub fn set_transient(&self, win: Window, parent: Window) {
        self.transients.borrow_mut().insert(win, parent);
    }

    pub fn set_title(&self, win: Window, title: &str) {
        self.titles.borrow_mut().insert(win, title.to_string());
    }

    pub fn set_class(&self, win: Window, class: &str, instance: &str) {
        self.classes.borrow_mut().insert(
            win,
            ClassHint {
                class: class.to_string(),
                instance: instance.to_string(),
            },
        );
    }

    pub fn set_pid(&self, win: Window, pid: u32) {
        self.pids.borrow_mut().insert(win, pid);
    }

    pub fn set_root_name(&self, name: &str) {
        *self.root_name.borrow_mut() = Some(name.to_string());
    }

    pub fn set_protocols(&self, win: Window, protocols: &[Protocol]) {
        self.protocols.borrow_mut().insert(win, protocols.to_vec());
    }

    pub fn mapped(&self, win: Window) -> bool {
        self.mapped.borrow().contains(&win)
    }

    pub fn focused(&self) -> Option<Window> {
        self.focused.get()
    }

    /// Last geometry and border width passed to `move_resize`
    pub fn last_geometry(&self, win: Window) -> Option<(Geometry, i32)> {
        self.geometries.borrow().get(&win).copied()
    }

    /// Last position from either `move_window` or `move_resize`
    pub fn last_position(&self, win: Window) -> Option<(i32, i32)> {
        self.positions.borrow().get(&win).copied()
    }

    pub fn last_raised(&self) -> Option<Window> {
        self.raised.get()
    }

    pub fn forwarded_configures(&self) -> Vec<ConfigureRequest> {
        self.forwarded.borrow().clone()
    }

    pub fn sent_protocols(&self) -> Vec<(Window, Protocol)> {
        self.sent.borrow().clone()
    }

    pub fn killed(&self) -> Vec<Window> {
        self.killed.borrow().clone()
    }

    pub fn urgency_cleared(&self, win: Window) -> bool {
        self.urgency_cleared.borrow().contains(&win)
    }

    pub fn client_list(&self) -> Vec<Window> {
        self.client_list.borrow().clone()
    }

    pub fn current_desktop(&self) -> Option<u32> {
        self.current_desktop.get()
    }

    pub fn pointer_grabbed(&self) -> bool {
        self.pointer_grabbed.get()
    }

    pub fn pointer_replayed(&self) -> bool {
        self.pointer_replayed.get()
    }
}

impl XConn for MockConn {
    fn root(&self) -> Window {
        ROOT
    }

    fn screen_size(&self) -> (i32, i32) {
        self.outputs
            .borrow()
            .iter()
            .fold((0, 0), |(w, h), g| (w.max(g.right()), h.max(g.bottom())))
    }

    fn outputs(&self) -> Result<Vec<Geometry>> {
        Ok(self.outputs.borrow().clone())
    }

    fn become_wm(&self) -> Result<()> {
        Ok(())
    }

    fn next_event(&self) -> Result<XEvent> {
        match self.events.borrow_mut().pop_front() {
            Some(event) => Ok(event),
            None => bail!("no scripted events left"),
        }
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn discard_enter_events(&self) -> Result<()> {
        self.events
            .borrow_mut()
            .retain(|e| !matches!(e, XEvent::EnterNotify { .. }));
        Ok(())
    }

    fn set_root_cursor(&self, _cursor: Cursor) -> Result<()> {
        Ok(())
    }

    fn map_window(&self, win: Window) -> Result<()> {
        self.mapped.borrow_mut().insert(win);
        Ok(())
    }

    fn unmap_window(&self, win: Window) -> Result<()> {
        self.mapped.borrow_mut().remove(&win);
        Ok(())
    }

    fn move_window(&self, win: Window, x: i32, y: i32) -> Result<()> {
        self.positions.borrow_mut().insert(win, (x, y));
        Ok(())
    }

    fn move_resize(&self, win: Window, geometry: Geometry, border_width: i32) -> Result<()> {
        self.positions
            .borrow_mut()
            .insert(win, (geometry.x, geometry.y));
        self.geometries
            .borrow_mut()
            .insert(win, (geometry, border_width));
        Ok(())
    }

    fn configure_unmanaged(&self, request: &ConfigureRequest) -> Result<()> {
        self.forwarded.borrow_mut().push(*request);
        Ok(())
    }

    fn raise_window(&self, win: Window) -> Result<()> {
        self.raised.set(Some(win));
        Ok(())
    }

    fn stack_below(&self, _win: Window, _sibling: Window) -> Result<()> {
        Ok(())
    }

    fn set_border_width(&self, _win: Window, _width: i32) -> Result<()> {
        Ok(())
    }

    fn set_border_color(&self, _win: Window, _scheme: Scheme) -> Result<()> {
        Ok(())
    }

    fn send_configure_notify(&self, _win: Window, _g: Geometry, _bw: i32) -> Result<()> {
        Ok(())
    }

    fn select_client_input(&self, _win: Window) -> Result<()> {
        Ok(())
    }

    fn set_input_focus(&self, win: Window) -> Result<()> {
        self.focused.set(Some(win));
        Ok(())
    }

    fn focus_root(&self) -> Result<()> {
        self.focused.set(Some(ROOT));
        Ok(())
    }

    fn send_protocol(&self, win: Window, protocol: Protocol) -> Result<()> {
        self.sent.borrow_mut().push((win, protocol));
        Ok(())
    }

    fn kill_client(&self, win: Window) -> Result<()> {
        self.killed.borrow_mut().push(win);
        Ok(())
    }

    fn query_tree(&self) -> Result<Vec<Window>> {
        let mut windows: Vec<Window> = self.attributes.borrow().keys().copied().collect();
        windows.sort_unstable();
        Ok(windows)
    }

    fn window_attributes(&self, win: Window) -> Result<Option<WindowAttributes>> {
        Ok(Some(self.attributes.borrow().get(&win).copied().unwrap_or(
            WindowAttributes {
                geometry: Geometry::new(0, 0, 640, 480),
                border_width: 0,
                override_redirect: false,
                viewable: true,
            },
        )))
    }

    fn transient_for(&self, win: Window) -> Result<Option<Window>> {
        Ok(self.transients.borrow().get(&win).copied())
    }

    fn class_hint(&self, win: Window) -> Result<Option<ClassHint>> {
        Ok(self.classes.borrow().get(&win).cloned())
    }

    fn title(&self, win: Window) -> Result<Option<String>> {
        Ok(self.titles.borrow().get(&win).cloned())
    }

    fn root_name(&self) -> Result<Option<String>> {
        Ok(self.root_name.borrow().clone())
    }

    fn size_hints(&self, _win: Window) -> Result<Option<RawSizeHints>> {
        Ok(None)
    }

    fn wm_hints(&self, _win: Window) -> Result<Option<WmHints>> {
        Ok(None)
    }

    fn motif_hints(&self, _win: Window) -> Result<Option<MotifHints>> {
        Ok(None)
    }

    fn window_type(&self, _win: Window) -> Result<Option<String>> {
        Ok(None)
    }

    fn wants_fullscreen(&self, _win: Window) -> Result<bool> {
        Ok(false)
    }

    fn wm_state(&self, _win: Window) -> Result<Option<IcccmState>> {
        Ok(None)
    }

    fn supports_protocol(&self, win: Window, protocol: Protocol) -> Result<bool> {
        Ok(self
            .protocols
            .borrow()
            .get(&win)
            .is_some_and(|p| p.contains(&protocol)))
    }

    fn window_pid(&self, win: Window) -> Result<Option<u32>> {
        Ok(self.pids.borrow().get(&win).copied())
    }

    fn set_wm_state(&self, _win: Window, _state: IcccmState) -> Result<()> {
        Ok(())
    }

    fn set_fullscreen_state(&self, _win: Window, _fullscreen: bool) -> Result<()> {
        Ok(())
    }

    fn clear_urgency(&self, win: Window) -> Result<()> {
        self.urgency_cleared.borrow_mut().insert(win);
        Ok(())
    }

    fn set_active_window(&self, _win: Option<Window>) -> Result<()> {
        Ok(())
    }

    fn set_client_list(&self, windows: &[Window]) -> Result<()> {
        *self.client_list.borrow_mut() = windows.to_vec();
        Ok(())
    }

    fn set_client_list_stacking(&self, _windows: &[Window]) -> Result<()> {
        Ok(())
    }

    fn set_number_of_desktops(&self, _n: u32) -> Result<()> {
        Ok(())
    }

    fn set_current_desktop(&self, index: u32) -> Result<()> {
        self.current_desktop.set(Some(index));
        Ok(())
    }

    fn set_desktop_names(&self, _names: &[String]) -> Result<()> {
        Ok(())
    }

    fn set_desktop_viewport(&self, _n: u32) -> Result<()> {
        Ok(())
    }

    fn init_ewmh(&self, _wm_name: &str) -> Result<()> {
        Ok(())
    }

    fn cleanup_ewmh(&self) -> Result<()> {
        Ok(())
    }

    fn numlock_mask(&self) -> Result<u16> {
        Ok(1 << 4)
    }

    fn refresh_keyboard_mapping(&self) -> Result<()> {
        Ok(())
    }

    fn keycode_to_keysym(&self, keycode: u8) -> Result<Keysym> {
        Ok(Keysym::from(keycode))
    }

    fn ungrab_keys(&self) -> Result<()> {
        Ok(())
    }

    fn grab_key(&self, _keysym: Keysym, _modifiers: u16) -> Result<()> {
        Ok(())
    }

    fn ungrab_buttons(&self, _win: Window) -> Result<()> {
        Ok(())
    }

    fn grab_any_button(&self, _win: Window) -> Result<()> {
        Ok(())
    }

    fn grab_button(&self, _win: Window, _button: u8, _modifiers: u16) -> Result<()> {
        Ok(())
    }

    fn replay_pointer(&self) -> Result<()> {
        self.pointer_replayed.set(true);
        Ok(())
    }

    fn grab_pointer(&self, _cursor: Cursor) -> Result<bool> {
        self.pointer_grabbed.set(true);
        Ok(true)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.pointer_grabbed.set(false);
        Ok(())
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        Ok((0, 0))
    }

    fn warp_pointer(&self, _win: Window, _x: i32, _y: i32) -> Result<()> {
        Ok(())
    }

    fn create_bar_window(&self, geometry: Geometry) -> Result<Window> {
        let win = self.next_bar.get();
        self.next_bar.set(win + 1);
        self.positions
            .borrow_mut()
            .insert(win, (geometry.x, geometry.y));
        self.mapped.borrow_mut().insert(win);
        Ok(win)
    }

    fn destroy_window(&self, win: Window) -> Result<()> {
        self.mapped.borrow_mut().remove(&win);
        Ok(())
    }

    fn draw_bar(&self, _win: Window, _w: i32, _h: i32, _cells: &[BarCell]) -> Result<()> {
        Ok(())
    }

    fn text_width(&self, text: &str) -> i32 {
        CHAR_WIDTH * text.chars().count() as i32
    }

    fn font_height(&self) -> i32 {
        FONT_HEIGHT
    }
}

/// Manager over `conn` with default settings and no gaps, set up.
pub fn test_wm(conn: MockConn) -> WindowManager<MockConn> {
    test_wm_with(conn, |_| {})
}

/// Like [`test_wm`], with `adjust` applied to the configuration first.
pub fn test_wm_with(conn: MockConn, adjust: impl FnOnce(&mut Config)) -> WindowManager<MockConn> {
    let mut config = Config::default();
    config.appearance.gaps = Gaps::zero();
    adjust(&mut config);
    let mut wm = WindowManager::new(conn, config);
    wm.setup().expect("setup");
    wm
}

impl WindowManager<MockConn> {
    /// Answer a MapRequest for `win` and return the new client.
    pub fn map_new_window(&mut self, win: Window) -> ClientId {
        self.handle_event(XEvent::MapRequest { window: win })
            .expect("map request");
        self.state.win_to_client(win).expect("client managed")
    }
}
