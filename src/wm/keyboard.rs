//! Keyboard Module
//!
//! Key chord parsing, key and button grabs, and key press dispatch.

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::{ButtonBinding, KeyBinding};
use crate::wm::WindowManager;
use crate::wm::bar::ClickTarget;
use crate::wm::client::ClientId;
use crate::wm::commands::Action;
use crate::wm::xconn::{Keysym, XConn};

/// Core modifier masks
pub const SHIFT: u16 = 1 << 0;
pub const LOCK: u16 = 1 << 1;
pub const CONTROL: u16 = 1 << 2;
pub const MOD1: u16 = 1 << 3;
pub const MOD2: u16 = 1 << 4;
pub const MOD3: u16 = 1 << 5;
pub const MOD4: u16 = 1 << 6;
pub const MOD5: u16 = 1 << 7;

const MODIFIERS: [(&str, u16); 12] = [
    ("Shift", SHIFT),
    ("Lock", LOCK),
    ("Control", CONTROL),
    ("Ctrl", CONTROL),
    ("Mod1", MOD1),
    ("Alt", MOD1),
    ("Mod2", MOD2),
    ("Mod3", MOD3),
    ("Mod4", MOD4),
    ("Super", MOD4),
    ("Mod5", MOD5),
    ("None", 0),
];

/// Named keysyms, see `X11/keysymdef.h`
const KEYSYMS: &[(&str, Keysym)] = &[
    ("space", 0x0020),
    ("apostrophe", 0x0027),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("semicolon", 0x003b),
    ("equal", 0x003d),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("grave", 0x0060),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Page_Up", 0xff55),
    ("Page_Down", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
    ("KP_Enter", 0xff8d),
    ("KP_Home", 0xff95),
    ("KP_Left", 0xff96),
    ("KP_Up", 0xff97),
    ("KP_Right", 0xff98),
    ("KP_Down", 0xff99),
    ("KP_Page_Up", 0xff9a),
    ("KP_Page_Down", 0xff9b),
    ("KP_End", 0xff9c),
    ("KP_Begin", 0xff9d),
    ("Delete", 0xffff),
    ("Num_Lock", 0xff7f),
    ("XF86AudioLowerVolume", 0x1008_ff11),
    ("XF86AudioMute", 0x1008_ff12),
    ("XF86AudioRaiseVolume", 0x1008_ff13),
    ("XF86AudioPlay", 0x1008_ff14),
    ("XF86AudioNext", 0x1008_ff17),
    ("XF86AudioPrev", 0x1008_ff16),
    ("XF86MonBrightnessUp", 0x1008_ff02),
    ("XF86MonBrightnessDown", 0x1008_ff03),
];

pub const XK_NUM_LOCK: Keysym = 0xff7f;

/// Resolve a keysym name.
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    if let Some(&(_, sym)) = KEYSYMS.iter().find(|(n, _)| *n == name) {
        return Some(sym);
    }
    // F1..F35
    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=35).contains(&n) {
            return Some(0xffbe + n - 1);
        }
    }
    // Latin-1 printable characters map to themselves
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_graphic() => Some(c.to_ascii_lowercase() as Keysym),
        _ => None,
    }
}

fn parse_modifiers<'a>(parts: impl Iterator<Item = &'a str>) -> Option<u16> {
    let mut mask = 0;
    for part in parts {
        let &(_, bit) = MODIFIERS.iter().find(|(n, _)| *n == part)?;
        mask |= bit;
    }
    Some(mask)
}

/// Parse `"Mod4+Shift+Return"` into modifiers and keysym.
pub fn parse_key_chord(chord: &str) -> Option<(u16, Keysym)> {
    let mut parts: Vec<&str> = chord.split('+').map(str::trim).collect();
    let key = parts.pop().filter(|k| !k.is_empty())?;
    Some((parse_modifiers(parts.into_iter())?, keysym_from_name(key)?))
}

/// Parse `"Mod4+Button1"` into modifiers and button number.
pub fn parse_button_chord(chord: &str) -> Option<(u16, u8)> {
    let mut parts: Vec<&str> = chord.split('+').map(str::trim).collect();
    let button = parts
        .pop()?
        .strip_prefix("Button")?
        .parse::<u8>()
        .ok()
        .filter(|b| (1..=5).contains(b))?;
    Some((parse_modifiers(parts.into_iter())?, button))
}

/// Strip NumLock and CapsLock, keep the real modifiers.
pub fn clean_mask(mask: u16, numlock: u16) -> u16 {
    mask & !(numlock | LOCK) & (SHIFT | CONTROL | MOD1 | MOD2 | MOD3 | MOD4 | MOD5)
}

/// A key binding ready for matching
#[derive(Debug, Clone)]
pub struct KeyBind {
    pub modifiers: u16,
    pub keysym: Keysym,
    pub action: Action,
}

/// A mouse binding ready for matching
#[derive(Debug, Clone)]
pub struct ButtonBind {
    pub click: ClickTarget,
    pub modifiers: u16,
    pub button: u8,
    pub action: Action,
}

/// Resolved key and button tables
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub keys: Vec<KeyBind>,
    pub buttons: Vec<ButtonBind>,
}

impl Bindings {
    /// Resolve configured chords, dropping (and reporting) the unknown ones.
    pub fn new(keys: &[KeyBinding], buttons: &[ButtonBinding]) -> Self {
        let keys = keys
            .iter()
            .filter_map(|k| match parse_key_chord(&k.key) {
                Some((modifiers, keysym)) => Some(KeyBind {
                    modifiers,
                    keysym,
                    action: k.action.clone(),
                }),
                None => {
                    warn!("Ignoring unknown key chord {:?}", k.key);
                    None
                }
            })
            .collect();
        let buttons = buttons
            .iter()
            .filter_map(|b| match parse_button_chord(&b.button) {
                Some((modifiers, button)) => Some(ButtonBind {
                    click: b.click,
                    modifiers,
                    button,
                    action: b.action.clone(),
                }),
                None => {
                    warn!("Ignoring unknown button chord {:?}", b.button);
                    None
                }
            })
            .collect();
        Self { keys, buttons }
    }

    /// Actions bound to `keysym` with `state`, in configuration order.
    pub fn key_actions(&self, keysym: Keysym, state: u16, numlock: u16) -> Vec<Action> {
        self.keys
            .iter()
            .filter(|k| {
                k.keysym == keysym
                    && clean_mask(k.modifiers, numlock) == clean_mask(state, numlock)
            })
            .map(|k| k.action.clone())
            .collect()
    }

    pub fn button_actions(
        &self,
        click: ClickTarget,
        button: u8,
        state: u16,
        numlock: u16,
    ) -> Vec<Action> {
        self.buttons
            .iter()
            .filter(|b| {
                b.click == click
                    && b.button == button
                    && clean_mask(b.modifiers, numlock) == clean_mask(state, numlock)
            })
            .map(|b| b.action.clone())
            .collect()
    }
}

impl<X: XConn> WindowManager<X> {
    fn modifier_variants(&self) -> [u16; 4] {
        [0, LOCK, self.numlock, self.numlock | LOCK]
    }

    pub(crate) fn update_numlock_mask(&mut self) -> Result<()> {
        self.numlock = self.conn.numlock_mask()?;
        Ok(())
    }

    pub(crate) fn grab_keys(&mut self) -> Result<()> {
        self.update_numlock_mask()?;
        self.conn.ungrab_keys()?;
        for key in &self.bindings.keys {
            for extra in self.modifier_variants() {
                self.conn.grab_key(key.keysym, key.modifiers | extra)?;
            }
        }
        debug!("Grabbed {} key bindings", self.bindings.keys.len());
        Ok(())
    }

    /// Unfocused clients get every button grabbed so a click focuses them.
    pub(crate) fn grab_buttons(&mut self, id: ClientId, focused: bool) -> Result<()> {
        self.update_numlock_mask()?;
        let win = self.state[id].win;
        self.conn.ungrab_buttons(win)?;
        if !focused {
            self.conn.grab_any_button(win)?;
        }
        for button in self
            .bindings
            .buttons
            .iter()
            .filter(|b| b.click == ClickTarget::ClientWin)
        {
            for extra in self.modifier_variants() {
                self.conn
                    .grab_button(win, button.button, button.modifiers | extra)?;
            }
        }
        Ok(())
    }

    pub(crate) fn key_press(&mut self, keycode: u8, state: u16) -> Result<()> {
        let keysym = self.conn.keycode_to_keysym(keycode)?;
        for action in self.bindings.key_actions(keysym, state, self.numlock) {
            debug!("Key {:#x} state {:#x}: {:?}", keysym, state, action);
            self.execute(&action)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::commands::StackPos;

    #[test]
    fn test_parse_key_chord() {
        assert_eq!(parse_key_chord("Mod4+Shift+Return"), Some((MOD4 | SHIFT, 0xff0d)));
        assert_eq!(parse_key_chord("Mod4+j"), Some((MOD4, 'j' as u32)));
        assert_eq!(parse_key_chord("Mod1+Tab"), Some((MOD1, 0xff09)));
        assert_eq!(parse_key_chord("Mod4+KP_Begin"), Some((MOD4, 0xff9d)));
        assert_eq!(parse_key_chord("Mod4+F5"), Some((MOD4, 0xffc2)));
        assert_eq!(parse_key_chord("Mod4+0"), Some((MOD4, '0' as u32)));
        assert_eq!(parse_key_chord("x"), Some((0, 'x' as u32)));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(parse_key_chord("Hyper+x"), None);
        assert_eq!(parse_key_chord("Mod4+NoSuchKey"), None);
        assert_eq!(parse_key_chord("Mod4+"), None);
        assert_eq!(parse_button_chord("Mod4+Button9"), None);
        assert_eq!(parse_button_chord("Mod4+Left"), None);
    }

    #[test]
    fn test_parse_button_chord() {
        assert_eq!(parse_button_chord("Button1"), Some((0, 1)));
        assert_eq!(parse_button_chord("Mod4+Button3"), Some((MOD4, 3)));
    }

    #[test]
    fn test_clean_mask_strips_locks() {
        let numlock = MOD2;
        assert_eq!(clean_mask(MOD4 | LOCK | MOD2, numlock), MOD4);
        // button state bits are dropped
        assert_eq!(clean_mask(MOD4 | (1 << 8), numlock), MOD4);
    }

    #[test]
    fn test_key_actions_ignore_numlock() {
        let bindings = Bindings::new(
            &[KeyBinding {
                key: "Mod4+j".into(),
                action: Action::FocusStack(StackPos::Inc(1)),
            }],
            &[],
        );
        let hits = bindings.key_actions('j' as u32, MOD4 | MOD2, MOD2);
        assert_eq!(hits.len(), 1);
        assert!(bindings.key_actions('j' as u32, MOD4 | SHIFT, MOD2).is_empty());
    }

    #[test]
    fn test_default_bindings_all_resolve() {
        let config = crate::config::Config::default();
        let bindings = Bindings::new(&config.keys, &config.buttons);
        assert_eq!(bindings.keys.len(), config.keys.len());
        assert_eq!(bindings.buttons.len(), config.buttons.len());
    }
}
