//! Configuration system for tagwm
//!
//! Loads configuration from TOML file at `~/.config/tagwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::bar::{BarAlign, BarModuleKind, BarRule, ClickTarget, MonitorSelector};
use crate::wm::commands::{Action, PlaceMode, StackPos};
use crate::wm::errors::WmError;
use crate::wm::gaps::Gaps;
use crate::wm::keyboard::{parse_button_chord, parse_key_chord};
use crate::wm::layout::LayoutKind;
use crate::wm::rules::Rule;
use crate::wm::screen::MonitorRule;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tag names, one per tag
    pub tags: Vec<String>,
    /// Available layouts; the first is the default, the third the alternate
    pub layouts: Vec<LayoutKind>,
    pub appearance: AppearanceConfig,
    pub behavior: BehaviorConfig,
    pub status: StatusConfig,
    pub scratchpads: Vec<ScratchpadConfig>,
    pub rules: Vec<Rule>,
    pub monitor_rules: Vec<MonitorRule>,
    pub bar_rules: Vec<BarRule>,
    pub keys: Vec<KeyBinding>,
    pub buttons: Vec<ButtonBinding>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tags: ["一", "二", "三", "四", "五", "六", "七", "八", "九"]
                .into_iter()
                .map(String::from)
                .collect(),
            layouts: LayoutKind::ALL.to_vec(),
            appearance: AppearanceConfig::default(),
            behavior: BehaviorConfig::default(),
            status: StatusConfig::default(),
            scratchpads: vec![ScratchpadConfig {
                name: "kitty-sp".to_string(),
                command: vec!["kitty".into(), "--class".into(), "kitty-sp".into()],
            }],
            rules: default_rules(),
            monitor_rules: vec![
                MonitorRule {
                    monitor: 1,
                    layout: 2,
                    tagset: 1 << 5,
                    ..MonitorRule::default()
                },
                MonitorRule {
                    monitor: 2,
                    layout: 0,
                    tagset: 1 << 4,
                    ..MonitorRule::default()
                },
                MonitorRule::default(),
            ],
            bar_rules: vec![
                BarRule::new(MonitorSelector::All, 0, BarAlign::Left, BarModuleKind::Tags),
                BarRule::new(MonitorSelector::All, 0, BarAlign::Left, BarModuleKind::Layout),
                BarRule::new(MonitorSelector::All, 0, BarAlign::Right, BarModuleKind::Status),
                BarRule::new(MonitorSelector::All, 0, BarAlign::None, BarModuleKind::WinTitle),
            ],
            keys: default_keys(),
            buttons: default_buttons(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {:?}", config_path))?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse and validate a configuration document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("tagwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = Self::default();
        let toml_string =
            toml::to_string_pretty(&default_config).context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), WmError> {
        let invalid = |msg: String| Err(WmError::InvalidConfig(msg));

        if self.tags.is_empty() {
            return invalid("at least one tag is required".into());
        }
        if self.tags.len() + self.scratchpads.len() > 31 {
            return invalid(format!(
                "{} tags and {} scratchpads exceed the 31 available tag bits",
                self.tags.len(),
                self.scratchpads.len()
            ));
        }
        if self.layouts.is_empty() {
            return invalid("at least one layout is required".into());
        }
        if !(0.05..=0.95).contains(&self.behavior.mfact) {
            return invalid(format!("mfact {} outside [0.05, 0.95]", self.behavior.mfact));
        }
        for rule in &self.monitor_rules {
            if rule.layout >= self.layouts.len() {
                return invalid(format!("monitor rule refers to layout {}", rule.layout));
            }
            if let Some(mfact) = rule.mfact {
                if !(0.05..=0.95).contains(&mfact) {
                    return invalid(format!("monitor rule mfact {} outside [0.05, 0.95]", mfact));
                }
            }
        }
        for rule in &self.rules {
            if let Some(sp) = rule.scratchpad {
                if sp >= self.scratchpads.len() {
                    return invalid(format!("rule refers to scratchpad {}", sp));
                }
            }
        }
        for key in &self.keys {
            if parse_key_chord(&key.key).is_none() {
                return invalid(format!("unknown key chord {:?}", key.key));
            }
            if let Action::ToggleScratch(sp) = key.action {
                if sp >= self.scratchpads.len() {
                    return invalid(format!("key {:?} refers to scratchpad {}", key.key, sp));
                }
            }
        }
        for button in &self.buttons {
            if parse_button_chord(&button.button).is_none() {
                return invalid(format!("unknown button chord {:?}", button.button));
            }
        }
        Ok(())
    }

    pub fn ntags(&self) -> usize {
        self.tags.len()
    }

    /// Mask of all regular tags and scratchpad tags.
    pub fn tagmask(&self) -> u32 {
        (1u32 << (self.tags.len() + self.scratchpads.len())) - 1
    }

    /// Tag bit of scratchpad `i`.
    pub fn sptag(&self, i: usize) -> u32 {
        (1u32 << self.tags.len()) << i
    }

    /// Mask of all scratchpad tags.
    pub fn sptagmask(&self) -> u32 {
        ((1u32 << self.scratchpads.len()) - 1) << self.tags.len()
    }
}

/// Appearance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Border width of windows in pixels
    pub border_px: i32,
    /// Snap distance in pixels for mouse moves and resizes
    pub snap: i32,
    pub show_bar: bool,
    /// Bar on top (true) or bottom (false)
    pub top_bar: bool,
    /// Horizontal padding added to bar text
    pub horiz_pad_bar: i32,
    /// Vertical padding added to the font height
    pub vert_pad_bar: i32,
    /// Core X font name
    pub font: String,
    /// Gap size multiplier with a single tiled window, 0 removes outer gaps
    pub smartgaps: i32,
    /// Float placement grid columns
    pub floatpos_grid_x: i32,
    /// Float placement grid rows
    pub floatpos_grid_y: i32,
    pub gaps: Gaps,
    pub colors: ColorsConfig,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            border_px: 2,
            snap: 32,
            show_bar: true,
            top_bar: true,
            horiz_pad_bar: 2,
            vert_pad_bar: 10,
            font: "fixed".to_string(),
            smartgaps: 3,
            floatpos_grid_x: 5,
            floatpos_grid_y: 5,
            gaps: Gaps::new(20, 20, 10, 30),
            colors: ColorsConfig::default(),
        }
    }
}

/// Foreground, background and border color of a scheme (hex: #RRGGBB)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub fg: String,
    pub bg: String,
    pub border: String,
}

impl ColorScheme {
    fn new(fg: &str, bg: &str, border: &str) -> Self {
        Self {
            fg: fg.to_string(),
            bg: bg.to_string(),
            border: border.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub norm: ColorScheme,
    pub sel: ColorScheme,
    pub urg: ColorScheme,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        let norm = ColorScheme::new("#222222", "#444444", "#eeeeee");
        Self {
            urg: norm.clone(),
            norm,
            sel: ColorScheme::new("#444444", "#bbbbbb", "#bbbbbb"),
        }
    }
}

/// Window behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Factor of master area size [0.05..0.95]
    pub mfact: f64,
    /// Number of clients in master area
    pub nmaster: usize,
    /// Respect size hints in tiled resizals
    pub resize_hints: bool,
    /// Force focus on the fullscreen window
    pub lock_fullscreen: bool,
    /// Respect Motif decoration hints
    pub decor_hints: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            mfact: 0.55,
            nmaster: 1,
            resize_hints: false,
            lock_fullscreen: true,
            decor_hints: true,
        }
    }
}

/// Status text configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Splits root WM_NAME into the main and the extra status text
    pub separator: char,
    /// Process signalled on status clicks
    pub process: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            separator: ';',
            process: "dwmblocks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchpadConfig {
    /// Instance name the scratchpad window is matched by
    pub name: String,
    pub command: Vec<String>,
}

/// Keyboard shortcut: `"Mod4+Shift+Return"`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: String,
    pub action: Action,
}

/// Mouse binding: `"Mod4+Button1"` on a click target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub click: ClickTarget,
    pub button: String,
    pub action: Action,
}

const WTYPE: &str = "_NET_WM_WINDOW_TYPE_";

fn default_rules() -> Vec<Rule> {
    let float_type = |t: &str| Rule {
        window_type: Some(format!("{WTYPE}{t}")),
        floating: true,
        ..Rule::default()
    };
    vec![
        Rule {
            instance: Some("kitty-sp".into()),
            scratchpad: Some(0),
            floating: true,
            match_once: true,
            floatpos: Some("50% 50% 90% 80%".into()),
            ..Rule::default()
        },
        float_type("DIALOG"),
        float_type("UTILITY"),
        float_type("TOOLBAR"),
        float_type("SPLASH"),
        Rule {
            class: Some("feh".into()),
            ..Rule::default()
        },
        Rule {
            title: Some("Discord Updater".into()),
            tags: 1 << 4,
            floating: true,
            match_once: true,
            floatpos: Some("50% 50%".into()),
            ..Rule::default()
        },
        Rule {
            class: Some("discord".into()),
            tags: 1 << 4,
            ..Rule::default()
        },
        Rule {
            class: Some("lutris".into()),
            floating: true,
            ..Rule::default()
        },
    ]
}

fn key(chord: &str, action: Action) -> KeyBinding {
    KeyBinding {
        key: chord.to_string(),
        action,
    }
}

fn default_keys() -> Vec<KeyBinding> {
    let mut keys = vec![
        key("Mod4+b", Action::ToggleBar),
        key("Mod4+Shift+Return", Action::Spawn(vec!["kitty".into()])),
    ];

    for (modifiers, push) in [("Mod4", false), ("Mod4+Shift", true)] {
        for (name, pos) in [
            ("j", StackPos::Inc(1)),
            ("k", StackPos::Inc(-1)),
            ("Tab", StackPos::PrevSel),
            ("a", StackPos::Index(0)),
            ("s", StackPos::Index(1)),
            ("d", StackPos::Index(2)),
            ("g", StackPos::Index(-1)),
        ] {
            let action = if push {
                Action::PushStack(pos)
            } else {
                Action::FocusStack(pos)
            };
            keys.push(key(&format!("{modifiers}+{name}"), action));
        }
    }

    keys.extend([
        key("Mod4+i", Action::IncNMaster(1)),
        key("Mod4+u", Action::IncNMaster(-1)),
        key("Mod4+h", Action::SetMFact(-0.05)),
        key("Mod4+l", Action::SetMFact(0.05)),
        key("Mod4+Return", Action::Zoom),
        key("Mod1+Tab", Action::View(0)),
        key("Mod4+c", Action::KillClient),
        key(
            "Mod4+Shift+c",
            Action::Spawn(vec![
                "/bin/sh".into(),
                "-c".into(),
                "xdotool getwindowfocus windowkill".into(),
            ]),
        ),
        key("Mod4+t", Action::SetLayout(LayoutKind::Tile)),
        key("Mod4+Shift+f", Action::SetLayout(LayoutKind::Floating)),
        key("Mod4+m", Action::SetLayout(LayoutKind::Monocle)),
        key("Mod4+semicolon", Action::SetLayout(LayoutKind::Deck)),
        key("Mod4+space", Action::ToggleLayout),
        key("Mod4+Shift+space", Action::ToggleFloating),
        key("Mod4+f", Action::ToggleFullscreen),
        key("Mod4+backslash", Action::ToggleScratch(0)),
        key("Mod4+0", Action::View(u32::MAX)),
        key("Mod4+Shift+0", Action::Tag(u32::MAX)),
        key("Mod4+comma", Action::FocusMon(-1)),
        key("Mod4+period", Action::FocusMon(1)),
        key("Mod4+Shift+comma", Action::TagMon(-1)),
        key("Mod4+Shift+period", Action::TagMon(1)),
    ]);

    for i in 0..9u32 {
        let k = (i + 1).to_string();
        let tag = 1 << i;
        keys.extend([
            key(&format!("Mod4+{k}"), Action::View(tag)),
            key(&format!("Mod4+Control+{k}"), Action::ToggleView(tag)),
            key(&format!("Mod4+Shift+{k}"), Action::Tag(tag)),
            key(&format!("Mod4+Control+Shift+{k}"), Action::ToggleTag(tag)),
            key(&format!("Mod4+Mod1+{k}"), Action::FocusOrView(tag)),
        ]);
    }

    keys.push(key("Mod4+Shift+q", Action::Quit));

    for (name, delta) in [
        ("KP_Home", "-26a -26a"),
        ("KP_Up", "0a -26a"),
        ("KP_Page_Up", "26a -26a"),
        ("KP_Left", "-26a 0a"),
        ("KP_Right", "26a 0a"),
        ("KP_End", "-26a 26a"),
        ("KP_Down", "0a 26a"),
        ("KP_Page_Down", "26a 26a"),
    ] {
        keys.push(key(&format!("Mod4+{name}"), Action::FloatPos(delta.into())));
    }
    for (name, delta) in [
        ("KP_Home", "-26w -26h"),
        ("KP_Up", "0w -26h"),
        ("KP_Page_Up", "26w -26h"),
        ("KP_Left", "-26w 0h"),
        ("KP_Begin", "50% 50% 90% 80%"),
        ("KP_Right", "26w 0h"),
        ("KP_End", "-26w 26h"),
        ("KP_Down", "0w 26h"),
        ("KP_Page_Down", "26w 26h"),
    ] {
        keys.push(key(&format!("Mod4+Shift+{name}"), Action::FloatPos(delta.into())));
    }

    keys
}

fn button(click: ClickTarget, chord: &str, action: Action) -> ButtonBinding {
    ButtonBinding {
        click,
        button: chord.to_string(),
        action,
    }
}

fn default_buttons() -> Vec<ButtonBinding> {
    let mut buttons = vec![
        button(ClickTarget::LtSymbol, "Button1", Action::ToggleLayout),
        button(ClickTarget::LtSymbol, "Button3", Action::SetLayout(LayoutKind::Monocle)),
        button(ClickTarget::WinTitle, "Button2", Action::Zoom),
    ];
    for b in 1..=5 {
        buttons.push(button(
            ClickTarget::StatusText,
            &format!("Button{b}"),
            Action::SignalStatus(b),
        ));
    }
    buttons.extend([
        button(
            ClickTarget::ClientWin,
            "Mod4+Button1",
            Action::MoveOrPlace(PlaceMode::Warp),
        ),
        button(ClickTarget::ClientWin, "Mod4+Button2", Action::ToggleFloating),
        button(ClickTarget::ClientWin, "Mod4+Button3", Action::ResizeMouse),
        button(ClickTarget::TagBar, "Button1", Action::View(0)),
        button(ClickTarget::TagBar, "Button3", Action::ToggleView(0)),
        button(ClickTarget::TagBar, "Mod4+Button1", Action::Tag(0)),
        button(ClickTarget::TagBar, "Mod4+Button3", Action::ToggleTag(0)),
    ]);
    buttons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.ntags(), 9);
        assert_eq!(config.layouts.len(), 14);
        assert_eq!(config.behavior.mfact, 0.55);
    }

    #[test]
    fn test_tag_masks() {
        let config = Config::default();
        assert_eq!(config.tagmask(), (1 << 10) - 1);
        assert_eq!(config.sptag(0), 1 << 9);
        assert_eq!(config.sptagmask(), 1 << 9);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.tags, Config::default().tags);
        assert_eq!(parsed.keys.len(), Config::default().keys.len());
        assert_eq!(parsed.rules.len(), 9);
        assert_eq!(parsed.status.separator, ';');
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            tags = ["web", "code"]

            [behavior]
            mfact = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(config.tags.len(), 2);
        assert_eq!(config.behavior.mfact, 0.6);
        assert_eq!(config.behavior.nmaster, 1);
        assert_eq!(config.appearance.border_px, 2);
    }

    #[test]
    fn test_too_many_tags_rejected() {
        let mut config = Config::default();
        config.tags = (0..31).map(|i| i.to_string()).collect();
        assert!(matches!(config.validate(), Err(WmError::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_mfact_rejected() {
        let err = Config::from_toml("[behavior]\nmfact = 0.99\n").unwrap_err();
        assert!(format!("{:#}", err).contains("mfact"));
    }

    #[test]
    fn test_bad_key_chord_rejected() {
        let err = Config::from_toml(
            r#"
            [[keys]]
            key = "Hyper+x"
            action = "zoom"
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Hyper+x"));
    }

    #[test]
    fn test_actions_parse_from_toml() {
        let config = Config::from_toml(
            r#"
            [[keys]]
            key = "Mod4+j"
            action = { focus_stack = { inc = 1 } }

            [[keys]]
            key = "Mod4+Tab"
            action = { focus_stack = "prev_sel" }

            [[keys]]
            key = "Mod4+p"
            action = { spawn = ["dmenu_run"] }
            "#,
        )
        .unwrap();
        assert!(matches!(config.keys[0].action, Action::FocusStack(StackPos::Inc(1))));
        assert!(matches!(config.keys[1].action, Action::FocusStack(StackPos::PrevSel)));
        assert!(matches!(&config.keys[2].action, Action::Spawn(cmd) if cmd == &["dmenu_run"]));
    }
}
