//! Window rules
//!
//! Rules are matched against a new window's class, instance, title and
//! window type. Every matching rule contributes; see [`Rule::matches`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::client_flags::ClientFlags;
use crate::wm::xconn::XConn;

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Substring of WM_CLASS class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Substring of WM_CLASS instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Substring of the title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Exact _NET_WM_WINDOW_TYPE atom name
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub window_type: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub tags: u32,
    /// Scratchpad index; adds that scratchpad's tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratchpad: Option<usize>,
    #[serde(skip_serializing_if = "is_false")]
    pub terminal: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub no_swallow: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub floating: bool,
    /// Stop scanning after this rule matches
    #[serde(skip_serializing_if = "is_false")]
    pub match_once: bool,
    /// Monitor index overriding the tag-based choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<usize>,
    /// Placement descriptor applied to floating clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floatpos: Option<String>,
}

/// Window properties rules are matched against
#[derive(Debug, Clone, Copy)]
pub struct RuleTarget<'a> {
    pub class: &'a str,
    pub instance: &'a str,
    pub title: &'a str,
    pub window_type: Option<&'a str>,
}

impl Rule {
    pub fn matches(&self, target: &RuleTarget) -> bool {
        let contains = |pattern: &Option<String>, value: &str| {
            pattern.as_deref().is_none_or(|p| value.contains(p))
        };
        contains(&self.title, target.title)
            && contains(&self.class, target.class)
            && contains(&self.instance, target.instance)
            && self
                .window_type
                .as_deref()
                .is_none_or(|t| target.window_type == Some(t))
    }

    /// Tags contributed by this rule, scratchpad bit included.
    pub fn tag_bits(&self, sptag: impl Fn(usize) -> u32) -> u32 {
        self.tags | self.scratchpad.map_or(0, sptag)
    }
}

/// Clamp accumulated rule tags; a client always ends up with some tag.
pub fn finalize_tags(tags: u32, tagmask: u32, mon_tagset: u32, sptagmask: u32) -> u32 {
    if tags & tagmask != 0 {
        tags & tagmask
    } else if mon_tagset & !sptagmask != 0 {
        mon_tagset & !sptagmask
    } else {
        1
    }
}

impl<X: XConn> WindowManager<X> {
    /// Apply the configured rules to a freshly read client.
    pub(crate) fn apply_rules(&mut self, id: ClientId) -> Result<()> {
        let window_type = self.conn.window_type(self.state[id].win)?;
        let c = &mut self.state[id];
        c.flags.remove(ClientFlags::FLOATING);
        c.tags = 0;

        let rules = self.config.rules.clone();
        for rule in &rules {
            let c = &self.state[id];
            let target = RuleTarget {
                class: &c.class,
                instance: &c.instance,
                title: &c.name,
                window_type: window_type.as_deref(),
            };
            if !rule.matches(&target) {
                continue;
            }
            debug!("Rule {:?} matches window {:#x}", rule, c.win);

            let bits = rule.tag_bits(|i| self.config.sptag(i));
            let c = &mut self.state[id];
            c.flags.set(ClientFlags::TERMINAL, rule.terminal);
            c.flags.set(ClientFlags::NO_SWALLOW, rule.no_swallow);
            c.flags.set(ClientFlags::FLOATING, rule.floating);
            c.tags |= bits;
            let tags = c.tags;

            let mon = match rule.monitor {
                Some(m) if m < self.state.monitors.len() => Some(m),
                _ => self
                    .state
                    .monitors
                    .iter()
                    .position(|m| m.tagset() & tags != 0),
            };
            if let Some(m) = mon {
                self.state[id].mon = m;
            }

            if rule.floating {
                if bits & self.config.sptagmask() != 0 {
                    self.center(id);
                }
                if let Some(pos) = &rule.floatpos {
                    self.set_float_pos(id, pos)?;
                }
            }
            if rule.match_once {
                break;
            }
        }

        let tagset = self.state.monitors[self.state[id].mon].tagset();
        let c = &mut self.state[id];
        c.tags = finalize_tags(
            c.tags,
            self.config.tagmask(),
            tagset,
            self.config.sptagmask(),
        );
        Ok(())
    }

    /// Center a client on its monitor's work area.
    pub(crate) fn center(&mut self, id: ClientId) {
        let wa: Geometry = self.state.monitors[self.state[id].mon].work_area;
        let c = &mut self.state[id];
        c.geometry.x = wa.x + (wa.width - c.width()) / 2;
        c.geometry.y = wa.y + (wa.height - c.height()) / 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::mock::{MockConn, test_wm_with};
    use crate::wm::xconn::Window;

    fn rule(class: &str) -> Rule {
        Rule {
            class: Some(class.into()),
            ..Rule::default()
        }
    }

    fn wm_with_rules(conn: MockConn, rules: Vec<Rule>) -> WindowManager<MockConn> {
        test_wm_with(conn, |config| config.rules = rules)
    }

    fn map_with_class(wm: &mut WindowManager<MockConn>, win: Window, class: &str) -> ClientId {
        wm.conn.set_class(win, class, &class.to_lowercase());
        wm.map_new_window(win)
    }

    fn target<'a>(class: &'a str, instance: &'a str, title: &'a str) -> RuleTarget<'a> {
        RuleTarget {
            class,
            instance,
            title,
            window_type: None,
        }
    }

    #[test]
    fn test_substring_match() {
        let rule = Rule {
            class: Some("fire".into()),
            ..Rule::default()
        };
        assert!(rule.matches(&target("Firefox firefox", "navigator", "x")));
        assert!(!rule.matches(&target("Firefox", "navigator", "x")));
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        assert!(Rule::default().matches(&target("a", "b", "c")));
    }

    #[test]
    fn test_window_type_is_exact() {
        let rule = Rule {
            window_type: Some("_NET_WM_WINDOW_TYPE_DIALOG".into()),
            ..Rule::default()
        };
        let mut t = target("a", "b", "c");
        assert!(!rule.matches(&t));
        t.window_type = Some("_NET_WM_WINDOW_TYPE_DIALOG");
        assert!(rule.matches(&t));
        t.window_type = Some("_NET_WM_WINDOW_TYPE_DIALOG_X");
        assert!(!rule.matches(&t));
    }

    #[test]
    fn test_scratchpad_bit() {
        let rule = Rule {
            tags: 0b10,
            scratchpad: Some(1),
            ..Rule::default()
        };
        // 9 tags: scratchpad 1 is bit 10
        assert_eq!(rule.tag_bits(|i| (1 << 9) << i), 0b10 | (1 << 10));
    }

    #[test]
    fn test_finalize_tags_fallbacks() {
        let tagmask = (1 << 10) - 1;
        let sptagmask = 1 << 9;
        assert_eq!(finalize_tags(1 << 4, tagmask, 1, sptagmask), 1 << 4);
        assert_eq!(finalize_tags(1 << 20, tagmask, 0b110, sptagmask), 0b110);
        assert_eq!(finalize_tags(0, tagmask, 1 << 9, sptagmask), 1);
    }

    #[test]
    fn test_rule_type_field_name() {
        let rule: Rule = toml::from_str("type = \"_NET_WM_WINDOW_TYPE_SPLASH\"\nfloating = true").unwrap();
        assert_eq!(rule.window_type.as_deref(), Some("_NET_WM_WINDOW_TYPE_SPLASH"));
        assert!(rule.floating);
        assert!(!rule.match_once);
    }

    #[test]
    fn test_matching_rules_accumulate_tags() {
        let mut wm = wm_with_rules(
            MockConn::new(),
            vec![
                Rule { tags: 1 << 1, ..rule("Mail") },
                Rule { tags: 1 << 3, ..rule("Mail") },
                Rule { tags: 1 << 6, ..rule("Other") },
            ],
        );
        let id = map_with_class(&mut wm, 0x400001, "Mail");
        assert_eq!(wm.state[id].tags, (1 << 1) | (1 << 3));
    }

    #[test]
    fn test_match_once_stops_scan() {
        let mut wm = wm_with_rules(
            MockConn::new(),
            vec![
                Rule {
                    tags: 1 << 1,
                    match_once: true,
                    ..rule("Mail")
                },
                Rule {
                    tags: 1 << 3,
                    floating: true,
                    ..rule("Mail")
                },
            ],
        );
        let id = map_with_class(&mut wm, 0x400001, "Mail");
        assert_eq!(wm.state[id].tags, 1 << 1);
        assert!(!wm.state[id].is_floating());
    }

    #[test]
    fn test_flags_come_from_last_match() {
        let mut wm = wm_with_rules(
            MockConn::new(),
            vec![
                Rule {
                    floating: true,
                    terminal: true,
                    ..rule("Term")
                },
                Rule {
                    no_swallow: true,
                    ..rule("Term")
                },
            ],
        );
        let id = map_with_class(&mut wm, 0x400001, "Term");
        let flags = wm.state[id].flags;
        assert!(!flags.contains(ClientFlags::FLOATING));
        assert!(!flags.contains(ClientFlags::TERMINAL));
        assert!(flags.contains(ClientFlags::NO_SWALLOW));
        // no tags from any rule: the monitor's view
        assert_eq!(wm.state[id].tags, 1);
    }

    #[test]
    fn test_monitor_rule_moves_client() {
        let conn = MockConn::with_outputs(vec![
            Geometry::new(0, 0, 1920, 1080),
            Geometry::new(1920, 0, 1280, 1024),
        ]);
        let mut wm = wm_with_rules(conn, vec![Rule { monitor: Some(1), ..rule("Mail") }]);
        let id = map_with_class(&mut wm, 0x400001, "Mail");
        assert_eq!(wm.state[id].mon, 1);
        assert!(wm.state.monitors[1].clients.contains(&id));
        assert!(!wm.state.monitors[0].clients.contains(&id));
        assert_eq!(wm.state[id].tags, wm.state.monitors[1].tagset());
        assert!(wm.state[id].geometry.x >= 1920);

        // an out of range monitor falls back to the selected one
        let mut wm = wm_with_rules(MockConn::new(), vec![Rule { monitor: Some(7), ..rule("Mail") }]);
        let id = map_with_class(&mut wm, 0x400001, "Mail");
        assert_eq!(wm.state[id].mon, 0);
    }

    #[test]
    fn test_rule_placement_applied_on_manage() {
        let mut wm = wm_with_rules(
            MockConn::new(),
            vec![Rule {
                floating: true,
                floatpos: Some("100A 200A 400A 300A".into()),
                ..rule("Mixer")
            }],
        );
        let id = map_with_class(&mut wm, 0x400001, "Mixer");
        assert!(wm.state[id].is_floating());
        assert_eq!(wm.state[id].geometry, Geometry::new(100, 200, 400, 300));
        assert_eq!(wm.conn.last_position(0x400001), Some((100, 200)));

        // placement is only used together with floating
        let mut wm = wm_with_rules(
            MockConn::new(),
            vec![Rule {
                floatpos: Some("100A 200A 400A 300A".into()),
                ..rule("Mixer")
            }],
        );
        let id = map_with_class(&mut wm, 0x400001, "Mixer");
        assert!(!wm.state[id].is_floating());
        assert_ne!(wm.state[id].geometry, Geometry::new(100, 200, 400, 300));
    }
}
