//! Quick-jump command palette and its keyboard binding.

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteItem {
    pub label: String,
    pub path: String,
}

impl PaletteItem {
    pub fn new<S: Into<String>>(label: S, path: S) -> Self { Self { label: label.into(), path: path.into() } }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteGroup {
    pub heading: String,
    pub items: Vec<PaletteItem>,
}

impl PaletteGroup {
    pub fn new<S: Into<String>>(heading: S, items: Vec<PaletteItem>) -> Self { Self { heading: heading.into(), items } }
}

/// One key press as the palette sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn new<S: Into<String>>(key: S, ctrl: bool, meta: bool) -> Self { Self { key: key.into(), ctrl, meta } }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyCombo {
    key: String,
    ctrl: bool,
    meta: bool,
}

/// Comma-separated key combos such as `"ctrl+k, cmd+k"`. The last `+` part is the key;
/// `ctrl` and `cmd` are required only when spelled out, other modifiers are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    combos: Vec<KeyCombo>,
}

impl HotkeyBinding {
    pub fn parse(spec: &str) -> AppResult<Self> {
        let mut combos = Vec::new();
        for raw in spec.to_lowercase().split(',') {
            let parts: Vec<&str> = raw.split('+').map(str::trim).collect();
            let key = parts.last().copied().unwrap_or_default();
            if key.is_empty() {
                return Err(AppError::user("bad_hotkey".to_string(), format!("empty key in '{}'", spec)));
            }
            let has_modifier = parts.len() > 1;
            combos.push(KeyCombo {
                key: key.to_string(),
                ctrl: has_modifier && parts.contains(&"ctrl"),
                meta: has_modifier && parts.contains(&"cmd"),
            });
        }
        Ok(Self { combos })
    }

    pub fn matches(&self, press: &KeyPress) -> bool {
        let key = press.key.to_lowercase();
        self.combos
            .iter()
            .any(|c| c.key == key && (!c.ctrl || press.ctrl) && (!c.meta || press.meta))
    }
}

pub struct CommandPalette {
    groups: Vec<PaletteGroup>,
    binding: HotkeyBinding,
    open: bool,
}

impl CommandPalette {
    pub fn new(groups: Vec<PaletteGroup>, binding: HotkeyBinding) -> Self {
        Self { groups, binding, open: false }
    }

    /// Quick-jump items of the maintenance console, toggled with Ctrl+K / Cmd+K.
    pub fn standard() -> AppResult<Self> {
        let groups = vec![
            PaletteGroup::new("Machines", vec![
                PaletteItem::new("CNC Machine #1", "/machines/1"),
                PaletteItem::new("Assembly Line #3", "/machines/2"),
                PaletteItem::new("Packaging Unit #2", "/machines/3"),
            ]),
            PaletteGroup::new("Maintenance Tasks", vec![
                PaletteItem::new("Hydraulic System Maintenance", "/maintenance/tasks"),
                PaletteItem::new("Belt Replacement", "/maintenance/tasks"),
                PaletteItem::new("Calibration", "/maintenance/tasks"),
            ]),
            PaletteGroup::new("Inventory Parts", vec![
                PaletteItem::new("Hydraulic Filter HF-238", "/inventory"),
                PaletteItem::new("Drive Belt B-450", "/inventory"),
                PaletteItem::new("Control Board CB-17X", "/inventory"),
            ]),
        ];
        Ok(Self::new(groups, HotkeyBinding::parse("ctrl+k, cmd+k")?))
    }

    pub fn groups(&self) -> &[PaletteGroup] { &self.groups }

    pub fn is_open(&self) -> bool { self.open }

    pub fn open(&mut self) { self.open = true; }

    pub fn close(&mut self) { self.open = false; }

    /// Toggle on the bound hotkey; returns whether the press was consumed.
    pub fn handle_key(&mut self, press: &KeyPress) -> bool {
        if self.binding.matches(press) {
            self.open = !self.open;
            true
        } else {
            false
        }
    }

    /// Items whose label contains `query` (case-insensitive) and whose path `admits` accepts.
    /// Empty groups are dropped; group and item order is preserved.
    pub fn search<F>(&self, query: &str, admits: F) -> Vec<PaletteGroup>
    where
        F: Fn(&str) -> bool,
    {
        let needle = query.trim().to_lowercase();
        self.groups
            .iter()
            .filter_map(|g| {
                let items: Vec<PaletteItem> = g
                    .items
                    .iter()
                    .filter(|i| needle.is_empty() || i.label.to_lowercase().contains(&needle))
                    .filter(|i| admits(&i.path))
                    .cloned()
                    .collect();
                if items.is_empty() { None } else { Some(PaletteGroup::new(g.heading.clone(), items)) }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotkey_requires_named_modifiers() {
        let b = HotkeyBinding::parse("ctrl+k, cmd+k").unwrap();
        assert!(b.matches(&KeyPress::new("k", true, false)));
        assert!(b.matches(&KeyPress::new("K", false, true)));
        assert!(!b.matches(&KeyPress::new("k", false, false)));
        assert!(!b.matches(&KeyPress::new("j", true, false)));
    }

    #[test]
    fn bare_key_ignores_modifier_state() {
        let b = HotkeyBinding::parse("/").unwrap();
        assert!(b.matches(&KeyPress::new("/", false, false)));
        assert!(b.matches(&KeyPress::new("/", true, true)));
    }

    #[test]
    fn empty_key_rejected() {
        assert!(HotkeyBinding::parse("ctrl+").is_err());
        assert!(HotkeyBinding::parse("ctrl+k,").is_err());
    }

    #[test]
    fn handle_key_toggles() {
        let mut p = CommandPalette::standard().unwrap();
        assert!(!p.is_open());
        assert!(p.handle_key(&KeyPress::new("k", true, false)));
        assert!(p.is_open());
        assert!(!p.handle_key(&KeyPress::new("x", true, false)));
        assert!(p.is_open());
        p.handle_key(&KeyPress::new("k", false, true));
        assert!(!p.is_open());
    }

    #[test]
    fn search_filters_text_and_admission() {
        let p = CommandPalette::standard().unwrap();
        let all = p.search("", |_| true);
        assert_eq!(all.len(), 3);

        let hyd = p.search("HYDRAULIC", |_| true);
        assert_eq!(hyd.iter().map(|g| g.heading.as_str()).collect::<Vec<_>>(), vec!["Maintenance Tasks", "Inventory Parts"]);

        let no_inventory = p.search("", |path| !path.starts_with("/inventory"));
        assert_eq!(no_inventory.len(), 2);
        assert!(p.search("zzz", |_| true).is_empty());
    }
}
