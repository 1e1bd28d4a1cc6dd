//! What the console offers: sidebar entries and command palette, both filtered by role.

pub mod menu;
pub mod palette;

pub use menu::{audit, standard_menu, visible_entries, MenuDrift, NavigationEntry};
pub use palette::{CommandPalette, HotkeyBinding, KeyPress, PaletteGroup, PaletteItem};
