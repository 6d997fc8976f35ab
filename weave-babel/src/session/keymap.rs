//! Keyboard shortcuts of the rich view.
//!
//! Bindings use the editor notation `Mod-Shift-x`, where `Mod` is Cmd on
//! macOS and Ctrl elsewhere. Lookups are normalized, so `Mod-Shift-S`,
//! `shift-mod-s` and `Ctrl-Shift-s` all resolve to the same entry.

use crate::tree::{Mark, MarkKind, TextAlign};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ToggleMark(MarkKind),
    Align(TextAlign),
}

impl KeyAction {
    /// The mark a toggle applies. Links need a target and have no shortcut.
    pub fn mark(self) -> Option<Mark> {
        let KeyAction::ToggleMark(kind) = self else {
            return None;
        };
        Some(match kind {
            MarkKind::Bold => Mark::Bold,
            MarkKind::Italic => Mark::Italic,
            MarkKind::Strike => Mark::Strike,
            MarkKind::Code => Mark::Code,
            MarkKind::Subscript => Mark::Subscript,
            MarkKind::Superscript => Mark::Superscript,
            MarkKind::Highlight => Mark::Highlight,
            MarkKind::Link => return None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: BTreeMap<String, KeyAction>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The editor's default shortcuts.
    pub fn standard() -> Self {
        let mut keymap = Self::new();
        for (binding, action) in [
            ("Mod-b", KeyAction::ToggleMark(MarkKind::Bold)),
            ("Mod-i", KeyAction::ToggleMark(MarkKind::Italic)),
            ("Mod-Shift-s", KeyAction::ToggleMark(MarkKind::Strike)),
            ("Mod-e", KeyAction::ToggleMark(MarkKind::Code)),
            ("Mod-Shift-h", KeyAction::ToggleMark(MarkKind::Highlight)),
            ("Mod-,", KeyAction::ToggleMark(MarkKind::Subscript)),
            ("Mod-.", KeyAction::ToggleMark(MarkKind::Superscript)),
            ("Mod-Shift-l", KeyAction::Align(TextAlign::Left)),
            ("Mod-Shift-e", KeyAction::Align(TextAlign::Center)),
            ("Mod-Shift-r", KeyAction::Align(TextAlign::Right)),
            ("Mod-Shift-j", KeyAction::Align(TextAlign::Justify)),
        ] {
            keymap.bind(binding, action);
        }
        keymap
    }

    /// Adds or replaces a binding. Returns false when the binding cannot be
    /// parsed.
    pub fn bind(&mut self, binding: &str, action: KeyAction) -> bool {
        match normalize_binding(binding) {
            Some(key) => {
                self.bindings.insert(key, action);
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, binding: &str) -> Option<KeyAction> {
        self.bindings.get(&normalize_binding(binding)?).copied()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, KeyAction)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Canonical form `Mod-Alt-Shift-key` with a lowercase key.
fn normalize_binding(binding: &str) -> Option<String> {
    let parts: Vec<&str> = binding.split('-').collect();
    let (modifiers, key) = match parts.as_slice() {
        // "Mod--" binds the minus key
        [rest @ .., "", ""] if !rest.is_empty() => (rest, "-"),
        [rest @ .., key] if !key.is_empty() => (rest, *key),
        _ => return None,
    };

    let (mut command, mut alt, mut shift) = (false, false, false);
    for modifier in modifiers {
        match modifier.to_ascii_lowercase().as_str() {
            "mod" | "cmd" | "ctrl" | "control" | "meta" => command = true,
            "alt" | "option" => alt = true,
            "shift" => shift = true,
            _ => return None,
        }
    }

    let mut out = String::new();
    if command {
        out.push_str("Mod-");
    }
    if alt {
        out.push_str("Alt-");
    }
    if shift {
        out.push_str("Shift-");
    }
    out.push_str(&key.to_lowercase());
    Some(out)
}
