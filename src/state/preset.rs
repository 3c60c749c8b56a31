//! Effect chain presets
//!
//! A preset is a named, serializable snapshot of a track's effect chain
//! composition (not its audio) — useful for quickly recomposing a chain
//! without touching the loop buffer itself.

use serde::{Deserialize, Serialize};

use crate::audio::effects::EffectDescriptor;

/// A named ordered list of effect descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPreset {
    /// Display name.
    pub name: String,
    /// Effects in chain order.
    pub chain: Vec<EffectDescriptor>,
}

impl EffectPreset {
    /// Build an empty, named preset.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }
}

/// In-memory catalog of presets for the current session. Not persisted
/// across sessions (spec §1 non-goal: no cross-session persistence).
#[derive(Debug, Default, Clone)]
pub struct PresetLibrary {
    presets: Vec<EffectPreset>,
}

impl PresetLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a preset by name.
    pub fn upsert(&mut self, preset: EffectPreset) {
        if let Some(existing) = self.presets.iter_mut().find(|p| p.name == preset.name) {
            *existing = preset;
        } else {
            self.presets.push(preset);
        }
    }

    /// Look up a preset by name.
    pub fn get(&self, name: &str) -> Option<&EffectPreset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// All preset names, in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_by_name() {
        let mut lib = PresetLibrary::new();
        lib.upsert(EffectPreset::empty("clean"));
        assert_eq!(lib.names(), vec!["clean"]);

        let mut replacement = EffectPreset::empty("clean");
        replacement.chain.push(EffectDescriptor::low_pass(1, 2000.0));
        lib.upsert(replacement);

        assert_eq!(lib.presets.len(), 1);
        assert_eq!(lib.get("clean").unwrap().chain.len(), 1);
    }
}
