// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Named keyboard layouts: the built-ins plus the user's own
//!
//! User layouts are stored as `name -> {physical: substituted}` forward
//! maps. Conflicts are never stored; they are recomputed whenever a
//! layout is turned into a `Translation`.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::ConfigError;
use crate::core::layouts::{built_in_layout, built_in_layouts, is_built_in_layout};
use crate::core::{Label, Translation};

/// Forward map of a user layout, physical label to substituted label
pub type LayoutMap = IndexMap<Label, Label>;

/// How imported user layouts combine with the current ones
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutMerge {
    /// Ignore imported layouts
    #[default]
    Keep,
    /// Replace all user layouts with the imported ones
    Overwrite,
    /// Imported layouts win over current ones with the same name
    Update,
    /// Current layouts win over imported ones with the same name
    InverseUpdate,
}

/// The built-in layouts plus the user's named layouts
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutCatalog {
    custom: BTreeMap<String, LayoutMap>,
    locked: bool,
}

/// Keeps string-to-string entries of a JSON object, dropping the rest
fn layout_map_from_value(name: &str, value: &Value) -> Option<LayoutMap> {
    let Value::Object(entries) = value else {
        warn!("Dropping user layout '{}': not an object", name);
        return None;
    };

    let mut map = LayoutMap::new();
    for (physical, substituted) in entries {
        match substituted {
            Value::String(s) => {
                map.insert(physical.clone(), s.clone());
            }
            other => warn!(
                "Dropping key '{}' of layout '{}': {} is not a string",
                physical, name, other
            ),
        }
    }
    Some(map)
}

impl LayoutCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads user layouts from `{name: {physical: substituted}}` JSON
    ///
    /// Built-in names and malformed entries are dropped. Malformed
    /// documents yield an empty catalogue.
    pub fn from_json_or_default(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::new();
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!("Ignoring malformed user layouts: {}", e);
                Self::new()
            }
        }
    }

    pub(crate) fn from_value(value: &Value) -> Self {
        let Value::Object(layouts) = value else {
            warn!("Ignoring user layouts: expected an object of layouts");
            return Self::new();
        };

        let custom = layouts
            .iter()
            .filter(|(name, _)| !is_built_in_layout(name))
            .filter_map(|(name, layout)| {
                layout_map_from_value(name, layout).map(|map| (name.clone(), map))
            })
            .collect();

        Self {
            custom,
            locked: false,
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.custom)?)
    }

    /// User layouts as stored, by name.
    pub fn custom_layouts(&self) -> &BTreeMap<String, LayoutMap> {
        &self.custom
    }

    /// Locks every user layout against edits (while emulation is active).
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// All layout names, built-ins first, then user layouts.
    pub fn names(&self) -> Vec<String> {
        built_in_layouts()
            .iter()
            .map(|layout| layout.name.to_string())
            .chain(self.custom.keys().cloned())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        is_built_in_layout(name) || self.custom.contains_key(name)
    }

    /// Looks up a layout by name and builds its translation.
    pub fn translation(&self, name: &str) -> Option<Translation> {
        if let Some(layout) = built_in_layout(name) {
            return Some(layout.translation.clone());
        }
        self.custom
            .get(name)
            .map(|forward| Translation::from_forward(forward.clone()))
    }

    fn check_editable(&self, name: &str) -> Result<(), ConfigError> {
        if is_built_in_layout(name) {
            return Err(ConfigError::BuiltInLayout(name.to_string()));
        }
        if self.locked {
            return Err(ConfigError::LayoutLocked(name.to_string()));
        }
        Ok(())
    }

    /// Adds a new user layout.
    pub fn add(&mut self, name: &str, forward: LayoutMap) -> Result<(), ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidLayoutName(name.to_string()));
        }
        self.check_editable(name)?;
        if self.custom.contains_key(name) {
            return Err(ConfigError::LayoutExists(name.to_string()));
        }
        self.custom.insert(name.to_string(), forward);
        Ok(())
    }

    /// Adds a user layout, or replaces it if the name is taken.
    pub fn set(&mut self, name: &str, forward: LayoutMap) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidLayoutName(name.to_string()));
        }
        self.check_editable(name)?;
        self.custom.insert(name.trim().to_string(), forward);
        Ok(())
    }

    /// Replaces an existing user layout.
    pub fn replace(&mut self, name: &str, forward: LayoutMap) -> Result<(), ConfigError> {
        self.check_editable(name)?;
        let layout = self
            .custom
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownLayout(name.to_string()))?;
        *layout = forward;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<LayoutMap, ConfigError> {
        self.check_editable(name)?;
        self.custom
            .remove(name)
            .ok_or_else(|| ConfigError::UnknownLayout(name.to_string()))
    }

    /// Overrides one key of a user layout
    ///
    /// Setting a key to itself removes its mapping. Returns the updated
    /// translation so the caller can report new conflicts.
    pub fn set_key(
        &mut self,
        name: &str,
        physical: &str,
        substituted: &str,
    ) -> Result<Translation, ConfigError> {
        self.check_editable(name)?;
        let forward = self
            .custom
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownLayout(name.to_string()))?;

        let updated = Translation::from_forward(forward.clone()).update_key(physical, substituted);
        *forward = updated.forward().clone();
        Ok(Translation::from_forward(forward.clone()))
    }

    /// Combines imported user layouts with the current ones
    ///
    /// Layouts named in `preserve` keep their current value whatever the
    /// strategy. Ignores the edit lock: callers decide what to preserve.
    pub fn merge(&mut self, imported: &LayoutCatalog, strategy: LayoutMerge, preserve: &[&str]) {
        let preserved: Vec<(String, Option<LayoutMap>)> = preserve
            .iter()
            .filter(|name| !is_built_in_layout(name))
            .map(|name| (name.to_string(), self.custom.get(*name).cloned()))
            .collect();

        match strategy {
            LayoutMerge::Keep => {}
            LayoutMerge::Overwrite => {
                self.custom = imported.custom.clone();
            }
            LayoutMerge::Update => {
                self.custom.extend(imported.custom.clone());
            }
            LayoutMerge::InverseUpdate => {
                for (name, layout) in &imported.custom {
                    self.custom
                        .entry(name.clone())
                        .or_insert_with(|| layout.clone());
                }
            }
        }

        for (name, layout) in preserved {
            match layout {
                Some(layout) => {
                    self.custom.insert(name, layout);
                }
                None => {
                    self.custom.remove(&name);
                }
            }
        }
    }
}
