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

//! src/core/types.rs
//!
//! Core type definitions for shortcut remapping
//!
//! This module defines the host-facing value types the remap engine works on:
//! - `ModifierState` / `ModifierSet`: Tri-state modifier keys and their signature
//! - `TriggerMode`: When a binding fires (press, release, click, ...)
//! - `InputDevice`: Which device class a binding listens to
//! - `Binding`: One host-owned shortcut assignment
//! - `BindingSet`: A named, host-defined group of bindings
//!
//! Bindings carry no identity of their own. Two structurally identical
//! bindings are indistinguishable to everything in this crate.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::fingerprint::ParamValue;

/// A key identifier, usually a single character such as `"A"` or `";"`.
pub type Label = String;

/// Opaque identifier of a binding set, supplied by the host.
pub type BindingSetId = String;

/// Identifier of the operation a binding invokes. Not unique.
pub type OperationId = String;

/// State of a single modifier key in a binding.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierState {
    /// Modifier must not be held
    #[default]
    Off,
    /// Modifier must be held
    On,
    /// Modifier state is ignored
    Any,
}

/// The full modifier requirements of a binding
///
/// Besides the five standard modifiers a binding may name one extra key
/// that has to be held (`key_modifier`), e.g. `"Q"` for "Q + click".
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default)]
pub struct ModifierSet {
    pub shift: ModifierState,
    pub ctrl: ModifierState,
    pub alt: ModifierState,
    pub oskey: ModifierState,
    pub hyper: ModifierState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_modifier: Option<Label>,
}

impl ModifierSet {
    /// Canonical signature string used to compare modifiers across sessions
    ///
    /// Modifiers are written in a fixed order: hyper `@`, oskey `#`, ctrl `^`,
    /// alt `!`, shift `+`. A held modifier emits its symbol, an ignored one
    /// emits `~` followed by the symbol. The key modifier, if any, comes last.
    ///
    /// # Example
    /// ```
    /// use keylayout_remap::core::{ModifierSet, ModifierState};
    ///
    /// let mods = ModifierSet {
    ///     ctrl: ModifierState::On,
    ///     shift: ModifierState::Any,
    ///     ..ModifierSet::default()
    /// };
    /// assert_eq!(mods.signature(), "^~+");
    /// ```
    pub fn signature(&self) -> String {
        let mut out = String::new();
        for (state, symbol) in self.ordered() {
            match state {
                ModifierState::Off => {}
                ModifierState::On => out.push(symbol),
                ModifierState::Any => {
                    out.push('~');
                    out.push(symbol);
                }
            }
        }
        if let Some(key) = &self.key_modifier {
            out.push_str(key);
        }
        out
    }

    /// True when no modifier is held or ignored and there is no key modifier.
    pub fn is_empty(&self) -> bool {
        self.key_modifier.is_none()
            && self.ordered().iter().all(|(state, _)| *state == ModifierState::Off)
    }

    fn ordered(&self) -> [(ModifierState, char); 5] {
        [
            (self.hyper, '@'),
            (self.oskey, '#'),
            (self.ctrl, '^'),
            (self.alt, '!'),
            (self.shift, '+'),
        ]
    }
}

/// When a binding fires
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    #[default]
    Press,
    Release,
    Click,
    DoubleClick,
    ClickDrag,
    Any,
    Nothing,
}

impl TriggerMode {
    /// Simple key triggers, the only ones remapping ever touches.
    pub fn is_simple_key_trigger(self) -> bool {
        matches!(self, TriggerMode::Press | TriggerMode::Release)
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::Press => write!(f, "press"),
            TriggerMode::Release => write!(f, "release"),
            TriggerMode::Click => write!(f, "click"),
            TriggerMode::DoubleClick => write!(f, "double_click"),
            TriggerMode::ClickDrag => write!(f, "click_drag"),
            TriggerMode::Any => write!(f, "any"),
            TriggerMode::Nothing => write!(f, "nothing"),
        }
    }
}

/// Device class a binding listens to
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDevice {
    #[default]
    Keyboard,
    Mouse,
    Ndof,
    Text,
    Timer,
}

/// A host-owned shortcut assignment
///
/// Only `trigger_char` is ever mutated by this crate; every other field is
/// read to classify the binding and to tell it apart from its siblings.
///
/// # Example
/// ```
/// use keylayout_remap::core::{Binding, ModifierSet, ModifierState};
///
/// let binding = Binding::new("mesh.select_all", "A")
///     .with_modifiers(ModifierSet { ctrl: ModifierState::On, ..Default::default() });
/// assert_eq!(binding.to_string(), "mesh.select_all [^ & A] (press)");
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Binding {
    /// Operation invoked by this binding (shared by many bindings)
    pub operation_id: OperationId,

    /// Key that currently triggers the binding
    pub trigger_char: Label,

    #[serde(default)]
    pub modifiers: ModifierSet,

    #[serde(default)]
    pub trigger_mode: TriggerMode,

    #[serde(default)]
    pub device: InputDevice,

    /// Operation parameters, in host order
    #[serde(default)]
    pub parameters: IndexMap<String, ParamValue>,

    /// Secondary mode selector (modal maps), absent for plain shortcuts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_mode: Option<String>,

    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Binding {
    /// Keyboard press binding without modifiers or parameters.
    pub fn new(operation_id: &str, trigger_char: &str) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            trigger_char: trigger_char.to_string(),
            modifiers: ModifierSet::default(),
            trigger_mode: TriggerMode::Press,
            device: InputDevice::Keyboard,
            parameters: IndexMap::new(),
            auxiliary_mode: None,
            enabled: true,
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifierSet) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_trigger_mode(mut self, trigger_mode: TriggerMode) -> Self {
        self.trigger_mode = trigger_mode;
        self
    }

    pub fn with_device(mut self, device: InputDevice) -> Self {
        self.device = device;
        self
    }

    pub fn with_parameter(mut self, name: &str, value: ParamValue) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }

    pub fn with_auxiliary_mode(mut self, mode: &str) -> Self {
        self.auxiliary_mode = Some(mode.to_string());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signature = self.modifiers.signature();
        if signature.is_empty() {
            write!(f, "{} [{}]", self.operation_id, self.trigger_char)?;
        } else {
            write!(f, "{} [{} & {}]", self.operation_id, signature, self.trigger_char)?;
        }
        write!(f, " ({})", self.trigger_mode)?;

        if let Some(mode) = &self.auxiliary_mode {
            write!(f, " <{}>", mode)?;
        }

        Ok(())
    }
}

/// A named group of bindings, e.g. one context-specific shortcut table
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BindingSet {
    pub id: BindingSetId,

    /// Host refuses trigger mutations for every binding in this set
    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl BindingSet {
    pub fn new(id: &str, bindings: Vec<Binding>) -> Self {
        Self {
            id: id.to_string(),
            read_only: false,
            bindings,
        }
    }
}
