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

//! Structural signatures of bindings and the remap effects recorded for them
//!
//! The host never hands out stable binding identifiers, so a remapped binding
//! is recognised later by *what it looks like*:
//! - `Fingerprint`: the binding's own parameters, auxiliary mode and enabled
//!   flag, used to tell apart siblings sharing one operation id
//! - `Diff`: the character change a remap pass applied, plus the modifier
//!   signature and trigger mode it was applied under
//!
//! # Parameter capture
//!
//! Parameters are compacted before comparison: falsy values (false, 0, "",
//! empty collections, null) are dropped recursively. Host values with no
//! structural representation (`ParamValue::Opaque`) are dropped with a
//! warning. Capture is best-effort and never fails.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::core::types::{Binding, Label, TriggerMode};

/// A binding parameter value
///
/// Serialized untagged for primitives, lists and maps. Sets and opaque
/// host values use reserved single-key objects:
/// `{"$set": ["A", "B"]}` and `{"$opaque": "TypeName"}`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(from = "ParamRepr", into = "ParamRepr")]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Unordered set of enum flags
    Set(BTreeSet<String>),
    List(Vec<ParamValue>),
    Map(IndexMap<String, ParamValue>),
    /// Host value that cannot be represented, identified by its type name
    Opaque(String),
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum ParamRepr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Set {
        #[serde(rename = "$set")]
        items: BTreeSet<String>,
    },
    Opaque {
        #[serde(rename = "$opaque")]
        type_name: String,
    },
    List(Vec<ParamValue>),
    Map(IndexMap<String, ParamValue>),
}

impl From<ParamRepr> for ParamValue {
    fn from(repr: ParamRepr) -> Self {
        match repr {
            ParamRepr::Null => ParamValue::Null,
            ParamRepr::Bool(b) => ParamValue::Bool(b),
            ParamRepr::Int(i) => ParamValue::Int(i),
            ParamRepr::Float(f) => ParamValue::Float(f),
            ParamRepr::Text(s) => ParamValue::Text(s),
            ParamRepr::Set { items } => ParamValue::Set(items),
            ParamRepr::Opaque { type_name } => ParamValue::Opaque(type_name),
            ParamRepr::List(items) => ParamValue::List(items),
            ParamRepr::Map(map) => ParamValue::Map(map),
        }
    }
}

impl From<ParamValue> for ParamRepr {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Null => ParamRepr::Null,
            ParamValue::Bool(b) => ParamRepr::Bool(b),
            ParamValue::Int(i) => ParamRepr::Int(i),
            ParamValue::Float(f) => ParamRepr::Float(f),
            ParamValue::Text(s) => ParamRepr::Text(s),
            ParamValue::Set(items) => ParamRepr::Set { items },
            ParamValue::Opaque(type_name) => ParamRepr::Opaque { type_name },
            ParamValue::List(items) => ParamRepr::List(items),
            ParamValue::Map(map) => ParamRepr::Map(map),
        }
    }
}

impl ParamValue {
    /// False, zero, empty and null values carry no disambiguating information.
    pub fn is_falsy(&self) -> bool {
        match self {
            ParamValue::Null => true,
            ParamValue::Bool(b) => !b,
            ParamValue::Int(i) => *i == 0,
            ParamValue::Float(f) => *f == 0.0,
            ParamValue::Text(s) => s.is_empty(),
            ParamValue::Set(items) => items.is_empty(),
            ParamValue::List(items) => items.is_empty(),
            ParamValue::Map(map) => map.is_empty(),
            ParamValue::Opaque(_) => false,
        }
    }
}

/// Recursively drops falsy and unrepresentable parameter values
///
/// Returns `None` when nothing is left.
pub fn compact_parameters(
    parameters: &IndexMap<String, ParamValue>,
) -> Option<IndexMap<String, ParamValue>> {
    let compacted: IndexMap<String, ParamValue> = parameters
        .iter()
        .filter_map(|(name, value)| compact_value(name, value).map(|v| (name.clone(), v)))
        .collect();

    if compacted.is_empty() {
        None
    } else {
        Some(compacted)
    }
}

fn compact_value(name: &str, value: &ParamValue) -> Option<ParamValue> {
    match value {
        ParamValue::Opaque(type_name) => {
            warn!("Dropping parameter '{}' of unsupported type {}", name, type_name);
            None
        }
        ParamValue::Map(map) => compact_parameters(map).map(ParamValue::Map),
        ParamValue::List(items) => {
            let kept: Vec<ParamValue> = items
                .iter()
                .filter(|item| {
                    if let ParamValue::Opaque(type_name) = item {
                        warn!("Dropping element of '{}' of unsupported type {}", name, type_name);
                        false
                    } else {
                        true
                    }
                })
                .cloned()
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(ParamValue::List(kept))
            }
        }
        other if other.is_falsy() => None,
        other => Some(other.clone()),
    }
}

/// Disambiguation key of a binding among siblings with the same operation id
///
/// Equality is structural over all three fields. Parameter order does not
/// matter.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Fingerprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<IndexMap<String, ParamValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_mode: Option<String>,

    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Fingerprint {
    pub fn from_binding(binding: &Binding) -> Self {
        Self {
            parameters: compact_parameters(&binding.parameters),
            auxiliary_mode: binding.auxiliary_mode.clone(),
            enabled: binding.enabled,
        }
    }
}

/// Remap effect recorded for one binding
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Diff {
    /// `ModifierSet::signature()` of the binding when it was remapped
    pub modifiers_signature: String,

    /// Key before the remap
    pub source_char: Label,

    /// Key after the remap
    pub target_char: Label,

    #[serde(default)]
    pub trigger_mode: TriggerMode,
}

impl Diff {
    pub fn from_binding_and_chars(binding: &Binding, source_char: &str, target_char: &str) -> Self {
        Self {
            modifiers_signature: binding.modifiers.signature(),
            source_char: source_char.to_string(),
            target_char: target_char.to_string(),
            trigger_mode: binding.trigger_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ModifierSet, ModifierState};

    #[test]
    fn test_compaction_drops_falsy_values() {
        let binding = Binding::new("transform.translate", "G")
            .with_parameter("release_confirm", ParamValue::Bool(false))
            .with_parameter("value", ParamValue::Float(0.0))
            .with_parameter("mode", ParamValue::Text(String::new()))
            .with_parameter("axis", ParamValue::Text("X".to_string()));

        let fingerprint = Fingerprint::from_binding(&binding);
        let params = fingerprint.parameters.unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("axis"), Some(&ParamValue::Text("X".to_string())));
    }

    #[test]
    fn test_compaction_recurses_into_maps() {
        let mut nested = IndexMap::new();
        nested.insert("use_proportional".to_string(), ParamValue::Bool(false));
        let binding = Binding::new("transform.resize", "S")
            .with_parameter("options", ParamValue::Map(nested));

        assert_eq!(Fingerprint::from_binding(&binding).parameters, None);
    }

    #[test]
    fn test_opaque_values_are_dropped() {
        let binding = Binding::new("wm.call_menu", "W")
            .with_parameter("callback", ParamValue::Opaque("PyCapsule".to_string()))
            .with_parameter("name", ParamValue::Text("MENU".to_string()));

        let params = Fingerprint::from_binding(&binding).parameters.unwrap();
        assert!(!params.contains_key("callback"));
        assert!(params.contains_key("name"));
    }

    #[test]
    fn test_fingerprint_ignores_parameter_order() {
        let a = Binding::new("op", "A")
            .with_parameter("x", ParamValue::Int(1))
            .with_parameter("y", ParamValue::Int(2));
        let b = Binding::new("op", "B")
            .with_parameter("y", ParamValue::Int(2))
            .with_parameter("x", ParamValue::Int(1));

        assert_eq!(Fingerprint::from_binding(&a), Fingerprint::from_binding(&b));
    }

    #[test]
    fn test_fingerprint_distinguishes_enabled_and_mode() {
        let base = Binding::new("op", "A");
        let disabled = base.clone().with_enabled(false);
        let modal = base.clone().with_auxiliary_mode("CONFIRM");

        assert_ne!(Fingerprint::from_binding(&base), Fingerprint::from_binding(&disabled));
        assert_ne!(Fingerprint::from_binding(&base), Fingerprint::from_binding(&modal));
    }

    #[test]
    fn test_param_value_tagged_set_json() {
        let value: ParamValue = serde_json::from_str(r#"{"$set": ["B", "A"]}"#).unwrap();
        let expected: BTreeSet<String> = ["A".to_string(), "B".to_string()].into_iter().collect();
        assert_eq!(value, ParamValue::Set(expected));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"$set":["A","B"]}"#);
    }

    #[test]
    fn test_param_value_untagged_json() {
        let value: ParamValue =
            serde_json::from_str(r#"{"n": 3, "f": 1.5, "s": "x", "l": [true, null]}"#).unwrap();
        let ParamValue::Map(map) = value else {
            panic!("Expected a map");
        };
        assert_eq!(map["n"], ParamValue::Int(3));
        assert_eq!(map["f"], ParamValue::Float(1.5));
        assert_eq!(map["s"], ParamValue::Text("x".to_string()));
        assert_eq!(
            map["l"],
            ParamValue::List(vec![ParamValue::Bool(true), ParamValue::Null])
        );
    }

    #[test]
    fn test_diff_captures_modifiers_and_mode() {
        let binding = Binding::new("op", "A").with_modifiers(ModifierSet {
            shift: ModifierState::On,
            ..ModifierSet::default()
        });
        let diff = Diff::from_binding_and_chars(&binding, "A", "Q");
        assert_eq!(diff.modifiers_signature, "+");
        assert_eq!(diff.source_char, "A");
        assert_eq!(diff.target_char, "Q");
        assert_eq!(diff.trigger_mode, TriggerMode::Press);
    }

    #[test]
    fn test_diff_trigger_mode_defaults_to_press() {
        let diff: Diff = serde_json::from_str(
            r#"{"modifiers_signature": "", "source_char": "A", "target_char": "Q"}"#,
        )
        .unwrap();
        assert_eq!(diff.trigger_mode, TriggerMode::Press);
    }
}
