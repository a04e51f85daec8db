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

//! Built-in keyboard layouts
//!
//! Each layout is written as two aligned rows: reference (US-QWERTY) labels,
//! and the labels the layout produces on the same physical keys. Only keys
//! that differ need to be listed; identical pairs are dropped anyway.
//!
//! Built-ins are created once per process and never change.

use std::sync::OnceLock;

use crate::core::translation::Translation;

/// Name of the reference layout (the identity translation)
pub const REFERENCE_LAYOUT: &str = "QWERTY";

/// Keys of the reference layout that shortcuts may be bound to
pub const REFERENCE_KEYS: &[&str] = &[
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M",
    "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
    "`", "-", "=", "[", "]", ";", "'", ",", ".", "/", "\\",
];

/// True when `label` is a key of the reference layout.
pub fn is_reference_key(label: &str) -> bool {
    REFERENCE_KEYS.contains(&label)
}

/// A named built-in layout
#[derive(Debug)]
pub struct BuiltInLayout {
    pub name: &'static str,
    pub description: &'static str,
    pub translation: Translation,
}

struct LayoutTable {
    name: &'static str,
    description: &'static str,
    reference: &'static str,
    substituted: &'static str,
}

const LAYOUT_TABLES: &[LayoutTable] = &[
    LayoutTable {
        name: REFERENCE_LAYOUT,
        description: "Standard US-QWERTY keyboard layout",
        reference: "",
        substituted: "",
    },
    LayoutTable {
        name: "AZERTY",
        description: "French AZERTY keyboard layout (letters and punctuation only)",
        reference: "QA  WZ  ;M,",
        substituted: "AQ  ZW  M,;",
    },
    LayoutTable {
        name: "QWERTZ",
        description: "German QWERTZ keyboard layout (letters only)",
        reference: "YZ",
        substituted: "ZY",
    },
    LayoutTable {
        name: "Spanish",
        description: "Spanish ISO keyboard layout (punctuation keys)",
        reference: r"  `  -  =  [  ]  ;  '  \  /  ",
        substituted: r"  º  '  ¡  `  +  ñ  ´  ç  -  ",
    },
    LayoutTable {
        name: "Dvorak",
        description: "US-Dvorak keyboard layout, with `\"` standing for the quote key",
        reference: r#"  -=  QWERTYUIOP[]\  ASDFGHJKL;"  ZXCVBNM,./  "#,
        substituted: r#"  []  ",.PYFGCRL/=\  AOEUIDHTNS-  ;QJKXBMWVZ  "#,
    },
    LayoutTable {
        name: "Colemak",
        description: "Colemak keyboard layout",
        reference: r"  QWERTYUIOP[]\  ASDFGHJKL;'  ZXCVBNM,./  ",
        substituted: r"  QWFPGJLUY;[]\  ARSTDHNEIO'  ZXCVBKM,./  ",
    },
];

/// All built-in layouts, reference layout first
pub fn built_in_layouts() -> &'static [BuiltInLayout] {
    static LAYOUTS: OnceLock<Vec<BuiltInLayout>> = OnceLock::new();
    LAYOUTS.get_or_init(|| {
        LAYOUT_TABLES
            .iter()
            .map(|table| {
                let translation = Translation::from_layout_rows(table.reference, table.substituted)
                    .unwrap_or_else(|e| {
                        tracing::error!("Built-in layout '{}' is malformed: {}", table.name, e);
                        Translation::identity()
                    });
                BuiltInLayout {
                    name: table.name,
                    description: table.description,
                    translation,
                }
            })
            .collect()
    })
}

/// Looks up a built-in layout by name.
pub fn built_in_layout(name: &str) -> Option<&'static BuiltInLayout> {
    built_in_layouts().iter().find(|layout| layout.name == name)
}

pub fn is_built_in_layout(name: &str) -> bool {
    built_in_layout(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::layout_row_labels;

    #[test]
    fn test_layout_rows_are_aligned() {
        for table in LAYOUT_TABLES {
            let reference = layout_row_labels(table.reference).unwrap();
            let substituted = layout_row_labels(table.substituted).unwrap();
            assert_eq!(
                reference.len(),
                substituted.len(),
                "Rows of layout '{}' should have the same length",
                table.name
            );
        }
    }

    #[test]
    fn test_built_ins_are_valid() {
        for layout in built_in_layouts() {
            assert!(
                layout.translation.is_valid(),
                "Built-in layout '{}' has conflicts: {:?}",
                layout.name,
                layout.translation.conflicts()
            );
        }
    }

    #[test]
    fn test_only_reference_layout_is_identity() {
        for layout in built_in_layouts() {
            assert_eq!(
                layout.translation.is_identity(),
                layout.name == REFERENCE_LAYOUT,
                "Unexpected identity state for '{}'",
                layout.name
            );
        }
    }

    #[test]
    fn test_azerty_table() {
        let azerty = &built_in_layout("AZERTY").unwrap().translation;
        assert_eq!(azerty.map_forward("Q"), "A");
        assert_eq!(azerty.map_forward("A"), "Q");
        assert_eq!(azerty.map_forward(";"), "M");
        assert_eq!(azerty.map_forward("M"), ",");
        assert_eq!(azerty.map_forward(","), ";");
        assert_eq!(azerty.map_forward("E"), "E");
    }

    #[test]
    fn test_dvorak_drops_identity_pairs() {
        let dvorak = &built_in_layout("Dvorak").unwrap().translation;
        assert!(!dvorak.remaps_physical("A"));
        assert!(!dvorak.remaps_physical("M"));
        assert!(!dvorak.remaps_physical("\\"));
        assert_eq!(dvorak.map_forward("\""), "-");
        assert_eq!(dvorak.map_forward("Q"), "\"");
    }

    #[test]
    fn test_unknown_layout() {
        assert!(built_in_layout("Workman").is_none());
        assert!(is_built_in_layout("Colemak"));
    }
}
