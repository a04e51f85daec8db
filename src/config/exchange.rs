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

//! Layout import/export files
//!
//! A layout file is a flat JSON object `{ "physical": "substituted", ... }`,
//! UTF-8, keys sorted, 2-space indent. Import coerces every value to a
//! string and rejects anything that is not an object.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::layouts::LayoutMap;
use crate::config::transaction::write_atomically;
use crate::config::ConfigError;
use crate::core::Translation;

/// Renders a translation's forward map as a layout file.
pub fn export_translation(translation: &Translation) -> Result<String, ConfigError> {
    let sorted: BTreeMap<&str, &str> = translation
        .forward()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    Ok(serde_json::to_string_pretty(&sorted)?)
}

/// Parses a layout file into a forward map.
pub fn import_layout_map(text: &str) -> Result<LayoutMap, ConfigError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(entries) = value else {
        return Err(ConfigError::InvalidLayoutFile(
            "expected an object of {physical: substituted}".to_string(),
        ));
    };

    Ok(entries
        .into_iter()
        .map(|(physical, substituted)| {
            let substituted = match substituted {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (physical, substituted)
        })
        .collect())
}

/// Atomically writes an export file, ending it with a newline.
pub fn write_export_file(path: &Path, content: &str) -> Result<(), ConfigError> {
    write_atomically(path, &format!("{}\n", content))
}

pub fn export_layout_file(path: &Path, translation: &Translation) -> Result<(), ConfigError> {
    write_export_file(path, &export_translation(translation)?)
}

pub fn import_layout_file(path: &Path) -> Result<LayoutMap, ConfigError> {
    import_layout_map(&fs::read_to_string(path)?)
}

/// Layout name suggested for a file, e.g. `bepo.json` -> `bepo`
///
/// Names clashing with a built-in get a ` (User)` suffix.
pub fn layout_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Imported Layout");
    if crate::core::layouts::is_built_in_layout(stem) {
        format!("{} (User)", stem)
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_export_sorted_and_indented() {
        let t = Translation::from_forward([("Z", "Y"), ("Y", "Z"), ("A", "Q"), ("Q", "A")]);
        let json = export_translation(&t).unwrap();
        assert_eq!(
            json,
            "{\n  \"A\": \"Q\",\n  \"Q\": \"A\",\n  \"Y\": \"Z\",\n  \"Z\": \"Y\"\n}"
        );
    }

    #[test]
    fn test_export_keeps_non_ascii() {
        let t = Translation::from_forward([(";", "ñ")]);
        assert!(export_translation(&t).unwrap().contains("ñ"));
    }

    #[test]
    fn test_import_coerces_values() {
        let map = import_layout_map(r#"{"1": 2, "Q": "A", "X": true}"#).unwrap();
        assert_eq!(map["1"], "2");
        assert_eq!(map["Q"], "A");
        assert_eq!(map["X"], "true");
    }

    #[test]
    fn test_import_rejects_non_objects() {
        assert!(matches!(
            import_layout_map(r#"[["Q", "A"]]"#),
            Err(ConfigError::InvalidLayoutFile(_))
        ));
        assert!(matches!(import_layout_map("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_conflicting_import_surfaces_conflict() {
        let map = import_layout_map(r#"{"Q": "A", "W": "A", "A": "Q"}"#).unwrap();
        let t = Translation::from_forward(map);
        assert_eq!(t.conflicts().iter().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_layout_file_round_trip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("azerty.json");
        let t = Translation::from_forward([("Q", "A"), ("A", "Q")]);

        export_layout_file(&path, &t).unwrap();

        assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
        assert_eq!(&import_layout_file(&path).unwrap(), t.forward());
    }

    #[test]
    fn test_layout_name_from_path() {
        assert_eq!(layout_name_from_path(&PathBuf::from("/tmp/bepo.json")), "bepo");
        assert_eq!(layout_name_from_path(&PathBuf::from("AZERTY.json")), "AZERTY (User)");
    }
}
