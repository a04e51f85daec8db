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

//! Persistent record of every remap applied to the host's bindings
//!
//! Layout: binding set id -> operation id -> list of (fingerprint, diff).
//! Entries are appended the first time a binding is remapped and updated in
//! place on re-apply, never duplicated. Revert reads the whole journal and
//! then clears it.
//!
//! # Persisted schema
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "binding_sets": {
//!     "3d_view": {
//!       "view3d.select_all": [
//!         { "fingerprint": { "enabled": true },
//!           "diff": { "modifiers_signature": "^", "source_char": "A",
//!                     "target_char": "Q", "trigger_mode": "press" } }
//!       ]
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::warn;

use crate::core::fingerprint::{Diff, Fingerprint};
use crate::core::types::{BindingSetId, Label, OperationId};

/// Version written to, and required from, persisted journals
pub const JOURNAL_SCHEMA_VERSION: u32 = 1;

/// Errors reading a persisted journal
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Malformed journal: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported journal schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// One remapped binding: how to recognise it, and what was done to it
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JournalEntry {
    pub fingerprint: Fingerprint,
    pub diff: Diff,
}

type OperationEntries = BTreeMap<OperationId, Vec<JournalEntry>>;

#[derive(Deserialize, Serialize)]
struct JournalDocument {
    schema_version: u32,
    #[serde(default)]
    binding_sets: BTreeMap<BindingSetId, OperationEntries>,
}

/// Record of all remaps applied, keyed by binding set and operation id
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "JournalDocument", into = "JournalDocument")]
pub struct Journal {
    binding_sets: BTreeMap<BindingSetId, OperationEntries>,
}

impl TryFrom<JournalDocument> for Journal {
    type Error = JournalError;

    fn try_from(document: JournalDocument) -> Result<Self, Self::Error> {
        if document.schema_version != JOURNAL_SCHEMA_VERSION {
            return Err(JournalError::UnsupportedVersion {
                found: document.schema_version,
                expected: JOURNAL_SCHEMA_VERSION,
            });
        }

        // Empty groups carry nothing to revert
        let mut binding_sets = document.binding_sets;
        for operations in binding_sets.values_mut() {
            operations.retain(|_, entries| !entries.is_empty());
        }
        binding_sets.retain(|_, operations| !operations.is_empty());

        Ok(Self { binding_sets })
    }
}

impl From<Journal> for JournalDocument {
    fn from(journal: Journal) -> Self {
        Self {
            schema_version: JOURNAL_SCHEMA_VERSION,
            binding_sets: journal.binding_sets,
        }
    }
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.binding_sets.is_empty()
    }

    /// Total number of entries across all binding sets and operations.
    pub fn len(&self) -> usize {
        self.binding_sets
            .values()
            .flat_map(|operations| operations.values())
            .map(Vec::len)
            .sum()
    }

    /// Journaled entries for one operation in one binding set, if any.
    pub fn operation_entries(&self, set_id: &str, operation_id: &str) -> Option<&[JournalEntry]> {
        self.binding_sets
            .get(set_id)
            .and_then(|operations| operations.get(operation_id))
            .map(Vec::as_slice)
    }

    /// Appends a new entry and returns its index within the operation's list.
    pub fn record(&mut self, set_id: &str, operation_id: &str, entry: JournalEntry) -> usize {
        let entries = self
            .binding_sets
            .entry(set_id.to_string())
            .or_default()
            .entry(operation_id.to_string())
            .or_default();
        entries.push(entry);
        entries.len() - 1
    }

    /// Overwrites the diff of an existing entry
    ///
    /// Returns false when no such entry exists.
    pub fn update_diff(
        &mut self,
        set_id: &str,
        operation_id: &str,
        index: usize,
        diff: Diff,
    ) -> bool {
        match self
            .binding_sets
            .get_mut(set_id)
            .and_then(|operations| operations.get_mut(operation_id))
            .and_then(|entries| entries.get_mut(index))
        {
            Some(entry) => {
                entry.diff = diff;
                true
            }
            None => false,
        }
    }

    /// Iterates `(set id, operation id, index, entry)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, usize, &JournalEntry)> {
        self.binding_sets.iter().flat_map(|(set_id, operations)| {
            operations.iter().flat_map(move |(operation_id, entries)| {
                entries.iter().enumerate().map(move |(index, entry)| {
                    (set_id.as_str(), operation_id.as_str(), index, entry)
                })
            })
        })
    }

    /// Every label some journaled binding was moved to.
    pub fn target_labels(&self) -> BTreeSet<Label> {
        self.iter()
            .map(|(_, _, _, entry)| entry.diff.target_char.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.binding_sets.clear();
    }

    /// Serializes the journal with its schema version.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, JournalError> {
        let document: JournalDocument = serde_json::from_str(text)?;
        Self::try_from(document)
    }

    /// Parses a persisted journal, treating malformed data as empty
    ///
    /// Blank input is an empty journal without a warning.
    pub fn from_json_or_empty(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::new();
        }
        Self::from_json(text).unwrap_or_else(|e| {
            warn!("Ignoring persisted journal: {}", e);
            Self::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TriggerMode;

    fn entry(source: &str, target: &str) -> JournalEntry {
        JournalEntry {
            fingerprint: Fingerprint {
                parameters: None,
                auxiliary_mode: None,
                enabled: true,
            },
            diff: Diff {
                modifiers_signature: String::new(),
                source_char: source.to_string(),
                target_char: target.to_string(),
                trigger_mode: TriggerMode::Press,
            },
        }
    }

    #[test]
    fn test_record_and_lookup() {
        let mut journal = Journal::new();
        assert!(journal.is_empty());

        assert_eq!(journal.record("window", "wm.save", entry("S", "O")), 0);
        assert_eq!(journal.record("window", "wm.save", entry("W", "Z")), 1);
        assert_eq!(journal.record("view", "view.zoom", entry("Z", "W")), 0);

        assert_eq!(journal.len(), 3);
        assert_eq!(journal.operation_entries("window", "wm.save").unwrap().len(), 2);
        assert!(journal.operation_entries("window", "wm.open").is_none());
    }

    #[test]
    fn test_update_diff_in_place() {
        let mut journal = Journal::new();
        journal.record("window", "wm.save", entry("S", "O"));

        assert!(journal.update_diff("window", "wm.save", 0, entry("S", "R").diff));
        assert!(!journal.update_diff("window", "wm.save", 4, entry("S", "R").diff));

        let entries = journal.operation_entries("window", "wm.save").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].diff.target_char, "R");
    }

    #[test]
    fn test_target_labels() {
        let mut journal = Journal::new();
        journal.record("a", "op", entry("A", "Q"));
        journal.record("b", "op", entry("Q", "A"));
        let targets: Vec<_> = journal.target_labels().into_iter().collect();
        assert_eq!(targets, vec!["A", "Q"]);
    }

    #[test]
    fn test_json_carries_schema_version() {
        let mut journal = Journal::new();
        journal.record("window", "wm.save", entry("S", "O"));

        let json = journal.to_json().unwrap();
        assert!(json.contains("\"schema_version\": 1"));

        let restored = Journal::from_json(&json).unwrap();
        assert_eq!(restored, journal);
    }

    #[test]
    fn test_rejects_unknown_schema_version() {
        let result = Journal::from_json(r#"{"schema_version": 7, "binding_sets": {}}"#);
        assert!(matches!(
            result,
            Err(JournalError::UnsupportedVersion { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn test_malformed_journal_reads_as_empty() {
        assert!(Journal::from_json_or_empty("[1, 2, 3]").is_empty());
        assert!(Journal::from_json_or_empty("{not json").is_empty());
        assert!(Journal::from_json_or_empty("").is_empty());
    }

    #[test]
    fn test_empty_groups_are_dropped_on_load() {
        let journal = Journal::from_json(
            r#"{"schema_version": 1, "binding_sets": {"window": {"wm.save": []}, "view": {}}}"#,
        )
        .unwrap();
        assert!(journal.is_empty());
    }
}
