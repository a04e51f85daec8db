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

//! Reconciler tests
//!
//! Walks the tie-break order: fingerprint, current key against target then
//! source, modifier signature and trigger mode, then the key test again.

use crate::core::fingerprint::{Diff, Fingerprint, ParamValue};
use crate::core::journal::JournalEntry;
use crate::core::reconciler::{resolve, resolve_detailed, Resolution};
use crate::core::types::{Binding, ModifierSet, ModifierState, TriggerMode};

fn candidate(binding: &Binding, source: &str, target: &str) -> JournalEntry {
    JournalEntry {
        fingerprint: Fingerprint::from_binding(binding),
        diff: Diff::from_binding_and_chars(binding, source, target),
    }
}

fn ctrl() -> ModifierSet {
    ModifierSet {
        ctrl: ModifierState::On,
        ..ModifierSet::default()
    }
}

fn shift() -> ModifierSet {
    ModifierSet {
        shift: ModifierState::On,
        ..ModifierSet::default()
    }
}

#[test]
fn test_siblings_matched_by_target_key() {
    let first = Binding::new("view.toggle", "A").with_parameter("axis", ParamValue::Int(1));
    let second = Binding::new("view.toggle", "B").with_parameter("axis", ParamValue::Int(1));

    // Same source, targets differ
    let candidates = vec![candidate(&first, "X", "A"), candidate(&second, "X", "B")];

    assert_eq!(resolve_detailed(&first, &candidates), Resolution::Matched(0));
    assert_eq!(resolve_detailed(&second, &candidates), Resolution::Matched(1));
}

#[test]
fn test_swapped_siblings() {
    // Two bindings of one operation on A and Q, both remapped by a swap
    let on_a = Binding::new("mesh.select", "A");
    let on_q = Binding::new("mesh.select", "Q");
    let candidates = vec![candidate(&on_a, "A", "Q"), candidate(&on_q, "Q", "A")];

    // After apply the binding formerly on A sits on Q, and vice versa
    let (index, entry) = resolve(&Binding::new("mesh.select", "Q"), &candidates).unwrap();
    assert_eq!(index, 0);
    assert_eq!(entry.diff.source_char, "A");

    let (index, _) = resolve(&Binding::new("mesh.select", "A"), &candidates).unwrap();
    assert_eq!(index, 1);
}

#[test]
fn test_source_key_matches_reset_binding() {
    let on_s = Binding::new("wm.save", "S");
    let on_w = Binding::new("wm.save", "W");
    let candidates = vec![candidate(&on_s, "S", "O"), candidate(&on_w, "W", "Z")];

    // Reset to its original key by the host, no candidate targets S
    assert_eq!(resolve_detailed(&on_s, &candidates), Resolution::Matched(0));
}

#[test]
fn test_modifier_signature_breaks_tie() {
    let with_ctrl = Binding::new("edit.undo", "Q").with_modifiers(ctrl());
    let with_shift = Binding::new("edit.undo", "Q").with_modifiers(shift());
    let candidates = vec![
        candidate(&with_ctrl, "A", "Q"),
        candidate(&with_shift, "A", "Q"),
    ];

    assert_eq!(resolve_detailed(&with_ctrl, &candidates), Resolution::Matched(0));
    assert_eq!(resolve_detailed(&with_shift, &candidates), Resolution::Matched(1));
}

#[test]
fn test_trigger_mode_breaks_tie() {
    let press = Binding::new("view.pan", "Q");
    let release = Binding::new("view.pan", "Q").with_trigger_mode(TriggerMode::Release);
    let candidates = vec![candidate(&press, "A", "Q"), candidate(&release, "A", "Q")];

    assert_eq!(resolve_detailed(&release, &candidates), Resolution::Matched(1));
}

#[test]
fn test_key_test_repeats_after_narrowing() {
    let binding = Binding::new("edit.undo", "Q").with_modifiers(ctrl());
    let other = Binding::new("edit.undo", "Q").with_modifiers(shift());
    let candidates = vec![
        candidate(&binding, "A", "Q"),
        candidate(&binding, "W", "Z"),
        candidate(&other, "A", "Q"),
    ];

    // Two candidates target Q, and only one of them carries the ctrl signature
    assert_eq!(resolve_detailed(&binding, &candidates), Resolution::Matched(0));
}

#[test]
fn test_no_candidate_with_matching_modifiers() {
    let binding = Binding::new("edit.undo", "Q").with_modifiers(ctrl());
    let shifted = Binding::new("edit.undo", "Q").with_modifiers(shift());
    let plain = Binding::new("edit.undo", "Q");
    let candidates = vec![candidate(&shifted, "A", "Q"), candidate(&plain, "A", "Q")];

    assert_eq!(resolve_detailed(&binding, &candidates), Resolution::NoCompatible);
}

#[test]
fn test_identical_candidates_are_ambiguous() {
    let binding = Binding::new("wm.call_menu", "Q");
    let candidates = vec![candidate(&binding, "A", "Q"), candidate(&binding, "A", "Q")];

    assert_eq!(
        resolve_detailed(&binding, &candidates),
        Resolution::Ambiguous(vec![0, 1])
    );
    assert!(resolve(&binding, &candidates).is_none());
}

#[test]
fn test_fingerprint_filters_before_keys() {
    let binding = Binding::new("transform.translate", "Q")
        .with_parameter("axis", ParamValue::Text("X".to_string()));
    let other = Binding::new("transform.translate", "Q")
        .with_parameter("axis", ParamValue::Text("Y".to_string()));

    // The other candidate matches the key, but not the parameters
    let candidates = vec![candidate(&other, "A", "Q"), candidate(&binding, "W", "Z")];
    assert_eq!(resolve_detailed(&binding, &candidates), Resolution::Matched(1));
}
