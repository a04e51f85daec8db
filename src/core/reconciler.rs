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

//! Matching live bindings against journaled remaps
//!
//! The host has no stable binding identity, so a binding is matched to the
//! journal entry it most plausibly produced, narrowing the candidates in a
//! fixed order:
//!
//! 1. Equal fingerprint (parameters, auxiliary mode, enabled flag)
//! 2. Current key equals the recorded target key, then the recorded source key
//! 3. Equal modifier signature and trigger mode, then step 2 again
//!
//! Structurally identical bindings cannot be told apart; those come back
//! `Ambiguous` and are treated as unresolved by callers.

use tracing::debug;

use crate::core::fingerprint::Fingerprint;
use crate::core::journal::JournalEntry;
use crate::core::types::Binding;

/// Detailed verdict of matching a binding against its candidates
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Index of the single matching candidate
    Matched(usize),
    /// No candidate has a compatible fingerprint or modifier signature
    NoCompatible,
    /// Several candidates remain indistinguishable
    Ambiguous(Vec<usize>),
}

impl Resolution {
    pub fn matched(&self) -> Option<usize> {
        match self {
            Resolution::Matched(index) => Some(*index),
            _ => None,
        }
    }
}

/// Picks the unique candidate whose target, or else source, equals the key
fn by_current_key(
    key: &str,
    candidates: &[JournalEntry],
    pool: &[usize],
) -> Result<usize, (Vec<usize>, Vec<usize>)> {
    let after: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|&i| candidates[i].diff.target_char == key)
        .collect();
    if let [only] = after.as_slice() {
        return Ok(*only);
    }

    let before: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|&i| candidates[i].diff.source_char == key)
        .collect();
    if let [only] = before.as_slice() {
        return Ok(*only);
    }

    Err((after, before))
}

/// Matches `binding` against the journal entries of its operation id.
pub fn resolve_detailed(binding: &Binding, candidates: &[JournalEntry]) -> Resolution {
    let fingerprint = Fingerprint::from_binding(binding);
    let compatible: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.fingerprint == fingerprint)
        .map(|(i, _)| i)
        .collect();

    match compatible.as_slice() {
        [] => {
            debug!(
                "No compatible journal entry for {}\n  fingerprint: {:?}\n  candidates: {:?}",
                binding, fingerprint, candidates
            );
            return Resolution::NoCompatible;
        }
        [only] => return Resolution::Matched(*only),
        _ => {}
    }

    let key = binding.trigger_char.as_str();
    if let Ok(index) = by_current_key(key, candidates, &compatible) {
        return Resolution::Matched(index);
    }

    // Some operations are bound to the same key under different modifiers
    let signature = binding.modifiers.signature();
    let narrowed: Vec<usize> = compatible
        .into_iter()
        .filter(|&i| {
            candidates[i].diff.modifiers_signature == signature
                && candidates[i].diff.trigger_mode == binding.trigger_mode
        })
        .collect();

    match narrowed.as_slice() {
        [] => return Resolution::NoCompatible,
        [only] => return Resolution::Matched(*only),
        _ => {}
    }

    match by_current_key(key, candidates, &narrowed) {
        Ok(index) => Resolution::Matched(index),
        Err((after, before)) => {
            let remaining = if after.len() > 1 {
                after
            } else if before.len() > 1 {
                before
            } else {
                narrowed
            };
            debug!(
                "Multiple journal entries match {}: {:?}",
                binding,
                remaining.iter().map(|&i| &candidates[i]).collect::<Vec<_>>()
            );
            Resolution::Ambiguous(remaining)
        }
    }
}

/// Matches `binding` and returns the single best candidate, if any.
pub fn resolve<'a>(
    binding: &Binding,
    candidates: &'a [JournalEntry],
) -> Option<(usize, &'a JournalEntry)> {
    resolve_detailed(binding, candidates)
        .matched()
        .map(|index| (index, &candidates[index]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::Diff;

    fn entry_for(binding: &Binding, source: &str, target: &str) -> JournalEntry {
        JournalEntry {
            fingerprint: Fingerprint::from_binding(binding),
            diff: Diff::from_binding_and_chars(binding, source, target),
        }
    }

    #[test]
    fn test_single_compatible_candidate() {
        let binding = Binding::new("wm.save", "S");
        let other = Binding::new("wm.save", "S").with_enabled(false);
        let candidates = vec![entry_for(&other, "S", "O"), entry_for(&binding, "S", "O")];

        assert_eq!(resolve_detailed(&binding, &candidates), Resolution::Matched(1));
    }

    #[test]
    fn test_no_compatible_candidate() {
        let binding = Binding::new("wm.save", "S").with_auxiliary_mode("CONFIRM");
        let candidates = vec![entry_for(&Binding::new("wm.save", "S"), "S", "O")];

        assert_eq!(resolve_detailed(&binding, &candidates), Resolution::NoCompatible);
        assert!(resolve(&binding, &candidates).is_none());
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(
            resolve_detailed(&Binding::new("op", "A"), &[]),
            Resolution::NoCompatible
        );
    }
}
