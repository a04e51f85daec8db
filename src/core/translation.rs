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

//! Bidirectional key translation between a physical layout and a reference layout
//!
//! A `Translation` maps *physical* labels (what the user's keyboard produces)
//! to *substituted* labels (what the reference layout expects for the same
//! physical key), and back.
//!
//! # Conflicts
//!
//! The two directions are not required to be exact inverses. Whenever they
//! cannot agree, the offending label is recorded in `conflicts` instead of
//! raising an error. A translation is valid iff it has no conflicts.
//!
//! # Algebra
//!
//! - `invert` swaps the two directions
//! - `compose` chains translations left to right on the forward direction
//! - `update` overrides individual entries (used for single-key edits)
//! - `from_input_to_target` builds the effective translation used to emulate
//!   a target layout while typing on an input layout

use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;

use crate::core::layouts::is_reference_key;
use crate::core::parser::{layout_row_labels, ParseError};
use crate::core::types::Label;

/// Bidirectional mapping between physical and substituted labels
///
/// Identity entries (`k == v`) are never stored. Instances are immutable:
/// every editing operation returns a new `Translation`.
///
/// # Example
/// ```
/// use keylayout_remap::core::Translation;
///
/// let swap = Translation::from_forward([("Q", "A"), ("A", "Q")]);
/// assert!(swap.is_valid());
/// assert_eq!(swap.map_forward("Q"), "A");
/// assert_eq!(swap.map_backward("A"), "Q");
/// assert_eq!(swap.map_forward("X"), "X");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Translation {
    /// physical -> substituted
    forward: IndexMap<Label, Label>,
    /// substituted -> physical
    backward: IndexMap<Label, Label>,
    conflicts: BTreeSet<Label>,
}

fn strip_identity<I, K, V>(entries: I) -> IndexMap<Label, Label>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<Label>,
    V: Into<Label>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(k, v)| k != v)
        .collect()
}

impl Translation {
    /// The translation that maps every label to itself.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Builds a translation from its forward direction alone
    ///
    /// The backward direction is derived in insertion order. The first
    /// physical label claiming a substituted label owns the backward entry.
    /// A substituted label is a conflict when a later physical label claims
    /// it too, or when it is a reference key that this translation leaves
    /// unmapped (that physical key still produces it).
    ///
    /// Conflicted labels keep their backward entry, so `map_backward` still
    /// answers for them with the first claimant.
    ///
    /// # Example
    /// ```
    /// use keylayout_remap::core::Translation;
    ///
    /// let t = Translation::from_forward([("A", "B"), ("C", "B")]);
    /// assert_eq!(t.conflicts().iter().collect::<Vec<_>>(), vec!["B"]);
    /// assert_eq!(t.map_backward("B"), "A");
    /// ```
    pub fn from_forward<I, K, V>(forward: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Label>,
        V: Into<Label>,
    {
        let forward = strip_identity(forward);
        let mut backward = IndexMap::new();
        let mut conflicts = BTreeSet::new();

        for (physical, substituted) in &forward {
            let unmapped_reference_key =
                is_reference_key(substituted) && !forward.contains_key(substituted);

            if backward.contains_key(substituted) {
                conflicts.insert(substituted.clone());
                continue;
            }
            if unmapped_reference_key {
                conflicts.insert(substituted.clone());
            }
            backward.insert(substituted.clone(), physical.clone());
        }

        Self {
            forward,
            backward,
            conflicts,
        }
    }

    /// Builds a translation from explicit forward and backward directions
    ///
    /// Both sides are kept. A physical label `p` mapped to `o` is a conflict
    /// unless `backward[o] == p`, and symmetrically for backward entries
    /// without a matching forward entry. Conflicts here are physical labels.
    pub fn from_forward_and_backward<I, J, K, V, W, X>(forward: I, backward: J) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        J: IntoIterator<Item = (W, X)>,
        K: Into<Label>,
        V: Into<Label>,
        W: Into<Label>,
        X: Into<Label>,
    {
        let forward = strip_identity(forward);
        let backward = strip_identity(backward);
        let mut conflicts = BTreeSet::new();

        for (physical, substituted) in &forward {
            if backward.get(substituted) != Some(physical) {
                conflicts.insert(physical.clone());
            }
        }
        for (substituted, physical) in &backward {
            if forward.get(physical) != Some(substituted) {
                conflicts.insert(physical.clone());
            }
        }

        Self {
            forward,
            backward,
            conflicts,
        }
    }

    /// Builds a translation from two aligned layout rows
    ///
    /// `reference` lists reference-layout labels and `substituted` the labels
    /// the other layout produces on the same physical keys, in the same order.
    /// Whitespace is ignored in both rows. Extra labels in the longer row are
    /// ignored.
    ///
    /// # Example
    /// ```
    /// use keylayout_remap::core::Translation;
    ///
    /// let qwertz = Translation::from_layout_rows("YZ", "ZY").unwrap();
    /// assert_eq!(qwertz.map_forward("Y"), "Z");
    /// ```
    pub fn from_layout_rows(reference: &str, substituted: &str) -> Result<Self, ParseError> {
        let reference = layout_row_labels(reference)?;
        let substituted = layout_row_labels(substituted)?;
        Ok(Self::from_forward(reference.into_iter().zip(substituted)))
    }

    /// Swaps the forward and backward directions.
    pub fn invert(&self) -> Self {
        Self::from_forward_and_backward(self.backward.clone(), self.forward.clone())
    }

    /// Chains translations: forward maps `i` to `tN(...t2(t1(i)))`
    ///
    /// The backward direction is composed in reverse order, so that it
    /// undoes the forward chain. An empty chain is the identity.
    pub fn compose(translations: &[Translation]) -> Self {
        let (Some(first), Some(last)) = (translations.first(), translations.last()) else {
            return Self::identity();
        };

        let mut forward = last.forward.clone();
        for translation in translations[..translations.len() - 1].iter().rev() {
            let composed: Vec<(Label, Label)> = translation
                .forward
                .iter()
                .map(|(i, o)| (i.clone(), forward.get(o).unwrap_or(o).clone()))
                .collect();
            forward.extend(composed);
        }

        let mut backward = first.backward.clone();
        for translation in &translations[1..] {
            let composed: Vec<(Label, Label)> = translation
                .backward
                .iter()
                .map(|(o, i)| (o.clone(), backward.get(i).unwrap_or(i).clone()))
                .collect();
            backward.extend(composed);
        }

        Self::from_forward_and_backward(forward, backward)
    }

    /// Effective translation for typing on `input` while triggering `target` shortcuts
    ///
    /// This is `compose([input, invert(target)])`, and exactly `input` when the
    /// target is the identity.
    pub fn from_input_to_target(input: &Translation, target: &Translation) -> Self {
        if target.is_identity() {
            return input.clone();
        }
        Self::compose(&[input.clone(), target.invert()])
    }

    /// Overrides entries instead of composing
    ///
    /// Identity entries in `forward_delta` are meaningful here: they erase an
    /// existing mapping. When `backward_delta` is `None` it is derived from
    /// `forward_delta`, first writer winning.
    pub fn update(
        &self,
        forward_delta: &IndexMap<Label, Label>,
        backward_delta: Option<&IndexMap<Label, Label>>,
    ) -> Self {
        let mut forward = self.forward.clone();
        forward.extend(forward_delta.iter().map(|(k, v)| (k.clone(), v.clone())));

        let derived;
        let backward_delta = match backward_delta {
            Some(delta) => delta,
            None => {
                let mut inverse = IndexMap::new();
                for (physical, substituted) in forward_delta {
                    inverse
                        .entry(substituted.clone())
                        .or_insert_with(|| physical.clone());
                }
                derived = inverse;
                &derived
            }
        };

        let mut backward = self.backward.clone();
        backward.extend(backward_delta.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self::from_forward_and_backward(forward, backward)
    }

    /// Overrides a single physical key.
    pub fn update_key(&self, physical: &str, substituted: &str) -> Self {
        let mut delta = IndexMap::new();
        delta.insert(physical.to_string(), substituted.to_string());
        self.update(&delta, None)
    }

    /// Maps a physical label forward, passing unmapped labels through.
    pub fn map_forward<'a>(&'a self, label: &'a str) -> &'a str {
        self.forward.get(label).map(String::as_str).unwrap_or(label)
    }

    /// Maps a substituted label backward, passing unmapped labels through.
    pub fn map_backward<'a>(&'a self, label: &'a str) -> &'a str {
        self.backward.get(label).map(String::as_str).unwrap_or(label)
    }

    /// True when `label` is a physical label this translation remaps.
    pub fn remaps_physical(&self, label: &str) -> bool {
        self.forward.contains_key(label)
    }

    /// True when `label` is a label this translation produces.
    pub fn produces_substituted(&self, label: &str) -> bool {
        self.backward.contains_key(label)
    }

    pub fn forward(&self) -> &IndexMap<Label, Label> {
        &self.forward
    }

    pub fn backward(&self) -> &IndexMap<Label, Label> {
        &self.backward
    }

    pub fn conflicts(&self) -> &BTreeSet<Label> {
        &self.conflicts
    }

    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return write!(f, "identity");
        }

        let pairs = self
            .forward
            .iter()
            .map(|(p, s)| format!("{}→{}", p, s))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{}", pairs)?;

        if !self.conflicts.is_empty() {
            let conflicts = self.conflicts.iter().cloned().collect::<Vec<_>>().join(" ");
            write!(f, " (conflicts: {})", conflicts)?;
        }

        Ok(())
    }
}
