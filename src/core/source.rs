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

//! The host's binding collection, as seen by the remap engine
//!
//! The engine reads every binding set, then asks the host to change a single
//! binding's trigger key at a time. The host may refuse.

use std::fmt;
use thiserror::Error;

use crate::core::types::{Binding, BindingSet, BindingSetId};

/// Position of a binding inside a binding source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingRef {
    /// Index of the binding set
    pub set: usize,
    /// Index of the binding within its set
    pub index: usize,
}

impl fmt::Display for BindingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.set, self.index)
    }
}

/// Host refusal of a trigger key mutation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MutationError {
    #[error("Binding set '{0}' is read-only")]
    ReadOnly(BindingSetId),

    #[error("No binding at {0}")]
    NotFound(BindingRef),

    #[error("Host rejected key '{label}' for {binding}: {reason}")]
    Rejected {
        binding: String,
        label: String,
        reason: String,
    },
}

/// Enumerable, mutable sequence of bindings grouped into binding sets
pub trait BindingSource {
    fn binding_sets(&self) -> &[BindingSet];

    /// Changes the trigger key of one binding.
    fn set_trigger_char(&mut self, at: BindingRef, label: &str) -> Result<(), MutationError>;

    /// Every binding with its position and set id, in source order.
    fn iter_bindings(&self) -> Box<dyn Iterator<Item = (BindingRef, &str, &Binding)> + '_> {
        Box::new(
            self.binding_sets()
                .iter()
                .enumerate()
                .flat_map(|(set_index, set)| {
                    set.bindings.iter().enumerate().map(move |(index, binding)| {
                        (
                            BindingRef {
                                set: set_index,
                                index,
                            },
                            set.id.as_str(),
                            binding,
                        )
                    })
                }),
        )
    }
}

impl BindingSource for Vec<BindingSet> {
    fn binding_sets(&self) -> &[BindingSet] {
        self
    }

    fn set_trigger_char(&mut self, at: BindingRef, label: &str) -> Result<(), MutationError> {
        let set = self.get_mut(at.set).ok_or(MutationError::NotFound(at))?;
        if set.read_only {
            return Err(MutationError::ReadOnly(set.id.clone()));
        }
        let binding = set
            .bindings
            .get_mut(at.index)
            .ok_or(MutationError::NotFound(at))?;
        binding.trigger_char = label.to_string();
        Ok(())
    }
}
