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

//! Remap passes over a host binding source
//!
//! # Passes
//!
//! - **Plan** is pure: it classifies and reconciles every binding and lists
//!   the ones that still need their key changed.
//! - **Apply** records the whole plan in the journal, persists it, and only
//!   then mutates bindings one by one, stopping at the first refusal.
//! - **Revert** restores every journaled binding it can find to its source
//!   key, then clears the journal whatever the outcome.
//!
//! # Partial failure
//!
//! When a mutation fails mid-apply, the journal entries already written for
//! the failed binding and every later one stay in the journal, describing
//! remaps that never happened. `ApplyReport::orphaned` reports how many
//! entries are in that state. A later plan matches such a binding to its
//! entry and, since it still sits on the entry's source key, lists it again
//! as a re-remap.
//!
//! # State
//!
//! `Idle -> Applying -> Applied -> Reverting -> Idle`. A pass that starts
//! while another is in flight fails with `EngineError::Busy`.

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::classifier::{is_remappable, is_remapped_to};
use crate::core::fingerprint::{Diff, Fingerprint};
use crate::core::journal::{Journal, JournalEntry};
use crate::core::reconciler::resolve;
use crate::core::source::{BindingRef, BindingSource, MutationError};
use crate::core::translation::Translation;
use crate::core::types::{Binding, BindingSetId, Label, OperationId};

/// Lifecycle of the remap engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Idle,
    Applying,
    Applied,
    Reverting,
}

impl EngineState {
    fn in_flight(self) -> bool {
        matches!(self, EngineState::Applying | EngineState::Reverting)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::Applying => "applying",
            EngineState::Applied => "applied",
            EngineState::Reverting => "reverting",
        };
        write!(f, "{}", name)
    }
}

/// Failures that stop a pass before it produces a report
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Another remap pass is in progress (engine is {0})")]
    Busy(EngineState),

    #[error("Failed to persist the remap journal: {0}")]
    Persist(#[source] PersistError),
}

pub type PersistError = Box<dyn std::error::Error + Send + Sync>;

/// Durable storage for the journal
///
/// Apply calls `persist` before touching any binding.
pub trait JournalSink {
    fn persist(&mut self, journal: &Journal) -> Result<(), PersistError>;
}

/// Keeps the last persisted journal in memory
#[derive(Debug, Default)]
pub struct MemoryJournalSink {
    pub persisted: Option<Journal>,
    pub writes: usize,
}

impl JournalSink for MemoryJournalSink {
    fn persist(&mut self, journal: &Journal) -> Result<(), PersistError> {
        self.persisted = Some(journal.clone());
        self.writes += 1;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemapOptions {
    /// Apply translations that still have conflicts
    pub allow_conflicts: bool,
}

/// A binding that needs its trigger key changed
#[derive(Clone, Debug, PartialEq)]
pub struct PendingRemap {
    pub at: BindingRef,
    pub set_id: BindingSetId,
    pub binding: Binding,
    /// Key the binding will be moved to
    pub new_char: Label,
    /// Journal entry this binding was matched to, with its index among the
    /// operation's entries. `None` for a first-time remap.
    pub existing: Option<(usize, JournalEntry)>,
}

/// Outcome of an apply pass
#[derive(Clone, Debug, PartialEq)]
pub struct ApplyReport {
    pub success: bool,
    /// Bindings whose key was changed
    pub applied: usize,
    /// Journal entries describing mutations that did not happen
    pub orphaned: usize,
    pub message: String,
    pub failure: Option<MutationError>,
}

/// (binding set, operation, index among the operation's entries)
type EntryKey = (BindingSetId, OperationId, usize);

/// A journal entry revert could not match to a live binding, or could not
/// restore on one of the bindings it matched
#[derive(Clone, Debug, PartialEq)]
pub struct UnresolvedEntry {
    pub set_id: BindingSetId,
    pub operation_id: OperationId,
    pub entry: JournalEntry,
}

/// Outcome of a revert pass
#[derive(Clone, Debug, PartialEq)]
pub struct RevertReport {
    pub success: bool,
    /// Bindings restored to their source key
    pub reverted: usize,
    /// Journal entries at the start of the pass
    pub total: usize,
    pub unresolved: Vec<UnresolvedEntry>,
    pub message: String,
}

/// Lists every binding that needs remapping under `translation`
///
/// A remappable binding is pending when its operation has no journal entry
/// yet, when it cannot be matched to one, or when it was matched but sits on
/// the entry's source key again. Bindings sitting anywhere else are taken as
/// already remapped.
pub fn plan(
    source: &dyn BindingSource,
    translation: &Translation,
    journal: &Journal,
) -> Vec<PendingRemap> {
    let mut pending = Vec::new();

    for (at, set_id, binding) in source.iter_bindings() {
        if !is_remappable(binding, translation) {
            continue;
        }

        let existing = match journal.operation_entries(set_id, &binding.operation_id) {
            None => None,
            Some(entries) => match resolve(binding, entries) {
                None => {
                    debug!("Unresolved {} in '{}', planning a new remap", binding, set_id);
                    None
                }
                Some((index, entry)) if entry.diff.source_char == binding.trigger_char => {
                    Some((index, entry.clone()))
                }
                Some(_) => continue,
            },
        };

        pending.push(PendingRemap {
            at,
            set_id: set_id.to_string(),
            binding: binding.clone(),
            new_char: translation.map_forward(&binding.trigger_char).to_string(),
            existing,
        });
    }

    pending
}

/// Restores the engine state when a pass ends, including on early return
struct PassGuard<'a> {
    state: &'a Cell<EngineState>,
    settle: EngineState,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.state.set(self.settle);
    }
}

/// Runs apply and revert passes
///
/// The engine holds no bindings and no journal of its own: both are handed
/// in by the host on every pass.
#[derive(Debug, Default)]
pub struct RemapEngine {
    state: Cell<EngineState>,
    options: RemapOptions,
}

impl RemapEngine {
    pub fn new(options: RemapOptions) -> Self {
        Self {
            state: Cell::new(EngineState::Idle),
            options,
        }
    }

    /// Engine for a host whose journal already records applied remaps.
    pub fn resume(options: RemapOptions, journal: &Journal) -> Self {
        let engine = Self::new(options);
        if !journal.is_empty() {
            engine.state.set(EngineState::Applied);
        }
        engine
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    pub fn options(&self) -> RemapOptions {
        self.options
    }

    fn begin(&self, pass: EngineState) -> Result<PassGuard<'_>, EngineError> {
        let current = self.state.get();
        if current.in_flight() {
            return Err(EngineError::Busy(current));
        }
        self.state.set(pass);
        Ok(PassGuard {
            state: &self.state,
            settle: current,
        })
    }

    /// Remaps every pending binding to its translated key.
    pub fn apply(
        &self,
        source: &mut dyn BindingSource,
        translation: &Translation,
        journal: &mut Journal,
        sink: &mut dyn JournalSink,
    ) -> Result<ApplyReport, EngineError> {
        let mut guard = self.begin(EngineState::Applying)?;

        if !translation.is_valid() && !self.options.allow_conflicts {
            let conflicts = translation.conflicts().iter().cloned().collect::<Vec<_>>().join(" ");
            warn!("Refusing to apply a translation with conflicting keys: {}", conflicts);
            return Ok(ApplyReport {
                success: false,
                applied: 0,
                orphaned: 0,
                message: format!("Layout has conflicting keys: {}", conflicts),
                failure: None,
            });
        }

        let pending = plan(&*source, translation, journal);
        if pending.is_empty() {
            guard.settle = settled_state(journal);
            return Ok(ApplyReport {
                success: true,
                applied: 0,
                orphaned: 0,
                message: "All shortcuts are already remapped".to_string(),
                failure: None,
            });
        }

        let previous = journal.clone();
        for item in &pending {
            let binding = &item.binding;
            let diff = Diff::from_binding_and_chars(binding, &binding.trigger_char, &item.new_char);
            match &item.existing {
                Some((index, _)) => {
                    journal.update_diff(&item.set_id, &binding.operation_id, *index, diff);
                }
                None => {
                    journal.record(
                        &item.set_id,
                        &binding.operation_id,
                        JournalEntry {
                            fingerprint: Fingerprint::from_binding(binding),
                            diff,
                        },
                    );
                }
            }
        }

        if let Err(e) = sink.persist(journal) {
            *journal = previous;
            return Err(EngineError::Persist(e));
        }

        let mut applied = 0;
        let mut failure = None;
        for item in &pending {
            match source.set_trigger_char(item.at, &item.new_char) {
                Ok(()) => {
                    debug!("{} -> {} in '{}'", item.binding, item.new_char, item.set_id);
                    applied += 1;
                }
                Err(e) => {
                    warn!("Stopping apply: {}", e);
                    failure = Some(e);
                    break;
                }
            }
        }

        guard.settle = settled_state(journal);

        let orphaned = pending.len() - applied;
        let report = match failure {
            None => ApplyReport {
                success: true,
                applied,
                orphaned,
                message: format!("Remapped {} shortcut(s)", applied),
                failure: None,
            },
            Some(e) => ApplyReport {
                success: false,
                applied,
                orphaned,
                message: format!(
                    "Remapped {} of {} shortcut(s); {} journal entr{} left without a remap: {}",
                    applied,
                    pending.len(),
                    orphaned,
                    if orphaned == 1 { "y" } else { "ies" },
                    e
                ),
                failure: Some(e),
            },
        };
        info!("{}", report.message);
        Ok(report)
    }

    /// Restores every journaled binding to its source key and clears the journal.
    pub fn revert(
        &self,
        source: &mut dyn BindingSource,
        journal: &mut Journal,
        sink: &mut dyn JournalSink,
    ) -> Result<RevertReport, EngineError> {
        let mut guard = self.begin(EngineState::Reverting)?;

        let total = journal.len();
        let produced = journal.target_labels();
        let mut matched: HashSet<EntryKey> = HashSet::new();
        let mut failed: HashSet<EntryKey> = HashSet::new();
        let mut restores: Vec<(BindingRef, Label, bool, EntryKey)> = Vec::new();

        // One entry may resolve to several live bindings when the host added
        // a sibling after an earlier apply; every one of them is restored.
        for (at, set_id, binding) in source.iter_bindings() {
            if !is_remapped_to(binding, &produced) {
                continue;
            }
            let Some(entries) = journal.operation_entries(set_id, &binding.operation_id) else {
                continue;
            };
            let Some((index, entry)) = resolve(binding, entries) else {
                debug!("No journal entry for remapped {} in '{}'", binding, set_id);
                continue;
            };

            let key = (set_id.to_string(), binding.operation_id.clone(), index);
            matched.insert(key.clone());
            let moved = binding.trigger_char != entry.diff.source_char;
            restores.push((at, entry.diff.source_char.clone(), moved, key));
        }

        let mut reverted = 0;
        for (at, source_char, moved, key) in restores {
            // Already back on its source key
            if !moved {
                reverted += 1;
                continue;
            }
            match source.set_trigger_char(at, &source_char) {
                Ok(()) => reverted += 1,
                Err(e) => {
                    warn!("Could not restore '{}': {}", source_char, e);
                    failed.insert(key);
                }
            }
        }

        let unresolved: Vec<UnresolvedEntry> = journal
            .iter()
            .filter(|(set_id, operation_id, index, _)| {
                let key = (set_id.to_string(), operation_id.to_string(), *index);
                !matched.contains(&key) || failed.contains(&key)
            })
            .map(|(set_id, operation_id, _, entry)| UnresolvedEntry {
                set_id: set_id.to_string(),
                operation_id: operation_id.to_string(),
                entry: entry.clone(),
            })
            .collect();

        for item in &unresolved {
            warn!(
                "Unresolved journal entry in '{}': {} ({} -> {})",
                item.set_id,
                item.operation_id,
                item.entry.diff.source_char,
                item.entry.diff.target_char
            );
        }

        journal.clear();
        guard.settle = EngineState::Idle;
        sink.persist(journal).map_err(EngineError::Persist)?;

        let message = if unresolved.is_empty() {
            format!("Restored {} shortcut(s)", reverted)
        } else {
            format!(
                "Restored {} of {} shortcut(s); {} could not be found",
                reverted,
                total,
                unresolved.len()
            )
        };
        info!("{}", message);

        Ok(RevertReport {
            success: unresolved.is_empty(),
            reverted,
            total,
            unresolved,
            message,
        })
    }
}

fn settled_state(journal: &Journal) -> EngineState {
    if journal.is_empty() {
        EngineState::Idle
    } else {
        EngineState::Applied
    }
}
