// Copyright 2025 bakri (tidynest@proton.me)
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

//! src/core/mod.rs
//!
//! Core business logic module
//!
//! This module contains the data structures and algorithms for remapping
//! shortcuts between keyboard layouts:
//! - Binding types and modifier signatures
//! - The translation algebra with conflict detection
//! - Built-in layouts
//! - Fingerprints, diffs and the remap journal
//! - Reconciliation of live bindings against the journal
//! - The remap engine (plan, apply, revert)
//!
//! All business logic is isolated from I/O concerns. The host's bindings and
//! the journal's storage are reached through the `BindingSource` and
//! `JournalSink` traits.

pub mod classifier;
pub mod engine;
pub mod fingerprint;
pub mod journal;
pub mod layouts;
pub mod parser;
pub mod reconciler;
pub mod source;
pub mod translation;
pub mod types;

pub use classifier::{is_remappable, is_remapped, is_remapped_to};
pub use engine::{
    plan, ApplyReport, EngineError, EngineState, JournalSink, MemoryJournalSink, PendingRemap,
    PersistError, RemapEngine, RemapOptions, RevertReport, UnresolvedEntry,
};
pub use fingerprint::{Diff, Fingerprint, ParamValue};
pub use journal::{Journal, JournalEntry, JournalError};
pub use layouts::{built_in_layout, built_in_layouts, BuiltInLayout, REFERENCE_LAYOUT};
pub use parser::ParseError;
pub use reconciler::{resolve, resolve_detailed, Resolution};
pub use source::{BindingRef, BindingSource, MutationError};
pub use translation::Translation;
pub use types::*;

#[cfg(test)]
mod tests;
