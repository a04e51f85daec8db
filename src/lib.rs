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

//! Keyboard Layout Remapper
//!
//! Lets someone typing on one physical keyboard layout trigger shortcuts
//! that were designed for another, by rewriting the trigger key of every
//! affected binding. Every change is journaled so it can be reverted
//! exactly, even after the host reloads or edits its bindings.
//!
//! # Features
//!
//! - **Translation Algebra:** Invertible key maps with conflict tracking
//! - **Reversible Remaps:** A persisted journal records every change
//! - **Reconciliation:** Journal entries are matched back to live bindings
//!   by fingerprint, modifiers and trigger mode
//! - **Named Layouts:** Built-in layouts plus user-defined ones
//! - **Automatic Backups:** Timestamped backups before every data file write
//! - **Atomic Operations:** Safe file writes with rollback on failure
//!
//! # Architecture
//!
//! - **`core`:** Business logic (types, translation, classifier, journal,
//!   reconciler, remap engine)
//! - **`config`:** Persistence (preferences, user layouts, journal, backups,
//!   import/export)
//! - **`host`:** File-backed binding source and file watcher
//! - **`logging`:** Tracing subscriber setup
//!
//! # Examples
//!
//! ## Remapping a binding set
//!
//! ```
//! use keylayout_remap::core::{
//!     Binding, BindingSet, Journal, MemoryJournalSink, RemapEngine, RemapOptions, Translation,
//! };
//!
//! let mut sets = vec![BindingSet::new("window", vec![Binding::new("wm.close", "Q")])];
//! let azerty = Translation::from_forward([("Q", "A"), ("A", "Q")]);
//!
//! let engine = RemapEngine::new(RemapOptions::default());
//! let mut journal = Journal::new();
//! let mut sink = MemoryJournalSink::default();
//!
//! let report = engine.apply(&mut sets, &azerty, &mut journal, &mut sink)?;
//! assert_eq!(report.applied, 1);
//! assert_eq!(sets[0].bindings[0].trigger_char, "A");
//!
//! let report = engine.revert(&mut sets, &mut journal, &mut sink)?;
//! assert_eq!(report.reverted, 1);
//! assert_eq!(sets[0].bindings[0].trigger_char, "Q");
//! # Ok::<(), keylayout_remap::core::EngineError>(())
//! ```
//!
//! ## Building the preferred translation
//!
//! ```
//! use keylayout_remap::config::{LayoutCatalog, Preferences};
//!
//! let catalog = LayoutCatalog::new();
//! let prefs = Preferences {
//!     preferred_input_layout: "QWERTZ".to_string(),
//!     ..Preferences::default()
//! };
//! assert_eq!(prefs.effective_translation(&catalog).map_forward("Y"), "Z");
//! ```

pub mod config;
pub mod core;
pub mod host;
pub mod logging;

// Re-export commonly used types for convenience
pub use core::{Binding, BindingSet, Journal, RemapEngine, Translation};
