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

//! File-backed reference host
//!
//! Bindings live in a JSON file holding an array of binding sets:
//!
//! ```json
//! [
//!   {
//!     "id": "window",
//!     "read_only": false,
//!     "bindings": [
//!       { "operation_id": "wm.close", "trigger_char": "Q", "modifiers": { "ctrl": "on" } }
//!     ]
//!   }
//! ]
//! ```

pub mod watcher;

pub use watcher::FileWatcher;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::transaction::write_atomically;
use crate::core::{BindingRef, BindingSet, BindingSource, MutationError};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Cannot read bindings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed bindings file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Atomic write failed: {0}")]
    WriteFailed(String),
}

/// Binding sets loaded from a JSON file
#[derive(Debug)]
pub struct BindingFile {
    path: PathBuf,
    sets: Vec<BindingSet>,
}

impl BindingFile {
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let content = fs::read_to_string(path).map_err(|source| HostError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let sets: Vec<BindingSet> =
            serde_json::from_str(&content).map_err(|source| HostError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded {} binding set(s) from {}", sets.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            sets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the binding sets back to the file they came from.
    pub fn save(&self) -> Result<(), HostError> {
        let content = serde_json::to_string_pretty(&self.sets)
            .map_err(|e| HostError::WriteFailed(format!("Failed to serialize bindings: {}", e)))?;

        write_atomically(&self.path, &format!("{}\n", content))
            .map_err(|e| HostError::WriteFailed(e.to_string()))
    }
}

impl BindingSource for BindingFile {
    fn binding_sets(&self) -> &[BindingSet] {
        &self.sets
    }

    fn set_trigger_char(&mut self, at: BindingRef, label: &str) -> Result<(), MutationError> {
        self.sets.set_trigger_char(at, label)
    }
}
