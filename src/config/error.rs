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

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration management.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Data directory cannot be created or written to.
    #[error("Data directory not writable: {0}")]
    DataDirNotWritable(PathBuf),
    /// Backup directory cannot be created or written to.
    #[error("Backup directory not writable: {0}")]
    BackupDirNotWritable(PathBuf),
    /// Failed to create backup file.
    #[error("Failed to create backup: {0}")]
    BackupFailed(String),
    /// Atomic write operation failed.
    #[error("Atomic write failed: {0}")]
    WriteFailed(String),
    /// Content could not be serialized or parsed as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Built-in layouts are constants.
    #[error("Cannot edit built-in layout '{0}'")]
    BuiltInLayout(String),
    /// Layouts are read-only while emulation is active.
    #[error("Cannot edit layout '{0}' while emulation is active; revert emulation first")]
    LayoutLocked(String),
    #[error("No keyboard layout named '{0}'")]
    UnknownLayout(String),
    #[error("A layout named '{0}' already exists")]
    LayoutExists(String),
    #[error("Invalid layout name '{0}'")]
    InvalidLayoutName(String),
    /// Layout file is not a flat `{physical: substituted}` object.
    #[error("Invalid layout file: {0}")]
    InvalidLayoutFile(String),
    /// Preferences come from another program or an incompatible version.
    #[error("Unsupported preferences: {0}")]
    UnsupportedPreferences(String),
    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
