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

//! Data file transactions with automatic backups
//!
//! Provides atomic write operations for the files in the data directory.

use atomic_write_file::AtomicWriteFile;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::config::{ConfigError, ConfigManager};

/// Atomic data file transaction with automatic backup.
///
/// Provides ACID guarantees:
/// - **Atomic**: Changes are all-or-nothing (atomic file operations)
/// - **Consistent**: A file is never in a half-written state
/// - **Isolated**: No race conditions (OS-level atomic rename)
/// - **Durable**: Backup created before any modifications
///
/// # Lifecycle
///
/// 1. `begin()` - Creates timestamped backup immediately (if the file exists)
/// 2. Caller prepares new content (in memory)
/// 3. `commit()` - Writes atomically or `rollback()` - Restores original
///
/// # Example
///
/// ```no_run
/// use keylayout_remap::config::{ConfigManager, FileTransaction, LAYOUTS_FILE};
/// use std::path::PathBuf;
///
/// let manager = ConfigManager::new(PathBuf::from("/tmp/keylayout-remap"))?;
/// let tx = FileTransaction::begin(&manager, LAYOUTS_FILE)?;
///
/// match tx.commit("{}") {
///     Ok(()) => println!("Layouts saved"),
///     Err(e) => eprintln!("Commit failed: {}", e),
/// }
/// # Ok::<(), keylayout_remap::config::ConfigError>(())
/// ```
pub struct FileTransaction<'a> {
    manager: &'a ConfigManager,
    file_name: String,
    backup_path: Option<PathBuf>,
}

/// Replaces `path` with `content` through a temp file and rename.
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<(), ConfigError> {
    let mut file = AtomicWriteFile::options().open(path).map_err(|e| {
        ConfigError::WriteFailed(format!("Failed to open for atomic write: {}", e))
    })?;

    file.write_all(content.as_bytes())
        .map_err(|e| ConfigError::WriteFailed(format!("Failed to write content: {}", e)))?;

    file.commit()
        .map_err(|e| ConfigError::WriteFailed(format!("Failed to commit atomic write: {}", e)))
}

impl<'a> FileTransaction<'a> {
    /// Begins a new transaction on one file of the data directory.
    ///
    /// The backup is created immediately when `begin()` is called, ensuring
    /// that a rollback point exists before any modifications are attempted.
    /// A file that does not exist yet has no backup; rolling back removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing file cannot be read or the backup
    /// cannot be written.
    pub fn begin(manager: &'a ConfigManager, file_name: &str) -> Result<Self, ConfigError> {
        let backup_path = manager.create_timestamped_backup(file_name)?;

        Ok(Self {
            manager,
            file_name: file_name.to_string(),
            backup_path,
        })
    }

    /// Backup taken when the transaction began, if the file existed.
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    /// Commits the transaction by atomically writing the new content.
    ///
    /// Old backups beyond the manager's limit are pruned afterwards; a
    /// pruning failure does not undo the commit.
    pub fn commit(self, new_content: &str) -> Result<(), ConfigError> {
        write_atomically(&self.manager.file_path(&self.file_name), new_content)?;

        if let Err(e) = self.manager.cleanup_old_backups(&self.file_name) {
            tracing::warn!("Failed to prune backups of {}: {}", self.file_name, e);
        }
        Ok(())
    }

    /// Rolls back to the state the file had when the transaction began.
    ///
    /// Borrows `self` immutably, so it can be retried.
    pub fn rollback(&self) -> Result<(), ConfigError> {
        let path = self.manager.file_path(&self.file_name);
        match &self.backup_path {
            Some(backup_path) => {
                let backup_content = fs::read_to_string(backup_path)?;
                write_atomically(&path, &backup_content)
            }
            None => {
                if path.exists() {
                    fs::remove_file(&path)?;
                }
                Ok(())
            }
        }
    }
}
