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

//! Data directory management with atomic writes and backup support.
//!
//! The data directory holds three JSON files:
//!
//! - `preferences.json`: [`Preferences`]
//! - `layouts.json`: user layouts of the [`LayoutCatalog`]
//! - `journal.json`: the remap [`Journal`]
//!
//! Key features:
//!
//! - **Atomic writes**: Uses temp-file-then-rename to prevent corruption
//! - **Automatic backups**: Every write first copies the old file to `backups/`
//! - **Pruning**: Only the newest backups of each file are kept
//! - **Forgiving loads**: Missing or malformed files load as defaults
//!
//! # Example
//!
//! ```no_run
//! use keylayout_remap::config::ConfigManager;
//!
//! let manager = ConfigManager::new(ConfigManager::default_data_dir())?;
//! let mut prefs = manager.load_preferences();
//! prefs.reapply_on_reload = false;
//! manager.save_preferences(&prefs)?;
//! # Ok::<(), keylayout_remap::config::ConfigError>(())
//! ```

pub mod error;
pub mod exchange;
pub mod layouts;
pub mod preferences;
pub mod transaction;

pub use error::ConfigError;
pub use exchange::{
    export_layout_file, export_translation, import_layout_file, import_layout_map,
    layout_name_from_path, write_export_file,
};
pub use layouts::{LayoutCatalog, LayoutMap, LayoutMerge};
pub use preferences::{ImportOptions, LogLevel, Preferences};
pub use transaction::FileTransaction;

use chrono::{Local, NaiveDateTime};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::{Journal, JournalSink, PersistError};

pub const PREFERENCES_FILE: &str = "preferences.json";
pub const LAYOUTS_FILE: &str = "layouts.json";
pub const JOURNAL_FILE: &str = "journal.json";

pub const DEFAULT_DATA_DIR: &str = "~/.config/keylayout-remap";
pub const DEFAULT_MAX_BACKUPS: usize = 10;

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Manages the data directory with safe atomic operations.
///
/// All writes go through [`FileTransaction`] so every change is backed up
/// and recoverable.
#[derive(Debug)]
pub struct ConfigManager {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    max_backups: usize,
}

impl ConfigManager {
    /// Creates a manager for `data_dir`, creating it and its `backups/`
    /// directory when missing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DataDirNotWritable` or
    /// `ConfigError::BackupDirNotWritable` if a directory cannot be created
    /// or is read-only.
    pub fn new(data_dir: PathBuf) -> Result<Self, ConfigError> {
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)
                .map_err(|_| ConfigError::DataDirNotWritable(data_dir.clone()))?;
        }
        if data_dir.metadata()?.permissions().readonly() {
            return Err(ConfigError::DataDirNotWritable(data_dir));
        }

        let backup_dir = data_dir.join("backups");
        if !backup_dir.exists() {
            fs::create_dir_all(&backup_dir)
                .map_err(|_| ConfigError::BackupDirNotWritable(backup_dir.clone()))?;
        }
        if backup_dir.metadata()?.permissions().readonly() {
            return Err(ConfigError::BackupDirNotWritable(backup_dir));
        }

        Ok(Self {
            data_dir,
            backup_dir,
            max_backups: DEFAULT_MAX_BACKUPS,
        })
    }

    /// `~/.config/keylayout-remap`, with the home directory expanded.
    pub fn default_data_dir() -> PathBuf {
        PathBuf::from(shellexpand::tilde(DEFAULT_DATA_DIR).into_owned())
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// Reads a data file; `None` when it does not exist.
    pub fn read_file(&self, file_name: &str) -> Result<Option<String>, ConfigError> {
        match fs::read_to_string(self.file_path(file_name)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Backs up and atomically replaces a data file.
    pub fn write_file(&self, file_name: &str, content: &str) -> Result<(), ConfigError> {
        FileTransaction::begin(self, file_name)?.commit(content)
    }

    /// Copies the current file to `backups/<file_name>.<timestamp>`.
    ///
    /// Returns `None` when there is nothing to back up yet.
    pub(crate) fn create_timestamped_backup(
        &self,
        file_name: &str,
    ) -> Result<Option<PathBuf>, ConfigError> {
        let Some(content) = self.read_file(file_name)? else {
            return Ok(None);
        };

        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT);
        let backup_path = self.backup_dir.join(format!("{}.{}", file_name, timestamp));

        fs::write(&backup_path, content)
            .map_err(|e| ConfigError::BackupFailed(format!("{}: {}", backup_path.display(), e)))?;
        debug!("Backed up {} to {}", file_name, backup_path.display());

        Ok(Some(backup_path))
    }

    /// Backups of one file, oldest first.
    pub fn list_backups(&self, file_name: &str) -> Result<Vec<PathBuf>, ConfigError> {
        let prefix = format!("{}.", file_name);
        let mut backups: Vec<(NaiveDateTime, PathBuf)> = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stamp) = name.strip_prefix(&prefix) else {
                continue;
            };
            if let Ok(taken_at) = NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT) {
                backups.push((taken_at, path));
            }
        }

        backups.sort();
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Deletes the oldest backups of a file beyond the limit.
    ///
    /// Returns how many were removed.
    pub fn cleanup_old_backups(&self, file_name: &str) -> Result<usize, ConfigError> {
        let backups = self.list_backups(file_name)?;
        let excess = backups.len().saturating_sub(self.max_backups);

        for path in &backups[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }

    pub fn load_journal(&self) -> Journal {
        self.load_text(JOURNAL_FILE)
            .map(|text| Journal::from_json_or_empty(&text))
            .unwrap_or_default()
    }

    pub fn save_journal(&self, journal: &Journal) -> Result<(), ConfigError> {
        self.write_file(JOURNAL_FILE, &journal.to_json()?)
    }

    pub fn load_layouts(&self) -> LayoutCatalog {
        self.load_text(LAYOUTS_FILE)
            .map(|text| LayoutCatalog::from_json_or_default(&text))
            .unwrap_or_default()
    }

    pub fn save_layouts(&self, catalog: &LayoutCatalog) -> Result<(), ConfigError> {
        self.write_file(LAYOUTS_FILE, &catalog.to_json()?)
    }

    /// Loads preferences as stored; callers sanitize them against the catalogue.
    pub fn load_preferences(&self) -> Preferences {
        self.load_text(PREFERENCES_FILE)
            .map(|text| Preferences::from_json_or_default(&text))
            .unwrap_or_default()
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), ConfigError> {
        self.write_file(PREFERENCES_FILE, &preferences.to_json()?)
    }

    fn load_text(&self, file_name: &str) -> Option<String> {
        match self.read_file(file_name) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read {}: {}", file_name, e);
                None
            }
        }
    }
}

impl JournalSink for ConfigManager {
    fn persist(&mut self, journal: &Journal) -> Result<(), PersistError> {
        Ok(self.save_journal(journal)?)
    }
}

#[cfg(test)]
mod tests;
