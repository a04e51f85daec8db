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

use super::super::*;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

use crate::core::{Binding, Diff, Fingerprint, JournalEntry};

/// Helper: Creates a manager over a fresh temporary data directory.
fn create_test_manager() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(temp_dir.path().join("data")).unwrap();
    (temp_dir, manager)
}

fn sample_journal() -> Journal {
    let binding = Binding::new("wm.close", "A");
    let mut journal = Journal::new();
    journal.record(
        "window",
        "wm.close",
        JournalEntry {
            fingerprint: Fingerprint::from_binding(&binding),
            diff: Diff::from_binding_and_chars(&binding, "Q", "A"),
        },
    );
    journal
}

// ============================================================================
// Directory setup
// ============================================================================

#[test]
fn test_new_creates_data_and_backup_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("data");

    let manager = ConfigManager::new(data_dir.clone()).unwrap();

    assert!(data_dir.is_dir(), "Data directory should be created");
    assert!(data_dir.join("backups").is_dir(), "Backup directory should be created");
    assert_eq!(manager.data_dir(), data_dir.as_path());
    assert_eq!(manager.backup_dir(), data_dir.join("backups").as_path());
}

#[test]
fn test_new_with_existing_dir() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(LAYOUTS_FILE), "{}").unwrap();

    let manager = ConfigManager::new(temp_dir.path().to_path_buf()).unwrap();
    assert_eq!(manager.read_file(LAYOUTS_FILE).unwrap().as_deref(), Some("{}"));
}

#[test]
fn test_default_data_dir_is_expanded() {
    let dir = ConfigManager::default_data_dir();
    assert!(!dir.to_string_lossy().starts_with('~'), "Tilde should be expanded");
    assert!(dir.ends_with(".config/keylayout-remap"));
}

#[test]
fn test_read_missing_file_is_none() {
    let (_temp_dir, manager) = create_test_manager();
    assert!(manager.read_file(JOURNAL_FILE).unwrap().is_none());
}

// ============================================================================
// Backups
// ============================================================================

#[test]
fn test_create_timestamped_backup() {
    let (_temp_dir, manager) = create_test_manager();
    fs::write(manager.file_path(JOURNAL_FILE), "{\"schema_version\": 1}").unwrap();

    let backup_path = manager.create_timestamped_backup(JOURNAL_FILE).unwrap().unwrap();

    assert!(backup_path.exists(), "Backup file should exist");
    assert_eq!(backup_path.parent().unwrap(), manager.backup_dir());

    // "journal.json.2025-10-10_221500" -> "2025-10-10_221500"
    let filename = backup_path.file_name().unwrap().to_str().unwrap();
    let timestamp = filename.strip_prefix("journal.json.").unwrap();
    let parsed = chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d_%H%M%S");
    assert!(parsed.is_ok(), "Timestamp should be valid chrono format: {}", timestamp);

    assert_eq!(fs::read_to_string(&backup_path).unwrap(), "{\"schema_version\": 1}");
}

#[test]
fn test_no_backup_for_missing_file() {
    let (_temp_dir, manager) = create_test_manager();
    assert!(manager.create_timestamped_backup(LAYOUTS_FILE).unwrap().is_none());
    assert!(manager.list_backups(LAYOUTS_FILE).unwrap().is_empty());
}

#[test]
fn test_list_backups_filters_by_file_and_sorts() {
    let (_temp_dir, manager) = create_test_manager();
    let backups = manager.backup_dir();
    fs::write(backups.join("layouts.json.2025-01-02_000000"), "new").unwrap();
    fs::write(backups.join("layouts.json.2025-01-01_000000"), "old").unwrap();
    fs::write(backups.join("journal.json.2025-01-03_000000"), "other").unwrap();
    fs::write(backups.join("layouts.json.not-a-timestamp"), "junk").unwrap();

    let listed: Vec<PathBuf> = manager.list_backups(LAYOUTS_FILE).unwrap();
    assert_eq!(
        listed,
        vec![
            backups.join("layouts.json.2025-01-01_000000"),
            backups.join("layouts.json.2025-01-02_000000"),
        ]
    );
}

#[test]
fn test_cleanup_keeps_newest_backups() {
    let (_temp_dir, manager) = create_test_manager();
    let manager = manager.with_max_backups(2);
    for day in 1..=4 {
        fs::write(
            manager.backup_dir().join(format!("layouts.json.2025-01-0{}_000000", day)),
            day.to_string(),
        )
        .unwrap();
    }

    assert_eq!(manager.cleanup_old_backups(LAYOUTS_FILE).unwrap(), 2);

    let remaining = manager.list_backups(LAYOUTS_FILE).unwrap();
    assert_eq!(remaining.len(), 2);
    assert_eq!(fs::read_to_string(&remaining[0]).unwrap(), "3");
    assert_eq!(fs::read_to_string(&remaining[1]).unwrap(), "4");
}

#[test]
fn test_multiple_writes_dont_overwrite_backups() {
    let (_temp_dir, manager) = create_test_manager();

    manager.write_file(PREFERENCES_FILE, "first").unwrap();
    manager.write_file(PREFERENCES_FILE, "second").unwrap();

    // Wait 1 second to ensure a different timestamp
    thread::sleep(Duration::from_secs(1));
    manager.write_file(PREFERENCES_FILE, "third").unwrap();

    let backups = manager.list_backups(PREFERENCES_FILE).unwrap();
    assert_eq!(backups.len(), 2, "The first write has nothing to back up");
    assert_eq!(fs::read_to_string(backups.last().unwrap()).unwrap(), "second");
    assert_eq!(
        fs::read_to_string(manager.file_path(PREFERENCES_FILE)).unwrap(),
        "third"
    );
}

// ============================================================================
// Load / save
// ============================================================================

#[test]
fn test_missing_files_load_defaults() {
    let (_temp_dir, manager) = create_test_manager();

    assert!(manager.load_journal().is_empty());
    assert!(manager.load_layouts().custom_layouts().is_empty());
    assert_eq!(manager.load_preferences(), Preferences::default());
}

#[test]
fn test_malformed_files_load_defaults() {
    let (_temp_dir, manager) = create_test_manager();
    fs::write(manager.file_path(JOURNAL_FILE), "{ not json").unwrap();
    fs::write(manager.file_path(LAYOUTS_FILE), "[1, 2]").unwrap();
    fs::write(manager.file_path(PREFERENCES_FILE), "\"QWERTY\"").unwrap();

    assert!(manager.load_journal().is_empty());
    assert!(manager.load_layouts().custom_layouts().is_empty());
    assert_eq!(manager.load_preferences(), Preferences::default());
}

#[test]
fn test_journal_round_trip_through_files() {
    let (_temp_dir, manager) = create_test_manager();
    let journal = sample_journal();

    manager.save_journal(&journal).unwrap();

    assert_eq!(manager.load_journal(), journal);
}

#[test]
fn test_journal_sink_persists_to_disk() {
    let (_temp_dir, mut manager) = create_test_manager();
    let journal = sample_journal();

    manager.persist(&journal).unwrap();

    let on_disk = fs::read_to_string(manager.file_path(JOURNAL_FILE)).unwrap();
    assert!(on_disk.contains("\"schema_version\": 1"));
    assert!(on_disk.contains("wm.close"));
}

#[test]
fn test_layouts_and_preferences_saved() {
    let (_temp_dir, manager) = create_test_manager();

    let mut catalog = LayoutCatalog::new();
    catalog
        .add("Swap", [("Q".to_string(), "A".to_string())].into_iter().collect())
        .unwrap();
    manager.save_layouts(&catalog).unwrap();

    let prefs = Preferences {
        preferred_input_layout: "Swap".to_string(),
        reapply_delay_secs: 0.5,
        ..Preferences::default()
    };
    manager.save_preferences(&prefs).unwrap();

    assert_eq!(manager.load_layouts(), catalog);
    assert_eq!(manager.load_preferences(), prefs);
}
