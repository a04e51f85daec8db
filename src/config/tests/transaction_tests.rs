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
use std::{fs, thread, time::Duration};
use tempfile::TempDir;

fn create_test_manager(original: Option<&str>) -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(temp_dir.path().to_path_buf()).unwrap();
    if let Some(content) = original {
        fs::write(manager.file_path(LAYOUTS_FILE), content).unwrap();
    }
    (temp_dir, manager)
}

// ============================================================================
// FileTransaction Tests
// ============================================================================

#[test]
fn test_transaction_basic_flow() {
    let original_content = "{\"Swap\": {\"Q\": \"A\"}}";
    let (_temp_dir, manager) = create_test_manager(Some(original_content));

    // Begin transaction (creates backup)
    let tx = FileTransaction::begin(&manager, LAYOUTS_FILE).unwrap();
    assert!(tx.backup_path().is_some());
    assert_eq!(manager.list_backups(LAYOUTS_FILE).unwrap().len(), 1);

    let new_content = "{\"Swap\": {\"Q\": \"W\"}}";
    tx.commit(new_content).unwrap();

    assert_eq!(
        fs::read_to_string(manager.file_path(LAYOUTS_FILE)).unwrap(),
        new_content,
        "File should have new content"
    );

    // Backup survives the commit and holds the original
    let backups = manager.list_backups(LAYOUTS_FILE).unwrap();
    assert_eq!(backups.len(), 1, "Backup should still exist after commit");
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), original_content);
}

#[test]
fn test_transaction_rollback() {
    let original_content = "{\"Swap\": {}}";
    let (_temp_dir, manager) = create_test_manager(Some(original_content));

    let tx = FileTransaction::begin(&manager, LAYOUTS_FILE).unwrap();
    fs::write(manager.file_path(LAYOUTS_FILE), "garbage").unwrap();
    tx.rollback().unwrap();

    assert_eq!(
        fs::read_to_string(manager.file_path(LAYOUTS_FILE)).unwrap(),
        original_content,
        "Rollback should restore the content from the backup"
    );
}

#[test]
fn test_rollback_of_new_file_removes_it() {
    let (_temp_dir, manager) = create_test_manager(None);

    let tx = FileTransaction::begin(&manager, LAYOUTS_FILE).unwrap();
    assert!(tx.backup_path().is_none(), "Nothing to back up yet");

    fs::write(manager.file_path(LAYOUTS_FILE), "{}").unwrap();
    tx.rollback().unwrap();
    assert!(!manager.file_path(LAYOUTS_FILE).exists());

    // Rollback borrows immutably, so retrying is harmless
    tx.rollback().unwrap();
}

#[test]
fn test_transaction_preserves_exact_content() {
    let (_temp_dir, manager) = create_test_manager(None);
    let content = "{\n  \"Bépo\": {\n    \"Q\": \"B\"\n  }\n}\n\n";

    FileTransaction::begin(&manager, LAYOUTS_FILE)
        .unwrap()
        .commit(content)
        .unwrap();

    assert_eq!(fs::read_to_string(manager.file_path(LAYOUTS_FILE)).unwrap(), content);
}

#[test]
fn test_multiple_transactions_create_multiple_backups() {
    let (_temp_dir, manager) = create_test_manager(Some("v1"));

    FileTransaction::begin(&manager, LAYOUTS_FILE).unwrap().commit("v2").unwrap();
    // Wait 1 second to ensure a different timestamp
    thread::sleep(Duration::from_secs(1));
    FileTransaction::begin(&manager, LAYOUTS_FILE).unwrap().commit("v3").unwrap();

    let backups = manager.list_backups(LAYOUTS_FILE).unwrap();
    assert_eq!(backups.len(), 2);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "v1");
    assert_eq!(fs::read_to_string(&backups[1]).unwrap(), "v2");
}

#[test]
fn test_commit_prunes_old_backups() {
    let (_temp_dir, manager) = create_test_manager(Some("current"));
    let manager = manager.with_max_backups(1);
    fs::write(
        manager.backup_dir().join("layouts.json.2000-01-01_000000"),
        "ancient",
    )
    .unwrap();

    FileTransaction::begin(&manager, LAYOUTS_FILE).unwrap().commit("next").unwrap();

    let backups = manager.list_backups(LAYOUTS_FILE).unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "current");
}
