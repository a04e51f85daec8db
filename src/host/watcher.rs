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

//! File system watcher for the bindings file
//!
//! Uses OS-level file watching (Linux inotify) via the notify crate. The
//! parent directory is watched rather than the file itself: atomic writes
//! replace the file, which would silently end a watch on the old inode.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::mpsc::{channel, Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Watches one file for modifications
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    file_name: OsString,
}

impl FileWatcher {
    pub fn new(path: &Path) -> Result<Self, notify::Error> {
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| notify::Error::generic("watched path has no file name"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!("Watching {} for changes to {:?}", dir.display(), file_name);

        Ok(FileWatcher {
            _watcher: watcher,
            rx,
            file_name,
        })
    }

    fn is_relevant(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }

    fn accept(&self, received: notify::Result<Event>) -> bool {
        match received {
            Ok(event) => self.is_relevant(&event),
            Err(e) => {
                warn!("File watch error: {}", e);
                false
            }
        }
    }

    /// Blocks until the file changes; false once the watcher has shut down.
    pub fn wait(&self) -> bool {
        while let Ok(received) = self.rx.recv() {
            if self.accept(received) {
                return true;
            }
        }
        false
    }

    /// Blocks until the file changes or `timeout` passes.
    ///
    /// Returns false on timeout or when the watcher has shut down. A timeout
    /// too long to represent as a deadline waits without one.
    pub fn wait_for_change(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(received) => {
                    if self.accept(received) {
                        return true;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false
                }
            }
        }
    }

    /// Waits until the file has been quiet for `quiet`
    ///
    /// Bursts of writes collapse into one change this way; each new event
    /// restarts the wait.
    pub fn settle(&self, quiet: Duration) {
        while self.wait_for_change(quiet) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_no_changes_initially() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bindings.json");
        fs::write(&path, "[]").unwrap();

        let watcher = FileWatcher::new(&path).unwrap();
        assert!(!watcher.wait_for_change(Duration::from_millis(100)));
    }

    #[test]
    fn test_detects_write_to_watched_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bindings.json");
        fs::write(&path, "[]").unwrap();

        let watcher = FileWatcher::new(&path).unwrap();
        fs::write(&path, "[{\"id\": \"window\"}]").unwrap();

        assert!(watcher.wait_for_change(Duration::from_secs(5)));
    }

    #[test]
    fn test_ignores_sibling_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bindings.json");
        fs::write(&path, "[]").unwrap();

        let watcher = FileWatcher::new(&path).unwrap();
        fs::write(temp_dir.path().join("other.json"), "{}").unwrap();

        assert!(!watcher.wait_for_change(Duration::from_millis(300)));
    }
}
