//! Project file watcher feeding the rebuild loop.
//!
//! Watches the project root recursively and forwards the paths of
//! relevant source changes through a channel. Build output, dependency
//! trees, and editor droppings are filtered out so writing a bundle
//! never re-triggers its own rebuild.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

/// Debounce window for repeated writes to the same file.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Directory names that never hold watched sources.
const IGNORED_DIRS: &[&str] = &["node_modules", "build", "dist", "target"];

/// File name suffixes that never trigger a rebuild.
const IGNORED_SUFFIXES: &[&str] = &[".log", ".DS_Store", ".swp", "~"];

/// Recursive watcher over a project root.
///
/// Dropping the watcher stops it; the receiver then drains and closes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root` recursively, debouncing per path.
    ///
    /// Returns the watcher handle and the change receiver. The handle
    /// must outlive every consumer of the receiver.
    pub fn new(root: PathBuf, debounce_ms: u64) -> Result<(Self, mpsc::Receiver<PathBuf>)> {
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }
        // notify reports canonical paths on some backends
        let root = root.canonicalize()?;

        let (tx, rx) = mpsc::channel(100);
        let watched_root = root.clone();
        let mut debouncer = Debouncer::new(Duration::from_millis(debounce_ms));

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!("watch error: {err}");
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            for path in event.paths {
                if Self::is_ignored(&path, &watched_root) {
                    continue;
                }

                if !debouncer.accept(&path, Instant::now()) {
                    continue;
                }

                // a full receiver means a rebuild is already pending
                let _ = tx.try_send(path);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for file changes");

        Ok((Self { _watcher: watcher, root }, rx))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a changed path is irrelevant to rebuilding.
    fn is_ignored(path: &Path, root: &Path) -> bool {
        let rel = match path.strip_prefix(root) {
            Ok(rel) => rel,
            // outside the project root entirely
            Err(_) => return true,
        };

        for component in rel.components() {
            if let Some(name) = component.as_os_str().to_str() {
                if IGNORED_DIRS.contains(&name) {
                    return true;
                }
                if name.starts_with('.') {
                    return true;
                }
            }
        }

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                return true;
            }
        }

        false
    }
}

/// Per-path debounce over a sliding window.
///
/// Entries older than the window are pruned on every call, so the map
/// stays bounded by the number of distinct paths touched within one
/// window rather than growing for the life of the watch.
struct Debouncer {
    window: Duration,
    recent: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            recent: HashMap::new(),
        }
    }

    /// Whether an event for `path` at `now` should pass through.
    fn accept(&mut self, path: &Path, now: Instant) -> bool {
        self.recent
            .retain(|_, seen| now.duration_since(*seen) < self.window);
        if self.recent.contains_key(path) {
            return false;
        }
        self.recent.insert(path.to_path_buf(), now);
        true
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.recent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignored(path: &str) -> bool {
        FileWatcher::is_ignored(&PathBuf::from(path), &PathBuf::from("/project"))
    }

    #[test]
    fn test_sources_are_watched() {
        assert!(!ignored("/project/src/index.jsx"));
        assert!(!ignored("/project/public/index.html"));
        assert!(!ignored("/project/beacon.config.json"));
    }

    #[test]
    fn test_dependency_and_output_dirs_are_ignored() {
        assert!(ignored("/project/node_modules/react/index.js"));
        assert!(ignored("/project/build/index.js"));
        assert!(ignored("/project/dist/main.js"));
    }

    #[test]
    fn test_hidden_paths_are_ignored() {
        assert!(ignored("/project/.git/HEAD"));
        assert!(ignored("/project/.env"));
        assert!(ignored("/project/src/.cache/entry.js"));
    }

    #[test]
    fn test_editor_droppings_are_ignored() {
        assert!(ignored("/project/debug.log"));
        assert!(ignored("/project/src/.DS_Store"));
        assert!(ignored("/project/src/index.js~"));
    }

    #[test]
    fn test_paths_outside_root_are_ignored() {
        assert!(ignored("/elsewhere/src/index.js"));
    }

    #[test]
    fn test_debouncer_suppresses_repeats_within_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let path = PathBuf::from("/project/src/index.js");
        let start = Instant::now();

        assert!(debouncer.accept(&path, start));
        assert!(!debouncer.accept(&path, start + Duration::from_millis(50)));
        assert!(debouncer.accept(&path, start + Duration::from_millis(150)));
    }

    #[test]
    fn test_debouncer_prunes_stale_entries() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();

        for i in 0..50 {
            let path = PathBuf::from(format!("/project/src/file{i}.js"));
            assert!(debouncer.accept(&path, start));
        }
        assert_eq!(debouncer.tracked(), 50);

        // once the window has passed, old entries are dropped instead
        // of accumulating for the lifetime of the watch
        let later = start + Duration::from_millis(200);
        assert!(debouncer.accept(&PathBuf::from("/project/src/other.js"), later));
        assert_eq!(debouncer.tracked(), 1);
    }

    #[tokio::test]
    async fn test_watcher_reports_writes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();

        let (_watcher, mut rx) = FileWatcher::new(dir.path().to_path_buf(), 0).unwrap();

        // give the backend a moment to establish the watch
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(src.join("index.js"), "console.log(1);").unwrap();

        let changed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no change reported")
            .expect("channel closed");
        assert!(changed.ends_with("index.js") || changed.ends_with("src"));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let err = FileWatcher::new(PathBuf::from("/definitely/not/here"), 50);
        assert!(err.is_err());
    }
}
