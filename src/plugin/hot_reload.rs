//! File watching for `--watch` mode
//!
//! Reports when a unit file in the functions directory, or any extra file
//! being tracked (such as the script itself), is created, modified or
//! removed. The caller decides what to rerun; the registry is rebuilt from
//! scratch either way.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::registry::unit_name;
use super::PluginError;

/// Quiet period used to coalesce bursts of events from a single save
const DEBOUNCE: Duration = Duration::from_millis(150);

/// Watches a functions directory and a set of extra files
pub struct FunctionsWatcher {
    /// The file watcher
    _watcher: RecommendedWatcher,

    /// Channel receiver for file system events
    rx: Receiver<Result<Event, notify::Error>>,

    /// The functions directory being watched
    functions_dir: PathBuf,

    /// Extra files whose changes count
    tracked: HashSet<PathBuf>,

    /// Relevant paths seen since the last wait returned
    pending_changes: HashSet<PathBuf>,
}

impl FunctionsWatcher {
    /// Watch `functions_dir` plus each of `extra_files`
    pub fn new(functions_dir: PathBuf, extra_files: &[PathBuf]) -> Result<Self, PluginError> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| PluginError::Watch(format!("Failed to create watcher: {}", e)))?;

        // Only watch if the directory exists
        if functions_dir.exists() {
            watcher
                .watch(&functions_dir, RecursiveMode::NonRecursive)
                .map_err(|e| PluginError::Watch(format!("Failed to watch directory: {}", e)))?;
        }

        let mut tracked = HashSet::new();
        for file in extra_files {
            watcher
                .watch(file, RecursiveMode::NonRecursive)
                .map_err(|e| PluginError::Watch(format!("Failed to watch {}: {}", file.display(), e)))?;
            tracked.insert(canonical(file));
        }

        Ok(Self {
            _watcher: watcher,
            rx,
            functions_dir: canonical(&functions_dir),
            tracked,
            pending_changes: HashSet::new(),
        })
    }

    /// Block until something relevant changes, then return the changed paths.
    ///
    /// Returns an empty list if the watcher shuts down.
    pub fn wait_for_changes(&mut self) -> Vec<PathBuf> {
        loop {
            match self.rx.recv() {
                Ok(Ok(event)) => self.process_event(event),
                Ok(Err(e)) => tracing::warn!(error = %e, "file watcher error"),
                Err(_) => return Vec::new(),
            }
            if self.pending_changes.is_empty() {
                continue;
            }

            // Let the rest of the burst arrive
            loop {
                match self.rx.recv_timeout(DEBOUNCE) {
                    Ok(Ok(event)) => self.process_event(event),
                    Ok(Err(e)) => tracing::warn!(error = %e, "file watcher error"),
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            return self.pending_changes.drain().collect();
        }
    }

    fn process_event(&mut self, event: Event) {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => {}
            _ => return,
        }

        for path in event.paths {
            if self.is_relevant(&path) {
                self.pending_changes.insert(path);
            }
        }
    }

    fn is_relevant(&self, path: &Path) -> bool {
        if self.tracked.contains(&canonical(path)) {
            return true;
        }
        let in_functions_dir = path
            .parent()
            .map_or(false, |parent| canonical(parent) == self.functions_dir);
        in_functions_dir && unit_name(path).is_some()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Create a watcher, returning None if it fails (non-fatal)
pub fn try_create_watcher(functions_dir: PathBuf, extra_files: &[PathBuf]) -> Option<FunctionsWatcher> {
    match FunctionsWatcher::new(functions_dir, extra_files) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "watch mode disabled");
            None
        }
    }
}
