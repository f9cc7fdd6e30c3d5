//! File change watching with debounce.
//!
//! One OS watcher serves every asset. Each distinct parent directory is watched
//! once, rather than each file, so the watch survives the file being deleted,
//! replaced by rename, or created later, and the number of OS watch instances
//! does not grow with the number of assets.
//!
//! ```text
//! notify callback (one per registry)
//!     → routes: directory → file name → raw senders
//!         → debounce_events (one task per watched file)
//!             → FileWatch::changed
//! ```

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::assets::error::AssetError;

type Routes = HashMap<PathBuf, HashMap<OsString, Vec<mpsc::UnboundedSender<()>>>>;

/// Shared OS watcher handing out per-file [`FileWatch`]es.
///
/// Dropping the hub stops all OS watches; every `FileWatch` it created then
/// yields no further signals.
pub struct WatchHub {
    watcher: RecommendedWatcher,
    routes: Arc<Mutex<Routes>>,
    watched_dirs: HashSet<PathBuf>,
}

impl WatchHub {
    /// Create the OS watcher.
    pub fn new() -> Result<Self, AssetError> {
        let routes: Arc<Mutex<Routes>> = Arc::default();
        let callback_routes = Arc::clone(&routes);
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        dispatch(&callback_routes, &event.paths);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )
        .map_err(|source| AssetError::WatcherInit { source })?;

        Ok(Self {
            watcher,
            routes,
            watched_dirs: HashSet::new(),
        })
    }

    /// Start watching `path`.
    ///
    /// Bursts of notifications closer together than `debounce` collapse into
    /// one signal. A missing parent directory is logged and leaves a watch that
    /// only ever yields the initial signal; any other OS error is returned.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(&mut self, path: &Path, debounce: Duration) -> Result<FileWatch, AssetError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (trigger_tx, triggers) = mpsc::channel(1);

        let _ = trigger_tx.try_send(());

        let dir = watch_dir(path);
        let watching = match path.file_name() {
            Some(name) => {
                let watching = self.watch_dir_once(dir, path)?;
                if watching {
                    let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
                    // Some backends report canonical paths, others the path as watched.
                    let mut keys = vec![dir.to_path_buf()];
                    if let Ok(canonical) = dir.canonicalize() {
                        if canonical != dir {
                            keys.push(canonical);
                        }
                    }
                    for key in keys {
                        routes
                            .entry(key)
                            .or_default()
                            .entry(name.to_os_string())
                            .or_default()
                            .push(raw_tx.clone());
                    }
                }
                watching
            }
            None => {
                tracing::warn!(path = %path.display(), "Path has no file name, not watching for changes");
                false
            }
        };

        tokio::spawn(debounce_events(raw_rx, trigger_tx, debounce));

        tracing::debug!(path = %path.display(), watching, "File watch started");
        Ok(FileWatch {
            path: path.to_path_buf(),
            triggers,
        })
    }

    /// Register `dir` with the OS watcher unless already done. `false` if it does not exist.
    fn watch_dir_once(&mut self, dir: &Path, path: &Path) -> Result<bool, AssetError> {
        if self.watched_dirs.contains(dir) {
            return Ok(true);
        }
        match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                self.watched_dirs.insert(dir.to_path_buf());
                Ok(true)
            }
            Err(e) if is_not_found(&e) => {
                tracing::warn!(path = %path.display(), "Directory does not exist, not watching for changes");
                Ok(false)
            }
            Err(source) => Err(AssetError::WatchRegistration {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Number of directories registered with the OS watcher.
    pub fn watched_dirs(&self) -> usize {
        self.watched_dirs.len()
    }
}

impl std::fmt::Debug for WatchHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHub")
            .field("watched_dirs", &self.watched_dirs)
            .finish()
    }
}

fn dispatch(routes: &Mutex<Routes>, paths: &[PathBuf]) {
    let routes = routes.lock().unwrap_or_else(PoisonError::into_inner);
    for path in paths {
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            continue;
        };
        if let Some(senders) = routes.get(dir).and_then(|files| files.get(name)) {
            for sender in senders {
                let _ = sender.send(());
            }
        }
    }
}

/// Stream of "re-read this file now" signals for one path.
///
/// The first signal is queued at registration.
pub struct FileWatch {
    path: PathBuf,
    triggers: mpsc::Receiver<()>,
}

impl FileWatch {
    /// Wait for the next change signal. `None` once no more can arrive.
    pub async fn changed(&mut self) -> Option<()> {
        self.triggers.recv().await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn watch_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn is_not_found(err: &notify::Error) -> bool {
    match &err.kind {
        notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
        _ => false,
    }
}

/// Forward one trigger per quiet period.
///
/// The trigger channel holds a single slot, so a reload that is still running
/// when more changes arrive gets exactly one follow-up.
async fn debounce_events(
    mut raw: mpsc::UnboundedReceiver<()>,
    triggers: mpsc::Sender<()>,
    window: Duration,
) {
    while raw.recv().await.is_some() {
        loop {
            match tokio::time::timeout(window, raw.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) | Err(_) => break,
            }
        }
        if let Err(mpsc::error::TrySendError::Closed(_)) = triggers.try_send(()) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_burst_collapses_to_one_trigger() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::channel(1);
        tokio::spawn(debounce_events(raw_rx, tx, WINDOW));

        for _ in 0..5 {
            raw_tx.send(()).unwrap();
        }
        tokio::time::sleep(WINDOW * 4).await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_separate_bursts_trigger_separately() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::channel(1);
        tokio::spawn(debounce_events(raw_rx, tx, WINDOW));

        raw_tx.send(()).unwrap();
        assert!(tokio::time::timeout(WINDOW * 10, rx.recv()).await.unwrap().is_some());
        raw_tx.send(()).unwrap();
        assert!(tokio::time::timeout(WINDOW * 10, rx.recv()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_closing_source_ends_triggers() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<()>();
        let (tx, mut rx) = mpsc::channel(1);
        tokio::spawn(debounce_events(raw_rx, tx, WINDOW));
        drop(raw_tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_initial_trigger_and_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.txt");
        std::fs::write(&path, "one").unwrap();

        let mut hub = WatchHub::new().unwrap();
        let mut watch = hub.watch(&path, WINDOW).unwrap();
        assert!(watch.changed().await.is_some());

        std::fs::write(&path, "two").unwrap();
        let next = tokio::time::timeout(Duration::from_secs(5), watch.changed()).await;
        assert!(matches!(next, Ok(Some(()))));
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("file.txt");

        let mut hub = WatchHub::new().unwrap();
        let mut watch = hub.watch(&path, WINDOW).unwrap();
        assert!(watch.changed().await.is_some());
        assert!(watch.changed().await.is_none());
        assert_eq!(hub.watched_dirs(), 0);
    }

    #[tokio::test]
    async fn test_one_directory_watch_routes_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.txt");
        let two = dir.path().join("two.txt");
        std::fs::write(&one, "1").unwrap();
        std::fs::write(&two, "2").unwrap();

        let mut hub = WatchHub::new().unwrap();
        let mut watch_one = hub.watch(&one, WINDOW).unwrap();
        let mut watch_two = hub.watch(&two, WINDOW).unwrap();
        let mut watch_two_again = hub.watch(&two, WINDOW).unwrap();
        assert_eq!(hub.watched_dirs(), 1);
        for watch in [&mut watch_one, &mut watch_two, &mut watch_two_again] {
            assert!(watch.changed().await.is_some());
        }

        std::fs::write(&two, "changed").unwrap();
        for watch in [&mut watch_two, &mut watch_two_again] {
            let next = tokio::time::timeout(Duration::from_secs(5), watch.changed()).await;
            assert!(matches!(next, Ok(Some(()))));
        }
        tokio::time::sleep(WINDOW * 4).await;
        assert!(watch_one.triggers.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropping_hub_ends_watches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.txt");
        std::fs::write(&path, "one").unwrap();

        let mut hub = WatchHub::new().unwrap();
        let mut watch = hub.watch(&path, WINDOW).unwrap();
        assert!(watch.changed().await.is_some());

        drop(hub);
        let next = tokio::time::timeout(Duration::from_secs(5), watch.changed()).await;
        assert!(matches!(next, Ok(None)));
    }
}
