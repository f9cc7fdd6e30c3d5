//! Asset registration: one watch → load → install task per URL.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::assets::entry::AssetEntry;
use crate::assets::loader::AssetLoader;
use crate::assets::table::AssetTable;
use crate::assets::watcher::{FileWatch, WatchHub};
use crate::assets::AssetError;
use crate::config::{AssetConfig, CacheSettings};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;

/// Owns the background reload tasks feeding an [`AssetTable`].
///
/// Dropping the registry stops every task and every file watch.
pub struct AssetRegistry {
    table: AssetTable,
    loader: AssetLoader,
    watches: WatchHub,
    tasks: Vec<JoinHandle<()>>,
}

impl AssetRegistry {
    /// Register `assets` in order and wait until each has been loaded once.
    ///
    /// Unreadable files become missing entries; only a watch registration
    /// failure aborts startup.
    pub async fn register(
        assets: &[AssetConfig],
        settings: &CacheSettings,
        table: AssetTable,
        shutdown: &Shutdown,
    ) -> Result<Self, AssetError> {
        let mut registry = Self {
            table,
            loader: AssetLoader::new(settings),
            watches: WatchHub::new()?,
            tasks: Vec::with_capacity(assets.len()),
        };
        let debounce = Duration::from_millis(settings.debounce_ms);

        let mut initial_loads = Vec::with_capacity(assets.len());
        for config in assets {
            let watch = registry.watches.watch(&config.path, debounce)?;
            let (ready_tx, ready_rx) = oneshot::channel();
            registry.tasks.push(tokio::spawn(reload_loop(
                config.clone(),
                registry.loader.clone(),
                registry.table.clone(),
                watch,
                ready_tx,
                shutdown.subscribe(),
            )));
            initial_loads.push(ready_rx);
        }

        for ready in initial_loads {
            let _ = ready.await;
        }

        tracing::info!(
            assets = assets.len(),
            watched_dirs = registry.watches.watched_dirs(),
            revision = %registry.loader.revision(),
            "Assets registered"
        );
        Ok(registry)
    }

    pub fn table(&self) -> &AssetTable {
        &self.table
    }
}

impl Drop for AssetRegistry {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn reload_loop(
    config: AssetConfig,
    loader: AssetLoader,
    table: AssetTable,
    mut watch: FileWatch,
    ready: oneshot::Sender<()>,
    mut shutdown: ShutdownSignal,
) {
    let mut ready = Some(ready);
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            trigger = watch.changed() => {
                if trigger.is_none() {
                    break;
                }
                reload(&loader, &table, &config).await;
                if let Some(ready) = ready.take() {
                    let _ = ready.send(());
                }
            }
        }
    }
    tracing::debug!(url = %config.url, path = %watch.path().display(), "Reload task stopped");
}

/// Load `config` once and install the result, missing or not.
pub async fn reload(loader: &AssetLoader, table: &AssetTable, config: &AssetConfig) {
    match loader.load(config).await {
        Ok(asset) => {
            let entry = AssetEntry::loaded(config, asset);
            tracing::info!(
                url = %entry.url,
                path = %entry.source_path.display(),
                etag = %entry.etag,
                bytes = entry.raw_len(),
                gzip = entry.compressed.is_some(),
                "Asset loaded"
            );
            metrics::record_reload("loaded");
            metrics::record_compression(
                &entry.url,
                entry.raw_len(),
                entry.compressed.as_ref().map(|c| c.len() as u64),
            );
            table.install(entry);
        }
        Err(err) => {
            tracing::warn!(url = %config.url, error = %err, "Asset unavailable, answering 404");
            metrics::record_reload("missing");
            table.install(AssetEntry::missing(config));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::compute_etag;

    #[tokio::test]
    async fn test_reload_installs_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let config = AssetConfig::new("/a", &path);
        let loader = AssetLoader::new(&CacheSettings::default());
        let table = AssetTable::new();

        std::fs::write(&path, "hello").unwrap();
        reload(&loader, &table, &config).await;
        assert_eq!(table.get("/a").unwrap().etag, compute_etag(b"hello"));

        std::fs::remove_file(&path).unwrap();
        reload(&loader, &table, &config).await;
        assert!(table.get("/a").unwrap().is_missing());

        std::fs::write(&path, "back").unwrap();
        reload(&loader, &table, &config).await;
        assert_eq!(table.get("/a").unwrap().etag, compute_etag(b"back"));
    }

    #[tokio::test]
    async fn test_register_loads_everything_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.txt"), "one").unwrap();
        let assets = vec![
            AssetConfig::new("/one", dir.path().join("one.txt")).with_cache(300),
            AssetConfig::new("/absent", dir.path().join("absent.txt")),
        ];

        let shutdown = Shutdown::new();
        let registry =
            AssetRegistry::register(&assets, &CacheSettings::default(), AssetTable::new(), &shutdown)
                .await
                .unwrap();

        let one = registry.table().get("/one").unwrap();
        assert_eq!(one.cache_seconds, 300);
        assert_eq!(one.content_type, "text/plain");
        assert!(registry.table().get("/absent").unwrap().is_missing());
    }

    #[tokio::test]
    async fn test_shutdown_stops_reload_tasks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.txt"), "one").unwrap();
        let assets = vec![AssetConfig::new("/one", dir.path().join("one.txt"))];

        let shutdown = Shutdown::new();
        let _registry =
            AssetRegistry::register(&assets, &CacheSettings::default(), AssetTable::new(), &shutdown)
                .await
                .unwrap();
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        for _ in 0..100 {
            if shutdown.receiver_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reload task still subscribed after shutdown");
    }

    #[tokio::test]
    async fn test_many_assets_share_one_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let assets: Vec<_> = (0..200)
            .map(|i| {
                let path = dir.path().join(format!("f{}.txt", i));
                std::fs::write(&path, format!("file {}", i)).unwrap();
                AssetConfig::new(format!("/f{}", i), path)
            })
            .collect();

        let shutdown = Shutdown::new();
        let registry =
            AssetRegistry::register(&assets, &CacheSettings::default(), AssetTable::new(), &shutdown)
                .await
                .unwrap();
        assert_eq!(registry.table().len(), 200);
        assert_eq!(registry.watches.watched_dirs(), 1);
        assert_eq!(
            registry.table().get("/f150").unwrap().etag,
            compute_etag(b"file 150")
        );

        std::fs::write(dir.path().join("f150.txt"), "rewritten").unwrap();
        for _ in 0..500 {
            if registry.table().get("/f150").unwrap().etag == compute_etag(b"rewritten") {
                assert_eq!(registry.table().get("/f149").unwrap().etag, compute_etag(b"file 149"));
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("change to f150.txt was not picked up");
    }
}
