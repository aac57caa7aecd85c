//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_routing;
use crate::routing::{HookRegistry, RoutingTable};

/// Monitors the configuration file and recompiles the routing table on change.
pub struct ConfigWatcher {
    path: PathBuf,
    registry: HookRegistry,
    update_tx: mpsc::UnboundedSender<RoutingTable>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for freshly compiled tables.
    pub fn new(path: &Path, registry: HookRegistry) -> (Self, mpsc::UnboundedReceiver<RoutingTable>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                registry,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let registry = self.registry;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Config file change detected, reloading");
                        match load_routing(&path, &registry) {
                            Ok((_, table)) => {
                                tracing::info!(vhosts = table.len(), "Routing table recompiled");
                                let _ = tx.send(table);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current routing table");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
