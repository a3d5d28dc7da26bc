use anyhow::Result;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;
use tracing::{error, info, warn};

/// Quiet period after the last event before a reload fires.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches the main config file and the rule-set directory, calling
/// `on_change` once per burst of file events.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn new<F>(paths: Vec<PathBuf>, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;

        let mut watched = 0;
        for path in &paths {
            if path.exists() {
                let mode = if path.is_dir() {
                    RecursiveMode::Recursive
                } else {
                    RecursiveMode::NonRecursive
                };
                watcher.watch(path, mode)?;
                info!("Watching configuration path: {}", path.display());
                watched += 1;
            } else {
                warn!("Configuration path does not exist, skipping: {}", path.display());
            }
        }
        if watched == 0 {
            warn!("No configuration paths watched, live reload disabled");
        }

        std::thread::spawn(move || loop {
            match rx.recv() {
                Ok(Ok(_event)) => {
                    // Editors write in several steps; wait for them to settle
                    loop {
                        match rx.recv_timeout(DEBOUNCE) {
                            Ok(Ok(_)) => continue,
                            Ok(Err(e)) => error!("Watch error: {:?}", e),
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    info!("Configuration change detected, reloading...");
                    on_change();
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(e) => {
                    error!("Watch channel error: {:?}", e);
                    break;
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}
