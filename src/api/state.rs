//! Shared server state
//!
//! The dataset lives in memory as an immutable [`Snapshot`] behind an
//! `Arc`. Request handlers clone the `Arc` and read from a consistent
//! view; a triggered crawl swaps the whole snapshot in one step when it
//! finishes. The crawl gate serializes triggered crawls so at most one
//! runs at a time.

use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::Settings;
use crate::dataset::Snapshot;

#[derive(Clone)]
pub struct ApiState {
    settings: Arc<Settings>,
    snapshot: Arc<RwLock<Option<Arc<Snapshot>>>>,
    crawl_gate: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            snapshot: Arc::new(RwLock::new(None)),
            crawl_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current snapshot, or None when no dataset has been loaded yet
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().unwrap().clone()
    }

    /// Replaces the in-memory snapshot wholesale
    pub fn install_snapshot(&self, snapshot: Snapshot) {
        *self.snapshot.write().unwrap() = Some(Arc::new(snapshot));
    }

    /// Loads the snapshot from the configured dataset path
    ///
    /// A missing file is not fatal: the server starts and reports the
    /// dataset as unavailable until a crawl produces one.
    pub fn load_from_disk(&self) -> bool {
        match Snapshot::load(&self.settings.data_path) {
            Ok(snapshot) => {
                tracing::info!(
                    "Loaded {} records from {}",
                    snapshot.len(),
                    self.settings.data_path.display()
                );
                self.install_snapshot(snapshot);
                true
            }
            Err(e) => {
                tracing::warn!(
                    "No dataset loaded from {}: {}",
                    self.settings.data_path.display(),
                    e
                );
                false
            }
        }
    }

    /// Claims the crawl gate; None when a crawl is already in flight
    pub fn try_begin_crawl(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.crawl_gate).try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::BookRecord;

    fn test_state() -> ApiState {
        ApiState::new(Settings::from_lookup(|_| None).unwrap())
    }

    #[test]
    fn test_snapshot_starts_empty() {
        assert!(test_state().snapshot().is_none());
    }

    #[test]
    fn test_install_and_read_snapshot() {
        let state = test_state();
        state.install_snapshot(Snapshot {
            books: vec![BookRecord {
                id: 1,
                title: "One".to_string(),
                price: "£1.00".to_string(),
                rating: None,
                availability: "In stock".to_string(),
                category: None,
                image_url: None,
                book_url: "https://example.com/1".to_string(),
            }],
        });
        assert_eq!(state.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_crawl_gate_is_exclusive() {
        let state = test_state();
        let guard = state.try_begin_crawl();
        assert!(guard.is_some());
        assert!(state.try_begin_crawl().is_none());
        drop(guard);
        assert!(state.try_begin_crawl().is_some());
    }
}
