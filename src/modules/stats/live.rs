//! Dashboard kept current as the store changes.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use lectern_db::{Snapshot, Store};
use lectern_kernel::settings::ReadingSettings;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::engine::Dashboard;

struct Feed {
    reading: ReadingSettings,
    dashboards: watch::Sender<Dashboard>,
}

impl Feed {
    fn refresh(&self, snapshot: &Snapshot) -> Dashboard {
        let dashboard = Dashboard::compute(
            snapshot.books(),
            snapshot.logs(),
            &Local::now(),
            &self.reading,
        );
        self.dashboards.send_replace(dashboard.clone());
        dashboard
    }
}

/// Caches the dashboard and recomputes it after every store commit.
pub struct DashboardFeed {
    store: Arc<Store>,
    feed: Arc<Feed>,
    /// Snapshots seen by [`DashboardFeed::current`].
    seen: Mutex<watch::Receiver<Snapshot>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DashboardFeed {
    pub fn new(store: Arc<Store>, reading: ReadingSettings) -> Self {
        let mut seen = store.subscribe();
        let snapshot = seen.borrow_and_update().clone();
        let initial = Dashboard::compute(snapshot.books(), snapshot.logs(), &Local::now(), &reading);
        let (dashboards, _) = watch::channel(initial);

        Self {
            store,
            feed: Arc::new(Feed { reading, dashboards }),
            seen: Mutex::new(seen),
            task: Mutex::new(None),
        }
    }

    /// The dashboard for the latest snapshot and today's date. A stale
    /// cached value is recomputed first.
    pub fn current(&self) -> Dashboard {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let cached = self.feed.dashboards.borrow().clone();
        let store_changed = seen.has_changed().unwrap_or(false);
        let day_changed = cached.date != Local::now().date_naive();
        if !store_changed && !day_changed {
            return cached;
        }

        tracing::debug!(target: "lectern::stats", store_changed, day_changed, "recomputing dashboard");
        let snapshot = seen.borrow_and_update().clone();
        self.feed.refresh(&snapshot)
    }

    pub fn subscribe(&self) -> watch::Receiver<Dashboard> {
        self.feed.dashboards.subscribe()
    }

    /// Follow store commits until [`DashboardFeed::stop`].
    pub fn start(&self) {
        let mut snapshots = self.store.subscribe();
        let feed = Arc::clone(&self.feed);
        let task = tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                let dashboard = feed.refresh(&snapshot);
                tracing::debug!(
                    target: "lectern::stats",
                    today_pages = dashboard.today_pages,
                    streak_days = dashboard.streak_days,
                    "dashboard refreshed"
                );
            }
        });

        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }
}

impl Drop for DashboardFeed {
    fn drop(&mut self) {
        self.stop();
    }
}
