//! Background lookup pipeline: pending requests, the rate-limited fetch
//! worker that drains them, the callers waiting on results, and the periodic
//! expiry sweep.

pub mod jobs;
pub mod queue;
pub mod sweeper;
pub mod waiters;
pub mod worker;

use crate::cache::ColorCache;
use crate::config::{LookupConfig, Settings};
use crate::host::{AccountColors, MessageStore};
use parking_lot::RwLock;
use std::sync::Arc;

pub use jobs::{WorkerMetrics, WorkerState, WorkerStatus, WorkerTracker};
pub use queue::{FetchQueue, LookupRequest};
pub use sweeper::run_sweeper;
pub use waiters::Waiters;
pub use worker::{FetchWorker, select_color};

/// State shared between the lookup façade, the fetch worker and the sweeper.
pub struct Pipeline {
    pub config: LookupConfig,
    settings: RwLock<Settings>,
    pub cache: ColorCache,
    pub queue: FetchQueue,
    pub waiters: Waiters,
    pub messages: Arc<dyn MessageStore>,
    pub accounts: Arc<dyn AccountColors>,
    /// Host account of the local user; lookups sent by it mark the author as owned.
    pub current_user_id: Option<String>,
    pub tracker: WorkerTracker,
}

impl Pipeline {
    pub fn new(
        config: LookupConfig,
        settings: Settings,
        messages: Arc<dyn MessageStore>,
        accounts: Arc<dyn AccountColors>,
        current_user_id: Option<String>,
    ) -> Self {
        let cache = ColorCache::new(config.color_ttl);
        Self {
            config,
            settings: RwLock::new(settings),
            cache,
            queue: FetchQueue::new(),
            waiters: Waiters::new(),
            messages,
            accounts,
            current_user_id,
            tracker: WorkerTracker::new(),
        }
    }

    pub fn settings(&self) -> Settings {
        *self.settings.read()
    }

    /// Replaces the settings. If the change affects colors, the cache is
    /// cleared before the new settings become visible to anyone.
    /// Returns whether the cache was cleared.
    pub fn update_settings(&self, settings: Settings) -> bool {
        let mut current = self.settings.write();
        let invalidate = current.invalidates_colors(&settings);
        if invalidate {
            self.cache.clear();
            log::info!(
                "settings: color mode {} (readable: {}), cleared cached colors",
                settings.color_mode,
                settings.readable_colors
            );
        }
        *current = settings;
        invalidate
    }
}
