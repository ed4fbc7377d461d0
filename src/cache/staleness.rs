//! Revalidate-on-interval cache for materialized post indexes.
//!
//! Each viewing mode owns one slot holding the last successfully built index.
//! A slot is fresh until its TTL elapses; the first request after that
//! rebuilds it while concurrent requests keep receiving the previous index.
//! Failed rebuilds never clear a slot, so readers fall back to the last
//! known good index and the next request tries again.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::{counter, histogram};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::application::index::{IndexMaterializer, MaterializeError};
use crate::domain::entities::PostIndex;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::staleness";
const METRIC_HIT: &str = "folio_index_cache_hit_total";
const METRIC_MISS: &str = "folio_index_cache_miss_total";
const METRIC_STALE_SERVED: &str = "folio_index_cache_stale_served_total";
const METRIC_REFRESH_FAILED: &str = "folio_index_refresh_failed_total";
const METRIC_MATERIALIZE_MS: &str = "folio_index_materialize_ms";

/// Where a slot sits in its fresh → stale → refreshing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Nothing has been built yet.
    Empty,
    Fresh,
    /// Past its TTL or invalidated; the next request rebuilds it.
    Stale,
    /// A rebuild is in flight.
    Refreshing,
}

/// Raised only when a rebuild fails and no earlier index exists to fall back on.
#[derive(Debug, Error)]
#[error("no {mode} post index is available")]
pub struct IndexUnavailable {
    pub mode: &'static str,
    #[source]
    pub source: MaterializeError,
}

pub fn mode_label(preview: bool) -> &'static str {
    if preview { "preview" } else { "published" }
}

#[derive(Clone)]
struct CachedIndex {
    index: Arc<PostIndex>,
    refreshed_at: Instant,
    expired: bool,
}

#[derive(Default)]
struct SlotState {
    cached: Option<CachedIndex>,
    /// Bumped by every invalidation, including ones that land mid-rebuild.
    generation: u64,
}

struct IndexSlot {
    ttl: Duration,
    state: RwLock<SlotState>,
    refresh: AsyncMutex<()>,
}

impl IndexSlot {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(SlotState::default()),
            refresh: AsyncMutex::new(()),
        }
    }

    fn current(&self) -> Option<CachedIndex> {
        rw_read(&self.state, SOURCE, "current").cached.clone()
    }

    fn generation(&self) -> u64 {
        rw_read(&self.state, SOURCE, "generation").generation
    }

    fn is_fresh(&self, entry: &CachedIndex, now: Instant) -> bool {
        !entry.expired && now.saturating_duration_since(entry.refreshed_at) < self.ttl
    }

    fn fresh_index(&self) -> Option<Arc<PostIndex>> {
        self.current()
            .filter(|entry| self.is_fresh(entry, Instant::now()))
            .map(|entry| entry.index)
    }

    /// Stores a rebuilt index, keeping it expired if the slot was
    /// invalidated after `generation` was read. Returns that expired flag.
    fn replace(&self, index: Arc<PostIndex>, generation: u64) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "replace");
        let expired = state.generation != generation;
        state.cached = Some(CachedIndex {
            index,
            refreshed_at: Instant::now(),
            expired,
        });
        expired
    }

    fn expire(&self) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "expire");
        state.generation = state.generation.wrapping_add(1);
        match state.cached.as_mut() {
            Some(entry) => {
                entry.expired = true;
                true
            }
            None => false,
        }
    }
}

pub struct StalenessPolicy {
    config: CacheConfig,
    materializer: IndexMaterializer,
    published: IndexSlot,
    preview: IndexSlot,
}

impl StalenessPolicy {
    pub fn new(config: CacheConfig, materializer: IndexMaterializer) -> Self {
        let published = IndexSlot::new(config.ttl(false));
        let preview = IndexSlot::new(config.ttl(true));
        Self {
            config,
            materializer,
            published,
            preview,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn slot(&self, preview: bool) -> &IndexSlot {
        if preview {
            &self.preview
        } else {
            &self.published
        }
    }

    /// Returns the index for the mode, rebuilding it when stale.
    ///
    /// While another request is rebuilding, the previous index is returned
    /// immediately. With nothing cached yet, callers wait for the in-flight
    /// build instead of starting their own.
    pub async fn get_index(&self, preview: bool) -> Result<Arc<PostIndex>, IndexUnavailable> {
        let mode = mode_label(preview);
        let slot = self.slot(preview);

        let last_good = slot.current();
        if let Some(entry) = &last_good {
            if slot.is_fresh(entry, Instant::now()) {
                counter!(METRIC_HIT, "mode" => mode).increment(1);
                return Ok(entry.index.clone());
            }
        }

        let _refresh = match &last_good {
            Some(entry) => match slot.refresh.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    counter!(METRIC_STALE_SERVED, "mode" => mode).increment(1);
                    debug!(
                        target = "folio::cache",
                        mode, "refresh in flight, serving previous index"
                    );
                    return Ok(entry.index.clone());
                }
            },
            None => slot.refresh.lock().await,
        };

        // The build we waited on may already have filled the slot.
        if let Some(index) = slot.fresh_index() {
            counter!(METRIC_HIT, "mode" => mode).increment(1);
            return Ok(index);
        }

        counter!(METRIC_MISS, "mode" => mode).increment(1);
        self.refresh(slot, preview).await
    }

    async fn refresh(
        &self,
        slot: &IndexSlot,
        preview: bool,
    ) -> Result<Arc<PostIndex>, IndexUnavailable> {
        let mode = mode_label(preview);
        let generation = slot.generation();
        let started_at = Instant::now();
        let outcome = self.materializer.materialize(preview).await;
        histogram!(METRIC_MATERIALIZE_MS, "mode" => mode)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(index) => {
                let index = Arc::new(index);
                if slot.replace(index.clone(), generation) {
                    debug!(
                        target = "folio::cache",
                        mode, "invalidated during rebuild, next request rebuilds again"
                    );
                }
                Ok(index)
            }
            Err(err) => {
                counter!(METRIC_REFRESH_FAILED, "mode" => mode).increment(1);
                match slot.current() {
                    Some(entry) => {
                        warn!(
                            target = "folio::cache",
                            mode,
                            error = %err,
                            "index rebuild failed, serving last known good index"
                        );
                        Ok(entry.index)
                    }
                    None => {
                        error!(
                            target = "folio::cache",
                            mode,
                            error = %err,
                            "index rebuild failed with nothing cached"
                        );
                        Err(IndexUnavailable { mode, source: err })
                    }
                }
            }
        }
    }

    /// Marks the mode's index stale so the next request rebuilds it.
    ///
    /// The old index is kept as the fallback should that rebuild fail.
    pub fn invalidate(&self, preview: bool) {
        let had_entry = self.slot(preview).expire();
        info!(
            target = "folio::cache",
            mode = mode_label(preview),
            had_entry,
            "index invalidated"
        );
    }

    pub fn invalidate_all(&self) {
        self.invalidate(false);
        self.invalidate(true);
    }

    pub fn freshness(&self, preview: bool) -> Freshness {
        let slot = self.slot(preview);
        if slot.refresh.try_lock().is_err() {
            return Freshness::Refreshing;
        }
        match slot.current() {
            None => Freshness::Empty,
            Some(entry) if slot.is_fresh(&entry, Instant::now()) => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }

    /// The cached index regardless of age, without triggering a rebuild.
    pub fn cached(&self, preview: bool) -> Option<Arc<PostIndex>> {
        self.slot(preview).current().map(|entry| entry.index)
    }

    /// Builds the mode's index ahead of the first request.
    pub async fn warm(&self, preview: bool) -> Result<(), IndexUnavailable> {
        let index = self.get_index(preview).await?;
        info!(
            target = "folio::cache",
            mode = mode_label(preview),
            posts = index.len(),
            "index warmed"
        );
        Ok(())
    }
}
