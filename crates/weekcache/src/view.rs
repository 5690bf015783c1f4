//! Per-table view state machine
//!
//! ```text
//! Uninitialized ──probe──> Cold | Stale ──> Rendering ──ok──> Fresh
//!                 └──────> Fresh            └──err──> Cold (retryable)
//! Fresh ──invalidate / day rollover──> Invalidated ──> Rendering
//! ```
//!
//! Probing, rendering and invalidation run on the blocking pool. A gate
//! serializes every transition, so at most one render is in flight and an
//! invalidation waits for it. Dropping a view does not cancel a render that
//! has already started; it completes and writes the cache.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{Freshness, ImageRef, LifeTableCache};
use crate::geometry::LifeStats;

/// Where a table view is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableState {
    /// Not probed yet
    Uninitialized,
    /// Probe found nothing usable, or the last render failed
    Cold,
    /// Probe found an entry from another day or rasterizer
    Stale,
    /// Cached image ready for display
    Fresh(ImageRef),
    /// A render is in flight
    Rendering,
    /// The cached entry was just discarded
    Invalidated,
}

/// What the consumer should display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutput {
    /// Show this image
    Ready(ImageRef),
    /// Show a loading state; the render failed or is not available yet
    Generating,
}

/// One visible life table
pub struct TableView {
    cache: Arc<LifeTableCache>,
    state: Mutex<TableState>,
    gate: tokio::sync::Mutex<()>,
}

impl TableView {
    /// Create a view over `cache`
    pub fn new(cache: Arc<LifeTableCache>) -> Self {
        Self {
            cache,
            state: Mutex::new(TableState::Uninitialized),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Current state
    pub fn state(&self) -> TableState {
        self.state.lock().clone()
    }

    /// Show the table: serve today's render or produce one
    pub async fn mount(&self, stats: LifeStats) -> TableOutput {
        let _gate = self.gate.lock().await;

        match self.probe().await {
            Freshness::Fresh(entry) => self.publish(entry.image_ref()),
            Freshness::Cold => {
                self.set_state(TableState::Cold);
                self.render(stats).await
            }
            Freshness::Stale => {
                self.set_state(TableState::Stale);
                self.render(stats).await
            }
        }
    }

    /// Discard the cached render and draw a new one
    ///
    /// Used after a change to the data behind `stats`.
    pub async fn invalidate(&self, stats: LifeStats) -> TableOutput {
        let _gate = self.gate.lock().await;

        self.discard().await;
        self.render(stats).await
    }

    /// Re-check freshness, redrawing if the local day has changed
    pub async fn refresh_if_day_changed(&self, stats: LifeStats) -> TableOutput {
        let _gate = self.gate.lock().await;
        let was_fresh = matches!(self.state(), TableState::Fresh(_));

        match self.probe().await {
            Freshness::Fresh(entry) => self.publish(entry.image_ref()),
            _ if was_fresh => {
                debug!("Life table expired while displayed");
                self.discard().await;
                self.render(stats).await
            }
            Freshness::Cold => {
                self.set_state(TableState::Cold);
                self.render(stats).await
            }
            Freshness::Stale => {
                self.set_state(TableState::Stale);
                self.render(stats).await
            }
        }
    }

    fn set_state(&self, state: TableState) {
        *self.state.lock() = state;
    }

    fn publish(&self, image: ImageRef) -> TableOutput {
        self.set_state(TableState::Fresh(image.clone()));
        TableOutput::Ready(image)
    }

    async fn probe(&self) -> Freshness {
        let cache = Arc::clone(&self.cache);
        match tokio::task::spawn_blocking(move || cache.probe()).await {
            Ok(freshness) => freshness,
            Err(e) => {
                warn!("Cache probe task failed: {}", e);
                Freshness::Cold
            }
        }
    }

    async fn discard(&self) {
        self.set_state(TableState::Invalidated);

        let cache = Arc::clone(&self.cache);
        if let Err(e) = tokio::task::spawn_blocking(move || cache.invalidate()).await {
            warn!("Cache invalidation task failed: {}", e);
        }
    }

    async fn render(&self, stats: LifeStats) -> TableOutput {
        self.set_state(TableState::Rendering);

        let cache = Arc::clone(&self.cache);
        match tokio::task::spawn_blocking(move || cache.render(stats)).await {
            Ok(Ok(image)) => self.publish(image),
            Ok(Err(_)) => {
                // Already logged by the cache
                self.set_state(TableState::Cold);
                TableOutput::Generating
            }
            Err(e) => {
                warn!("Render task failed: {}", e);
                self.set_state(TableState::Cold);
                TableOutput::Generating
            }
        }
    }
}
