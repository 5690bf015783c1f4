//! LifeTableCache: rendered table persisted for the current local day
//!
//! Durable footprint:
//! - one image slot (`life_table_cache.png`)
//! - `life_table_cache_timestamp`: epoch millis of the render
//! - `life_table_cache_version`: rasterizer version stamp
//!
//! The slot and the timestamp form one entry; if either half is missing or
//! unreadable the entry does not exist.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};
use weekstore::{SettingsStore, SlotStore};

use crate::clock::{same_local_day, week_fraction, Clock};
use crate::error::CaptureError;
use crate::geometry::{LifeStats, TableGeometry};
use crate::render::{PngRasterizer, Rasterizer};
use crate::stats::CacheStats;

/// Names of the persisted cache halves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Slot holding the rendered image
    pub image_file: String,
    /// Settings key holding the render timestamp
    pub timestamp_key: String,
    /// Settings key holding the rasterizer version
    pub version_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            image_file: "life_table_cache.png".to_string(),
            timestamp_key: "life_table_cache_timestamp".to_string(),
            version_key: "life_table_cache_version".to_string(),
        }
    }
}

/// A persisted render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCacheEntry {
    /// Where the image lives
    pub image_path: PathBuf,
    /// When it was rendered (epoch millis)
    pub created_at_millis: i64,
}

impl RenderCacheEntry {
    /// Reference handed to image consumers
    pub fn image_ref(&self) -> ImageRef {
        ImageRef {
            path: self.image_path.clone(),
            version: self.created_at_millis,
        }
    }
}

/// Displayable reference to a cached render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Image file path
    pub path: PathBuf,
    /// Cache-busting token (render timestamp)
    pub version: i64,
}

impl ImageRef {
    /// `file://` URI with a `?v=` query that changes on every render
    pub fn uri(&self) -> String {
        format!("file://{}?v={}", self.path.display(), self.version)
    }
}

/// Outcome of a cache probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Rendered today by the current rasterizer
    Fresh(RenderCacheEntry),
    /// No usable entry
    Cold,
    /// Entry from an earlier day or an older rasterizer
    Stale,
}

impl Freshness {
    /// Whether the table has to be rendered again
    pub fn needs_render(&self) -> bool {
        !matches!(self, Freshness::Fresh(_))
    }
}

/// Day-scoped cache of the rendered life table
pub struct LifeTableCache {
    /// Holds the timestamp and version halves
    settings: Arc<SettingsStore>,

    /// Holds the image half
    slots: SlotStore,

    rasterizer: Arc<dyn Rasterizer>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
}

impl LifeTableCache {
    /// Create a cache drawing with `PngRasterizer`
    ///
    /// # Arguments
    /// * `settings` - Key-value store for the timestamp
    /// * `slots` - Document directory for the image
    /// * `clock` - Source of "now" and of the local calendar
    pub fn new(settings: Arc<SettingsStore>, slots: SlotStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            slots,
            rasterizer: Arc::new(PngRasterizer::default()),
            clock,
            config: CacheConfig::default(),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Replace the rasterizer
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Replace the file and key names
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Check whether a usable render exists for today
    ///
    /// Read-only. Every read failure degrades to `Cold`.
    pub fn probe(&self) -> Freshness {
        let freshness = self.check();
        if freshness.needs_render() {
            self.stats.record_miss();
        } else {
            self.stats.record_hit();
        }
        freshness
    }

    fn check(&self) -> Freshness {
        let created_at_millis = match self.settings.get(&self.config.timestamp_key) {
            Ok(Some(raw)) => match raw.parse::<i64>() {
                Ok(millis) => millis,
                Err(e) => {
                    debug!("Unreadable cache timestamp {:?}: {}", raw, e);
                    return Freshness::Cold;
                }
            },
            Ok(None) => return Freshness::Cold,
            Err(e) => {
                debug!("Failed to read cache timestamp: {}", e);
                return Freshness::Cold;
            }
        };

        match self.slots.size(&self.config.image_file) {
            Ok(len) if len > 0 => {}
            Ok(_) => {
                debug!("Cached image is empty");
                return Freshness::Cold;
            }
            Err(e) => {
                debug!("Cached image unavailable: {}", e);
                return Freshness::Cold;
            }
        }

        let image_path = match self.slots.path(&self.config.image_file) {
            Ok(path) => path,
            Err(e) => {
                debug!("Invalid cache image name: {}", e);
                return Freshness::Cold;
            }
        };

        let version = self
            .settings
            .get(&self.config.version_key)
            .ok()
            .flatten()
            .and_then(|raw| raw.parse::<u32>().ok());
        if version != Some(self.rasterizer.version()) {
            debug!(
                "Cached render version {:?} differs from {}",
                version,
                self.rasterizer.version()
            );
            return Freshness::Stale;
        }

        if self.clock.local_datetime(created_at_millis).is_none() {
            return Freshness::Cold;
        }
        if !same_local_day(self.clock.as_ref(), created_at_millis, self.clock.now_millis()) {
            return Freshness::Stale;
        }

        Freshness::Fresh(RenderCacheEntry {
            image_path,
            created_at_millis,
        })
    }

    /// Draw, capture and persist a new render
    ///
    /// A failed capture or image write leaves any earlier entry as it was. A
    /// failed timestamp write removes the new image, so the entry reads Cold.
    pub fn render(&self, stats: LifeStats) -> Result<ImageRef, CaptureError> {
        let geometry = TableGeometry::compute(stats);
        let now_millis = self.clock.now_millis();
        let fraction = self
            .clock
            .local_datetime(now_millis)
            .map(week_fraction)
            .unwrap_or(0.0);

        let png = match self.rasterizer.capture(stats, &geometry, fraction) {
            Ok(png) if png.is_empty() => Err(CaptureError::EmptySnapshot),
            other => other,
        }
        .and_then(|png| {
            self.slots
                .write(&self.config.image_file, &png)
                .map(|path| (path, png.len()))
                .map_err(CaptureError::from)
        });

        let (image_path, size) = match png {
            Ok(written) => written,
            Err(e) => {
                self.stats.record_capture_failure();
                warn!("Life table capture failed: {}", e);
                return Err(e);
            }
        };

        // The image and its timestamp are one entry. Without a new timestamp
        // the new image must not sit next to an older one.
        if let Err(e) = self
            .settings
            .set(&self.config.timestamp_key, &now_millis.to_string())
        {
            self.stats.record_capture_failure();
            warn!("Failed to store cache timestamp, dropping render: {}", e);
            if let Err(remove_err) = self.slots.remove(&self.config.image_file) {
                warn!("Failed to delete orphaned cache image: {}", remove_err);
            }
            return Err(e.into());
        }
        if let Err(e) = self
            .settings
            .set(&self.config.version_key, &self.rasterizer.version().to_string())
        {
            // An old or missing stamp only makes the next probe Stale
            warn!("Failed to store cache version: {}", e);
        }

        self.stats.record_render();
        info!(
            "Rendered life table: {} of {} weeks, {}x{} px, {} bytes",
            stats.weeks_lived(),
            stats.total_weeks(),
            geometry.full_width,
            geometry.full_height,
            size
        );

        Ok(RenderCacheEntry {
            image_path,
            created_at_millis: now_millis,
        }
        .image_ref())
    }

    /// Serve today's render, rendering first if there is none
    pub fn ensure(&self, stats: LifeStats) -> Result<ImageRef, CaptureError> {
        match self.probe() {
            Freshness::Fresh(entry) => Ok(entry.image_ref()),
            Freshness::Cold | Freshness::Stale => self.render(stats),
        }
    }

    /// Discard the cached render
    ///
    /// Idempotent. Delete failures are logged, never returned.
    pub fn invalidate(&self) {
        match self.slots.remove(&self.config.image_file) {
            Ok(removed) => debug!("Invalidated cache image (present: {})", removed),
            Err(e) => warn!("Failed to delete cached image: {}", e),
        }

        for key in [&self.config.timestamp_key, &self.config.version_key] {
            if let Err(e) = self.settings.remove(key) {
                warn!("Failed to remove {}: {}", key, e);
            }
        }

        self.stats.record_invalidation();
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Names of the persisted halves
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    use crate::clock::FixedClock;

    struct Harness {
        dir: TempDir,
        settings: Arc<SettingsStore>,
        slots: SlotStore,
        clock: Arc<FixedClock>,
    }

    impl Harness {
        fn new(now: NaiveDateTime) -> Self {
            let dir = TempDir::new().unwrap();
            let settings = Arc::new(SettingsStore::open(dir.path()).unwrap());
            let slots = SlotStore::open(dir.path().join("documents")).unwrap();
            Self {
                dir,
                settings,
                slots,
                clock: Arc::new(FixedClock::at_utc(now)),
            }
        }

        fn cache(&self) -> LifeTableCache {
            LifeTableCache::new(
                Arc::clone(&self.settings),
                self.slots.clone(),
                self.clock.clone(),
            )
        }
    }

    struct BrokenRasterizer {
        output: Option<Vec<u8>>,
    }

    impl Rasterizer for BrokenRasterizer {
        fn capture(&self, _: LifeStats, g: &TableGeometry, _: f64) -> Result<Vec<u8>, CaptureError> {
            match &self.output {
                Some(bytes) => Ok(bytes.clone()),
                None => Err(CaptureError::SurfaceNotReady {
                    width: g.full_width,
                    height: g.full_height,
                }),
            }
        }
    }

    struct NextVersion;

    impl Rasterizer for NextVersion {
        fn capture(&self, s: LifeStats, g: &TableGeometry, f: f64) -> Result<Vec<u8>, CaptureError> {
            PngRasterizer::default().capture(s, g, f)
        }

        fn version(&self) -> u32 {
            crate::render::RENDER_VERSION + 1
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn stats() -> LifeStats {
        LifeStats::new(2600, 4160).unwrap()
    }

    #[test]
    fn test_cold_start_then_fresh() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache();

        assert_eq!(cache.probe(), Freshness::Cold);

        let image = cache.render(stats()).unwrap();
        assert!(image.path.is_file());
        assert!(h.settings.contains_key("life_table_cache_timestamp"));
        assert_eq!(
            h.settings.get("life_table_cache_version").unwrap(),
            Some(crate::render::RENDER_VERSION.to_string())
        );

        match cache.probe() {
            Freshness::Fresh(entry) => {
                assert_eq!(entry.image_ref(), image);
                assert_eq!(entry.created_at_millis, h.clock.now_millis());
            }
            other => panic!("expected fresh, got {:?}", other),
        }
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn test_fresh_survives_restart() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        h.cache().render(stats()).unwrap();

        let reopened = LifeTableCache::new(
            Arc::new(SettingsStore::open(h.settings.path().parent().unwrap()).unwrap()),
            h.slots.clone(),
            h.clock.clone(),
        );
        h.clock.advance(Duration::hours(10));

        assert!(matches!(reopened.probe(), Freshness::Fresh(_)));
    }

    #[test]
    fn test_day_rollover_is_stale() {
        let h = Harness::new(at(2024, 3, 10, 23, 59));
        let cache = h.cache();
        cache.render(stats()).unwrap();

        h.clock.advance(Duration::minutes(2));

        assert_eq!(cache.probe(), Freshness::Stale);
    }

    #[test]
    fn test_same_day_late_evening_is_fresh() {
        let h = Harness::new(at(2024, 3, 10, 0, 1));
        let cache = h.cache();
        cache.render(stats()).unwrap();

        h.clock.set_local(at(2024, 3, 10, 23, 59));

        assert!(matches!(cache.probe(), Freshness::Fresh(_)));
    }

    #[test]
    fn test_missing_half_is_cold() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache();

        cache.render(stats()).unwrap();
        h.settings.remove("life_table_cache_timestamp").unwrap();
        assert_eq!(cache.probe(), Freshness::Cold);

        cache.render(stats()).unwrap();
        h.slots.remove("life_table_cache.png").unwrap();
        assert_eq!(cache.probe(), Freshness::Cold);
    }

    #[test]
    fn test_unreadable_timestamp_is_cold() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache();
        cache.render(stats()).unwrap();

        h.settings.set("life_table_cache_timestamp", "yesterday").unwrap();
        assert_eq!(cache.probe(), Freshness::Cold);

        h.settings.close();
        assert_eq!(cache.probe(), Freshness::Cold);
    }

    #[test]
    fn test_version_mismatch_is_stale() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        h.cache().render(stats()).unwrap();

        let upgraded = h.cache().with_rasterizer(Arc::new(NextVersion));
        assert_eq!(upgraded.probe(), Freshness::Stale);

        upgraded.render(stats()).unwrap();
        assert!(matches!(upgraded.probe(), Freshness::Fresh(_)));
    }

    #[test]
    fn test_capture_failure_keeps_previous_entry() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let first = h.cache().render(stats()).unwrap();
        let before = h.slots.read("life_table_cache.png").unwrap();

        h.clock.advance(Duration::minutes(5));

        for output in [None, Some(Vec::new())] {
            let broken = h.cache().with_rasterizer(Arc::new(BrokenRasterizer { output }));
            assert!(broken.render(stats()).is_err());
            assert_eq!(broken.stats().capture_failures(), 1);
            assert_eq!(broken.stats().renders(), 0);
        }

        match h.cache().probe() {
            Freshness::Fresh(entry) => assert_eq!(entry.image_ref(), first),
            other => panic!("expected fresh, got {:?}", other),
        }
        assert_eq!(h.slots.read("life_table_cache.png").unwrap(), before);
    }

    #[test]
    fn test_image_write_failure_keeps_previous_entry() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache();
        let first = cache.render(stats()).unwrap();

        // A directory squatting on the temp name makes the slot write fail
        std::fs::create_dir(h.dir.path().join("documents/.life_table_cache.png.tmp")).unwrap();
        h.clock.advance(Duration::hours(1));

        assert!(matches!(cache.render(stats()), Err(CaptureError::Store(_))));
        assert_eq!(cache.stats().capture_failures(), 1);
        match cache.probe() {
            Freshness::Fresh(entry) => assert_eq!(entry.image_ref(), first),
            other => panic!("expected fresh, got {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_write_failure_leaves_entry_cold() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache();
        cache.render(stats()).unwrap();

        // Settings writes fail from here on
        std::fs::create_dir(h.dir.path().join(".settings.wkv.tmp")).unwrap();
        h.clock.advance(Duration::hours(1));

        assert!(matches!(cache.render(stats()), Err(CaptureError::Store(_))));
        assert_eq!(cache.stats().renders(), 1);
        assert!(!h.slots.exists("life_table_cache.png"));
        assert_eq!(cache.probe(), Freshness::Cold);
    }

    #[test]
    fn test_capture_failure_on_cold_cache_stays_cold() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let broken = h
            .cache()
            .with_rasterizer(Arc::new(BrokenRasterizer { output: None }));

        assert!(matches!(
            broken.render(stats()),
            Err(CaptureError::SurfaceNotReady { .. })
        ));
        assert_eq!(broken.probe(), Freshness::Cold);
        assert!(!h.settings.contains_key("life_table_cache_timestamp"));
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache();

        cache.invalidate();
        assert_eq!(cache.probe(), Freshness::Cold);

        cache.render(stats()).unwrap();
        cache.invalidate();
        cache.invalidate();

        assert_eq!(cache.probe(), Freshness::Cold);
        assert!(!h.slots.exists("life_table_cache.png"));
        assert!(!h.settings.contains_key("life_table_cache_timestamp"));
        assert!(!h.settings.contains_key("life_table_cache_version"));
        assert_eq!(cache.stats().invalidations(), 3);
    }

    #[test]
    fn test_ensure_renders_once_per_day() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache();

        let first = cache.ensure(stats()).unwrap();
        h.clock.advance(Duration::hours(1));
        let second = cache.ensure(stats()).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.stats().renders(), 1);

        h.clock.advance(Duration::days(1));
        let third = cache.ensure(stats()).unwrap();
        assert_ne!(third.version, first.version);
        assert_eq!(cache.stats().renders(), 2);
    }

    #[test]
    fn test_uri_busts_cache() {
        let image = ImageRef {
            path: PathBuf::from("/data/documents/life_table_cache.png"),
            version: 1_710_061_200_000,
        };
        assert_eq!(
            image.uri(),
            "file:///data/documents/life_table_cache.png?v=1710061200000"
        );
    }

    #[test]
    fn test_custom_names() {
        let h = Harness::new(at(2024, 3, 10, 9, 0));
        let cache = h.cache().with_config(CacheConfig {
            image_file: "table_v2.png".to_string(),
            timestamp_key: "table_v2_ts".to_string(),
            version_key: "table_v2_ver".to_string(),
        });

        cache.render(stats()).unwrap();
        assert!(h.slots.exists("table_v2.png"));
        assert!(h.settings.contains_key("table_v2_ts"));
        assert_eq!(h.cache().probe(), Freshness::Cold);
    }
}
