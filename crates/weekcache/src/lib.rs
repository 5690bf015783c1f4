//! # weekcache
//!
//! Renders the life-in-weeks table and keeps the rendered image on disk for
//! the rest of the local calendar day.
//!
//! ## Architecture
//! - **Geometry**: pure layout from `LifeStats` and fixed pixel constants
//! - **Rasterizer**: draws the grid with one fill per cell class and encodes PNG
//! - **LifeTableCache**: probe / render / invalidate over a `SettingsStore`
//!   timestamp and a `SlotStore` image file
//! - **TableView**: async per-table state machine that serializes renders
//!   and invalidations
//!
//! ## Freshness
//! An entry is fresh while its timestamp falls on today's local calendar
//! date and its version stamp matches the rasterizer. Midnight makes it
//! stale regardless of how recently it was written.

#![warn(missing_docs)]

mod cache;
mod clock;
mod error;
mod geometry;
mod render;
mod stats;
mod view;

pub use cache::{CacheConfig, Freshness, ImageRef, LifeTableCache, RenderCacheEntry};
pub use clock::{same_local_day, week_fraction, Clock, FixedClock, SystemClock};
pub use error::{CaptureError, StatsError};
pub use geometry::{
    LifeStats, TableGeometry, WeekClass, HEADER_HEIGHT, LABEL_GUTTER, SQUARE_SIZE,
    SQUARE_SPACING, WEEKS_PER_ROW,
};
pub use render::{CellPath, GridPaths, Palette, PngRasterizer, Rasterizer, Rect, RENDER_VERSION};
pub use stats::{CacheStats, StatsSnapshot};
pub use view::{TableOutput, TableState, TableView};
