//! Error types for weekcache

use thiserror::Error;

/// Why a render could not produce a cache entry
///
/// None of these are fatal: the caller keeps whatever entry was cached
/// before and may retry.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The drawing surface could not be allocated at the requested size
    #[error("Surface not ready ({width}x{height})")]
    SurfaceNotReady {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// The snapshot encoded to zero bytes
    #[error("Snapshot produced no data")]
    EmptySnapshot,

    /// PNG encoding failed
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Writing the snapshot to disk failed
    #[error("Failed to store snapshot: {0}")]
    Store(#[from] weekstore::Error),
}

/// Invalid `LifeStats` input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// `total_weeks` was zero
    #[error("Total weeks must be positive")]
    ZeroTotalWeeks,
}
