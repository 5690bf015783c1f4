//! Grid rasterization
//!
//! Cells are collected into one path per class (past, future, current fill,
//! current outline, axis ticks) and each path is filled with a single call,
//! so drawing cost is one pass per class rather than one draw per week.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use crate::error::CaptureError;
use crate::geometry::{
    LifeStats, TableGeometry, WeekClass, HEADER_HEIGHT, LABEL_GUTTER, SQUARE_SIZE, WEEKS_PER_ROW,
};

/// Version stamp of the drawing code; bump when the output changes
pub const RENDER_VERSION: u32 = 1;

/// Largest surface side we are willing to allocate
const MAX_SURFACE_SIDE: u32 = 16_384;

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

/// A batch of rectangles filled with one colour
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellPath {
    rects: Vec<Rect>,
}

impl CellPath {
    /// Add a rectangle; empty rectangles are dropped
    pub fn push(&mut self, rect: Rect) {
        if rect.w > 0 && rect.h > 0 {
            self.rects.push(rect);
        }
    }

    /// Rectangles in the path
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Number of rectangles
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Check if the path is empty
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    fn outline(&mut self, r: Rect) {
        self.push(Rect { h: 1, ..r });
        self.push(Rect { y: r.y + r.h - 1, h: 1, ..r });
        self.push(Rect { w: 1, ..r });
        self.push(Rect { x: r.x + r.w - 1, w: 1, ..r });
    }
}

/// Every path needed to draw one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridPaths {
    /// Fully elapsed weeks
    pub past: CellPath,
    /// Weeks not yet reached
    pub future: CellPath,
    /// Elapsed part of the current week
    pub current_fill: CellPath,
    /// Border around the current week
    pub current_outline: CellPath,
    /// Gutter tick marks
    pub ticks: CellPath,
}

impl GridPaths {
    /// Lay out every cell of `stats`
    ///
    /// `week_fraction` is the elapsed part of the current week in `[0, 1]`.
    pub fn build(stats: LifeStats, geometry: &TableGeometry, week_fraction: f64) -> Self {
        let mut paths = GridPaths::default();

        for index in 0..stats.total_weeks() {
            let (x, y) = geometry.cell_origin(index);
            let cell = Rect {
                x,
                y,
                w: SQUARE_SIZE,
                h: SQUARE_SIZE,
            };

            match stats.classify(index) {
                WeekClass::Past => paths.past.push(cell),
                WeekClass::Future => paths.future.push(cell),
                WeekClass::Current => {
                    let filled = (week_fraction.clamp(0.0, 1.0) * SQUARE_SIZE as f64).round() as u32;
                    paths.current_fill.push(Rect {
                        w: filled.min(SQUARE_SIZE),
                        ..cell
                    });
                    paths.current_outline.outline(cell);
                }
            }
        }

        paths.add_ticks(geometry);
        paths
    }

    fn add_ticks(&mut self, geometry: &TableGeometry) {
        // Week ticks on quarter boundaries, long ones on half years
        for col in (0..WEEKS_PER_ROW).step_by(13) {
            let len = if col % 26 == 0 { 8 } else { 4 };
            let (x, _) = geometry.cell_origin(col);
            self.ticks.push(Rect {
                x: x + SQUARE_SIZE / 2,
                y: HEADER_HEIGHT - 2 - len,
                w: 1,
                h: len,
            });
        }

        // Year ticks every 5 rows, long ones every decade
        for row in (0..geometry.total_rows).step_by(5) {
            let len = if row % 10 == 0 { 10 } else { 6 };
            let (_, y) = geometry.cell_origin(row * WEEKS_PER_ROW);
            self.ticks.push(Rect {
                x: LABEL_GUTTER - 2 - len,
                y: y + SQUARE_SIZE / 2,
                w: len,
                h: 1,
            });
        }
    }
}

/// Colours used by `PngRasterizer`
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    /// Surface background
    pub background: Rgba<u8>,
    /// Elapsed weeks
    pub past: Rgba<u8>,
    /// Remaining weeks
    pub future: Rgba<u8>,
    /// Current week fill and outline
    pub current: Rgba<u8>,
    /// Gutter ticks
    pub axis: Rgba<u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba([255, 255, 255, 255]),
            past: Rgba([43, 45, 66, 255]),
            future: Rgba([229, 229, 229, 255]),
            current: Rgba([239, 35, 60, 255]),
            axis: Rgba([141, 153, 174, 255]),
        }
    }
}

/// Turns a table into encoded image bytes
pub trait Rasterizer: Send + Sync {
    /// Draw and snapshot the table
    fn capture(
        &self,
        stats: LifeStats,
        geometry: &TableGeometry,
        week_fraction: f64,
    ) -> Result<Vec<u8>, CaptureError>;

    /// Version stamp stored next to cached output
    fn version(&self) -> u32 {
        RENDER_VERSION
    }
}

/// Software rasterizer producing PNG
#[derive(Debug, Clone, Default)]
pub struct PngRasterizer {
    palette: Palette,
}

impl PngRasterizer {
    /// Rasterizer with a custom palette
    pub fn with_palette(palette: Palette) -> Self {
        Self { palette }
    }

    /// Draw the table to an in-memory surface
    pub fn draw(
        &self,
        stats: LifeStats,
        geometry: &TableGeometry,
        week_fraction: f64,
    ) -> Result<RgbaImage, CaptureError> {
        let (width, height) = (geometry.full_width, geometry.full_height);
        if width == 0 || height == 0 || width > MAX_SURFACE_SIDE || height > MAX_SURFACE_SIDE {
            return Err(CaptureError::SurfaceNotReady { width, height });
        }

        let mut surface = RgbaImage::from_pixel(width, height, self.palette.background);
        let paths = GridPaths::build(stats, geometry, week_fraction);

        fill_path(&mut surface, &paths.ticks, self.palette.axis);
        fill_path(&mut surface, &paths.past, self.palette.past);
        fill_path(&mut surface, &paths.future, self.palette.future);
        fill_path(&mut surface, &paths.current_fill, self.palette.current);
        fill_path(&mut surface, &paths.current_outline, self.palette.current);

        Ok(surface)
    }
}

impl Rasterizer for PngRasterizer {
    fn capture(
        &self,
        stats: LifeStats,
        geometry: &TableGeometry,
        week_fraction: f64,
    ) -> Result<Vec<u8>, CaptureError> {
        let surface = self.draw(stats, geometry, week_fraction)?;

        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            surface.as_raw(),
            surface.width(),
            surface.height(),
            ExtendedColorType::Rgba8,
        )?;

        if png.is_empty() {
            return Err(CaptureError::EmptySnapshot);
        }
        Ok(png)
    }
}

fn fill_path(surface: &mut RgbaImage, path: &CellPath, color: Rgba<u8>) {
    let (width, height) = surface.dimensions();

    for rect in path.rects() {
        let x_end = (rect.x + rect.w).min(width);
        let y_end = (rect.y + rect.h).min(height);
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                surface.put_pixel(x, y, color);
            }
        }
    }
}
