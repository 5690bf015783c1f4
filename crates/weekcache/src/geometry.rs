//! Table geometry

use serde::Serialize;

use crate::error::StatsError;

/// Weeks drawn on one row (one row per year of life)
pub const WEEKS_PER_ROW: u32 = 52;

/// Side of one week square in pixels
pub const SQUARE_SIZE: u32 = 6;

/// Gap between adjacent squares in pixels
pub const SQUARE_SPACING: u32 = 2;

/// Height of the top gutter holding the week ticks
pub const HEADER_HEIGHT: u32 = 16;

/// Width of the left gutter holding the year ticks
pub const LABEL_GUTTER: u32 = 24;

const CELL_PITCH: u32 = SQUARE_SIZE + SQUARE_SPACING;

/// Weeks lived against weeks expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LifeStats {
    weeks_lived: u32,
    total_weeks: u32,
}

/// How a single week cell is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekClass {
    /// Fully elapsed week
    Past,
    /// The week in progress
    Current,
    /// Week not yet reached
    Future,
}

impl LifeStats {
    /// Create stats, rejecting an empty life table
    pub fn new(weeks_lived: u32, total_weeks: u32) -> Result<Self, StatsError> {
        if total_weeks == 0 {
            return Err(StatsError::ZeroTotalWeeks);
        }
        Ok(Self {
            weeks_lived,
            total_weeks,
        })
    }

    /// Completed weeks since birth
    pub fn weeks_lived(&self) -> u32 {
        self.weeks_lived
    }

    /// Total weeks in the table
    pub fn total_weeks(&self) -> u32 {
        self.total_weeks
    }

    /// Weeks left in the table, zero once the expectancy is exceeded
    pub fn weeks_remaining(&self) -> u32 {
        self.total_weeks.saturating_sub(self.weeks_lived)
    }

    /// `ceil(total_weeks / 52)`
    pub fn total_rows(&self) -> u32 {
        self.total_weeks.div_ceil(WEEKS_PER_ROW)
    }

    /// `floor(weeks_lived / 52)`
    pub fn current_week_row(&self) -> u32 {
        self.weeks_lived / WEEKS_PER_ROW
    }

    /// Classify week `index`
    pub fn classify(&self, index: u32) -> WeekClass {
        match index.cmp(&self.weeks_lived) {
            std::cmp::Ordering::Less => WeekClass::Past,
            std::cmp::Ordering::Equal => WeekClass::Current,
            std::cmp::Ordering::Greater => WeekClass::Future,
        }
    }
}

/// Pixel layout of the rendered table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableGeometry {
    /// Rows in the grid
    pub total_rows: u32,
    /// Vertical distance between row origins
    pub row_height: u32,
    /// Grid width without gutters
    pub canvas_width: u32,
    /// Grid height without gutters
    pub canvas_height: u32,
    /// Surface width including the left gutter
    pub full_width: u32,
    /// Surface height including the header
    pub full_height: u32,
}

impl TableGeometry {
    /// Compute the layout for `stats`
    pub fn compute(stats: LifeStats) -> Self {
        let total_rows = stats.total_rows();
        let canvas_width = WEEKS_PER_ROW * CELL_PITCH - SQUARE_SPACING;
        let canvas_height = total_rows * CELL_PITCH - SQUARE_SPACING;

        Self {
            total_rows,
            row_height: CELL_PITCH,
            canvas_width,
            canvas_height,
            full_width: LABEL_GUTTER + canvas_width,
            full_height: HEADER_HEIGHT + canvas_height,
        }
    }

    /// Top-left pixel of week `index` on the full surface
    pub fn cell_origin(&self, index: u32) -> (u32, u32) {
        let row = index / WEEKS_PER_ROW;
        let col = index % WEEKS_PER_ROW;
        (
            LABEL_GUTTER + col * CELL_PITCH,
            HEADER_HEIGHT + row * self.row_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_total() {
        assert_eq!(LifeStats::new(10, 0), Err(StatsError::ZeroTotalWeeks));
    }

    #[test]
    fn test_rows() {
        let cases = [
            (0, 1, 1, 0),
            (51, 52, 1, 0),
            (52, 53, 2, 1),
            (103, 104, 2, 1),
            (104, 105, 3, 2),
        ];

        for (lived, total, rows, current_row) in cases {
            let stats = LifeStats::new(lived, total).unwrap();
            assert_eq!(stats.total_rows(), rows, "total {}", total);
            assert_eq!(stats.current_week_row(), current_row, "lived {}", lived);
        }
    }

    #[test]
    fn test_fifty_of_eighty_years() {
        let stats = LifeStats::new(2600, 4160).unwrap();

        assert_eq!(stats.total_rows(), 80);
        assert_eq!(stats.current_week_row(), 50);
        assert!((0..2600).all(|i| stats.classify(i) == WeekClass::Past));
        assert_eq!(stats.classify(2600), WeekClass::Current);
        assert!((2601..4160).all(|i| stats.classify(i) == WeekClass::Future));
        assert_eq!(stats.weeks_remaining(), 1560);
    }

    #[test]
    fn test_geometry_is_deterministic() {
        for (lived, total) in [(0, 1), (2600, 4160), (5000, 4160), (7, 60)] {
            let stats = LifeStats::new(lived, total).unwrap();
            assert_eq!(TableGeometry::compute(stats), TableGeometry::compute(stats));
        }
    }

    #[test]
    fn test_geometry_dimensions() {
        let geometry = TableGeometry::compute(LifeStats::new(2600, 4160).unwrap());

        assert_eq!(geometry.row_height, 8);
        assert_eq!(geometry.canvas_width, 52 * 8 - 2);
        assert_eq!(geometry.canvas_height, 80 * 8 - 2);
        assert_eq!(geometry.full_width, LABEL_GUTTER + 414);
        assert_eq!(geometry.full_height, HEADER_HEIGHT + 638);
    }

    #[test]
    fn test_geometry_ignores_weeks_lived() {
        let young = TableGeometry::compute(LifeStats::new(0, 4160).unwrap());
        let old = TableGeometry::compute(LifeStats::new(4000, 4160).unwrap());
        assert_eq!(young, old);
    }

    #[test]
    fn test_cell_origin() {
        let geometry = TableGeometry::compute(LifeStats::new(0, 4160).unwrap());

        assert_eq!(geometry.cell_origin(0), (LABEL_GUTTER, HEADER_HEIGHT));
        assert_eq!(geometry.cell_origin(51), (LABEL_GUTTER + 51 * 8, HEADER_HEIGHT));
        assert_eq!(geometry.cell_origin(52), (LABEL_GUTTER, HEADER_HEIGHT + 8));
        assert_eq!(
            geometry.cell_origin(4159),
            (LABEL_GUTTER + 51 * 8, HEADER_HEIGHT + 79 * 8)
        );
    }
}
