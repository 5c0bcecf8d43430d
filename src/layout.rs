//! Time-grid geometry for the day and week calendar views.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::error::AppError;
use crate::models::ClockTime;

pub const DEFAULT_PIXELS_PER_HOUR: f64 = 60.0;
pub const DEFAULT_GRID_START_HOUR: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    pub pixels_per_hour: f64,
    pub grid_start_hour: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            pixels_per_hour: DEFAULT_PIXELS_PER_HOUR,
            grid_start_hour: DEFAULT_GRID_START_HOUR,
        }
    }
}

impl GridConfig {
    pub fn place(&self, start: ClockTime, end: ClockTime) -> Placement {
        layout(start, end, self.pixels_per_hour, self.grid_start_hour)
    }
}

/// Vertical position and height of a block, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub offset: f64,
    pub extent: f64,
}

/// Maps a time range onto the grid.
///
/// Precondition: `start < end`. Inverted ranges are not rejected here and
/// yield a zero or negative extent.
pub fn layout(start: ClockTime, end: ClockTime, pixels_per_hour: f64, grid_start_hour: f64) -> Placement {
    let start_hours = start.fractional_hours();
    let end_hours = end.fractional_hours();
    Placement {
        offset: (start_hours - grid_start_hour) * pixels_per_hour,
        extent: (end_hours - start_hours) * pixels_per_hour,
    }
}

/// Same as [`layout`] but for raw `"HH:MM"` strings.
pub fn layout_str(start: &str, end: &str, pixels_per_hour: f64, grid_start_hour: f64) -> Result<Placement, AppError> {
    Ok(layout(start.parse()?, end.parse()?, pixels_per_hour, grid_start_hour))
}

/// `count` consecutive days starting at the Sunday on or before `anchor`.
pub fn week_days(anchor: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let back = u64::from(anchor.weekday().num_days_from_sunday());
    let sunday = anchor.checked_sub_days(Days::new(back)).unwrap_or(anchor);
    sunday.iter_days().take(count).collect()
}

/// 1-based week index of `date` within the semester. Never below 1.
pub fn week_number(semester_start: NaiveDate, date: NaiveDate) -> u32 {
    let days = (date - semester_start).num_days().unsigned_abs();
    u32::try_from(days / 7).map_or(u32::MAX, |w| w.saturating_add(1))
}
