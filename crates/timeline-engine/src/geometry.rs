//! Bar placement on the time axis.
//!
//! Positions are plain linear maps from day counts to pixels. Nothing here
//! clips or rounds; the hosting layer clamps to its viewport and snaps to
//! device pixels if it wants to.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{days_between, DateRange};
use crate::error::{Result, TimelineError};
use crate::item::{ItemKind, TimelineItem};

/// Horizontal placement of one bar, in pixels from the axis origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BarPosition {
    pub left: f64,
    pub width: f64,
}

impl BarPosition {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

fn check_width(total_pixel_width: f64) -> Result<f64> {
    if !total_pixel_width.is_finite() || total_pixel_width < 0.0 {
        return Err(TimelineError::InvalidWidth(total_pixel_width));
    }
    Ok(total_pixel_width)
}

/// Place `item` on an axis of `total_pixel_width` pixels spanning `range`.
///
/// ```text
/// left  = W * offset / range_days
/// width = W * item_days / range_days
/// ```
///
/// `offset` counts days inclusively from the range start to the item start
/// (an item starting on the range's third day has offset 3), and `item_days`
/// is the item's inclusive duration. Milestones get `width == 0`; the
/// renderer draws a fixed-size marker for them instead of a rectangle.
///
/// Items reaching outside `range` get positions outside `0..=W`.
///
/// # Errors
///
/// - [`TimelineError::InvalidRange`] if the item ends before it starts
/// - [`TimelineError::InvalidWidth`] for a negative or non-finite width
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use timeline_engine::calendar::DateRange;
/// use timeline_engine::geometry::calculate_bar_position;
/// use timeline_engine::item::TimelineItem;
///
/// let d = |day| NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
/// let range = DateRange::new(d(1), d(10)).unwrap();
/// let item = TimelineItem::task("a", "A", d(3), d(5));
/// let bar = calculate_bar_position(&item, &range, 1000.0).unwrap();
/// assert_eq!(bar.left, 300.0);
/// assert_eq!(bar.width, 300.0);
/// ```
pub fn calculate_bar_position(
    item: &TimelineItem,
    range: &DateRange,
    total_pixel_width: f64,
) -> Result<BarPosition> {
    let total_pixel_width = check_width(total_pixel_width)?;
    let item_days = days_between(item.start_date, item.end_date)?;
    let range_days = range.days() as f64;

    let offset = item.start_date.signed_duration_since(range.start()).num_days() + 1;
    let left = total_pixel_width * offset as f64 / range_days;
    let width = match item.kind {
        ItemKind::Task | ItemKind::Phase => total_pixel_width * item_days as f64 / range_days,
        ItemKind::Milestone => 0.0,
    };

    Ok(BarPosition { left, width })
}

/// The day cell under horizontal pixel `x`, clamped to the range.
///
/// Cells follow the same inclusive offset as [`calculate_bar_position`]: the
/// cell of the range's `k`-th day (counting from 0) spans
/// `W * (k + 1) / range_days .. W * (k + 2) / range_days`, so a click inside
/// a drawn bar lands on a day the bar covers.
///
/// # Errors
///
/// Returns [`TimelineError::InvalidWidth`] for a zero, negative or
/// non-finite width.
pub fn date_at_x(x: f64, range: &DateRange, total_pixel_width: f64) -> Result<NaiveDate> {
    let total_pixel_width = check_width(total_pixel_width)?;
    if total_pixel_width == 0.0 {
        return Err(TimelineError::InvalidWidth(total_pixel_width));
    }
    let last = range.days() - 1;
    let cell = if x.is_finite() {
        ((x / total_pixel_width) * range.days() as f64).floor() as i64 - 1
    } else {
        0
    };
    let cell = cell.clamp(0, last) as u64;
    Ok(range
        .start()
        .checked_add_days(Days::new(cell))
        .unwrap_or(range.end()))
}

/// Horizontal centre of `today`'s day cell, or `None` when the cell is not
/// on the axis.
///
/// Uses the cell layout of [`date_at_x`]. The range's last day has its cell
/// past `W` and so gets no marker.
pub fn today_marker_x(today: NaiveDate, range: &DateRange, total_pixel_width: f64) -> Option<f64> {
    if !range.contains(today) || today == range.end() {
        return None;
    }
    let cell = today.signed_duration_since(range.start()).num_days() as f64 + 1.0;
    let cell_width = total_pixel_width / range.days() as f64;
    Some(cell * cell_width + cell_width / 2.0)
}
