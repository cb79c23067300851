//! Time-axis column generation.
//!
//! A [`DateRange`] is cut into labelled [`Column`]s at a chosen
//! [`Granularity`]. Columns tile the range exactly: the first starts on
//! `range.start()`, the last ends on `range.end()`, and each column starts
//! the day after its predecessor ends. Week and month columns are aligned to
//! calendar boundaries and clipped at the range edges, so a partial leading
//! or trailing period still gets a column of its own.
//!
//! Columns are recomputed from scratch on every call.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{end_of_month, end_of_week, DateRange};

/// Zoom level of the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    #[default]
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// One labelled segment of the time axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Column {
    /// Inclusive length in days.
    pub fn days(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Cut `range` into columns at `granularity`.
///
/// - `Day`: one column per day, labelled with the day of month (`"7"`, `"31"`)
/// - `Week`: one column per ISO week touched, labelled `W<week number>`
/// - `Month`: one column per month touched, labelled `Jan`, `Feb`, ...
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use timeline_engine::calendar::DateRange;
/// use timeline_engine::columns::{generate_columns, Granularity};
///
/// let range = DateRange::new(
///     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
/// )
/// .unwrap();
/// let labels: Vec<String> = generate_columns(&range, Granularity::Month)
///     .into_iter()
///     .map(|c| c.label)
///     .collect();
/// assert_eq!(labels, ["Jan", "Feb", "Mar"]);
/// ```
pub fn generate_columns(range: &DateRange, granularity: Granularity) -> Vec<Column> {
    match granularity {
        Granularity::Day => bucket(range, |d| d, |d| d.day().to_string()),
        Granularity::Week => bucket(range, end_of_week, |d| format!("W{}", d.iso_week().week())),
        Granularity::Month => bucket(range, end_of_month, |d| d.format("%b").to_string()),
    }
}

/// Walk the range period by period. `period_end` maps a date to the last day
/// of the period containing it; `label` names the period from its first
/// in-range day.
fn bucket<E, L>(range: &DateRange, period_end: E, label: L) -> Vec<Column>
where
    E: Fn(NaiveDate) -> NaiveDate,
    L: Fn(NaiveDate) -> String,
{
    let mut columns = Vec::new();
    let mut cursor = range.start();
    loop {
        let end = period_end(cursor).min(range.end());
        columns.push(Column {
            label: label(cursor),
            start: cursor,
            end,
        });
        if end >= range.end() {
            break;
        }
        match end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    columns
}
