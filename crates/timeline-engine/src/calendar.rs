//! Date and work-day arithmetic for the time axis.
//!
//! Every function here works on [`NaiveDate`] calendar days. Dates are treated
//! as midnight-UTC days with no timezone attached, so a date never shifts by
//! one when the host runs in a different local offset.
//!
//! All durations are **inclusive**: a range that starts and ends on the same
//! day is one day long. The rest of the engine (columns, bar geometry, work-day
//! counts) builds on that convention.
//!
//! # Functions
//!
//! - [`days_between`] — inclusive day count between two dates
//! - [`is_weekend`] / [`is_today`] — calendar-day predicates
//! - [`calculate_work_days`] — inclusive day count under a [`WorkDayPolicy`]

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};

// ── Day counting ────────────────────────────────────────────────────────────

/// Inclusive number of calendar days from `start` to `end`.
///
/// # Errors
///
/// Returns [`TimelineError::InvalidRange`] if `end` precedes `start`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use timeline_engine::calendar::days_between;
///
/// let jan1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// let jan10 = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
/// assert_eq!(days_between(jan1, jan10).unwrap(), 10);
/// assert_eq!(days_between(jan1, jan1).unwrap(), 1);
/// assert!(days_between(jan10, jan1).is_err());
/// ```
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Result<i64> {
    if end < start {
        return Err(TimelineError::InvalidRange { start, end });
    }
    Ok(end.signed_duration_since(start).num_days() + 1)
}

/// True for Saturdays and Sundays.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True if `date` is the same UTC calendar day as `now`.
///
/// The caller supplies `now` so the check stays deterministic under test.
pub fn is_today(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date == now.date_naive()
}

/// Today's UTC calendar day, read from the system clock.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ── Work days ───────────────────────────────────────────────────────────────

/// Which weekend days count toward a work-day duration.
///
/// Only the derived "duration in work days" figure uses this policy. Bar
/// geometry and columns always run on calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkDayPolicy {
    #[serde(default)]
    pub include_saturday: bool,
    #[serde(default)]
    pub include_sunday: bool,
}

impl WorkDayPolicy {
    /// Every calendar day is a work day.
    pub const ALL_DAYS: Self = Self {
        include_saturday: true,
        include_sunday: true,
    };

    /// Monday through Friday only.
    pub const WEEKDAYS: Self = Self {
        include_saturday: false,
        include_sunday: false,
    };

    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        match date.weekday() {
            Weekday::Sat => self.include_saturday,
            Weekday::Sun => self.include_sunday,
            _ => true,
        }
    }
}

/// Inclusive day count from `start` to `end`, minus every Saturday and/or
/// Sunday the policy excludes.
///
/// # Errors
///
/// Returns [`TimelineError::InvalidRange`] if `end` precedes `start`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use timeline_engine::calendar::{calculate_work_days, WorkDayPolicy};
///
/// // Mon Feb 9 .. Sun Feb 15, 2026
/// let mon = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
/// let sun = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
/// assert_eq!(calculate_work_days(mon, sun, &WorkDayPolicy::WEEKDAYS).unwrap(), 5);
/// assert_eq!(calculate_work_days(mon, sun, &WorkDayPolicy::ALL_DAYS).unwrap(), 7);
/// ```
pub fn calculate_work_days(start: NaiveDate, end: NaiveDate, policy: &WorkDayPolicy) -> Result<i64> {
    let total = days_between(start, end)?;
    Ok(work_days_from(start, total, policy))
}

fn work_days_from(start: NaiveDate, total_days: i64, policy: &WorkDayPolicy) -> i64 {
    let mut work_days = total_days;
    if !policy.include_saturday {
        work_days -= count_weekday(start, total_days, Weekday::Sat);
    }
    if !policy.include_sunday {
        work_days -= count_weekday(start, total_days, Weekday::Sun);
    }
    work_days
}

/// How many times `weekday` occurs in the `total_days` days starting at `start`.
fn count_weekday(start: NaiveDate, total_days: i64, weekday: Weekday) -> i64 {
    let first = (weekday.num_days_from_monday() as i64
        - start.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    if first >= total_days {
        0
    } else {
        (total_days - first - 1) / 7 + 1
    }
}

// ── Period boundaries ───────────────────────────────────────────────────────

/// The Monday of the ISO week containing `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// The Sunday of the ISO week containing `date`.
pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    let ahead = 6 - date.weekday().num_days_from_monday() as u64;
    date.checked_add_days(Days::new(ahead)).unwrap_or(NaiveDate::MAX)
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

// ── DateRange ───────────────────────────────────────────────────────────────

/// An inclusive span of calendar days with `start <= end`.
///
/// The fields are private so the ordering invariant holds for every value,
/// including deserialized ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RangeBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RangeBounds> for DateRange {
    type Error = TimelineError;

    fn try_from(bounds: RangeBounds) -> Result<Self> {
        DateRange::new(bounds.start, bounds.end)
    }
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`TimelineError::InvalidRange`] if `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(TimelineError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A one-day range.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        Self {
            start: start_of_month(date),
            end: end_of_month(date),
        }
    }

    /// Smallest range containing every given `(start, end)` pair, or `None`
    /// when the iterator is empty.
    pub fn covering<I>(spans: I) -> Option<Self>
    where
        I: IntoIterator<Item = (NaiveDate, NaiveDate)>,
    {
        spans.into_iter().fold(None, |acc: Option<Self>, (a, b)| {
            let lo = a.min(b);
            let hi = a.max(b);
            Some(match acc {
                Some(range) => Self {
                    start: range.start.min(lo),
                    end: range.end.max(hi),
                },
                None => Self { start: lo, end: hi },
            })
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive length in days. Always at least 1.
    pub fn days(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Widen the range by `margin` days on each side.
    pub fn padded(&self, margin: u32) -> Self {
        let margin = Days::new(u64::from(margin));
        Self {
            start: self.start.checked_sub_days(margin).unwrap_or(NaiveDate::MIN),
            end: self.end.checked_add_days(margin).unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn work_days(&self, policy: &WorkDayPolicy) -> i64 {
        work_days_from(self.start, self.days(), policy)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
