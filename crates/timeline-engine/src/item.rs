//! Timeline item records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{calculate_work_days, days_between, WorkDayPolicy};
use crate::error::{Result, TimelineError};

/// What a row represents, which decides how its bar is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Standard bar with a progress fill.
    #[default]
    Task,
    /// Zero-duration marker (diamond).
    Milestone,
    /// Group bar bracketing its children.
    Phase,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Milestone => "milestone",
            Self::Phase => "phase",
        }
    }
}

/// One row of the chart.
///
/// Items belong to the caller. The engine reads them as an immutable snapshot
/// and never writes back into one; `hierarchy_level` in particular is
/// recomputed from the `parent_id` chain rather than trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Percentage complete, 0-100.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub color: String,
    /// Weak reference to another item's `id`.
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub hierarchy_level: usize,
    #[serde(default = "default_true")]
    pub is_editable: bool,
}

fn default_true() -> bool {
    true
}

impl TimelineItem {
    fn with_kind(
        kind: ItemKind,
        id: impl Into<String>,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            start_date,
            end_date,
            progress: 0.0,
            color: String::new(),
            parent_id: None,
            hierarchy_level: 0,
            is_editable: true,
        }
    }

    pub fn task(
        id: impl Into<String>,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self::with_kind(ItemKind::Task, id, name, start_date, end_date)
    }

    pub fn phase(
        id: impl Into<String>,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self::with_kind(ItemKind::Phase, id, name, start_date, end_date)
    }

    /// A milestone sits on a single day.
    pub fn milestone(id: impl Into<String>, name: impl Into<String>, date: NaiveDate) -> Self {
        Self::with_kind(ItemKind::Milestone, id, name, date, date)
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set progress, clamped to 0-100.
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress.clamp(0.0, 100.0);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.is_editable = editable;
        self
    }

    /// Check the record's own invariants.
    ///
    /// # Errors
    ///
    /// - [`TimelineError::InvalidRange`] if `end_date` precedes `start_date`
    /// - [`TimelineError::InvalidItem`] for an empty id, a milestone spanning
    ///   more than one day, or a progress value outside 0-100
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(self.invalid("id must not be empty"));
        }
        days_between(self.start_date, self.end_date)?;
        if self.kind == ItemKind::Milestone && self.start_date != self.end_date {
            return Err(self.invalid("milestone must start and end on the same day"));
        }
        if !self.progress.is_finite() || !(0.0..=100.0).contains(&self.progress) {
            return Err(self.invalid(&format!("progress {} is outside 0-100", self.progress)));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> TimelineError {
        TimelineError::InvalidItem {
            id: self.id.clone(),
            reason: reason.to_string(),
        }
    }

    /// Inclusive calendar-day duration.
    pub fn duration_days(&self) -> Result<i64> {
        days_between(self.start_date, self.end_date)
    }

    /// Inclusive duration counting only the days `policy` treats as work days.
    pub fn work_days(&self, policy: &WorkDayPolicy) -> Result<i64> {
        calculate_work_days(self.start_date, self.end_date, policy)
    }
}
