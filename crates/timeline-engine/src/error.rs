//! Error types for timeline-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("Invalid range: end {end} precedes start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid item '{id}': {reason}")]
    InvalidItem { id: String, reason: String },

    #[error("Duplicate item id: {0}")]
    DuplicateItemId(String),

    #[error("Invalid pixel width: {0}")]
    InvalidWidth(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
