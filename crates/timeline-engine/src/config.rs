//! TOML-based timeline configuration.
//!
//! ```toml
//! padding_days = 3
//! granularity = "week"
//!
//! [work_days]
//! include_saturday = false
//! include_sunday = false
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};

use crate::calendar::WorkDayPolicy;
use crate::columns::Granularity;
use crate::error::{Result, TimelineError};

/// Bounds for `padding_days`. Bars are offset one day cell to the right, so
/// at least one day of padding keeps the last item's bar on the axis.
pub const MIN_PADDING_DAYS: u32 = 1;
pub const MAX_PADDING_DAYS: u32 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Days added on each side of the items' span so bars never touch the
    /// axis edges.
    #[serde(default = "default_padding_days")]
    pub padding_days: u32,
    /// Initial zoom level.
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub work_days: WorkDayPolicy,
}

fn default_padding_days() -> u32 {
    3
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            padding_days: default_padding_days(),
            granularity: Granularity::default(),
            work_days: WorkDayPolicy::default(),
        }
    }
}

impl TimelineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::InvalidConfig`] on malformed TOML or an
    /// out-of-range value.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| TimelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| TimelineError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_PADDING_DAYS..=MAX_PADDING_DAYS).contains(&self.padding_days) {
            return Err(TimelineError::InvalidConfig(format!(
                "padding_days {} outside {}..={}",
                self.padding_days, MIN_PADDING_DAYS, MAX_PADDING_DAYS
            )));
        }
        Ok(())
    }
}
