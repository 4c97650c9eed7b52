//! Rate limit window units.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Length of one rate limiting window, expressed as a single time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// One second
    Second,
    /// One minute
    #[default]
    Minute,
    /// One hour
    Hour,
    /// One day
    Day,
}

impl TimeWindow {
    /// Get the duration of this time window.
    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::Second => Duration::from_secs(1),
            TimeWindow::Minute => Duration::from_secs(60),
            TimeWindow::Hour => Duration::from_secs(3600),
            TimeWindow::Day => Duration::from_secs(86400),
        }
    }
}

impl From<TimeWindow> for Duration {
    fn from(window: TimeWindow) -> Self {
        window.duration()
    }
}
