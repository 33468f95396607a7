//! Confirmed on-site measurements.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{Date, Time};

use crate::classification::{Level, PollutantLevels};
use crate::inspector::Region;

/// A classified measurement recorded by an inspector.
///
/// Values are stored as submitted; levels are derived from the range table
/// in effect when the measurement was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    pub id: i64,
    pub province_id: i64,
    pub city_id: i64,
    pub address: String,
    pub so2_value: i64,
    pub so2_level: Level,
    pub co_value: i64,
    pub co_level: Level,
    pub spm_value: i64,
    pub spm_level: Level,
    /// Worst of the three channel levels.
    pub overall_level: Level,
    #[cfg_attr(feature = "serde", serde(with = "crate::wire::date"))]
    pub confirm_date: Date,
    #[cfg_attr(feature = "serde", serde(with = "crate::wire::time_of_day"))]
    pub confirm_time: Time,
    pub inspector_id: i64,
    /// Feedback this measurement confirms, if it was taken for one.
    pub feedback_id: Option<i64>,
    /// Supervisor who reported the confirmed feedback.
    pub reporter: Option<String>,
    /// Inspector's notes from the site.
    pub notes: String,
    pub remarks: Option<String>,
}

impl Measurement {
    #[must_use]
    pub fn region(&self) -> Region {
        Region::new(self.province_id, self.city_id)
    }

    #[must_use]
    pub fn levels(&self) -> PollutantLevels {
        PollutantLevels {
            so2: self.so2_level,
            co: self.co_level,
            spm: self.spm_level,
            overall: self.overall_level,
        }
    }
}
