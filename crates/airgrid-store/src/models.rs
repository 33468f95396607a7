//! Insert models for records whose ids are assigned by the database.

use time::{Date, Time};

use airgrid_types::{Availability, PollutantLevels, Region};

/// A feedback report about to be stored. Always inserted as `Unassigned`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub reporter: String,
    pub province_id: i64,
    pub city_id: i64,
    pub address: String,
    pub description: String,
    pub estimated_grade: u8,
    pub submitted_date: Date,
    pub submitted_time: Time,
}

impl NewFeedback {
    pub fn region(&self) -> Region {
        Region::new(self.province_id, self.city_id)
    }
}

/// An inspector about to be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInspector {
    pub name: String,
    pub code: String,
    pub province_id: i64,
    pub city_id: i64,
    pub tel: String,
    pub availability: Availability,
    pub remarks: Option<String>,
}

/// A classified measurement about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeasurement {
    pub province_id: i64,
    pub city_id: i64,
    pub address: String,
    pub so2_value: i64,
    pub co_value: i64,
    pub spm_value: i64,
    /// Levels derived from the three values.
    pub levels: PollutantLevels,
    pub confirm_date: Date,
    pub confirm_time: Time,
    pub inspector_id: i64,
    pub feedback_id: Option<i64>,
    pub reporter: Option<String>,
    pub notes: String,
    pub remarks: Option<String>,
}
