//! Field inspectors and the regions they cover.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A (province, city) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub province_id: i64,
    pub city_id: i64,
}

impl Region {
    #[must_use]
    pub fn new(province_id: i64, city_id: i64) -> Self {
        Self {
            province_id,
            city_id,
        }
    }

    /// Both identifiers are positive.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.province_id > 0 && self.city_id > 0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "province {} / city {}", self.province_id, self.city_id)
    }
}

/// Whether an inspector can currently take assignments.
///
/// Persisted as `0` (working) and `1` (inactive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Availability {
    #[default]
    Working,
    Inactive,
}

impl Availability {
    /// Numeric code used in storage.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Availability::Working => 0,
            Availability::Inactive => 1,
        }
    }
}

impl TryFrom<i64> for Availability {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Availability::Working),
            1 => Ok(Availability::Inactive),
            other => Err(ParseError::UnknownAvailability(other)),
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Working => write!(f, "working"),
            Availability::Inactive => write!(f, "inactive"),
        }
    }
}

/// A region-scoped field worker.
///
/// Credentials are owned by the identity collaborator and never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Inspector {
    pub id: i64,
    pub name: String,
    /// Login code issued by administrators.
    pub code: String,
    pub province_id: i64,
    pub city_id: i64,
    pub tel: String,
    pub availability: Availability,
    pub remarks: Option<String>,
}

impl Inspector {
    /// Region this inspector is responsible for.
    #[must_use]
    pub fn region(&self) -> Region {
        Region::new(self.province_id, self.city_id)
    }

    #[must_use]
    pub fn is_working(&self) -> bool {
        self.availability == Availability::Working
    }

    /// Exact province and city match.
    #[must_use]
    pub fn covers(&self, region: Region) -> bool {
        self.region() == region
    }
}
