//! Administrative regions.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Province {
    pub id: i64,
    pub name: String,
    /// Short abbreviation, e.g. "LN".
    pub abbr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct City {
    pub id: i64,
    pub name: String,
    pub province_id: i64,
}
