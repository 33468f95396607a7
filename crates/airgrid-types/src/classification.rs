//! Pollutant concentration classification.
//!
//! A [`RangeTable`] maps raw concentrations of the three monitored pollutant
//! channels onto discrete severity [`Level`]s. Tables are validated when they
//! are built: for every channel the ranges, taken in level order, must start
//! at zero and follow each other without gaps or overlaps. Classification is
//! therefore a total function over the table's domain and fails only for
//! values outside it.
//!
//! # Example
//!
//! ```
//! use airgrid_types::{Level, Pollutant, RangeTable, combine};
//!
//! let table = RangeTable::standard();
//!
//! let so2 = table.classify(Pollutant::So2, 30)?;
//! let co = table.classify(Pollutant::Co, 2)?;
//! let spm = table.classify(Pollutant::Spm, 40)?;
//!
//! assert_eq!(combine(so2, co, spm), Level::new(2));
//! # Ok::<(), airgrid_types::ClassifyError>(())
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ParseError;

/// One of the three monitored pollutant channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Pollutant {
    /// Sulphur dioxide.
    So2,
    /// Carbon monoxide.
    Co,
    /// Suspended particulate matter.
    Spm,
}

impl Pollutant {
    /// All channels, in reporting order.
    pub const ALL: [Pollutant; 3] = [Pollutant::So2, Pollutant::Co, Pollutant::Spm];

    /// Short machine name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Pollutant::So2 => "so2",
            Pollutant::Co => "co",
            Pollutant::Spm => "spm",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pollutant::So2 => write!(f, "SO2"),
            Pollutant::Co => write!(f, "CO"),
            Pollutant::Spm => write!(f, "SPM"),
        }
    }
}

impl core::str::FromStr for Pollutant {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "so2" => Ok(Pollutant::So2),
            "co" => Ok(Pollutant::Co),
            "spm" => Ok(Pollutant::Spm),
            _ => Err(ParseError::UnknownPollutant(s.to_string())),
        }
    }
}

/// Ordinal severity level. Higher is worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i64", into = "u8"))]
pub struct Level(u8);

impl Level {
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Level {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .map(Level)
            .ok_or(ParseError::InvalidLevel(value))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Combine per-pollutant levels into the overall level.
///
/// The worst pollutant dominates.
#[must_use]
pub fn combine(so2: Level, co: Level, spm: Level) -> Level {
    so2.max(co).max(spm)
}

/// Inclusive concentration bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// A classification rule: one level with its bounds on every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PollutantRange {
    pub level: Level,
    /// Short name, e.g. "Good".
    pub label: String,
    /// Display color as `#rrggbb`.
    pub color: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub health_impact: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub take_steps: String,
    pub so2: Bounds,
    pub co: Bounds,
    pub spm: Bounds,
}

impl PollutantRange {
    /// Bounds for a single channel.
    #[must_use]
    pub fn bounds(&self, pollutant: Pollutant) -> Bounds {
        match pollutant {
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
            Pollutant::Spm => self.spm,
        }
    }

    /// Display summary of this level.
    #[must_use]
    pub fn classification(&self) -> Classification {
        Classification {
            level: self.level,
            label: self.label.clone(),
            color: self.color.clone(),
        }
    }
}

/// Level summary returned with a classified measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Classification {
    pub level: Level,
    pub label: String,
    pub color: String,
}

/// Per-channel levels plus their combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PollutantLevels {
    pub so2: Level,
    pub co: Level,
    pub spm: Level,
    pub overall: Level,
}

/// Levels for one reading plus the display summary of its overall level.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assessment {
    pub levels: PollutantLevels,
    pub classification: Classification,
}

/// Classification of a single value failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No {pollutant} range contains value {value}")]
pub struct ClassifyError {
    pub pollutant: Pollutant,
    pub value: i64,
}

/// A range table failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RangeTableError {
    #[error("range table is empty")]
    Empty,

    #[error("level {0} is not valid, levels start at 1")]
    InvalidLevel(Level),

    #[error("level {0} is defined more than once")]
    DuplicateLevel(Level),

    #[error("level {level} has {pollutant} bounds {min}..={max} with min above max")]
    InvertedBounds {
        level: Level,
        pollutant: Pollutant,
        min: i64,
        max: i64,
    },

    #[error("lowest {pollutant} range starts at {min}, expected 0")]
    MissingZero { pollutant: Pollutant, min: i64 },

    #[error("{pollutant} gap before level {level}: expected min {expected}, found {found}")]
    Gap {
        pollutant: Pollutant,
        level: Level,
        expected: i64,
        found: i64,
    },

    #[error("{pollutant} overlap at level {level}: expected min {expected}, found {found}")]
    Overlap {
        pollutant: Pollutant,
        level: Level,
        expected: i64,
        found: i64,
    },

    #[error("{pollutant} range of level {level} ends at the largest value, nothing can follow it")]
    Exhausted { pollutant: Pollutant, level: Level },
}

/// A validated set of [`PollutantRange`]s, ordered by level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTable {
    ranges: Vec<PollutantRange>,
}

impl RangeTable {
    /// Build a table, checking that every channel is partitioned.
    ///
    /// # Errors
    ///
    /// Returns the first [`RangeTableError`] found. Checks run per channel in
    /// level order.
    pub fn new(mut ranges: Vec<PollutantRange>) -> Result<Self, RangeTableError> {
        if ranges.is_empty() {
            return Err(RangeTableError::Empty);
        }
        if let Some(r) = ranges.iter().find(|r| r.level.value() == 0) {
            return Err(RangeTableError::InvalidLevel(r.level));
        }

        ranges.sort_by_key(|r| r.level);
        for pair in ranges.windows(2) {
            if pair[0].level == pair[1].level {
                return Err(RangeTableError::DuplicateLevel(pair[0].level));
            }
        }

        for pollutant in Pollutant::ALL {
            check_channel(&ranges, pollutant)?;
        }

        Ok(Self { ranges })
    }

    /// The built-in six level table.
    ///
    /// SO2 and SPM are in µg/m³, CO in mg/m³.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            ranges: standard_ranges(),
        }
    }

    /// All ranges, lowest level first.
    #[must_use]
    pub fn ranges(&self) -> &[PollutantRange] {
        &self.ranges
    }

    /// Consume the table, returning its ranges.
    #[must_use]
    pub fn into_ranges(self) -> Vec<PollutantRange> {
        self.ranges
    }

    /// Inclusive domain covered for `pollutant`.
    #[must_use]
    pub fn domain(&self, pollutant: Pollutant) -> Bounds {
        // Non-empty by construction.
        let first = self.ranges[0].bounds(pollutant);
        let last = self.ranges[self.ranges.len() - 1].bounds(pollutant);
        Bounds::new(first.min, last.max)
    }

    /// Look up the level whose bounds contain `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if `value` lies outside the table's domain.
    pub fn classify(&self, pollutant: Pollutant, value: i64) -> Result<Level, ClassifyError> {
        self.range_for(pollutant, value).map(|r| r.level)
    }

    fn range_for(&self, pollutant: Pollutant, value: i64) -> Result<&PollutantRange, ClassifyError> {
        self.ranges
            .iter()
            .find(|r| r.bounds(pollutant).contains(value))
            .ok_or(ClassifyError { pollutant, value })
    }

    /// Classify all three channels and combine them.
    ///
    /// # Errors
    ///
    /// Returns the first channel's [`ClassifyError`], in SO2, CO, SPM order.
    pub fn classify_all(&self, so2: i64, co: i64, spm: i64) -> Result<PollutantLevels, ClassifyError> {
        let so2 = self.classify(Pollutant::So2, so2)?;
        let co = self.classify(Pollutant::Co, co)?;
        let spm = self.classify(Pollutant::Spm, spm)?;
        Ok(PollutantLevels {
            so2,
            co,
            spm,
            overall: combine(so2, co, spm),
        })
    }

    /// Classify a full reading and describe its overall level.
    ///
    /// # Errors
    ///
    /// Returns the first channel's [`ClassifyError`], in SO2, CO, SPM order.
    pub fn assess(&self, so2: i64, co: i64, spm: i64) -> Result<Assessment, ClassifyError> {
        let so2 = self.range_for(Pollutant::So2, so2)?;
        let co = self.range_for(Pollutant::Co, co)?;
        let spm = self.range_for(Pollutant::Spm, spm)?;

        let worst = [so2, co, spm]
            .into_iter()
            .max_by_key(|r| r.level)
            .unwrap_or(so2);

        Ok(Assessment {
            levels: PollutantLevels {
                so2: so2.level,
                co: co.level,
                spm: spm.level,
                overall: worst.level,
            },
            classification: worst.classification(),
        })
    }

    /// Metadata for a level.
    #[must_use]
    pub fn describe(&self, level: Level) -> Option<&PollutantRange> {
        self.ranges.iter().find(|r| r.level == level)
    }
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn check_channel(ranges: &[PollutantRange], pollutant: Pollutant) -> Result<(), RangeTableError> {
    let mut expected_min = 0i64;

    for (i, range) in ranges.iter().enumerate() {
        let bounds = range.bounds(pollutant);

        if bounds.min > bounds.max {
            return Err(RangeTableError::InvertedBounds {
                level: range.level,
                pollutant,
                min: bounds.min,
                max: bounds.max,
            });
        }

        if i == 0 {
            if bounds.min != 0 {
                return Err(RangeTableError::MissingZero {
                    pollutant,
                    min: bounds.min,
                });
            }
        } else if bounds.min > expected_min {
            return Err(RangeTableError::Gap {
                pollutant,
                level: range.level,
                expected: expected_min,
                found: bounds.min,
            });
        } else if bounds.min < expected_min {
            return Err(RangeTableError::Overlap {
                pollutant,
                level: range.level,
                expected: expected_min,
                found: bounds.min,
            });
        }

        let is_last = i + 1 == ranges.len();
        match bounds.max.checked_add(1) {
            Some(next) => expected_min = next,
            None if is_last => {}
            None => {
                return Err(RangeTableError::Exhausted {
                    pollutant,
                    level: range.level,
                });
            }
        }
    }

    Ok(())
}

fn standard_ranges() -> Vec<PollutantRange> {
    let level = |value: u8,
                 label: &str,
                 color: &str,
                 health_impact: &str,
                 take_steps: &str,
                 so2: (i64, i64),
                 co: (i64, i64),
                 spm: (i64, i64)| PollutantRange {
        level: Level(value),
        label: label.to_string(),
        color: color.to_string(),
        health_impact: health_impact.to_string(),
        take_steps: take_steps.to_string(),
        so2: Bounds::new(so2.0, so2.1),
        co: Bounds::new(co.0, co.1),
        spm: Bounds::new(spm.0, spm.1),
    };

    vec![
        level(
            1,
            "Excellent",
            "#00e400",
            "Air quality is satisfactory with little or no risk.",
            "Normal outdoor activity.",
            (0, 50),
            (0, 2),
            (0, 35),
        ),
        level(
            2,
            "Good",
            "#ffff00",
            "Acceptable; a few unusually sensitive people may be affected.",
            "Unusually sensitive people should reduce outdoor exertion.",
            (51, 150),
            (3, 4),
            (36, 75),
        ),
        level(
            3,
            "Lightly Polluted",
            "#ff7e00",
            "Sensitive groups show mild aggravation of symptoms.",
            "Children, the elderly and people with heart or lung disease should reduce prolonged outdoor exertion.",
            (151, 475),
            (5, 14),
            (76, 115),
        ),
        level(
            4,
            "Moderately Polluted",
            "#ff0000",
            "Sensitive groups are further affected; the general public may feel effects on the heart and lungs.",
            "Sensitive groups should avoid prolonged outdoor exertion; others should reduce it.",
            (476, 800),
            (15, 24),
            (116, 150),
        ),
        level(
            5,
            "Heavily Polluted",
            "#99004c",
            "Symptoms worsen noticeably in people with heart or lung disease; the general public is widely affected.",
            "Sensitive groups should stay indoors; everyone should avoid outdoor activity.",
            (801, 1600),
            (25, 36),
            (151, 250),
        ),
        level(
            6,
            "Severely Polluted",
            "#7e0023",
            "Healthy people show reduced endurance and pronounced symptoms.",
            "Everyone should stay indoors and avoid physical exertion.",
            (1601, i64::MAX),
            (37, i64::MAX),
            (251, i64::MAX),
        ),
    ]
}


/// Property tests for the classification engine.
///
/// Run with:
/// ```bash
/// cargo test -p airgrid-types classification::proptests
/// ```
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn level_strategy() -> impl Strategy<Value = Level> {
        (1u8..=6).prop_map(Level::new)
    }

    fn pollutant_strategy() -> impl Strategy<Value = Pollutant> {
        prop_oneof![
            Just(Pollutant::So2),
            Just(Pollutant::Co),
            Just(Pollutant::Spm)
        ]
    }

    /// Contiguous random range widths for `n` levels on all three channels.
    fn table_strategy() -> impl Strategy<Value = Vec<PollutantRange>> {
        (1usize..=8).prop_flat_map(|n| {
            (
                proptest::collection::vec(1i64..500, n),
                proptest::collection::vec(1i64..500, n),
                proptest::collection::vec(1i64..500, n),
            )
                .prop_map(move |(so2, co, spm)| {
                    let mut cursor = [0i64; 3];
                    (0..n)
                        .map(|i| {
                            let mut next = |channel: usize, width: i64| {
                                let b = Bounds::new(cursor[channel], cursor[channel] + width - 1);
                                cursor[channel] += width;
                                b
                            };
                            PollutantRange {
                                level: Level::new(i as u8 + 1),
                                label: format!("L{}", i + 1),
                                color: "#000000".to_string(),
                                health_impact: String::new(),
                                take_steps: String::new(),
                                so2: next(0, so2[i]),
                                co: next(1, co[i]),
                                spm: next(2, spm[i]),
                            }
                        })
                        .collect()
                })
        })
    }

    proptest! {
        /// Every value in the standard domain falls in exactly one range.
        #[test]
        fn standard_table_partitions_domain(pollutant in pollutant_strategy(), value in 0i64..5_000) {
            let table = RangeTable::standard();
            let matches = table
                .ranges()
                .iter()
                .filter(|r| r.bounds(pollutant).contains(value))
                .count();
            prop_assert_eq!(matches, 1);

            let first = table.classify(pollutant, value);
            prop_assert!(first.is_ok());
            prop_assert_eq!(first, table.classify(pollutant, value));
        }

        /// Higher concentrations never map to a lower level.
        #[test]
        fn classification_is_monotonic(pollutant in pollutant_strategy(), a in 0i64..5_000, b in 0i64..5_000) {
            let table = RangeTable::standard();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(table.classify(pollutant, lo).unwrap() <= table.classify(pollutant, hi).unwrap());
        }

        /// Negative values are outside every table's domain.
        #[test]
        fn negative_values_never_classify(pollutant in pollutant_strategy(), value in i64::MIN..0) {
            prop_assert!(RangeTable::standard().classify(pollutant, value).is_err());
        }

        #[test]
        fn combine_is_max(a in level_strategy(), b in level_strategy(), c in level_strategy()) {
            let overall = combine(a, b, c);
            prop_assert_eq!(overall, a.max(b).max(c));
            prop_assert!(overall >= a && overall >= b && overall >= c);
            prop_assert!(overall == a || overall == b || overall == c);
        }

        /// Contiguous tables validate and classify every covered value.
        #[test]
        fn contiguous_tables_are_total(ranges in table_strategy(), pollutant in pollutant_strategy(), probe in 0u32..10_000) {
            let table = RangeTable::new(ranges).unwrap();
            let domain = table.domain(pollutant);
            let value = domain.min + i64::from(probe) % (domain.max - domain.min + 1);
            prop_assert!(table.classify(pollutant, value).is_ok());
            prop_assert!(table.classify(pollutant, domain.max + 1).is_err());
        }

        /// Shifting any interior boundary breaks validation.
        #[test]
        fn shifted_boundary_is_rejected(ranges in table_strategy(), shift in prop_oneof![Just(-1i64), Just(1i64)], pick in 0usize..8) {
            prop_assume!(ranges.len() > 1);
            let mut ranges = ranges;
            let index = 1 + pick % (ranges.len() - 1);
            ranges[index].spm.min += shift;
            prop_assume!(ranges[index].spm.min <= ranges[index].spm.max);
            prop_assert!(RangeTable::new(ranges).is_err());
        }
    }
}
