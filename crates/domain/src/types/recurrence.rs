//! Provider-native recurrence vocabulary
//!
//! Mirrors the pattern/range shape used by Microsoft Graph
//! (`patternedRecurrence`). Unknown pattern or range types deserialize into
//! an `Unsupported` variant so that a single odd event fails conversion on its
//! own instead of failing the whole page.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Pattern + range describing a recurring series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternedRecurrence {
    pub pattern: RecurrencePattern,
    pub range: RecurrenceRange,
}

/// How often the series repeats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub days_of_week: Vec<DayOfWeek>,
    /// Graph reports `0` when not applicable; treat as absent.
    #[serde(default)]
    pub day_of_month: Option<u32>,
    /// Graph reports `0` when not applicable; treat as absent.
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub index: Option<WeekIndex>,
    #[serde(default)]
    pub first_day_of_week: Option<DayOfWeek>,
}

impl RecurrencePattern {
    /// Pattern of the given type with every optional field absent.
    pub fn new(pattern_type: PatternType) -> Self {
        Self {
            pattern_type,
            interval: None,
            days_of_week: Vec::new(),
            day_of_month: None,
            month: None,
            index: None,
            first_day_of_week: None,
        }
    }
}

/// When the series starts and stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRange {
    #[serde(rename = "type")]
    pub range_type: RangeType,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub number_of_occurrences: Option<u32>,
    #[serde(default)]
    pub recurrence_time_zone: Option<String>,
}

impl RecurrenceRange {
    /// Range of the given type with every optional field absent.
    pub fn new(range_type: RangeType) -> Self {
        Self {
            range_type,
            start_date: None,
            end_date: None,
            number_of_occurrences: None,
            recurrence_time_zone: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternType {
    Daily,
    Weekly,
    AbsoluteMonthly,
    RelativeMonthly,
    AbsoluteYearly,
    RelativeYearly,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangeType {
    EndDate,
    NoEnd,
    Numbered,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

/// Position of a weekday within a month for relative patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekIndex {
    First,
    Second,
    Third,
    Fourth,
    Last,
}
