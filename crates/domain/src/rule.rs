//! Internal recurrence rule grammar
//!
//! The application stores recurrence as a `;`-separated list of `KEY=VALUE`
//! parts modelled on RFC 5545 RRULE values, for example
//! `FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE;DTSTART=20250106`.
//!
//! Supported parts: `FREQ` (required), `INTERVAL`, `BYDAY`, `BYMONTHDAY`,
//! `BYMONTH`, `BYSETPOS`, `WKST`, `COUNT`, `UNTIL` and `DTSTART`. `COUNT` and
//! `UNTIL` are mutually exclusive. Any value produced by [`RecurrenceRule`]'s
//! `Display` impl parses back into an equal rule.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::errors::CalSyncError;
use crate::impl_vocabulary_conversions;

const COMPACT_DATE: &str = "%Y%m%d";
const ISO_DATE: &str = "%Y-%m-%d";
const COMPACT_UTC_DATETIME: &str = "%Y%m%dT%H%M%SZ";
const COMPACT_FLOATING_DATETIME: &str = "%Y%m%dT%H%M%S";

/// `FREQ` values of the internal grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl_vocabulary_conversions!(Frequency {
    Secondly => "SECONDLY",
    Minutely => "MINUTELY",
    Hourly => "HOURLY",
    Daily => "DAILY",
    Weekly => "WEEKLY",
    Monthly => "MONTHLY",
    Yearly => "YEARLY",
});

/// Two-letter weekday tokens used by `BYDAY` and `WKST`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl_vocabulary_conversions!(Weekday {
    Monday => "MO",
    Tuesday => "TU",
    Wednesday => "WE",
    Thursday => "TH",
    Friday => "FR",
    Saturday => "SA",
    Sunday => "SU",
});

/// A `BYDAY` entry: weekday with an optional ordinal (`MO`, `2TU`, `-1FR`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Every occurrence of `weekday` in the period.
    pub const fn every(weekday: Weekday) -> Self {
        Self { ordinal: None, weekday }
    }

    /// The `ordinal`-th occurrence of `weekday` (negative counts from the end).
    pub const fn nth(ordinal: i8, weekday: Weekday) -> Self {
        Self { ordinal: Some(ordinal), weekday }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ordinal {
            Some(ordinal) => write!(f, "{ordinal}{}", self.weekday),
            None => write!(f, "{}", self.weekday),
        }
    }
}

impl FromStr for WeekdayNum {
    type Err = CalSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.len() < 2 || !token.is_char_boundary(token.len() - 2) {
            return Err(invalid(format!("BYDAY token '{s}'")));
        }

        let (prefix, day) = token.split_at(token.len() - 2);
        let weekday = day.parse::<Weekday>().map_err(invalid)?;

        if prefix.is_empty() {
            return Ok(Self::every(weekday));
        }

        let ordinal = prefix
            .parse::<i8>()
            .map_err(|e| invalid(format!("BYDAY ordinal '{prefix}': {e}")))?;
        if ordinal == 0 || !(-53..=53).contains(&ordinal) {
            return Err(invalid(format!("BYDAY ordinal out of range: {ordinal}")));
        }

        Ok(Self::nth(ordinal, weekday))
    }
}

/// How a rule terminates. `COUNT` and `UNTIL` cannot both be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleEnd {
    #[default]
    Unbounded,
    Count(u32),
    /// Inclusive last instant, always UTC.
    Until(DateTime<Utc>),
}

/// Parsed internal recurrence rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: Option<u32>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i8>,
    pub by_month: Vec<u8>,
    pub by_set_pos: Vec<i16>,
    pub week_start: Option<Weekday>,
    pub end: RuleEnd,
    pub dtstart: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// Rule with only `FREQ` set.
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
            week_start: None,
            end: RuleEnd::Unbounded,
            dtstart: None,
        }
    }

    /// Interval with the grammar default applied.
    pub fn effective_interval(&self) -> u32 {
        self.interval.unwrap_or(1)
    }

    /// Inclusive end-of-day UTC instant for a date-only `UNTIL`.
    pub fn end_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        date.and_time(last_second).and_utc()
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.freq)?;

        if let Some(interval) = self.interval {
            write!(f, ";INTERVAL={interval}")?;
        }
        if !self.by_day.is_empty() {
            write!(f, ";BYDAY={}", join(&self.by_day))?;
        }
        if !self.by_month_day.is_empty() {
            write!(f, ";BYMONTHDAY={}", join(&self.by_month_day))?;
        }
        if !self.by_month.is_empty() {
            write!(f, ";BYMONTH={}", join(&self.by_month))?;
        }
        if !self.by_set_pos.is_empty() {
            write!(f, ";BYSETPOS={}", join(&self.by_set_pos))?;
        }
        if let Some(week_start) = self.week_start {
            write!(f, ";WKST={week_start}")?;
        }
        match self.end {
            RuleEnd::Unbounded => {}
            RuleEnd::Count(count) => write!(f, ";COUNT={count}")?,
            RuleEnd::Until(until) => write!(f, ";UNTIL={}", until.format(COMPACT_UTC_DATETIME))?,
        }
        if let Some(dtstart) = self.dtstart {
            write!(f, ";DTSTART={}", dtstart.format(COMPACT_DATE))?;
        }

        Ok(())
    }
}

impl FromStr for RecurrenceRule {
    type Err = CalSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);

        let mut freq = None;
        let mut interval = None;
        let mut by_day = None;
        let mut by_month_day = None;
        let mut by_month = None;
        let mut by_set_pos = None;
        let mut week_start = None;
        let mut count = None;
        let mut until = None;
        let mut dtstart = None;

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| invalid(format!("rule part without '=': '{part}'")))?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();

            match key.as_str() {
                "FREQ" => set_once(&mut freq, &key, value.parse::<Frequency>().map_err(invalid)?)?,
                "INTERVAL" => {
                    let parsed = parse_number::<u32>(&key, value)?;
                    if parsed == 0 {
                        return Err(invalid("INTERVAL must be at least 1"));
                    }
                    set_once(&mut interval, &key, parsed)?;
                }
                "BYDAY" => set_once(&mut by_day, &key, parse_list::<WeekdayNum>(value)?)?,
                "BYMONTHDAY" => {
                    let days = parse_number_list::<i8>(&key, value)?;
                    if days.iter().any(|d| *d == 0 || !(-31..=31).contains(d)) {
                        return Err(invalid(format!("BYMONTHDAY out of range: '{value}'")));
                    }
                    set_once(&mut by_month_day, &key, days)?;
                }
                "BYMONTH" => {
                    let months = parse_number_list::<u8>(&key, value)?;
                    if months.iter().any(|m| !(1..=12).contains(m)) {
                        return Err(invalid(format!("BYMONTH out of range: '{value}'")));
                    }
                    set_once(&mut by_month, &key, months)?;
                }
                "BYSETPOS" => {
                    let positions = parse_number_list::<i16>(&key, value)?;
                    if positions.iter().any(|p| *p == 0 || !(-366..=366).contains(p)) {
                        return Err(invalid(format!("BYSETPOS out of range: '{value}'")));
                    }
                    set_once(&mut by_set_pos, &key, positions)?;
                }
                "WKST" => set_once(&mut week_start, &key, value.parse::<Weekday>().map_err(invalid)?)?,
                "COUNT" => {
                    let parsed = parse_number::<u32>(&key, value)?;
                    if parsed == 0 {
                        return Err(invalid("COUNT must be at least 1"));
                    }
                    set_once(&mut count, &key, parsed)?;
                }
                "UNTIL" => set_once(&mut until, &key, parse_until(value)?)?,
                "DTSTART" => set_once(&mut dtstart, &key, parse_rule_date(value)?)?,
                other => return Err(invalid(format!("unsupported rule part '{other}'"))),
            }
        }

        let freq = freq.ok_or_else(|| invalid("FREQ is required"))?;
        let end = match (count, until) {
            (Some(_), Some(_)) => return Err(invalid("COUNT and UNTIL are mutually exclusive")),
            (Some(count), None) => RuleEnd::Count(count),
            (None, Some(until)) => RuleEnd::Until(until),
            (None, None) => RuleEnd::Unbounded,
        };

        Ok(Self {
            freq,
            interval,
            by_day: by_day.unwrap_or_default(),
            by_month_day: by_month_day.unwrap_or_default(),
            by_month: by_month.unwrap_or_default(),
            by_set_pos: by_set_pos.unwrap_or_default(),
            week_start,
            end,
            dtstart,
        })
    }
}

/// Parse a date in compact (`YYYYMMDD`) or ISO (`YYYY-MM-DD`) form.
///
/// A compact date-time (`YYYYMMDDTHHMMSS[Z]`) is accepted and truncated to
/// its date.
pub fn parse_rule_date(value: &str) -> Result<NaiveDate, CalSyncError> {
    let value = value.trim();
    let date_part = value.split_once('T').map_or(value, |(date, _)| date);

    NaiveDate::parse_from_str(date_part, COMPACT_DATE)
        .or_else(|_| NaiveDate::parse_from_str(date_part, ISO_DATE))
        .map_err(|e| invalid(format!("date '{value}': {e}")))
}

/// Format a date in the compact rule form (`YYYYMMDD`).
pub fn format_rule_date(date: NaiveDate) -> String {
    date.format(COMPACT_DATE).to_string()
}

fn parse_until(value: &str) -> Result<DateTime<Utc>, CalSyncError> {
    if value.contains('T') {
        let parsed = NaiveDateTime::parse_from_str(value, COMPACT_UTC_DATETIME)
            .or_else(|_| NaiveDateTime::parse_from_str(value, COMPACT_FLOATING_DATETIME))
            .map_err(|e| invalid(format!("UNTIL '{value}': {e}")))?;
        return Ok(parsed.and_utc());
    }

    parse_rule_date(value).map(RecurrenceRule::end_of_day_utc)
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<(), CalSyncError> {
    if slot.is_some() {
        return Err(invalid(format!("duplicate rule part '{key}'")));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, CalSyncError>
where
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(|e| invalid(format!("{key} value '{value}': {e}")))
}

fn parse_number_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>, CalSyncError>
where
    T::Err: fmt::Display,
{
    value.split(',').map(|item| parse_number::<T>(key, item.trim())).collect()
}

fn parse_list<T: FromStr<Err = CalSyncError>>(value: &str) -> Result<Vec<T>, CalSyncError> {
    value.split(',').map(|item| item.parse::<T>()).collect()
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn invalid(message: impl Into<String>) -> CalSyncError {
    CalSyncError::Conversion(format!("invalid recurrence rule: {}", message.into()))
}
