//! Recurrence conversion between the provider's pattern/range shape and the
//! internal rule grammar
//!
//! Both directions are pure. The reference instant is passed in explicitly:
//! a range without a start date is anchored to the reference date.

use calsync_domain::{
    CalSyncError, DayOfWeek, Frequency, PatternType, PatternedRecurrence, RangeType,
    RecurrencePattern, RecurrenceRange, RecurrenceRule, Result, RuleEnd, WeekIndex, Weekday,
    WeekdayNum,
};
use chrono::{DateTime, Utc};

/// Convert a native recurrence into an internal rule string.
///
/// The returned string always parses back with [`RecurrenceRule`]'s `FromStr`.
pub fn to_internal_rule(recurrence: &PatternedRecurrence, reference: DateTime<Utc>) -> Result<String> {
    let rule = to_internal(recurrence, reference)?;
    let rendered = rule.to_string();

    // Stored rules must always parse back.
    rendered.parse::<RecurrenceRule>()?;

    Ok(rendered)
}

/// Convert a native recurrence into a structured internal rule.
pub fn to_internal(recurrence: &PatternedRecurrence, reference: DateTime<Utc>) -> Result<RecurrenceRule> {
    let pattern = &recurrence.pattern;
    let range = &recurrence.range;

    let (freq, relative) = match pattern.pattern_type {
        PatternType::Daily => (Frequency::Daily, false),
        PatternType::Weekly => (Frequency::Weekly, false),
        PatternType::AbsoluteMonthly => (Frequency::Monthly, false),
        PatternType::RelativeMonthly => (Frequency::Monthly, true),
        PatternType::AbsoluteYearly => (Frequency::Yearly, false),
        PatternType::RelativeYearly => (Frequency::Yearly, true),
        PatternType::Unsupported => {
            return Err(conversion("unsupported recurrence pattern type"));
        }
    };

    let mut rule = RecurrenceRule::new(freq);
    rule.interval = pattern.interval.filter(|interval| *interval > 0);

    // Graph treats a missing index on a relative pattern as `first`.
    let ordinal = relative.then(|| week_index_ordinal(pattern.index.unwrap_or(WeekIndex::First)));
    rule.by_day = pattern
        .days_of_week
        .iter()
        .map(|day| WeekdayNum { ordinal, weekday: weekday_from_native(*day) })
        .collect();

    if let Some(day) = pattern.day_of_month.filter(|day| *day > 0) {
        let day = i8::try_from(day)
            .ok()
            .filter(|day| *day <= 31)
            .ok_or_else(|| conversion(format!("day of month out of range: {day}")))?;
        rule.by_month_day = vec![day];
    }

    if let Some(month) = pattern.month.filter(|month| *month > 0) {
        let month = u8::try_from(month)
            .ok()
            .filter(|month| *month <= 12)
            .ok_or_else(|| conversion(format!("month out of range: {month}")))?;
        rule.by_month = vec![month];
    }

    rule.week_start = pattern.first_day_of_week.map(weekday_from_native);

    rule.end = match range.range_type {
        RangeType::NoEnd => RuleEnd::Unbounded,
        RangeType::Numbered => match range.number_of_occurrences.filter(|count| *count > 0) {
            Some(count) => RuleEnd::Count(count),
            None => RuleEnd::Unbounded,
        },
        RangeType::EndDate => match range.end_date {
            Some(end_date) => RuleEnd::Until(RecurrenceRule::end_of_day_utc(end_date)),
            None => RuleEnd::Unbounded,
        },
        RangeType::Unsupported => {
            return Err(conversion("unsupported recurrence range type"));
        }
    };

    rule.dtstart = Some(range.start_date.unwrap_or_else(|| reference.date_naive()));

    Ok(rule)
}

/// Convert an internal rule string back into the provider's native shape.
pub fn to_native_pattern(rule: &str, reference: DateTime<Utc>) -> Result<PatternedRecurrence> {
    let rule = rule.parse::<RecurrenceRule>()?;
    to_native(&rule, reference)
}

/// Convert a structured internal rule into the provider's native shape.
pub fn to_native(rule: &RecurrenceRule, reference: DateTime<Utc>) -> Result<PatternedRecurrence> {
    let index = positional_index(rule)?;

    let pattern_type = match (rule.freq, index.is_some()) {
        (Frequency::Daily, false) => PatternType::Daily,
        (Frequency::Weekly, false) => PatternType::Weekly,
        (Frequency::Monthly, false) => PatternType::AbsoluteMonthly,
        (Frequency::Monthly, true) => PatternType::RelativeMonthly,
        (Frequency::Yearly, false) => PatternType::AbsoluteYearly,
        (Frequency::Yearly, true) => PatternType::RelativeYearly,
        (Frequency::Daily | Frequency::Weekly, true) => {
            return Err(conversion(format!("positional BYDAY is not supported with FREQ={}", rule.freq)));
        }
        (Frequency::Secondly | Frequency::Minutely | Frequency::Hourly, _) => {
            return Err(conversion(format!("unsupported frequency {}", rule.freq)));
        }
    };

    if matches!(pattern_type, PatternType::AbsoluteMonthly | PatternType::AbsoluteYearly)
        && !rule.by_day.is_empty()
    {
        return Err(conversion(format!(
            "FREQ={} with BYDAY needs an ordinal position",
            rule.freq
        )));
    }

    let mut pattern = RecurrencePattern::new(pattern_type);
    pattern.interval = Some(rule.effective_interval());
    pattern.days_of_week = rule.by_day.iter().map(|day| weekday_to_native(day.weekday)).collect();
    pattern.index = index;
    pattern.first_day_of_week = rule.week_start.map(weekday_to_native);

    pattern.day_of_month = match rule.by_month_day.as_slice() {
        [] => None,
        [day] if *day > 0 => Some(u32::from(day.unsigned_abs())),
        other => {
            return Err(conversion(format!("BYMONTHDAY {:?} has no native equivalent", other)));
        }
    };

    pattern.month = match rule.by_month.as_slice() {
        [] => None,
        [month] => Some(u32::from(*month)),
        other => {
            return Err(conversion(format!("BYMONTH {:?} has no native equivalent", other)));
        }
    };

    let start_date = rule.dtstart.unwrap_or_else(|| reference.date_naive());
    let mut range = match rule.end {
        RuleEnd::Unbounded => RecurrenceRange::new(RangeType::NoEnd),
        RuleEnd::Count(count) => {
            let mut range = RecurrenceRange::new(RangeType::Numbered);
            range.number_of_occurrences = Some(count);
            range
        }
        RuleEnd::Until(until) => {
            let mut range = RecurrenceRange::new(RangeType::EndDate);
            range.end_date = Some(until.date_naive());
            range
        }
    };
    range.start_date = Some(start_date);

    Ok(PatternedRecurrence { pattern, range })
}

/// Shared ordinal of the rule's BYDAY tokens, folding in a single BYSETPOS.
fn positional_index(rule: &RecurrenceRule) -> Result<Option<WeekIndex>> {
    let mut ordinals = rule.by_day.iter().map(|day| day.ordinal);
    let first = match ordinals.next() {
        Some(first) => first,
        None => return Ok(None),
    };
    if ordinals.any(|ordinal| ordinal != first) {
        return Err(conversion("BYDAY tokens with differing ordinals have no native equivalent"));
    }

    let ordinal = match (first, rule.by_set_pos.as_slice()) {
        (Some(ordinal), []) => Some(i16::from(ordinal)),
        (None, []) => None,
        (None, [position]) => Some(*position),
        (_, positions) => {
            return Err(conversion(format!("BYSETPOS {:?} has no native equivalent", positions)));
        }
    };

    ordinal.map(week_index_from_ordinal).transpose()
}

fn week_index_ordinal(index: WeekIndex) -> i8 {
    match index {
        WeekIndex::First => 1,
        WeekIndex::Second => 2,
        WeekIndex::Third => 3,
        WeekIndex::Fourth => 4,
        WeekIndex::Last => -1,
    }
}

fn week_index_from_ordinal(ordinal: i16) -> Result<WeekIndex> {
    match ordinal {
        1 => Ok(WeekIndex::First),
        2 => Ok(WeekIndex::Second),
        3 => Ok(WeekIndex::Third),
        4 => Ok(WeekIndex::Fourth),
        -1 => Ok(WeekIndex::Last),
        other => Err(conversion(format!("ordinal position {other} has no native equivalent"))),
    }
}

fn weekday_from_native(day: DayOfWeek) -> Weekday {
    match day {
        DayOfWeek::Sunday => Weekday::Sunday,
        DayOfWeek::Monday => Weekday::Monday,
        DayOfWeek::Tuesday => Weekday::Tuesday,
        DayOfWeek::Wednesday => Weekday::Wednesday,
        DayOfWeek::Thursday => Weekday::Thursday,
        DayOfWeek::Friday => Weekday::Friday,
        DayOfWeek::Saturday => Weekday::Saturday,
    }
}

fn weekday_to_native(day: Weekday) -> DayOfWeek {
    match day {
        Weekday::Sunday => DayOfWeek::Sunday,
        Weekday::Monday => DayOfWeek::Monday,
        Weekday::Tuesday => DayOfWeek::Tuesday,
        Weekday::Wednesday => DayOfWeek::Wednesday,
        Weekday::Thursday => DayOfWeek::Thursday,
        Weekday::Friday => DayOfWeek::Friday,
        Weekday::Saturday => DayOfWeek::Saturday,
    }
}

fn conversion(message: impl Into<String>) -> CalSyncError {
    CalSyncError::Conversion(message.into())
}

#[cfg(test)]
mod tests {
    use calsync_domain::rule::format_rule_date;
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recurrence(pattern: RecurrencePattern, range: RecurrenceRange) -> PatternedRecurrence {
        PatternedRecurrence { pattern, range }
    }

    fn no_end_from(start: NaiveDate) -> RecurrenceRange {
        let mut range = RecurrenceRange::new(RangeType::NoEnd);
        range.start_date = Some(start);
        range
    }

    fn daily() -> PatternedRecurrence {
        let mut pattern = RecurrencePattern::new(PatternType::Daily);
        pattern.interval = Some(2);
        let mut range = RecurrenceRange::new(RangeType::Numbered);
        range.start_date = Some(date(2025, 1, 6));
        range.number_of_occurrences = Some(10);
        recurrence(pattern, range)
    }

    fn weekly_with_days() -> PatternedRecurrence {
        let mut pattern = RecurrencePattern::new(PatternType::Weekly);
        pattern.interval = Some(1);
        pattern.days_of_week = vec![DayOfWeek::Monday, DayOfWeek::Wednesday];
        pattern.first_day_of_week = Some(DayOfWeek::Sunday);
        recurrence(pattern, no_end_from(date(2025, 1, 6)))
    }

    fn absolute_monthly() -> PatternedRecurrence {
        let mut pattern = RecurrencePattern::new(PatternType::AbsoluteMonthly);
        pattern.interval = Some(1);
        pattern.day_of_month = Some(15);
        let mut range = RecurrenceRange::new(RangeType::EndDate);
        range.start_date = Some(date(2025, 1, 15));
        range.end_date = Some(date(2025, 12, 31));
        recurrence(pattern, range)
    }

    fn relative_monthly_last_friday() -> PatternedRecurrence {
        let mut pattern = RecurrencePattern::new(PatternType::RelativeMonthly);
        pattern.interval = Some(1);
        pattern.days_of_week = vec![DayOfWeek::Friday];
        pattern.index = Some(WeekIndex::Last);
        recurrence(pattern, no_end_from(date(2025, 1, 31)))
    }

    fn absolute_yearly() -> PatternedRecurrence {
        let mut pattern = RecurrencePattern::new(PatternType::AbsoluteYearly);
        pattern.interval = Some(1);
        pattern.day_of_month = Some(4);
        pattern.month = Some(7);
        recurrence(pattern, no_end_from(date(2025, 7, 4)))
    }

    #[test]
    fn weekly_pattern_becomes_weekly_rule() {
        let rule = to_internal_rule(&weekly_with_days(), reference()).unwrap();
        assert_eq!(rule, "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE;WKST=SU;DTSTART=20250106");
    }

    #[test]
    fn relative_monthly_keeps_position_as_ordinal() {
        let rule = to_internal_rule(&relative_monthly_last_friday(), reference()).unwrap();
        assert_eq!(rule, "FREQ=MONTHLY;INTERVAL=1;BYDAY=-1FR;DTSTART=20250131");
    }

    #[test]
    fn end_date_becomes_inclusive_end_of_day_until() {
        let rule = to_internal_rule(&absolute_monthly(), reference()).unwrap();
        assert_eq!(
            rule,
            "FREQ=MONTHLY;INTERVAL=1;BYMONTHDAY=15;UNTIL=20251231T235959Z;DTSTART=20250115"
        );
    }

    #[test]
    fn numbered_range_becomes_count() {
        let rule = to_internal_rule(&daily(), reference()).unwrap();
        assert_eq!(rule, "FREQ=DAILY;INTERVAL=2;COUNT=10;DTSTART=20250106");
    }

    #[test]
    fn missing_start_date_defaults_to_reference_date() {
        let pattern = RecurrencePattern::new(PatternType::Daily);
        let range = RecurrenceRange::new(RangeType::NoEnd);
        let rule = to_internal_rule(&recurrence(pattern, range), reference()).unwrap();
        assert_eq!(rule, format!("FREQ=DAILY;DTSTART={}", format_rule_date(reference().date_naive())));
    }

    #[test]
    fn zero_fields_are_treated_as_absent() {
        let mut pattern = RecurrencePattern::new(PatternType::Weekly);
        pattern.interval = Some(0);
        pattern.day_of_month = Some(0);
        pattern.month = Some(0);
        pattern.days_of_week = vec![DayOfWeek::Tuesday];
        let rule = to_internal(&recurrence(pattern, no_end_from(date(2025, 1, 7))), reference()).unwrap();

        assert_eq!(rule.interval, None);
        assert!(rule.by_month_day.is_empty());
        assert!(rule.by_month.is_empty());
        assert_eq!(rule.effective_interval(), 1);
    }

    #[test]
    fn relative_pattern_without_index_means_first() {
        let mut pattern = RecurrencePattern::new(PatternType::RelativeMonthly);
        pattern.days_of_week = vec![DayOfWeek::Thursday];
        let rule = to_internal(&recurrence(pattern, no_end_from(date(2025, 1, 2))), reference()).unwrap();
        assert_eq!(rule.by_day, vec![WeekdayNum::nth(1, Weekday::Thursday)]);
    }

    #[test]
    fn unsupported_pattern_type_is_a_conversion_error() {
        let pattern = RecurrencePattern::new(PatternType::Unsupported);
        let err = to_internal_rule(&recurrence(pattern, no_end_from(date(2025, 1, 1))), reference())
            .unwrap_err();
        assert!(matches!(err, CalSyncError::Conversion(_)));
    }

    #[test]
    fn hourly_rule_has_no_native_equivalent() {
        let err = to_native_pattern("FREQ=HOURLY;INTERVAL=2", reference()).unwrap_err();
        assert!(matches!(err, CalSyncError::Conversion(_)));
    }

    #[test]
    fn unparsable_rule_is_a_conversion_error() {
        let err = to_native_pattern("FREQ=SOMETIMES", reference()).unwrap_err();
        assert!(matches!(err, CalSyncError::Conversion(_)));
    }

    #[test]
    fn native_pattern_uses_iso_dates_and_weekday_names() {
        let native = to_native_pattern(
            "FREQ=MONTHLY;INTERVAL=1;BYDAY=2TU;UNTIL=20251231T235959Z;DTSTART=20250114",
            reference(),
        )
        .unwrap();

        assert_eq!(native.pattern.pattern_type, PatternType::RelativeMonthly);
        assert_eq!(native.pattern.index, Some(WeekIndex::Second));
        assert_eq!(native.pattern.days_of_week, vec![DayOfWeek::Tuesday]);
        assert_eq!(native.range.range_type, RangeType::EndDate);
        assert_eq!(native.range.start_date, Some(date(2025, 1, 14)));
        assert_eq!(native.range.end_date, Some(date(2025, 12, 31)));

        let json = serde_json::to_value(&native.range).unwrap();
        assert_eq!(json["startDate"], "2025-01-14");
        assert_eq!(json["endDate"], "2025-12-31");
    }

    #[test]
    fn bysetpos_supplies_the_position_for_plain_weekdays() {
        let native =
            to_native_pattern("FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1", reference()).unwrap();
        assert_eq!(native.pattern.pattern_type, PatternType::RelativeMonthly);
        assert_eq!(native.pattern.index, Some(WeekIndex::Last));
        assert_eq!(native.pattern.days_of_week.len(), 5);
    }

    #[test]
    fn monthly_weekdays_without_position_are_rejected() {
        assert!(to_native_pattern("FREQ=MONTHLY;BYDAY=MO", reference()).is_err());
        assert!(to_native_pattern("FREQ=MONTHLY;BYDAY=5MO", reference()).is_err());
        assert!(to_native_pattern("FREQ=WEEKLY;BYDAY=1MO", reference()).is_err());
    }

    #[test]
    fn round_trip_preserves_rule_semantics() {
        let patterns = [
            daily(),
            weekly_with_days(),
            absolute_monthly(),
            relative_monthly_last_friday(),
            absolute_yearly(),
        ];

        for original in patterns {
            let first = to_internal_rule(&original, reference()).unwrap();
            let native = to_native_pattern(&first, reference()).unwrap();
            let second = to_internal_rule(&native, reference()).unwrap();

            let first: RecurrenceRule = first.parse().unwrap();
            let second: RecurrenceRule = second.parse().unwrap();
            assert_eq!(first.freq, second.freq);
            assert_eq!(first.effective_interval(), second.effective_interval());
            assert_eq!(first.by_day, second.by_day);
            assert_eq!(first.by_month_day, second.by_month_day);
            assert_eq!(first.by_month, second.by_month);
            assert_eq!(first.end, second.end);
            assert_eq!(first.dtstart, second.dtstart);
        }
    }
}
