//! Next-date resolution: calendar candidates and the override search.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::debug;

use crate::calendar::{first_of_next_month, nth_weekday_date};
use crate::types::MAX_DAY_ORDER;
use crate::{AnnualDate, Frequency, ScheduleConfig, ScheduleError};

/// Maximum number of candidates the override search will try.
pub const MAX_SEARCH_ITERATIONS: usize = 365;

/// How many years ahead an annual date is looked for (covers Feb 29).
const ANNUAL_LOOKAHEAD_YEARS: i32 = 8;

/// Already-computed next dates of other schedules, keyed by schedule name.
///
/// Only schedules that have a next date appear in the map.
pub type MemberDates = HashMap<String, NaiveDate>;

/// Find the next calendar date on or after `from`, ignoring include and
/// exclude dates.
///
/// Returns `Ok(None)` only for group schedules whose members have no date.
pub fn find_candidate_date(
    config: &ScheduleConfig,
    from: NaiveDate,
    members: &MemberDates,
) -> Result<Option<NaiveDate>, ScheduleError> {
    match config.frequency() {
        Frequency::Weekly
        | Frequency::EvenWeeks
        | Frequency::OddWeeks
        | Frequency::EveryNWeeks { .. } => {
            let (period, first_week) = config
                .frequency()
                .week_cycle()
                .ok_or_else(|| ScheduleError::configuration(config.name(), "missing week cycle"))?;
            weekly_candidate(config, from, period, first_week).map(Some)
        }
        Frequency::Monthly { day_order_numbers } => {
            monthly_candidate(config, from, day_order_numbers).map(Some)
        }
        Frequency::Annual { date } => annual_candidate(config, from, *date).map(Some),
        Frequency::Group { members: names } => group_candidate(config, from, names, members),
    }
}

/// Find the next collection date on or after `day1`, honouring include and
/// exclude dates.
///
/// An include date earlier than the calendar candidate replaces it. An
/// excluded result moves the search to the following day; exclusion wins
/// over inclusion. Gives up after [`MAX_SEARCH_ITERATIONS`] candidates.
pub fn get_next_date(
    config: &ScheduleConfig,
    day1: NaiveDate,
    members: &MemberDates,
) -> Result<Option<NaiveDate>, ScheduleError> {
    let mut cursor = day1;

    for _ in 0..MAX_SEARCH_ITERATIONS {
        let candidate = find_candidate_date(config, cursor, members)?;
        let next = match (candidate, config.next_include(cursor)) {
            (Some(candidate), Some(include)) if include < candidate => include,
            (Some(candidate), _) => candidate,
            (None, Some(include)) => include,
            (None, None) => return Ok(None),
        };

        if !config.is_excluded(next) {
            return Ok(Some(next));
        }

        debug!(schedule = config.name(), date = %next, "skipping excluded date");
        cursor = next + Duration::days(1);
    }

    Err(ScheduleError::SearchExhausted {
        schedule: config.name().to_string(),
        iterations: MAX_SEARCH_ITERATIONS,
    })
}

fn first_collection_day(config: &ScheduleConfig) -> Result<Weekday, ScheduleError> {
    config
        .collection_days()
        .first()
        .copied()
        .ok_or_else(|| {
            ScheduleError::configuration(config.name(), "please configure the collection days")
        })
}

fn shift(config: &ScheduleConfig, from: NaiveDate, days: i64) -> Result<NaiveDate, ScheduleError> {
    from.checked_add_signed(Duration::days(days))
        .ok_or_else(|| ScheduleError::configuration(config.name(), "date out of range"))
}

fn weekly_candidate(
    config: &ScheduleConfig,
    from: NaiveDate,
    period: u32,
    first_week: u32,
) -> Result<NaiveDate, ScheduleError> {
    let first_day = first_collection_day(config)?;
    if period == 0 {
        return Err(ScheduleError::configuration(config.name(), "period must be at least 1"));
    }

    let period = i64::from(period);
    let week = i64::from(from.iso_week().week());
    let weekday = i64::from(from.weekday().num_days_from_monday());
    let phase = (week - i64::from(first_week)).rem_euclid(period);

    // Collection week: first listed day not yet past, today included.
    if phase == 0
        && let Some(day) = config
            .collection_days()
            .iter()
            .map(|d| i64::from(d.num_days_from_monday()))
            .find(|d| *d >= weekday)
    {
        return shift(config, from, day - weekday);
    }

    let in_weeks = period - phase;
    let offset = 7 * in_weeks - weekday + i64::from(first_day.num_days_from_monday());
    shift(config, from, offset)
}

fn monthly_candidate(
    config: &ScheduleConfig,
    from: NaiveDate,
    day_order_numbers: &[u32],
) -> Result<NaiveDate, ScheduleError> {
    let weekday = first_collection_day(config)?;
    let first_order = *day_order_numbers.first().ok_or_else(|| {
        ScheduleError::configuration(config.name(), "please configure the weekday order numbers")
    })?;
    if day_order_numbers.iter().any(|n| !(1..=MAX_DAY_ORDER).contains(n)) {
        return Err(ScheduleError::configuration(
            config.name(),
            format!("weekday order numbers must be between 1 and {MAX_DAY_ORDER}"),
        ));
    }

    // Listed order decides, not calendar order.
    if let Some(candidate) = day_order_numbers
        .iter()
        .map(|n| nth_weekday_date(*n, from, weekday))
        .find(|candidate| *candidate >= from)
    {
        return Ok(candidate);
    }

    let next_month = first_of_next_month(from)
        .ok_or_else(|| ScheduleError::configuration(config.name(), "date out of range"))?;
    Ok(nth_weekday_date(first_order, next_month, weekday))
}

fn annual_candidate(
    config: &ScheduleConfig,
    from: NaiveDate,
    date: AnnualDate,
) -> Result<NaiveDate, ScheduleError> {
    (from.year()..=from.year() + ANNUAL_LOOKAHEAD_YEARS)
        .filter_map(|year| date.in_year(year))
        .find(|candidate| *candidate >= from)
        .ok_or_else(|| {
            ScheduleError::configuration(config.name(), format!("no occurrence of {date} found"))
        })
}

fn group_candidate(
    config: &ScheduleConfig,
    from: NaiveDate,
    names: &[String],
    members: &MemberDates,
) -> Result<Option<NaiveDate>, ScheduleError> {
    if names.is_empty() {
        return Err(ScheduleError::configuration(
            config.name(),
            "please add entities for the group",
        ));
    }

    Ok(names
        .iter()
        .filter_map(|name| members.get(name))
        .copied()
        .filter(|date| *date >= from)
        .min())
}
