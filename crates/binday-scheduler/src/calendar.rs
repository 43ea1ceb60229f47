//! Calendar helpers shared by the resolver and the refresh orchestrator.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::{ActiveWindow, ScheduleConfig};

/// Format accepted for include and exclude dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether `date` falls inside the schedule's active window.
pub fn date_inside(config: &ScheduleConfig, date: NaiveDate) -> bool {
    config.window().contains(date)
}

/// Date of the `n`-th `weekday` (1-based) in the month containing `anchor`.
///
/// `n` is not bounds checked: a fifth occurrence that does not exist lands in
/// the following month.
pub fn nth_weekday_date(n: u32, anchor: NaiveDate, weekday: Weekday) -> NaiveDate {
    let first_of_month = anchor.with_day(1).unwrap_or(anchor);
    let starts_on = i64::from(first_of_month.weekday().num_days_from_monday());
    let target = i64::from(weekday.num_days_from_monday());
    let first_offset = if target >= starts_on {
        target - starts_on
    } else {
        7 - starts_on + target
    };
    let weeks = i64::from(n.saturating_sub(1));
    first_of_month + Duration::days(first_offset + weeks * 7)
}

/// First day of the month after the one containing `date`.
pub fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// Parse `YYYY-MM-DD` strings, skipping entries that do not parse.
///
/// Valid entries keep their input order.
pub fn to_dates<I, S>(values: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter_map(|value| NaiveDate::parse_from_str(value.as_ref().trim(), DATE_FORMAT).ok())
        .collect()
}

/// Where the search should start when today is outside the active window.
pub(crate) fn next_window_start(window: ActiveWindow, today: NaiveDate) -> Option<NaiveDate> {
    if !window.wraps() && today.month() > window.last_month() {
        window.start_in(today.year() + 1)
    } else {
        window.start_in(today.year())
    }
}

/// Where the search should restart when a result fell past the window.
pub(crate) fn window_restart(window: ActiveWindow, outside: NaiveDate) -> Option<NaiveDate> {
    if window.wraps() {
        window.start_in(outside.year())
    } else {
        window.start_in(outside.year() + 1)
    }
}
