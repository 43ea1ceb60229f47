//! Once-per-day refresh of a schedule's computed state.

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::calendar::{next_window_start, window_restart};
use crate::resolver::{MemberDates, get_next_date};
use crate::{ComputedState, ScheduleConfig, ScheduleError, Tier};

/// Recompute `state` for `today`.
///
/// If `state` was already computed for `today` it is returned unchanged.
/// Group schedules read `members`, which must hold dates already refreshed
/// for the same day. Errors are logged and leave the schedule without a date.
pub fn refresh(
    state: &ComputedState,
    config: &ScheduleConfig,
    today: NaiveDate,
    members: &MemberDates,
) -> ComputedState {
    if state.is_current(today) {
        return state.clone();
    }

    debug!(schedule = config.name(), %today, "refreshing schedule");

    let next_date = match resolve(config, today, members) {
        Ok(next_date) => next_date,
        Err(e) => {
            report(&e);
            None
        }
    };

    let days_until = next_date.map(|next| (next - today).num_days());
    if let (Some(next), Some(days)) = (next_date, days_until) {
        debug!(
            schedule = config.name(),
            next_date = %next.format("%d-%b-%Y"),
            days,
            "found next date"
        );
    }

    ComputedState {
        today: Some(today),
        next_date,
        days_until,
        tier: Tier::from_days(days_until),
    }
}

/// Find the next date for `today`, moving the search into the active window
/// when needed.
pub fn resolve(
    config: &ScheduleConfig,
    today: NaiveDate,
    members: &MemberDates,
) -> Result<Option<NaiveDate>, ScheduleError> {
    let window = config.window();
    let out_of_range =
        || ScheduleError::configuration(config.name(), "active window start out of range");

    if !window.contains(today) {
        let start = next_window_start(window, today).ok_or_else(out_of_range)?;
        debug!(
            schedule = config.name(),
            %start,
            "current date is outside of the range, starting from first month"
        );
        return get_next_date(config, start, members);
    }

    match get_next_date(config, today, members)? {
        Some(next) if !window.contains(next) => {
            let start = window_restart(window, next).ok_or_else(out_of_range)?;
            debug!(
                schedule = config.name(),
                %start,
                "arrived at the end of the date range, restarting at first month"
            );
            get_next_date(config, start, members)
        }
        next => Ok(next),
    }
}

/// Log a resolution error at the level its kind deserves.
pub(crate) fn report(e: &ScheduleError) {
    match e {
        ScheduleError::UnknownFrequency(_) => debug!(error = %e, "cannot resolve schedule"),
        _ => error!(error = %e, "cannot resolve schedule"),
    }
}
