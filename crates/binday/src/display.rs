//! Rendering a schedule's computed state for people.

use binday_scheduler::{ComputedState, ScheduleSnapshot, Tier};
use serde::Serialize;

use crate::config::SensorConfig;

/// State shown when a schedule has no upcoming date.
pub const UNKNOWN_STATE: &str = "unknown";

/// State value for a schedule.
///
/// Verbose sensors read "on 05-Mar-2024, in 3 days", "Today" or "Tomorrow".
/// Otherwise the value is `2` for anything beyond tomorrow and the day count
/// for today and tomorrow.
pub fn state_text(state: &ComputedState, verbose: bool) -> String {
    match (state.tier, state.next_date, state.days_until) {
        (Tier::Future, Some(next), Some(days)) if verbose => {
            format!("on {}, in {} days", next.format("%d-%b-%Y"), days)
        }
        (Tier::Future, _, _) => "2".to_string(),
        (Tier::Today, _, _) if verbose => "Today".to_string(),
        (Tier::Tomorrow, _, _) if verbose => "Tomorrow".to_string(),
        (Tier::Today | Tier::Tomorrow, _, Some(days)) => days.to_string(),
        _ => UNKNOWN_STATE.to_string(),
    }
}

/// Icon for the schedule's current tier.
pub fn icon(state: &ComputedState, sensor: &SensorConfig) -> String {
    match state.tier {
        Tier::Today => sensor.icon_today.clone(),
        Tier::Tomorrow => sensor.icon_tomorrow.clone(),
        Tier::Future | Tier::Unknown => sensor.icon_normal.clone(),
    }
}

/// One rendered line of `binday next`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorView {
    pub name: String,
    pub next_date: Option<String>,
    pub days: Option<i64>,
    pub tier: Tier,
    pub state: String,
    pub icon: String,
}

impl SensorView {
    pub fn new(snapshot: &ScheduleSnapshot, sensor: &SensorConfig) -> Self {
        let state = &snapshot.state;
        Self {
            name: snapshot.name.clone(),
            next_date: state
                .next_date
                .map(|d| d.format(binday_scheduler::calendar::DATE_FORMAT).to_string()),
            days: state.days_until,
            tier: state.tier,
            state: state_text(state, sensor.verbose_state),
            icon: icon(state, sensor),
        }
    }

    /// Single human readable line.
    pub fn line(&self) -> String {
        let days = self
            .days
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{}: {} days={} tier={:?} state=\"{}\" icon={}",
            self.name,
            self.next_date.as_deref().unwrap_or("-"),
            days,
            self.tier,
            self.state,
            self.icon
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binday_scheduler::ScheduleDefinition;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn state(days: Option<i64>) -> ComputedState {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let next_date = days.map(|d| today + chrono::Duration::days(d));
        ComputedState {
            today: Some(today),
            next_date,
            days_until: days,
            tier: Tier::from_days(days),
        }
    }

    fn sensor(verbose: bool) -> SensorConfig {
        SensorConfig {
            schedule: ScheduleDefinition::new("general", "weekly"),
            enabled: true,
            verbose_state: verbose,
            icon_normal: "normal".into(),
            icon_today: "today".into(),
            icon_tomorrow: "tomorrow".into(),
        }
    }

    #[test_case(Some(3), true, "on 05-Mar-2024, in 3 days" ; "verbose future")]
    #[test_case(Some(1), true, "Tomorrow" ; "verbose tomorrow")]
    #[test_case(Some(0), true, "Today" ; "verbose today")]
    #[test_case(Some(10), false, "2" ; "future")]
    #[test_case(Some(1), false, "1" ; "tomorrow")]
    #[test_case(Some(0), false, "0" ; "today")]
    #[test_case(None, true, "unknown" ; "verbose unknown")]
    #[test_case(None, false, "unknown" ; "unknown")]
    fn test_state_text(days: Option<i64>, verbose: bool, expected: &str) {
        assert_eq!(state_text(&state(days), verbose), expected);
    }

    #[test_case(Some(5), "normal")]
    #[test_case(Some(1), "tomorrow")]
    #[test_case(Some(0), "today")]
    #[test_case(None, "normal")]
    fn test_icon(days: Option<i64>, expected: &str) {
        assert_eq!(icon(&state(days), &sensor(false)), expected);
    }

    #[test]
    fn test_sensor_view() {
        let snapshot = ScheduleSnapshot {
            name: "general".into(),
            state: state(Some(3)),
        };
        let view = SensorView::new(&snapshot, &sensor(true));
        assert_eq!(view.next_date.as_deref(), Some("2024-03-05"));
        assert_eq!(view.days, Some(3));
        assert_eq!(view.tier, Tier::Future);
        assert_eq!(
            view.line(),
            "general: 2024-03-05 days=3 tier=Future state=\"on 05-Mar-2024, in 3 days\" icon=normal"
        );
    }
}
