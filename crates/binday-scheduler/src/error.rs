//! Error types for the schedule engine.

use thiserror::Error;

/// Errors that can occur while resolving a schedule.
///
/// None of these are fatal to the refresh loop: a schedule that hits one
/// simply reports no next date until its configuration changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A field required by the selected frequency is missing or invalid.
    #[error("({schedule}) invalid configuration: {reason}")]
    Configuration { schedule: String, reason: String },

    /// The override search ran out of iterations.
    #[error("({schedule}) cannot find any suitable date after {iterations} attempts")]
    SearchExhausted { schedule: String, iterations: usize },

    /// Frequency name not recognised.
    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),

    /// Weekday name not recognised.
    #[error("invalid weekday: {0}")]
    InvalidWeekday(String),

    /// Annual date is not a valid `MM/DD` value.
    #[error("invalid annual date: {0}")]
    InvalidAnnualDate(String),

    /// Two schedules share a name.
    #[error("duplicate schedule name: {0}")]
    DuplicateSchedule(String),

    /// Group schedules reference each other in a loop.
    #[error("group dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

impl ScheduleError {
    /// Build a configuration error for the named schedule.
    pub fn configuration(schedule: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            schedule: schedule.to_string(),
            reason: reason.into(),
        }
    }
}
