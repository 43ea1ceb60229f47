//! Recurring collection schedule engine for binday.
//!
//! This crate computes the next collection date of a schedule:
//! - Weekly, even/odd-week, every-n-weeks, monthly, annual and group frequencies
//! - Include and exclude date overrides with a bounded search
//! - Active month windows, including windows that wrap across the year end
//! - Once-per-day refresh of many schedules in dependency order

pub mod calendar;
mod definition;
mod error;
mod refresh;
mod registry;
pub mod resolver;
mod scheduler;
mod types;

pub use calendar::{date_inside, nth_weekday_date, to_dates};
pub use definition::ScheduleDefinition;
pub use error::ScheduleError;
pub use refresh::{refresh, resolve};
pub use registry::{Registry, ScheduleSnapshot};
pub use resolver::{MAX_SEARCH_ITERATIONS, MemberDates, find_candidate_date, get_next_date};
pub use scheduler::{ChangeHandler, Clock, DEFAULT_TICK, Scheduler, local_clock};
pub use types::{
    ActiveWindow, AnnualDate, ComputedState, Frequency, MAX_DAY_ORDER, MAX_PERIOD, ScheduleConfig,
    Tier,
};
