//! Schedule types.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::ScheduleError;

/// How often a collection recurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    /// Every week on the collection days.
    Weekly,
    /// Even ISO weeks only.
    EvenWeeks,
    /// Odd ISO weeks only.
    OddWeeks,
    /// Every `period` weeks, counting from ISO week `first_week`.
    EveryNWeeks { period: u32, first_week: u32 },
    /// The n-th collection weekday of each month, for each listed n.
    Monthly { day_order_numbers: Vec<u32> },
    /// Once a year on a fixed month/day.
    Annual { date: AnnualDate },
    /// Earliest next date among other schedules.
    Group { members: Vec<String> },
}

impl Frequency {
    /// The `(period, first_week)` pair of a week-based frequency.
    ///
    /// Returns `None` for monthly, annual and group schedules.
    pub fn week_cycle(&self) -> Option<(u32, u32)> {
        match self {
            Frequency::Weekly => Some((1, 1)),
            Frequency::EvenWeeks => Some((2, 2)),
            Frequency::OddWeeks => Some((2, 1)),
            Frequency::EveryNWeeks { period, first_week } => Some((*period, *first_week)),
            Frequency::Monthly { .. } | Frequency::Annual { .. } | Frequency::Group { .. } => None,
        }
    }

    /// Name used in schedule definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::EvenWeeks => "even-weeks",
            Frequency::OddWeeks => "odd-weeks",
            Frequency::EveryNWeeks { .. } => "every-n-weeks",
            Frequency::Monthly { .. } => "monthly",
            Frequency::Annual { .. } => "annual",
            Frequency::Group { .. } => "group",
        }
    }
}

/// A month/day pair with no year, written `MM/DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualDate {
    month: u32,
    day: u32,
}

impl AnnualDate {
    /// Create an annual date, rejecting days that never exist (Feb 29 is allowed).
    pub fn new(month: u32, day: u32) -> Option<Self> {
        // 2000 is a leap year, so every real month/day validates.
        NaiveDate::from_ymd_opt(2000, month, day).map(|_| Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// The date in a given year, if it exists there (Feb 29 only in leap years).
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

impl FromStr for AnnualDate {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidAnnualDate(s.to_string());
        let (month, day) = s.trim().split_once('/').ok_or_else(invalid)?;
        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        let day: u32 = day.trim().parse().map_err(|_| invalid())?;
        Self::new(month, day).ok_or_else(invalid)
    }
}

impl fmt::Display for AnnualDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.day)
    }
}

/// The span of months in which a schedule is active.
///
/// When `first_month > last_month` the window wraps across the year end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    first_month: u32,
    last_month: u32,
}

impl ActiveWindow {
    /// January through December.
    pub const ALL_YEAR: Self = Self {
        first_month: 1,
        last_month: 12,
    };

    /// Create a window; both months must be in `1..=12`.
    pub fn new(first_month: u32, last_month: u32) -> Option<Self> {
        let valid = 1..=12;
        (valid.contains(&first_month) && valid.contains(&last_month)).then_some(Self {
            first_month,
            last_month,
        })
    }

    pub fn first_month(&self) -> u32 {
        self.first_month
    }

    pub fn last_month(&self) -> u32 {
        self.last_month
    }

    /// Whether the window spans the year end.
    pub fn wraps(&self) -> bool {
        self.first_month > self.last_month
    }

    /// Whether the month of `date` lies inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let month = date.month();
        if self.wraps() {
            month <= self.last_month || month >= self.first_month
        } else {
            month >= self.first_month && month <= self.last_month
        }
    }

    /// First day of the window in `year`.
    pub fn start_in(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.first_month, 1)
    }
}

impl Default for ActiveWindow {
    fn default() -> Self {
        Self::ALL_YEAR
    }
}

/// Highest weekday order number of a monthly schedule (a fifth occurrence).
pub const MAX_DAY_ORDER: u32 = 5;

/// Longest period of an every-n-weeks schedule.
pub const MAX_PERIOD: u32 = 52;

/// Immutable, validated configuration of one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    name: String,
    frequency: Frequency,
    collection_days: Vec<Weekday>,
    window: ActiveWindow,
    include_dates: Vec<NaiveDate>,
    exclude_dates: Vec<NaiveDate>,
}

impl ScheduleConfig {
    /// Create a schedule active all year with no collection days or overrides.
    pub fn new(name: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            name: name.into(),
            frequency,
            collection_days: Vec::new(),
            window: ActiveWindow::ALL_YEAR,
            include_dates: Vec::new(),
            exclude_dates: Vec::new(),
        }
    }

    /// Set the collection weekdays. Listed order is kept; repeats are dropped.
    pub fn with_collection_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.collection_days.clear();
        for day in days {
            if !self.collection_days.contains(&day) {
                self.collection_days.push(day);
            }
        }
        self
    }

    /// Restrict the schedule to an active window.
    pub fn with_window(mut self, window: ActiveWindow) -> Self {
        self.window = window;
        self
    }

    /// Dates on which a collection happens regardless of the calendar.
    pub fn with_include_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.include_dates = sorted_unique(dates);
        self
    }

    /// Dates on which no collection happens.
    pub fn with_exclude_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.exclude_dates = sorted_unique(dates);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    pub fn collection_days(&self) -> &[Weekday] {
        &self.collection_days
    }

    pub fn window(&self) -> ActiveWindow {
        self.window
    }

    pub fn include_dates(&self) -> &[NaiveDate] {
        &self.include_dates
    }

    pub fn exclude_dates(&self) -> &[NaiveDate] {
        &self.exclude_dates
    }

    /// Whether `date` is explicitly excluded.
    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.exclude_dates.binary_search(&date).is_ok()
    }

    /// Earliest include date on or after `from`.
    pub fn next_include(&self, from: NaiveDate) -> Option<NaiveDate> {
        let idx = self.include_dates.partition_point(|d| *d < from);
        self.include_dates.get(idx).copied()
    }

    /// Members of a group schedule (empty for every other frequency).
    pub fn group_members(&self) -> &[String] {
        match &self.frequency {
            Frequency::Group { members } => members,
            _ => &[],
        }
    }

    /// Check the fields the selected frequency depends on.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let fail = |reason: &str| Err(ScheduleError::configuration(&self.name, reason));
        match &self.frequency {
            Frequency::Weekly | Frequency::EvenWeeks | Frequency::OddWeeks => {
                if self.collection_days.is_empty() {
                    return fail("please configure the collection days");
                }
            }
            Frequency::EveryNWeeks { period, .. } => {
                if self.collection_days.is_empty() {
                    return fail("please configure the collection days");
                }
                if !(1..=MAX_PERIOD).contains(period) {
                    return fail("period must be between 1 and 52 weeks");
                }
            }
            Frequency::Monthly { day_order_numbers } => {
                if self.collection_days.is_empty() {
                    return fail("please configure the collection days");
                }
                if day_order_numbers.is_empty() {
                    return fail("please configure the weekday order numbers");
                }
                if day_order_numbers.iter().any(|n| !(1..=MAX_DAY_ORDER).contains(n)) {
                    return fail("weekday order numbers must be between 1 and 5");
                }
            }
            Frequency::Annual { .. } => {}
            Frequency::Group { members } => {
                if members.is_empty() {
                    return fail("please add entities for the group");
                }
            }
        }
        Ok(())
    }
}

fn sorted_unique(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
    dates.sort();
    dates.dedup();
    dates
}

/// Display category derived from the number of days until the next collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// More than one day away.
    Future,
    /// Tomorrow.
    Tomorrow,
    /// Today.
    Today,
    /// No date could be found.
    #[default]
    Unknown,
}

impl Tier {
    /// Tier for a day count. Negative counts only come from stale group
    /// members and are reported as unknown.
    pub fn from_days(days: Option<i64>) -> Self {
        match days {
            Some(0) => Tier::Today,
            Some(1) => Tier::Tomorrow,
            Some(d) if d > 1 => Tier::Future,
            _ => Tier::Unknown,
        }
    }
}

/// Result of the last refresh of a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedState {
    /// Reference date of the last refresh.
    pub today: Option<NaiveDate>,
    /// Next collection date, if any.
    pub next_date: Option<NaiveDate>,
    /// Days from `today` to `next_date`.
    pub days_until: Option<i64>,
    /// Display tier for `days_until`.
    pub tier: Tier,
}

impl ComputedState {
    /// Whether this state was already computed for `today`.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.today == Some(today)
    }
}
