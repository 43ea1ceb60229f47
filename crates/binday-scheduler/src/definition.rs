//! Declarative schedule definitions, as written in configuration files.

use chrono::{Month, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::to_dates;
use crate::{ActiveWindow, AnnualDate, Frequency, ScheduleConfig, ScheduleError};

fn default_period() -> u32 {
    1
}

fn default_first_week() -> u32 {
    1
}

/// A schedule as written by a user, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    /// Unique schedule name.
    pub name: String,
    /// One of `weekly`, `even-weeks`, `odd-weeks`, `every-n-weeks`,
    /// `monthly`, `annual`, `group`.
    pub frequency: String,
    /// Weekday names such as `mon` or `monday`.
    #[serde(default)]
    pub collection_days: Vec<String>,
    /// Month name the active window starts in (defaults to January).
    #[serde(default)]
    pub first_month: Option<String>,
    /// Month name the active window ends in (defaults to December).
    #[serde(default)]
    pub last_month: Option<String>,
    /// For `monthly`: which occurrences of the weekday, e.g. `[1, 3]`.
    #[serde(default)]
    pub weekday_order_number: Vec<u32>,
    /// For `every-n-weeks`: weeks between collections.
    #[serde(default = "default_period")]
    pub period: u32,
    /// For `every-n-weeks`: ISO week the cycle is anchored to.
    #[serde(default = "default_first_week")]
    pub first_week: u32,
    /// For `annual`: `MM/DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Extra collection dates, `YYYY-MM-DD`. Malformed entries are ignored.
    #[serde(default)]
    pub include_dates: Vec<String>,
    /// Cancelled collection dates, `YYYY-MM-DD`. Malformed entries are ignored.
    #[serde(default)]
    pub exclude_dates: Vec<String>,
    /// For `group`: names of the member schedules.
    #[serde(default)]
    pub entities: Vec<String>,
}

impl ScheduleDefinition {
    /// Minimal definition with everything else defaulted.
    pub fn new(name: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frequency: frequency.into(),
            collection_days: Vec::new(),
            first_month: None,
            last_month: None,
            weekday_order_number: Vec::new(),
            period: default_period(),
            first_week: default_first_week(),
            date: None,
            include_dates: Vec::new(),
            exclude_dates: Vec::new(),
            entities: Vec::new(),
        }
    }

    fn frequency(&self) -> Result<Frequency, ScheduleError> {
        let frequency = match self.frequency.trim().to_lowercase().as_str() {
            "weekly" => Frequency::Weekly,
            "even-weeks" => Frequency::EvenWeeks,
            "odd-weeks" => Frequency::OddWeeks,
            "every-n-weeks" => Frequency::EveryNWeeks {
                period: self.period,
                first_week: self.first_week,
            },
            "monthly" => Frequency::Monthly {
                day_order_numbers: self.weekday_order_number.clone(),
            },
            "annual" => {
                let date = self.date.as_deref().ok_or_else(|| {
                    ScheduleError::configuration(
                        &self.name,
                        "please configure the date for annual collection frequency",
                    )
                })?;
                Frequency::Annual {
                    date: date.parse::<AnnualDate>()?,
                }
            }
            "group" => Frequency::Group {
                members: self.entities.clone(),
            },
            _ => return Err(ScheduleError::UnknownFrequency(self.frequency.clone())),
        };
        Ok(frequency)
    }

    fn window(&self) -> ActiveWindow {
        let first = month_number(self.first_month.as_deref()).unwrap_or(1);
        let last = month_number(self.last_month.as_deref()).unwrap_or(12);
        ActiveWindow::new(first, last).unwrap_or_default()
    }
}

/// Month number for a name like `jan` or `January`; `None` if unrecognised.
fn month_number(name: Option<&str>) -> Option<u32> {
    name?.trim().parse::<Month>().ok().map(|m| m.number_from_month())
}

impl TryFrom<&ScheduleDefinition> for ScheduleConfig {
    type Error = ScheduleError;

    fn try_from(def: &ScheduleDefinition) -> Result<Self, Self::Error> {
        let frequency = def.frequency()?;
        let collection_days = def
            .collection_days
            .iter()
            .map(|day| {
                day.trim()
                    .parse::<Weekday>()
                    .map_err(|_| ScheduleError::InvalidWeekday(day.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let config = ScheduleConfig::new(def.name.clone(), frequency)
            .with_collection_days(collection_days)
            .with_window(def.window())
            .with_include_dates(to_dates(&def.include_dates))
            .with_exclude_dates(to_dates(&def.exclude_dates));

        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<ScheduleDefinition> for ScheduleConfig {
    type Error = ScheduleError;

    fn try_from(def: ScheduleDefinition) -> Result<Self, Self::Error> {
        ScheduleConfig::try_from(&def)
    }
}
