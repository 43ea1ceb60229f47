//! A set of schedules refreshed together in dependency order.
//!
//! Group schedules read the next dates of their members, so members are
//! always refreshed first. Schedules whose definition is invalid stay in the
//! registry and report the unknown tier.

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::refresh::{refresh, report};
use crate::resolver::MemberDates;
use crate::{ComputedState, ScheduleConfig, ScheduleDefinition, ScheduleError, Tier};

/// Name and latest state of one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub name: String,
    pub state: ComputedState,
}

#[derive(Debug)]
struct Slot {
    name: String,
    config: Result<ScheduleConfig, ScheduleError>,
    state: ComputedState,
}

/// All configured schedules and their computed states.
#[derive(Debug)]
pub struct Registry {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    /// Slot indices, members before the groups that read them.
    order: Vec<usize>,
}

impl Registry {
    /// Build a registry from configs.
    ///
    /// Configs that fail [`ScheduleConfig::validate`] are kept and report no
    /// date, as with [`Registry::from_definitions`].
    pub fn new(configs: Vec<ScheduleConfig>) -> Result<Self, ScheduleError> {
        let slots = configs
            .into_iter()
            .map(|config| {
                let name = config.name().to_string();
                let config = config.validate().map(|()| config);
                if let Err(e) = &config {
                    report(e);
                }
                Slot {
                    name,
                    config,
                    state: ComputedState::default(),
                }
            })
            .collect();
        Self::build(slots)
    }

    /// Build a registry from user definitions.
    ///
    /// A definition that fails to convert is kept and reports no date; only
    /// duplicate names and dependency cycles fail the whole registry.
    pub fn from_definitions(defs: &[ScheduleDefinition]) -> Result<Self, ScheduleError> {
        let slots = defs
            .iter()
            .map(|def| {
                let config = ScheduleConfig::try_from(def);
                if let Err(e) = &config {
                    report(e);
                }
                Slot {
                    name: def.name.clone(),
                    config,
                    state: ComputedState::default(),
                }
            })
            .collect();
        Self::build(slots)
    }

    fn build(slots: Vec<Slot>) -> Result<Self, ScheduleError> {
        let mut index = HashMap::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            if index.insert(slot.name.clone(), i).is_some() {
                return Err(ScheduleError::DuplicateSchedule(slot.name.clone()));
            }
        }

        for slot in &slots {
            for member in slot_members(slot) {
                if !index.contains_key(member) {
                    warn!(schedule = %slot.name, member = %member, "group member not found");
                }
            }
        }

        let order = dependency_order(&slots, &index)?;
        info!(count = slots.len(), "loaded schedules");

        Ok(Self {
            slots,
            index,
            order,
        })
    }

    /// Refresh every schedule for `today`, members first.
    ///
    /// Returns the schedules whose date, day count or tier changed. Calling
    /// this again for the same day recomputes nothing and returns nothing.
    pub fn refresh_all(&mut self, today: NaiveDate) -> Vec<ScheduleSnapshot> {
        let mut changed = Vec::new();

        for i in self.order.clone() {
            let previous = self.slots[i].state.clone();
            if previous.is_current(today) {
                continue;
            }

            let next = match &self.slots[i].config {
                Ok(config) => {
                    let members = self.member_dates(config);
                    refresh(&previous, config, today, &members)
                }
                Err(_) => ComputedState {
                    today: Some(today),
                    next_date: None,
                    days_until: None,
                    tier: Tier::Unknown,
                },
            };

            let slot = &mut self.slots[i];
            if previous.today.is_none()
                || previous.next_date != next.next_date
                || previous.days_until != next.days_until
                || previous.tier != next.tier
            {
                changed.push(ScheduleSnapshot {
                    name: slot.name.clone(),
                    state: next.clone(),
                });
            }
            slot.state = next;
        }

        debug!(%today, changed = changed.len(), "refreshed schedules");
        changed
    }

    fn member_dates(&self, config: &ScheduleConfig) -> MemberDates {
        config
            .group_members()
            .iter()
            .filter_map(|member| {
                let slot = &self.slots[*self.index.get(member)?];
                slot.state.next_date.map(|date| (member.clone(), date))
            })
            .collect()
    }

    /// Latest state of one schedule.
    pub fn snapshot(&self, name: &str) -> Option<ScheduleSnapshot> {
        let slot = &self.slots[*self.index.get(name)?];
        Some(ScheduleSnapshot {
            name: slot.name.clone(),
            state: slot.state.clone(),
        })
    }

    /// Latest state of every schedule, in definition order.
    pub fn snapshots(&self) -> Vec<ScheduleSnapshot> {
        self.slots
            .iter()
            .map(|slot| ScheduleSnapshot {
                name: slot.name.clone(),
                state: slot.state.clone(),
            })
            .collect()
    }

    /// Validated config of a schedule, if its definition was valid.
    pub fn config(&self, name: &str) -> Option<&ScheduleConfig> {
        self.slots[*self.index.get(name)?].config.as_ref().ok()
    }

    /// Schedules whose definition could not be converted, with the reason.
    pub fn problems(&self) -> Vec<(&str, &ScheduleError)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.config.as_ref().err().map(|e| (slot.name.as_str(), e)))
            .collect()
    }

    /// Schedule names in refresh order.
    pub fn refresh_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|i| self.slots[*i].name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn slot_members(slot: &Slot) -> &[String] {
    match &slot.config {
        Ok(config) => config.group_members(),
        Err(_) => &[],
    }
}

/// Order slots so every member comes before the groups that read it.
///
/// Ties keep definition order.
fn dependency_order(
    slots: &[Slot],
    index: &HashMap<String, usize>,
) -> Result<Vec<usize>, ScheduleError> {
    let mut in_degree = vec![0usize; slots.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];

    for (i, slot) in slots.iter().enumerate() {
        for member in slot_members(slot) {
            if let Some(&m) = index.get(member) {
                dependents[m].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..slots.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut order = Vec::with_capacity(slots.len());

    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if order.len() < slots.len() {
        let mut cycle: Vec<String> = (0..slots.len())
            .filter(|i| in_degree[*i] > 0)
            .map(|i| slots[i].name.clone())
            .collect();
        cycle.sort();
        return Err(ScheduleError::DependencyCycle(cycle));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frequency;
    use chrono::Weekday;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly(name: &str, day: &str) -> ScheduleDefinition {
        let mut def = ScheduleDefinition::new(name, "weekly");
        def.collection_days = vec![day.to_string()];
        def
    }

    fn group(name: &str, members: &[&str]) -> ScheduleDefinition {
        let mut def = ScheduleDefinition::new(name, "group");
        def.entities = members.iter().map(|m| m.to_string()).collect();
        def
    }

    #[test]
    fn test_groups_refresh_after_members() {
        // The group is declared before its members.
        let defs = vec![
            group("any", &["paper", "glass"]),
            weekly("paper", "fri"),
            weekly("glass", "wed"),
        ];
        let mut registry = Registry::from_definitions(&defs).unwrap();
        assert_eq!(registry.refresh_order(), vec!["paper", "glass", "any"]);

        // 2024-03-04 is a Monday
        let changed = registry.refresh_all(date(2024, 3, 4));
        assert_eq!(changed.len(), 3);

        let any = registry.snapshot("any").unwrap();
        assert_eq!(any.state.next_date, Some(date(2024, 3, 6)));
        assert_eq!(any.state.days_until, Some(2));
    }

    #[test]
    fn test_nested_groups() {
        let defs = vec![
            group("everything", &["recycling", "waste"]),
            group("recycling", &["paper"]),
            weekly("paper", "thu"),
            weekly("waste", "tue"),
        ];
        let mut registry = Registry::from_definitions(&defs).unwrap();
        registry.refresh_all(date(2024, 3, 6));

        assert_eq!(
            registry.snapshot("recycling").unwrap().state.next_date,
            Some(date(2024, 3, 7))
        );
        assert_eq!(
            registry.snapshot("everything").unwrap().state.next_date,
            Some(date(2024, 3, 7))
        );
    }

    #[test]
    fn test_refresh_all_is_idempotent_per_day() {
        let mut registry = Registry::from_definitions(&[weekly("paper", "fri")]).unwrap();
        let first = registry.refresh_all(date(2024, 3, 4));
        assert_eq!(first.len(), 1);

        let before = registry.snapshots();
        assert!(registry.refresh_all(date(2024, 3, 4)).is_empty());
        assert_eq!(registry.snapshots(), before);

        let next_day = registry.refresh_all(date(2024, 3, 5));
        assert_eq!(next_day.len(), 1);
        assert_eq!(next_day[0].state.days_until, Some(3));
    }

    #[test]
    fn test_invalid_definition_reports_unknown() {
        let defs = vec![
            ScheduleDefinition::new("broken", "sometimes"),
            weekly("paper", "fri"),
            group("any", &["broken", "paper"]),
        ];
        let mut registry = Registry::from_definitions(&defs).unwrap();
        assert_eq!(registry.problems().len(), 1);
        assert_eq!(registry.problems()[0].0, "broken");
        assert!(registry.config("broken").is_none());
        assert!(registry.config("paper").is_some());

        registry.refresh_all(date(2024, 3, 4));
        let broken = registry.snapshot("broken").unwrap();
        assert_eq!(broken.state.tier, Tier::Unknown);
        assert_eq!(broken.state.today, Some(date(2024, 3, 4)));
        assert_eq!(
            registry.snapshot("any").unwrap().state.next_date,
            Some(date(2024, 3, 8))
        );
    }

    #[test]
    fn test_unknown_member_is_ignored() {
        let defs = vec![weekly("paper", "fri"), group("any", &["paper", "ghost"])];
        let mut registry = Registry::from_definitions(&defs).unwrap();
        registry.refresh_all(date(2024, 3, 4));
        assert_eq!(
            registry.snapshot("any").unwrap().state.next_date,
            Some(date(2024, 3, 8))
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let defs = vec![weekly("paper", "fri"), weekly("paper", "mon")];
        assert_eq!(
            Registry::from_definitions(&defs).unwrap_err(),
            ScheduleError::DuplicateSchedule("paper".into())
        );
    }

    #[test]
    fn test_dependency_cycle_rejected() {
        let defs = vec![
            group("a", &["b"]),
            group("b", &["a"]),
            weekly("c", "mon"),
        ];
        assert_eq!(
            Registry::from_definitions(&defs).unwrap_err(),
            ScheduleError::DependencyCycle(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_new_from_configs() {
        let config =
            ScheduleConfig::new("glass", Frequency::Weekly).with_collection_days([Weekday::Mon]);
        let mut registry = Registry::new(vec![config]).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert!(registry.snapshot("missing").is_none());

        registry.refresh_all(date(2024, 3, 4));
        assert_eq!(registry.snapshot("glass").unwrap().state.tier, Tier::Today);
    }

    #[test]
    fn test_out_of_range_numbers_do_not_break_refresh() {
        let mut monthly = ScheduleDefinition::new("glass", "monthly");
        monthly.collection_days = vec!["mon".into()];
        monthly.weekday_order_number = vec![u32::MAX];

        let mut every = ScheduleDefinition::new("garden", "every-n-weeks");
        every.collection_days = vec!["mon".into()];
        every.period = u32::MAX;

        let defs = vec![monthly, every, weekly("paper", "fri")];
        let mut registry = Registry::from_definitions(&defs).unwrap();
        let names: Vec<_> = registry.problems().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["glass", "garden"]);

        registry.refresh_all(date(2024, 3, 4));
        assert_eq!(registry.snapshot("glass").unwrap().state.tier, Tier::Unknown);
        assert_eq!(registry.snapshot("garden").unwrap().state.tier, Tier::Unknown);
        assert_eq!(
            registry.snapshot("paper").unwrap().state.next_date,
            Some(date(2024, 3, 8))
        );
    }

    #[test]
    fn test_new_keeps_invalid_configs() {
        let config = ScheduleConfig::new(
            "every",
            Frequency::EveryNWeeks {
                period: u32::MAX,
                first_week: 1,
            },
        )
        .with_collection_days([Weekday::Mon]);
        let mut registry = Registry::new(vec![config]).unwrap();
        assert_eq!(registry.problems().len(), 1);

        registry.refresh_all(date(2024, 3, 4));
        assert_eq!(registry.snapshot("every").unwrap().state.tier, Tier::Unknown);
    }
}
