//! Stateful property testing for the daily refresh of a schedule registry.
//!
//! Uses proptest-state-machine to drive a registry through repeated ticks on
//! the same day, day-by-day advances and long jumps, checking that every
//! schedule's state stays consistent with its configuration.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use proptest_state_machine::{ReferenceStateMachine, StateMachineTest, prop_state_machine};

use binday_scheduler::{Registry, ScheduleDefinition, ScheduleSnapshot, Tier};

/// Operations that can be performed on the registry.
#[derive(Debug, Clone)]
pub enum RefreshOperation {
    /// Tick again without the date changing.
    TickSameDay,
    /// Move forward a few days and tick.
    AdvanceDays { days: i64 },
    /// Move forward by months and tick.
    Jump { days: i64 },
}

/// Reference model: only the calendar moves; everything else is derived.
#[derive(Clone, Debug)]
pub struct RefreshModel {
    pub today: NaiveDate,
    /// Whether the last operation moved the date.
    pub moved: bool,
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

impl ReferenceStateMachine for RefreshModel {
    type State = Self;
    type Transition = RefreshOperation;

    fn init_state() -> BoxedStrategy<Self::State> {
        (0i64..730)
            .prop_map(|offset| RefreshModel {
                today: start_date() + Duration::days(offset),
                moved: true,
            })
            .boxed()
    }

    fn transitions(_state: &Self::State) -> BoxedStrategy<Self::Transition> {
        prop_oneof![
            3 => Just(RefreshOperation::TickSameDay),
            4 => (1i64..10).prop_map(|days| RefreshOperation::AdvanceDays { days }),
            1 => (30i64..400).prop_map(|days| RefreshOperation::Jump { days }),
        ]
        .boxed()
    }

    fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
        match transition {
            RefreshOperation::TickSameDay => state.moved = false,
            RefreshOperation::AdvanceDays { days } | RefreshOperation::Jump { days } => {
                state.today += Duration::days(*days);
                state.moved = true;
            }
        }
        state
    }
}

fn definitions() -> Vec<ScheduleDefinition> {
    let mut general = ScheduleDefinition::new("general", "weekly");
    general.collection_days = vec!["mon".into(), "thu".into()];
    general.exclude_dates = vec!["2024-12-26".into(), "2025-01-02".into()];
    general.include_dates = vec!["2024-12-28".into()];

    let mut paper = ScheduleDefinition::new("paper", "monthly");
    paper.collection_days = vec!["wed".into()];
    paper.weekday_order_number = vec![2, 4];

    let mut garden = ScheduleDefinition::new("garden", "even-weeks");
    garden.collection_days = vec!["fri".into()];
    garden.first_month = Some("apr".into());
    garden.last_month = Some("oct".into());

    let mut salt = ScheduleDefinition::new("salt", "every-n-weeks");
    salt.collection_days = vec!["sat".into()];
    salt.period = 3;
    salt.first_week = 2;
    salt.first_month = Some("nov".into());
    salt.last_month = Some("feb".into());

    let mut tree = ScheduleDefinition::new("tree", "annual");
    tree.date = Some("01/08".into());

    let mut recycling = ScheduleDefinition::new("recycling", "group");
    recycling.entities = vec!["paper".into(), "garden".into()];

    // Declared before its members on purpose.
    vec![recycling, general, paper, garden, salt, tree]
}

/// Test harness wrapping a registry and the changes of its last tick.
pub struct RegistryHarness {
    registry: Registry,
    last_changes: Vec<ScheduleSnapshot>,
}

impl StateMachineTest for RegistryHarness {
    type SystemUnderTest = Self;
    type Reference = RefreshModel;

    fn init_test(
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) -> Self::SystemUnderTest {
        let mut registry = Registry::from_definitions(&definitions()).expect("valid definitions");
        let last_changes = registry.refresh_all(ref_state.today);
        Self {
            registry,
            last_changes,
        }
    }

    fn apply(
        mut state: Self::SystemUnderTest,
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        _transition: <Self::Reference as ReferenceStateMachine>::Transition,
    ) -> Self::SystemUnderTest {
        let before = state.registry.snapshots();
        state.last_changes = state.registry.refresh_all(ref_state.today);

        if ref_state.moved {
            // A new day moves either the date or the day count of every schedule.
            assert_eq!(state.last_changes.len(), state.registry.len());
        } else {
            // Idempotent for the same day.
            assert!(state.last_changes.is_empty(), "same-day tick reported changes");
            assert_eq!(state.registry.snapshots(), before, "same-day tick changed state");
        }
        state
    }

    fn check_invariants(
        state: &Self::SystemUnderTest,
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) {
        let today = ref_state.today;

        for snapshot in state.registry.snapshots() {
            let s = &snapshot.state;
            let config = state
                .registry
                .config(&snapshot.name)
                .expect("all definitions are valid");

            // Invariant: every schedule was refreshed for today.
            assert_eq!(s.today, Some(today), "{} not refreshed", snapshot.name);

            // Invariant: tier and day count follow the next date.
            assert_eq!(s.days_until, s.next_date.map(|d| (d - today).num_days()));
            assert_eq!(s.tier, Tier::from_days(s.days_until));

            // Every schedule here always has an upcoming date.
            let next = s.next_date.unwrap_or_else(|| panic!("{} has no date", snapshot.name));
            assert!(next >= today, "{} in the past", snapshot.name);
            assert!(!config.is_excluded(next), "{} on excluded date", snapshot.name);
            assert!(config.window().contains(next), "{} outside window", snapshot.name);
        }

        // Invariant: the group is the earliest of its members.
        let member_min = ["paper", "garden"]
            .iter()
            .filter_map(|name| state.registry.snapshot(name)?.state.next_date)
            .min();
        let group = state.registry.snapshot("recycling").and_then(|s| s.state.next_date);
        assert_eq!(group, member_min);
    }
}

prop_state_machine! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 1024,
        ..ProptestConfig::default()
    })]

    #[test]
    fn registry_refresh_state_machine(sequential 1..40 => RegistryHarness);
}

#[test]
fn test_excluded_holiday_moves_to_include_date() {
    let mut registry = Registry::from_definitions(&definitions()).unwrap();
    // 2024-12-24 is a Tuesday; Thursday 26th is excluded, Saturday 28th included.
    registry.refresh_all(NaiveDate::from_ymd_opt(2024, 12, 24).unwrap());
    assert_eq!(
        registry.snapshot("general").unwrap().state.next_date,
        NaiveDate::from_ymd_opt(2024, 12, 28)
    );
}

#[test]
fn test_wrapping_window_out_of_season() {
    let mut registry = Registry::from_definitions(&definitions()).unwrap();
    registry.refresh_all(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    let salt = registry.snapshot("salt").unwrap().state.next_date.unwrap();
    assert!(salt >= NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
    assert!(salt < NaiveDate::from_ymd_opt(2024, 11, 30).unwrap());
}
