//! Property tests for the task collection under random command sequences.

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use taskflow_core::category::Category;
use taskflow_core::engine::TaskCollection;
use taskflow_core::filter::{FilterCriteria, StatusFilter};
use taskflow_core::task::{Priority, TaskId, TaskInput};

#[derive(Debug, Clone)]
enum Op {
    Add { title: String, priority: Priority },
    Toggle(u64),
    Remove(u64),
    Reorder { status: StatusFilter, from: usize, to: usize },
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::High), Just(Priority::Medium), Just(Priority::Low)]
}

fn arb_status() -> impl Strategy<Value = StatusFilter> {
    prop_oneof![
        Just(StatusFilter::All),
        Just(StatusFilter::Active),
        Just(StatusFilter::Completed),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        ("[ a-z]{0,12}", arb_priority()).prop_map(|(title, priority)| Op::Add { title, priority }),
        (1u64..12).prop_map(Op::Toggle),
        (1u64..12).prop_map(Op::Remove),
        (arb_status(), 0usize..10, 0usize..10)
            .prop_map(|(status, from, to)| Op::Reorder { status, from, to }),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_after_any_command_sequence(ops in prop::collection::vec(arb_op(), 0..40)) {
        let now = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).single().expect("valid now");
        let mut tasks = TaskCollection::seeded();
        let mut issued: HashSet<u64> = tasks.tasks().iter().map(|t| t.id.0).collect();

        for op in ops {
            let before = tasks.clone();
            match op {
                Op::Add { title, priority } => {
                    let input = TaskInput {
                        title: title.clone(),
                        category: Category::Learning,
                        priority,
                        ..TaskInput::default()
                    };
                    match tasks.add_or_update(input, None, now) {
                        Ok(id) => {
                            prop_assert!(!title.trim().is_empty());
                            prop_assert_eq!(tasks.len(), before.len() + 1);
                            prop_assert!(issued.insert(id.0), "id {} was reused", id);
                            let max_before = before.tasks().iter().map(|t| t.order).max().unwrap_or(0);
                            prop_assert_eq!(tasks.get(id).expect("added").order, max_before + 1);
                        }
                        Err(_) => {
                            prop_assert!(title.trim().is_empty());
                            prop_assert_eq!(tasks.tasks(), before.tasks());
                        }
                    }
                }
                Op::Toggle(id) => {
                    let flipped = tasks.toggle(TaskId(id));
                    let was = before.get(TaskId(id)).map(|t| t.completed);
                    prop_assert_eq!(flipped, was.map(|c| !c));
                }
                Op::Remove(id) => {
                    let removed = tasks.remove(TaskId(id));
                    prop_assert_eq!(removed.is_some(), before.get(TaskId(id)).is_some());
                    prop_assert!(tasks.get(TaskId(id)).is_none());
                }
                Op::Reorder { status, from, to } => {
                    let criteria = FilterCriteria::default().with_status(status);
                    let visible = before.view(&criteria).len();
                    match tasks.reorder(&criteria, from, to) {
                        Ok(()) if from != to => {
                            let mut orders: Vec<u64> = tasks.tasks().iter().map(|t| t.order).collect();
                            orders.sort_unstable();
                            let expected: Vec<u64> = (1..=tasks.len() as u64).collect();
                            prop_assert_eq!(orders, expected);
                            let moved = before.view(&criteria)[from].id;
                            prop_assert_eq!(tasks.view(&criteria)[to].id, moved);
                        }
                        Ok(()) => prop_assert_eq!(tasks.tasks(), before.tasks()),
                        Err(_) => {
                            prop_assert!(from >= visible || to >= visible);
                            prop_assert_eq!(tasks.tasks(), before.tasks());
                        }
                    }
                }
            }

            let ids: HashSet<TaskId> = tasks.tasks().iter().map(|t| t.id).collect();
            prop_assert_eq!(ids.len(), tasks.len());

            let stats = tasks.stats(now, &chrono_tz::UTC);
            prop_assert_eq!(stats.total, tasks.len());
            prop_assert_eq!(stats.active + stats.completed, stats.total);
            prop_assert_eq!(
                stats.by_priority.high + stats.by_priority.medium + stats.by_priority.low,
                stats.active
            );
            prop_assert!(stats.overdue <= stats.active);
            prop_assert!((0.0..=100.0).contains(&stats.completion_rate));
        }
    }

    #[test]
    fn derived_view_is_a_sorted_subset(
        status in arb_status(),
        needle in "[a-z]{0,3}",
    ) {
        let tasks = TaskCollection::seeded();
        let criteria = FilterCriteria::default().with_status(status).with_search(needle);
        let view = tasks.view(&criteria);

        prop_assert!(view.len() <= tasks.len());
        prop_assert!(view.windows(2).all(|w| w[0].order <= w[1].order));
        for task in &view {
            prop_assert!(tasks.tasks().contains(task));
        }
    }
}
