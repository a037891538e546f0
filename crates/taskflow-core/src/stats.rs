use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::task::{Priority, Task};

/// Incomplete tasks per priority level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityBreakdown {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
    /// Percentage in `0.0..=100.0`.
    pub completion_rate: f64,
    pub by_priority: PriorityBreakdown,
}

impl TaskStats {
    /// Whole-percent value for display, halves rounded up.
    pub fn rounded_rate(&self) -> u32 {
        (self.completion_rate + 0.5).floor().clamp(0.0, 100.0) as u32
    }
}

/// Summarizes the whole collection, ignoring any active filter.
#[tracing::instrument(skip(tasks, now, tz), fields(count = tasks.len()))]
pub fn compute_stats(tasks: &[Task], now: DateTime<Utc>, tz: &Tz) -> TaskStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(now, tz)).count();
    let completion_rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let mut by_priority = PriorityBreakdown::default();
    for task in tasks.iter().filter(|t| !t.completed) {
        match task.priority {
            Priority::High => by_priority.high += 1,
            Priority::Medium => by_priority.medium += 1,
            Priority::Low => by_priority.low += 1,
        }
    }

    TaskStats {
        total,
        active: total - completed,
        completed,
        overdue,
        completion_rate,
        by_priority,
    }
}
