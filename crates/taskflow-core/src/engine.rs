//! The task collection: canonical task list plus the commands that mutate
//! it. Queries (`view`, `stats`) recompute from scratch on every call.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::category::{CategoryInfo, catalog};
use crate::filter::{FilterCriteria, derive_view};
use crate::seed::sample_tasks;
use crate::stats::{TaskStats, compute_stats};
use crate::task::{Task, TaskId, TaskInput};

/// Reasons a command was rejected. The collection is unchanged whenever one
/// of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("task not found: {0}")]
    UnknownTask(TaskId),
    #[error("position {index} is out of range (view has {len} tasks)")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone)]
pub struct TaskCollection {
    tasks: Vec<Task>,
    next_id: u64,
}

impl Default for TaskCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::with_tasks(Vec::new())
    }

    pub fn seeded() -> Self {
        Self::with_tasks(sample_tasks())
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0) + 1;
        debug!(count = tasks.len(), next_id, "task collection created");
        Self { tasks, next_id }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn categories(&self) -> &'static [CategoryInfo] {
        catalog()
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn next_order(&self) -> u64 {
        self.tasks.iter().map(|t| t.order).max().unwrap_or(0) + 1
    }

    /// Creates a task, or replaces the editable fields of `editing` when
    /// given.
    #[instrument(skip(self, input, now), fields(editing = ?editing))]
    pub fn add_or_update(
        &mut self,
        input: TaskInput,
        editing: Option<TaskId>,
        now: DateTime<Utc>,
    ) -> Result<TaskId, EngineError> {
        if !input.has_title() {
            warn!("rejected task with empty title");
            return Err(EngineError::EmptyTitle);
        }

        if let Some(id) = editing {
            let idx = self.position(id).ok_or(EngineError::UnknownTask(id))?;
            self.tasks[idx].apply_input(input);
            info!(%id, "task updated");
            return Ok(id);
        }

        let id = TaskId(self.next_id);
        let order = self.next_order();
        self.next_id += 1;
        self.tasks.push(Task::from_input(input, id, order, now));
        info!(%id, order, count = self.tasks.len(), "task added");
        Ok(id)
    }

    /// Flips completion, returning the new state.
    #[instrument(skip(self), fields(id = %id))]
    pub fn toggle(&mut self, id: TaskId) -> Option<bool> {
        let Some(idx) = self.position(id) else {
            debug!("toggle ignored; no such task");
            return None;
        };
        let task = &mut self.tasks[idx];
        task.completed = !task.completed;
        info!(completed = task.completed, "task toggled");
        Some(task.completed)
    }

    /// Deletes a task. Remaining orders keep their gaps.
    #[instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let Some(idx) = self.position(id) else {
            debug!("remove ignored; no such task");
            return None;
        };
        let removed = self.tasks.remove(idx);
        info!(remaining = self.tasks.len(), "task removed");
        Some(removed)
    }

    /// Moves the task shown at view position `from` to view position `to`,
    /// then renumbers every task `1..=N`.
    ///
    /// The view is the one `criteria` derives right now. Tasks hidden by the
    /// filter keep their relative sequence.
    #[instrument(skip(self, criteria))]
    pub fn reorder(
        &mut self,
        criteria: &FilterCriteria,
        from: usize,
        to: usize,
    ) -> Result<(), EngineError> {
        let view = derive_view(&self.tasks, criteria);
        for index in [from, to] {
            if index >= view.len() {
                warn!(index, len = view.len(), "reorder index out of range");
                return Err(EngineError::IndexOutOfRange {
                    index,
                    len: view.len(),
                });
            }
        }
        if from == to {
            return Ok(());
        }

        let moved = view[from].id;
        let anchor = view[to].id;

        let mut sequence: Vec<Task> = std::mem::take(&mut self.tasks);
        sequence.sort_by_key(|t| t.order);

        let Some(moved_at) = sequence.iter().position(|t| t.id == moved) else {
            self.tasks = sequence;
            return Err(EngineError::UnknownTask(moved));
        };
        let task = sequence.remove(moved_at);

        let Some(anchor_at) = sequence.iter().position(|t| t.id == anchor) else {
            sequence.insert(moved_at, task);
            self.tasks = sequence;
            return Err(EngineError::UnknownTask(anchor));
        };
        let insert_at = if from < to { anchor_at + 1 } else { anchor_at };
        sequence.insert(insert_at, task);

        for (idx, task) in sequence.iter_mut().enumerate() {
            task.order = idx as u64 + 1;
        }
        self.tasks = sequence;

        info!(%moved, %anchor, "tasks reordered");
        Ok(())
    }

    pub fn view(&self, criteria: &FilterCriteria) -> Vec<Task> {
        derive_view(&self.tasks, criteria)
    }

    pub fn stats(&self, now: DateTime<Utc>, tz: &Tz) -> TaskStats {
        compute_stats(&self.tasks, now, tz)
    }
}
