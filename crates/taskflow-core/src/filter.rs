use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::category::Category;
use crate::task::{
  Priority,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed
}

impl StatusFilter {
  fn admits(
    self,
    task: &Task
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Active => {
        !task.completed
      }
      | StatusFilter::Completed => {
        task.completed
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(StatusFilter::All),
      | "active" | "open" => {
        Ok(StatusFilter::Active)
      }
      | "completed" | "done" => {
        Ok(StatusFilter::Completed)
      }
      | other => Err(anyhow!(
        "invalid status filter: \
         {other} (expected all, \
         active or completed)"
      ))
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | StatusFilter::All => "all",
      | StatusFilter::Active => {
        "active"
      }
      | StatusFilter::Completed => {
        "completed"
      }
    })
  }
}

/// Either `all` or a single value.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Choice<T> {
  All,
  Only(T)
}

impl<T> Default for Choice<T> {
  fn default() -> Self {
    Choice::All
  }
}

impl<T: PartialEq> Choice<T> {
  fn admits(
    &self,
    value: &T
  ) -> bool {
    match self {
      | Choice::All => true,
      | Choice::Only(wanted) => {
        wanted == value
      }
    }
  }
}

impl<T> FromStr for Choice<T>
where
  T: FromStr<Err = anyhow::Error>
{
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(Choice::All);
    }
    s.parse::<T>().map(Choice::Only)
  }
}

impl<T: fmt::Display> fmt::Display
  for Choice<T>
{
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Choice::All => f.write_str("all"),
      | Choice::Only(value) => {
        value.fmt(f)
      }
    }
  }
}

/// Transient query state held by the
/// presentation layer.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
)]
pub struct FilterCriteria {
  pub status:      StatusFilter,
  pub priority:    Choice<Priority>,
  pub category:    Choice<Category>,
  #[serde(default)]
  pub search_term: String
}

impl FilterCriteria {
  pub fn with_status(
    mut self,
    status: StatusFilter
  ) -> Self {
    self.status = status;
    self
  }

  pub fn with_priority(
    mut self,
    priority: Choice<Priority>
  ) -> Self {
    self.priority = priority;
    self
  }

  pub fn with_category(
    mut self,
    category: Choice<Category>
  ) -> Self {
    self.category = category;
    self
  }

  pub fn with_search(
    mut self,
    term: impl Into<String>
  ) -> Self {
    self.search_term = term.into();
    self
  }

  /// Applies a `key:value` term such as
  /// `status:active` or `cat:work`.
  pub fn apply_term(
    &mut self,
    term: &str
  ) -> anyhow::Result<()> {
    let (key, value) = term
      .split_once(':')
      .or_else(|| term.split_once('='))
      .ok_or_else(|| {
        anyhow!(
          "expected key:value filter \
           term, got: {term}"
        )
      })?;

    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "status" | "st" => {
        self.status = value.parse()?;
      }
      | "priority" | "pri" => {
        self.priority = value.parse()?;
      }
      | "category" | "cat" => {
        self.category = value.parse()?;
      }
      | "search" => {
        self.search_term =
          value.to_string();
      }
      | other => {
        return Err(anyhow!(
          "unknown filter key: {other}"
        ));
      }
    }

    Ok(())
  }

  pub fn is_default(&self) -> bool {
    *self == Self::default()
  }

  pub fn matches(
    &self,
    task: &Task,
    needle_lower: &str
  ) -> bool {
    self.status.admits(task)
      && self
        .priority
        .admits(&task.priority)
      && self
        .category
        .admits(&task.category)
      && task.matches_text(needle_lower)
  }
}

impl fmt::Display for FilterCriteria {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "status:{} priority:{} \
       category:{}",
      self.status,
      self.priority,
      self.category
    )?;
    if !self.search_term.is_empty() {
      write!(
        f,
        " search:\"{}\"",
        self.search_term
      )?;
    }
    Ok(())
  }
}

/// Filters by status, priority,
/// category and search text, then sorts
/// by manual order. Never mutates the
/// source.
#[tracing::instrument(skip(
  tasks, criteria
))]
pub fn derive_view(
  tasks: &[Task],
  criteria: &FilterCriteria
) -> Vec<Task> {
  let needle =
    criteria.search_term.to_lowercase();

  let mut view: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      criteria.matches(task, &needle)
    })
    .cloned()
    .collect();

  // stable: equal orders keep collection order
  view.sort_by_key(|task| task.order);

  trace!(
    total = tasks.len(),
    visible = view.len(),
    "derived view"
  );
  view
}

#[cfg(test)]
mod tests {
  use super::{
    Choice,
    FilterCriteria,
    StatusFilter,
    derive_view
  };
  use crate::category::Category;
  use crate::seed::sample_tasks;
  use crate::task::Priority;

  fn titles(
    criteria: &FilterCriteria
  ) -> Vec<String> {
    derive_view(
      &sample_tasks(),
      criteria
    )
    .into_iter()
    .map(|t| t.title)
    .collect()
  }

  #[test]
  fn active_view_excludes_completed() {
    let criteria =
      FilterCriteria::default()
        .with_status(
          StatusFilter::Active
        );
    assert_eq!(
      titles(&criteria),
      vec![
        "Complete project proposal",
        "Review investment portfolio",
        "Learn React hooks",
        "Plan weekend trip",
      ]
    );
  }

  #[test]
  fn completed_view_only_completed() {
    let criteria =
      FilterCriteria::default()
        .with_status(
          StatusFilter::Completed
        );
    let view = derive_view(
      &sample_tasks(),
      &criteria
    );
    assert!(!view.is_empty());
    assert!(
      view.iter().all(|t| t.completed)
    );
  }

  #[test]
  fn search_is_case_insensitive_over_title_and_description()
   {
    assert_eq!(
      titles(
        &FilterCriteria::default()
          .with_search("WORKOUT")
      ),
      vec!["Morning workout routine"]
    );
    assert_eq!(
      titles(
        &FilterCriteria::default()
          .with_search("rebalance")
      ),
      vec![
        "Review investment portfolio"
      ]
    );
  }

  #[test]
  fn filters_combine() {
    let criteria =
      FilterCriteria::default()
        .with_priority(Choice::Only(
          Priority::Low
        ))
        .with_category(Choice::Only(
          Category::Personal
        ));
    assert_eq!(
      titles(&criteria),
      vec!["Plan weekend trip"]
    );
  }

  #[test]
  fn view_sorted_by_order_not_position()
   {
    let mut tasks = sample_tasks();
    tasks.reverse();
    tasks[0].order = 0;
    let view = derive_view(
      &tasks,
      &FilterCriteria::default()
    );
    let orders: Vec<u64> =
      view.iter().map(|t| t.order).collect();
    assert_eq!(
      orders,
      vec![0, 1, 2, 3, 4]
    );
    assert_eq!(
      view[0].title,
      "Plan weekend trip"
    );
  }

  #[test]
  fn apply_term_parses_each_key() {
    let mut criteria =
      FilterCriteria::default();
    criteria
      .apply_term("status:completed")
      .expect("status");
    criteria
      .apply_term("pri:high")
      .expect("priority");
    criteria
      .apply_term("cat:Health")
      .expect("category");
    assert_eq!(
      criteria.status,
      StatusFilter::Completed
    );
    assert_eq!(
      criteria.priority,
      Choice::Only(Priority::High)
    );
    assert_eq!(
      criteria.category,
      Choice::Only(Category::Health)
    );

    criteria
      .apply_term("category:all")
      .expect("reset category");
    assert_eq!(
      criteria.category,
      Choice::All
    );
    assert!(
      criteria
        .apply_term("color:red")
        .is_err()
    );
    assert!(
      criteria.apply_term("high").is_err()
    );
  }
}
