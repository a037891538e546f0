use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::category::Category;
use crate::task::{Priority, Task, TaskId};

fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0)
        .single()
        .unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn sample(
    id: u64,
    title: &str,
    description: &str,
    category: Category,
    priority: Priority,
    due: (i32, u32, u32),
    completed: bool,
    created_at: DateTime<Utc>,
) -> Task {
    Task {
        id: TaskId(id),
        title: title.to_string(),
        description: description.to_string(),
        category,
        priority,
        due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2),
        completed,
        created_at,
        order: id,
    }
}

/// The five tasks a fresh session starts with.
pub fn sample_tasks() -> Vec<Task> {
    vec![
        sample(
            1,
            "Complete project proposal",
            "Finalize the Q4 project proposal document and send to stakeholders",
            Category::Work,
            Priority::High,
            (2025, 1, 10),
            false,
            utc(2025, 1, 1, 10),
        ),
        sample(
            2,
            "Morning workout routine",
            "30 minutes cardio and strength training",
            Category::Health,
            Priority::Medium,
            (2025, 1, 5),
            true,
            utc(2025, 1, 1, 6),
        ),
        sample(
            3,
            "Review investment portfolio",
            "Check quarterly performance and rebalance if needed",
            Category::Finance,
            Priority::Medium,
            (2025, 1, 15),
            false,
            utc(2025, 1, 2, 9),
        ),
        sample(
            4,
            "Learn React hooks",
            "Complete the advanced React hooks course on online platform",
            Category::Learning,
            Priority::Low,
            (2025, 1, 20),
            false,
            utc(2025, 1, 2, 14),
        ),
        sample(
            5,
            "Plan weekend trip",
            "Research destinations and book accommodation for weekend getaway",
            Category::Personal,
            Priority::Low,
            (2025, 1, 8),
            false,
            utc(2025, 1, 3, 11),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default, rename = "task")]
    tasks: Vec<SeedTask>,
}

#[derive(Debug, Deserialize)]
struct SeedTask {
    id: Option<u64>,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    due: Option<NaiveDate>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    order: Option<u64>,
}

/// Loads initial tasks from a TOML file of `[[task]]` tables.
///
/// Missing ids and orders are assigned after the largest value present, in
/// file order. Nothing is ever written back.
#[tracing::instrument(skip(now), fields(file = %path.display()))]
pub fn load_seed_file(path: &Path, now: DateTime<Utc>) -> anyhow::Result<Vec<Task>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let parsed: SeedFile = toml::from_str(&raw)
        .with_context(|| format!("failed parsing seed file {}", path.display()))?;

    let mut next_id = parsed.tasks.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1;
    let mut next_order = parsed
        .tasks
        .iter()
        .filter_map(|t| t.order)
        .max()
        .unwrap_or(0)
        + 1;

    let mut out: Vec<Task> = Vec::with_capacity(parsed.tasks.len());
    for (idx, entry) in parsed.tasks.into_iter().enumerate() {
        let title = entry.title.trim().to_string();
        if title.is_empty() {
            return Err(anyhow!(
                "seed task #{} in {} has an empty title",
                idx + 1,
                path.display()
            ));
        }

        let id = match entry.id {
            Some(id) => id,
            None => {
                next_id += 1;
                next_id - 1
            }
        };
        if out.iter().any(|t| t.id == TaskId(id)) {
            return Err(anyhow!("duplicate task id {id} in {}", path.display()));
        }

        let order = match entry.order {
            Some(order) => order,
            None => {
                next_order += 1;
                next_order - 1
            }
        };
        if let Some(clash) = out.iter().find(|t| t.order == order) {
            return Err(anyhow!(
                "seed tasks {} and {id} share order {order} in {}",
                clash.id,
                path.display()
            ));
        }

        let category = entry
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()
            .with_context(|| format!("seed task {id}"))?
            .unwrap_or_default();
        let priority = entry
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()
            .with_context(|| format!("seed task {id}"))?
            .unwrap_or(Priority::Medium);

        debug!(id, order, "loaded seed task");
        out.push(Task {
            id: TaskId(id),
            title,
            description: entry.description.trim().to_string(),
            category,
            priority,
            due_date: entry.due,
            completed: entry.completed,
            created_at: entry.created_at.unwrap_or(now),
            order,
        });
    }

    info!(count = out.len(), "loaded seed tasks");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Utc;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn sample_data_has_dense_orders() {
        let tasks = sample_tasks();
        let orders: Vec<u64> = tasks.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        assert_eq!(tasks.iter().filter(|t| t.completed).count(), 1);
    }

    #[test]
    fn seed_file_rejects_duplicate_orders() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[[task]]
title = "a"
order = 1

[[task]]
title = "b"
order = 1
"#
        )
        .expect("write seed");

        let err = load_seed_file(file.path(), Utc::now()).expect_err("duplicate order");
        assert!(format!("{err:#}").contains("share order 1"));
    }

    #[test]
    fn seed_file_fills_missing_ids_and_orders() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[[task]]
id = 7
title = "Renew passport"
category = "personal"
priority = "high"
due = "2025-03-01"
order = 2

[[task]]
title = "Stretch"
category = "Health"
completed = true
"#
        )
        .expect("write seed");

        let now = Utc::now();
        let tasks = load_seed_file(file.path(), now).expect("load seed");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, TaskId(7));
        assert_eq!(tasks[0].category, Category::Personal);
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[0].due_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(tasks[1].id, TaskId(8));
        assert_eq!(tasks[1].order, 3);
        assert_eq!(tasks[1].priority, Priority::Medium);
        assert!(tasks[1].completed);
        assert_eq!(tasks[1].created_at, now);
    }

    #[test]
    fn seed_file_rejects_blank_titles() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "[[task]]\ntitle = \"  \"").expect("write seed");
        assert!(load_seed_file(file.path(), Utc::now()).is_err());
    }
}
