use std::fs;

use chrono::{TimeZone, Utc};
use taskflow_core::config::Config;
use taskflow_core::engine::TaskCollection;
use taskflow_core::render::Renderer;
use taskflow_core::seed::load_seed_file;
use taskflow_core::session::{Session, run_script};
use taskflow_core::task::TaskId;
use taskflow_core::theme::Theme;
use tempfile::tempdir;

fn session_with(tasks: TaskCollection) -> Session {
    Session::new(
        tasks,
        Renderer::plain(Theme::Light),
        chrono_tz::UTC,
        Config::default(),
    )
}

#[test]
fn seed_file_then_script_drives_the_collection() {
    let temp = tempdir().expect("tempdir");
    let seed = temp.path().join("tasks.toml");
    fs::write(
        &seed,
        r#"
[[task]]
title = "Renew passport"
category = "personal"
priority = "high"
due = "2020-05-01"

[[task]]
title = "Read chapter 3"
category = "learning"
priority = "low"
completed = true
"#,
    )
    .expect("write seed");

    let now = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).single().expect("valid now");
    let tasks = load_seed_file(&seed, now).expect("load seed");
    assert_eq!(tasks.len(), 2);

    let mut session = session_with(TaskCollection::with_tasks(tasks));

    let script = temp.path().join("commands.txt");
    fs::write(
        &script,
        "# add and reshuffle\n\
         add Call the bank cat:finance pri:medium\n\
         toggle 2\n\
         move 3 1\n\
         delete 1\n\
         yes\n\
         quit\n\
         add Never reached\n",
    )
    .expect("write script");

    let mut out = Vec::new();
    run_script(&mut session, &script, &mut out).expect("run script");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Created task 3."));
    assert!(text.contains("Task 2 marked active."));
    assert!(text.contains("Deleted task 1"));
    assert!(!text.contains("Never reached"));

    let titles: Vec<String> = session
        .tasks()
        .view(session.criteria())
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["Call the bank", "Read chapter 3"]);

    let stats = session.tasks().stats(now, &chrono_tz::UTC);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.overdue, 0);
}

#[test]
fn overdue_task_is_flagged_in_list_and_stats() {
    let now = Utc.with_ymd_and_hms(2025, 1, 12, 9, 0, 0).single().expect("valid now");
    let mut session = session_with(TaskCollection::seeded());

    let mut out = Vec::new();
    session.execute_at("list", now, &mut out).expect("list");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("(Overdue)"));

    let mut out = Vec::new();
    session.execute_at("stats", now, &mut out).expect("stats");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("Overdue       2"));
    assert!(text.contains("20% Complete"));

    let mut out = Vec::new();
    session.execute_at("done 1", now, &mut out).expect("toggle");
    assert!(session.tasks().get(TaskId(1)).expect("task 1").completed);
    assert_eq!(session.tasks().stats(now, &chrono_tz::UTC).overdue, 1);
}

#[test]
fn script_comment_between_delete_and_answer_is_skipped() {
    let temp = tempdir().expect("tempdir");
    let script = temp.path().join("confirm.txt");
    fs::write(&script, "delete 1\n# confirm it\n\nyes\n").expect("write script");

    let mut session = session_with(TaskCollection::seeded());
    let mut out = Vec::new();
    run_script(&mut session, &script, &mut out).expect("run script");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Deleted task 1"));
    assert!(!text.contains("Delete cancelled."));
    assert!(!text.contains("error:"));
    assert_eq!(session.tasks().len(), 4);
}
