//! Presentation state for one terminal session.
//!
//! The session owns the task collection plus the transient UI state around
//! it: filter criteria, the pending delete confirmation and the theme.
//! Every line runs to completion before the next one is read.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::commands::{Command, HELP, TaskPatch, ThemeArg, parse_command};
use crate::config::Config;
use crate::datetime::today_in;
use crate::engine::TaskCollection;
use crate::filter::FilterCriteria;
use crate::render::Renderer;
use crate::task::{TaskId, TaskInput};
use crate::theme::{Theme, ThemeSetting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct Session {
    tasks: TaskCollection,
    criteria: FilterCriteria,
    renderer: Renderer,
    tz: Tz,
    cfg: Config,
    pending_delete: Option<TaskId>,
}

impl Session {
    pub fn new(tasks: TaskCollection, renderer: Renderer, tz: Tz, cfg: Config) -> Self {
        Self {
            tasks,
            criteria: FilterCriteria::default(),
            renderer,
            tz,
            cfg,
            pending_delete: None,
        }
    }

    pub fn tasks(&self) -> &TaskCollection {
        &self.tasks
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn theme(&self) -> Theme {
        self.renderer.theme()
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.pending_delete.is_some()
    }

    pub fn prompt(&self) -> String {
        match self.pending_delete {
            Some(id) => format!("delete task {id}? [y/N] "),
            None => "taskflow> ".to_string(),
        }
    }

    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        self.execute_at(line, Utc::now(), out)
    }

    /// Runs one input line. Bad input is reported to `out` and leaves the
    /// session untouched; only write failures are returned as errors.
    #[instrument(skip(self, now, out))]
    pub fn execute_at<W: Write>(
        &mut self,
        line: &str,
        now: DateTime<Utc>,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        let line = line.trim();
        if line.starts_with('#') {
            return Ok(Flow::Continue);
        }

        // an empty answer takes the [y/N] default
        if let Some(id) = self.pending_delete.take() {
            self.answer_delete(id, line, out)?;
            return Ok(Flow::Continue);
        }

        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let command = match parse_command(line, today_in(now, &self.tz)) {
            Ok(command) => command,
            Err(err) => {
                debug!(error = %err, "rejected input line");
                writeln!(out, "error: {err:#}")?;
                return Ok(Flow::Continue);
            }
        };

        self.run_command(command, now, out)
    }

    fn run_command<W: Write>(
        &mut self,
        command: Command,
        now: DateTime<Utc>,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        match command {
            Command::Add(patch) => self.cmd_add(&patch, now, out)?,
            Command::Edit(id, patch) => self.cmd_edit(id, &patch, now, out)?,
            Command::Toggle(id) => match self.tasks.toggle(id) {
                Some(true) => writeln!(out, "Task {id} marked completed.")?,
                Some(false) => writeln!(out, "Task {id} marked active.")?,
                None => writeln!(out, "No task with id {id}.")?,
            },
            Command::Delete(id) => match self.tasks.get(id) {
                Some(task) => {
                    writeln!(
                        out,
                        "Delete \"{}\"? This action cannot be undone. Answer y to confirm.",
                        task.title
                    )?;
                    self.pending_delete = Some(id);
                }
                None => writeln!(out, "No task with id {id}.")?,
            },
            Command::Move { from, to } => match self.tasks.reorder(&self.criteria, from, to) {
                Ok(()) => self.print_list(now, out)?,
                Err(err) => writeln!(out, "error: {err}")?,
            },
            Command::Filter(terms) => {
                let mut next = self.criteria.clone();
                for term in &terms {
                    if let Err(err) = next.apply_term(term) {
                        writeln!(out, "error: {err:#}")?;
                        return Ok(Flow::Continue);
                    }
                }
                self.criteria = next;
                self.print_list(now, out)?;
            }
            Command::FilterReset => {
                self.criteria = FilterCriteria::default();
                self.print_list(now, out)?;
            }
            Command::Search(term) => {
                self.criteria.search_term = term;
                self.print_list(now, out)?;
            }
            Command::List => self.print_list(now, out)?,
            Command::Stats => {
                let stats = self.tasks.stats(now, &self.tz);
                self.renderer.print_stats(out, &stats)?;
            }
            Command::Categories => {
                self.renderer
                    .print_categories(out, self.tasks.categories())?;
            }
            Command::Info(id) => match self.tasks.get(id) {
                Some(task) => self.renderer.print_task_info(out, task, now, &self.tz)?,
                None => writeln!(out, "No task with id {id}.")?,
            },
            Command::Theme(arg) => {
                let theme = match arg {
                    ThemeArg::Toggle => self.renderer.theme().toggle(),
                    ThemeArg::Light => Theme::Light,
                    ThemeArg::Dark => Theme::Dark,
                    ThemeArg::Auto => ThemeSetting::Auto.resolve(),
                };
                self.renderer.set_theme(theme);
                info!(%theme, "theme changed");
                writeln!(out, "Theme: {theme}")?;
            }
            Command::Export => {
                let view = self.tasks.view(&self.criteria);
                let json = serde_json::to_string_pretty(&view)
                    .context("failed to serialize task list")?;
                writeln!(out, "{json}")?;
            }
            Command::Show => {
                let mut entries: Vec<(&String, &String)> = self.cfg.iter().collect();
                entries.sort();
                for (key, value) in entries {
                    writeln!(out, "{key} = {value}")?;
                }
                for file in &self.cfg.loaded_files {
                    writeln!(out, "# loaded {}", file.display())?;
                }
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn cmd_add<W: Write>(
        &mut self,
        patch: &TaskPatch,
        now: DateTime<Utc>,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let mut input = TaskInput::default();
        patch.apply(&mut input);
        match self.tasks.add_or_update(input, None, now) {
            Ok(id) => writeln!(out, "Created task {id}.")?,
            Err(err) => writeln!(out, "error: {err}")?,
        }
        Ok(())
    }

    fn cmd_edit<W: Write>(
        &mut self,
        id: TaskId,
        patch: &TaskPatch,
        now: DateTime<Utc>,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let Some(current) = self.tasks.get(id) else {
            writeln!(out, "No task with id {id}.")?;
            return Ok(());
        };
        let mut input = current.to_input();
        patch.apply(&mut input);
        match self.tasks.add_or_update(input, Some(id), now) {
            Ok(id) => writeln!(out, "Updated task {id}.")?,
            Err(err) => writeln!(out, "error: {err}")?,
        }
        Ok(())
    }

    fn answer_delete<W: Write>(&mut self, id: TaskId, answer: &str, out: &mut W) -> anyhow::Result<()> {
        let confirmed = matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes");
        if !confirmed {
            debug!(%id, "delete cancelled");
            writeln!(out, "Delete cancelled.")?;
            return Ok(());
        }
        match self.tasks.remove(id) {
            Some(task) => writeln!(out, "Deleted task {id} \"{}\".", task.title)?,
            None => writeln!(out, "No task with id {id}.")?,
        }
        Ok(())
    }

    fn print_list<W: Write>(&self, now: DateTime<Utc>, out: &mut W) -> anyhow::Result<()> {
        let view = self.tasks.view(&self.criteria);
        if !self.criteria.is_default() {
            self.renderer
                .print_filters(out, &self.criteria, view.len(), self.tasks.len())?;
        }
        self.renderer.print_task_table(out, &view, now, &self.tz)
    }
}

/// Runs a single command given on the command line. A delete cannot be
/// confirmed afterwards, so it is reported as not done.
pub fn run_once<W: Write>(session: &mut Session, line: &str, out: &mut W) -> anyhow::Result<()> {
    session.execute(line, out)?;
    if let Some(id) = session.pending_delete.take() {
        warn!(%id, "delete needs confirmation; nothing removed");
        writeln!(
            out,
            "Nothing deleted. Confirm deletes in the interactive session or a script."
        )?;
    }
    Ok(())
}

/// Feeds every line of `path` to the session, stopping early on `quit`.
#[instrument(skip(session, out), fields(script = %path.display()))]
pub fn run_script<W: Write>(session: &mut Session, path: &Path, out: &mut W) -> anyhow::Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;

    for (line_num, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        debug!(line = line_num + 1, "script line");
        if session.execute(line, out)? == Flow::Quit {
            info!(line = line_num + 1, "script quit early");
            return Ok(());
        }
    }

    if session.awaiting_confirmation() {
        warn!("script ended with an unanswered delete confirmation");
    }
    Ok(())
}
