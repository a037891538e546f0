use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::category::{Category, CategoryInfo};
use crate::config::{Config, parse_bool};
use crate::datetime::format_due;
use crate::filter::FilterCriteria;
use crate::stats::TaskStats;
use crate::task::{Priority, Task};
use crate::theme::Theme;

const PROGRESS_WIDTH: usize = 20;
const TABLE_HEADERS: [&str; 7] = ["#", "ID", "Done", "Title", "Category", "Priority", "Due"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    theme: Theme,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> anyhow::Result<Self> {
        let setting = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let wanted = parse_bool(&setting)
            .ok_or_else(|| anyhow!("color must be on or off, got: {setting}"))?;

        Ok(Self {
            color: wanted && io::stdout().is_terminal(),
            theme,
        })
    }

    /// Renderer that never emits escape codes.
    pub fn plain(theme: Theme) -> Self {
        Self {
            color: false,
            theme,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    #[tracing::instrument(skip(self, out, tasks, now, tz), fields(count = tasks.len()))]
    pub fn print_task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "{}", self.paint("No tasks found", self.theme.palette().accent))?;
            writeln!(
                out,
                "{}",
                self.paint(
                    "Add a new task or adjust your filters to see tasks here.",
                    self.theme.palette().muted
                )
            )?;
            return Ok(());
        }

        let mut rows = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            let position = self.paint(&(idx + 1).to_string(), self.theme.palette().muted);
            let done = if task.completed { "[x]" } else { "[ ]" }.to_string();
            let title = if task.completed {
                self.paint(&task.title, self.theme.palette().completed)
            } else {
                task.title.clone()
            };

            rows.push(vec![
                position,
                task.id.to_string(),
                done,
                title,
                self.category_label(task.category),
                self.priority_label(task.priority),
                self.due_label(task, now, tz),
            ]);
        }

        write_table(out, &TABLE_HEADERS, &rows)
    }

    #[tracing::instrument(skip(self, out, task, now, tz), fields(id = %task.id))]
    pub fn print_task_info<W: Write>(
        &self,
        out: &mut W,
        task: &Task,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> anyhow::Result<()> {
        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        if !task.description.is_empty() {
            writeln!(out, "desc      {}", task.description)?;
        }
        writeln!(out, "category  {}", self.category_label(task.category))?;
        writeln!(out, "priority  {}", self.priority_label(task.priority))?;
        writeln!(
            out,
            "status    {}",
            if task.completed { "completed" } else { "active" }
        )?;
        if task.due_date.is_some() {
            writeln!(out, "due       {}", self.due_label(task, now, tz))?;
        }
        writeln!(out, "created   {}", task.created_at.format("%Y-%m-%dT%H:%M:%SZ"))?;
        writeln!(out, "order     {}", task.order)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_stats<W: Write>(&self, out: &mut W, stats: &TaskStats) -> anyhow::Result<()> {
        let palette = self.theme.palette();
        writeln!(out, "{}", self.paint("Task Statistics", palette.accent))?;
        writeln!(out, "  Total Tasks   {}", stats.total)?;
        writeln!(out, "  Active Tasks  {}", stats.active)?;
        writeln!(out, "  Completed     {}", stats.completed)?;
        let overdue = stats.overdue.to_string();
        let overdue = if stats.overdue > 0 {
            self.paint(&overdue, palette.overdue)
        } else {
            overdue
        };
        writeln!(out, "  Overdue       {overdue}")?;

        let rounded = stats.rounded_rate();
        writeln!(out, "  {} {rounded}% Complete", progress_bar(stats.completion_rate))?;

        writeln!(out, "{}", self.paint("Priority Breakdown", palette.accent))?;
        for priority in Priority::ALL {
            writeln!(
                out,
                "  {:<14}{}",
                format!("{priority} Priority"),
                stats.by_priority.get(priority)
            )?;
        }
        Ok(())
    }

    pub fn print_categories<W: Write>(
        &self,
        out: &mut W,
        categories: &[CategoryInfo],
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("Categories", self.theme.palette().accent))?;
        for info in categories {
            writeln!(
                out,
                "  {} {}  {}",
                info.icon,
                self.paint_category(info, info.category.name()),
                self.paint(info.color, self.theme.palette().muted)
            )?;
        }
        Ok(())
    }

    pub fn print_filters<W: Write>(
        &self,
        out: &mut W,
        criteria: &FilterCriteria,
        visible: usize,
        total: usize,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} ({visible} of {total} shown)",
            self.paint(&criteria.to_string(), self.theme.palette().muted)
        )?;
        Ok(())
    }

    fn category_label(&self, category: Category) -> String {
        let info = category.info();
        format!("{} {}", info.icon, self.paint_category(info, category.name()))
    }

    fn priority_label(&self, priority: Priority) -> String {
        self.paint(priority.as_str(), self.theme.priority_code(priority))
    }

    fn due_label(&self, task: &Task, now: DateTime<Utc>, tz: &Tz) -> String {
        let Some(date) = task.due_date else {
            return String::new();
        };
        let text = format_due(date);
        if task.is_overdue(now, tz) {
            self.paint(&format!("{text} (Overdue)"), self.theme.palette().overdue)
        } else {
            text
        }
    }

    fn paint_category(&self, info: &CategoryInfo, text: &str) -> String {
        match info.rgb() {
            Some((r, g, b)) => self.paint(text, &format!("38;2;{r};{g};{b}")),
            None => text.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn progress_bar(rate: f64) -> String {
    let filled = ((rate / 100.0) * PROGRESS_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_WIDTH);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}

/// Left-aligned columns sized by display width, ignoring escape codes.
fn write_table<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    write_row(out, &header_cells, &widths)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(out, &rule, &widths)?;
    for row in rows {
        write_row(out, row, &widths)?;
    }
    Ok(())
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(visible_width(cell))));
        line.push(' ');
    }
    writeln!(out, "{}", line.trim_end())
}

fn visible_width(cell: &str) -> usize {
    strip_ansi(cell).width()
}

fn strip_ansi(s: &str) -> String {
    let mut plain = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('\x1b') {
        plain.push_str(&rest[..start]);
        rest = match rest[start..].find('m') {
            Some(end) => &rest[start + end + 1..],
            None => "",
        };
    }
    plain.push_str(rest);
    plain
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::seed::sample_tasks;
    use crate::stats::compute_stats;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 12, 9, 0, 0)
            .single()
            .expect("valid now")
    }

    fn render_table(tasks: &[Task]) -> String {
        let renderer = Renderer::plain(Theme::Light);
        let mut buf = Vec::new();
        renderer
            .print_task_table(&mut buf, tasks, now(), &chrono_tz::UTC)
            .expect("render table");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn table_marks_overdue_and_completed() {
        let text = render_table(&sample_tasks());
        let proposal = text
            .lines()
            .find(|l| l.contains("Complete project proposal"))
            .expect("proposal row");
        assert!(proposal.contains("2025-01-10 (Overdue)"));
        assert!(proposal.contains("[ ]"));

        let workout = text
            .lines()
            .find(|l| l.contains("Morning workout routine"))
            .expect("workout row");
        assert!(workout.contains("[x]"));
        assert!(!workout.contains("Overdue"));
        assert!(workout.contains("💪 Health"));
    }

    #[test]
    fn empty_view_prints_hint() {
        let text = render_table(&[]);
        assert!(text.contains("No tasks found"));
        assert!(text.contains("adjust your filters"));
    }

    #[test]
    fn stats_panel_shows_rounded_rate_and_breakdown() {
        let renderer = Renderer::plain(Theme::Dark);
        let stats = compute_stats(&sample_tasks(), now(), &chrono_tz::UTC);
        let mut buf = Vec::new();
        renderer.print_stats(&mut buf, &stats).expect("render stats");
        let text = String::from_utf8(buf).expect("utf8");

        assert!(text.contains("20% Complete"));
        assert!(text.contains("[####----------------]"));
        assert!(text.contains("Low Priority  2"));
        assert!(text.contains("Overdue       2"));
    }

    #[test]
    fn ansi_is_ignored_for_widths() {
        assert_eq!(strip_ansi("\x1b[31mHigh\x1b[0m"), "High");
        assert_eq!(visible_width("\x1b[38;2;1;2;3m💼 Work\x1b[0m"), 7);
    }

    #[test]
    fn color_setting_must_be_a_switch() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "sometimes".to_string())]);
        assert!(Renderer::new(&cfg, Theme::Light).is_err());
    }
}
