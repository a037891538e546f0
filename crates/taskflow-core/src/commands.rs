use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::category::Category;
use crate::datetime::parse_due_date;
use crate::task::{Priority, TaskId, TaskInput};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "edit",
        "toggle",
        "done",
        "delete",
        "move",
        "filter",
        "search",
        "list",
        "stats",
        "categories",
        "info",
        "theme",
        "export",
        "show",
        "help",
        "quit",
        "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mod {
    Description(String),
    Category(Category),
    Priority(Priority),
    Due(Option<NaiveDate>),
}

/// Field changes parsed from `add`/`edit` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub mods: Vec<Mod>,
}

impl TaskPatch {
    pub fn apply(&self, input: &mut TaskInput) {
        if let Some(title) = &self.title {
            input.title = title.clone();
        }
        for one_mod in &self.mods {
            match one_mod {
                Mod::Description(text) => input.description = text.clone(),
                Mod::Category(category) => input.category = *category,
                Mod::Priority(priority) => input.priority = *priority,
                Mod::Due(date) => input.due_date = *date,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeArg {
    Toggle,
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(TaskPatch),
    Edit(TaskId, TaskPatch),
    Toggle(TaskId),
    Delete(TaskId),
    /// Zero-based view positions.
    Move { from: usize, to: usize },
    Filter(Vec<String>),
    FilterReset,
    Search(String),
    List,
    Stats,
    Categories,
    Info(TaskId),
    Theme(ThemeArg),
    Export,
    Show,
    Help,
    Quit,
}

#[instrument(skip(today))]
pub fn parse_command(line: &str, today: NaiveDate) -> anyhow::Result<Command> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let Some((head, args)) = tokens.split_first() else {
        return Err(anyhow!("empty command"));
    };

    let head_lower = head.to_ascii_lowercase();
    let known = known_command_names();
    let command = expand_command_abbrev(&head_lower, &known)
        .ok_or_else(|| anyhow!("unknown or ambiguous command: {head} (try 'help')"))?;
    debug!(command, args = ?args, "parsed command word");

    match command {
        "add" => {
            let patch = parse_patch(args, today)?;
            if patch.title.is_none() {
                return Err(anyhow!("add: a title is required"));
            }
            Ok(Command::Add(patch))
        }
        "edit" => {
            let (id, rest) = split_id(command, args)?;
            Ok(Command::Edit(id, parse_patch(rest, today)?))
        }
        "toggle" | "done" => Ok(Command::Toggle(single_id(command, args)?)),
        "delete" => Ok(Command::Delete(single_id(command, args)?)),
        "info" => Ok(Command::Info(single_id(command, args)?)),
        "move" => {
            let [from, to] = args else {
                return Err(anyhow!("move: expected <from> <to> positions"));
            };
            Ok(Command::Move {
                from: parse_position(from)?,
                to: parse_position(to)?,
            })
        }
        "filter" => match args {
            [] => Ok(Command::Filter(vec![])),
            [one] if one.eq_ignore_ascii_case("reset") || one.eq_ignore_ascii_case("clear") => {
                Ok(Command::FilterReset)
            }
            terms => Ok(Command::Filter(terms.to_vec())),
        },
        "search" => Ok(Command::Search(text_after_head(line, head))),
        "list" => Ok(Command::List),
        "stats" => Ok(Command::Stats),
        "categories" => Ok(Command::Categories),
        "theme" => {
            let arg = match args.first().map(|a| a.to_ascii_lowercase()).as_deref() {
                None | Some("toggle") => ThemeArg::Toggle,
                Some("light") => ThemeArg::Light,
                Some("dark") => ThemeArg::Dark,
                Some("auto") => ThemeArg::Auto,
                Some(other) => {
                    return Err(anyhow!(
                        "theme: expected light, dark, auto or toggle, got {other}"
                    ));
                }
            };
            Ok(Command::Theme(arg))
        }
        "export" => Ok(Command::Export),
        "show" => Ok(Command::Show),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(anyhow!("unhandled command: {other}")),
    }
}

/// The rest of `line` after its first word, with inner spacing intact.
fn text_after_head(line: &str, head: &str) -> String {
    let rest = line.trim_start();
    rest.strip_prefix(head).unwrap_or(rest).trim().to_string()
}

fn single_id(command: &str, args: &[String]) -> anyhow::Result<TaskId> {
    let (id, rest) = split_id(command, args)?;
    if !rest.is_empty() {
        return Err(anyhow!("{command}: unexpected arguments: {}", rest.join(" ")));
    }
    Ok(id)
}

fn split_id<'a>(command: &str, args: &'a [String]) -> anyhow::Result<(TaskId, &'a [String])> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("{command}: a task id is required"))?;
    Ok((first.parse::<TaskId>()?, rest))
}

/// Converts a 1-based list position into a view index.
fn parse_position(token: &str) -> anyhow::Result<usize> {
    let position: usize = token
        .parse()
        .map_err(|_| anyhow!("invalid position: {token}"))?;
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow!("positions start at 1"))
}

/// Plain words build the title until a `desc:` modifier switches them into
/// the description. Words after `--` are never treated as modifiers.
#[instrument(skip(args, today))]
pub fn parse_patch(args: &[String], today: NaiveDate) -> anyhow::Result<TaskPatch> {
    let mut title_parts: Vec<&str> = Vec::new();
    let mut desc_parts: Vec<&str> = Vec::new();
    let mut in_description = false;
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" && !literal {
            literal = true;
            continue;
        }

        if !literal {
            if let Some(rest) = description_start(arg) {
                in_description = true;
                if !rest.is_empty() {
                    desc_parts.push(rest);
                }
                continue;
            }
            if let Some(one_mod) = parse_one_mod(arg, today)? {
                mods.push(one_mod);
                continue;
            }
        }

        if in_description {
            desc_parts.push(arg);
        } else {
            title_parts.push(arg);
        }
    }

    if in_description {
        mods.push(Mod::Description(desc_parts.join(" ")));
    }

    Ok(TaskPatch {
        title: (!title_parts.is_empty()).then(|| title_parts.join(" ")),
        mods,
    })
}

fn description_start(tok: &str) -> Option<&str> {
    let (key, value) = tok.split_once(':')?;
    matches!(key.to_ascii_lowercase().as_str(), "desc" | "description").then_some(value)
}

fn parse_one_mod(tok: &str, today: NaiveDate) -> anyhow::Result<Option<Mod>> {
    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "cat" | "category" => Ok(Some(Mod::Category(value.parse()?))),
        "pri" | "priority" => Ok(Some(Mod::Priority(value.parse()?))),
        "due" => Ok(Some(Mod::Due(parse_due_date(value, today)?))),
        _ => Ok(None),
    }
}

pub const HELP: &str = "\
Commands (unique prefixes work, e.g. 'tog 3'):
  add <title> [desc:<text...>] [cat:<category>] [pri:<priority>] [due:<date>]
  edit <id> [title] [desc:...] [cat:...] [pri:...] [due:<date>|due:none]
  toggle <id>          flip completed (alias: done)
  delete <id>          delete after confirmation
  move <from> <to>     reorder using the # column of the current list
  filter [status:all|active|completed] [pri:all|high|medium|low] [cat:all|<name>]
  filter reset         clear status, priority, category and search
  search [text]        match title or description; no text clears
  list | stats | categories | info <id>
  theme [light|dark|auto|toggle]
  export               print the current list as JSON
  show                 print effective configuration
  help | quit
Dates: today, tomorrow, yesterday, monday..sunday, +3d, -1d, +2w, YYYY-MM-DD";
