pub mod category;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod engine;
pub mod filter;
pub mod render;
pub mod repl;
pub mod seed;
pub mod session;
pub mod stats;
pub mod task;
pub mod theme;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};
use std::path::{
  Path,
  PathBuf
};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::config::Config;
use crate::engine::TaskCollection;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskflow"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = Config::load(
    cli.taskflowrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let tasks = initial_tasks(
    &cfg,
    cli.empty,
    cli.seed.as_deref()
  )?;

  let theme_setting: theme::ThemeSetting =
    cfg
      .get("theme")
      .as_deref()
      .unwrap_or("auto")
      .parse()?;
  let renderer = render::Renderer::new(
    &cfg,
    theme_setting.resolve()
  )?;
  let tz =
    datetime::resolve_timezone(&cfg);

  let mut session = session::Session::new(
    tasks, renderer, tz, cfg
  );

  if let Some(script) = &cli.script {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    session::run_script(
      &mut session,
      script,
      &mut out
    )?;
    out.flush()?;
  } else if !cli.rest.is_empty() {
    let line = cli
      .rest
      .iter()
      .map(|a| {
        a.to_string_lossy().into_owned()
      })
      .collect::<Vec<_>>()
      .join(" ");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    session::run_once(
      &mut session,
      &line,
      &mut out
    )?;
    out.flush()?;
  } else {
    repl::run_interactive(&mut session)?;
  }

  info!("done");
  Ok(())
}

/// `--empty` beats `--seed`, which beats the `seed` config key
/// (`builtin`, `empty` or a file path).
fn initial_tasks(
  cfg: &Config,
  empty: bool,
  seed_override: Option<&Path>
) -> anyhow::Result<TaskCollection> {
  if empty {
    return Ok(TaskCollection::new());
  }

  let source: Option<PathBuf> =
    match seed_override {
      | Some(path) => {
        Some(path.to_path_buf())
      }
      | None => {
        match cfg
          .get("seed")
          .as_deref()
          .map(str::trim)
        {
          | None
          | Some("")
          | Some("builtin") => None,
          | Some("empty") => {
            return Ok(
              TaskCollection::new()
            );
          }
          | Some(path) => Some(
            config::expand_tilde(
              Path::new(path)
            )
          )
        }
      }
    };

  match source {
    | None => {
      debug!("using built-in sample tasks");
      Ok(TaskCollection::seeded())
    }
    | Some(path) => {
      let tasks = seed::load_seed_file(
        &path,
        Utc::now()
      )
      .with_context(|| {
        format!(
          "failed to load seed tasks \
           from {}",
          path.display()
        )
      })?;
      info!(
        count = tasks.len(),
        seed = %path.display(),
        "loaded seed tasks"
      );
      Ok(TaskCollection::with_tasks(tasks))
    }
  }
}
