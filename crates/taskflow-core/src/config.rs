use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "TASKFLOWRC";
const RC_FILE_NAME: &str =
  ".taskflowrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("color", "on"),
      ("theme", "auto"),
      ("timezone", "UTC"),
      ("seed", "builtin")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading taskflowrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no taskflowrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .and_then(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "cannot read taskflowrc {}",
            path.display()
          )
        })?;
    let canonical = fs::canonicalize(&path)
      .with_context(|| {
        format!(
          "cannot resolve {}",
          path.display()
        )
      })?;
    self.loaded_files.push(canonical);

    let base_dir = match path.parent() {
      | Some(dir) => dir.to_path_buf(),
      | None => PathBuf::from(".")
    };

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let parsed = parse_rc_line(raw_line)
        .with_context(|| {
          format!(
            "{}:{}",
            path.display(),
            idx + 1
          )
        })?;

      match parsed {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          let target = resolve_include_path(
            &base_dir, target
          )?;
          self.include(&target)?;
        }
        | RcLine::Setting(key, value) => {
          trace!(key, value, "rc setting");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
      }
    }

    Ok(())
  }

  fn include(
    &mut self,
    target: &Path
  ) -> anyhow::Result<()> {
    if !target.exists() {
      warn!(
        include = %target.display(),
        "included file is missing; skipping"
      );
      return Ok(());
    }
    // loaded_files holds canonical paths
    let canonical = fs::canonicalize(target)
      .with_context(|| {
        format!(
          "cannot resolve include {}",
          target.display()
        )
      })?;
    if self.loaded_files.contains(&canonical)
    {
      warn!(
        include = %target.display(),
        "include already loaded; skipping"
      );
      return Ok(());
    }
    debug!(include = %target.display(), "following include");
    self.load_file(target)
  }
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str)
}

/// One rc line: `key = value`,
/// `include <path>`, or blank. `#`
/// starts a comment anywhere.
fn parse_rc_line(
  raw: &str
) -> anyhow::Result<RcLine<'_>> {
  let line = match raw.split_once('#') {
    | Some((before, _)) => before,
    | None => raw
  }
  .trim();

  if line.is_empty() {
    return Ok(RcLine::Blank);
  }
  if let Some(target) =
    line.strip_prefix("include ")
  {
    return Ok(RcLine::Include(
      target.trim()
    ));
  }
  match line.split_once('=') {
    | Some((key, value))
      if !key.trim().is_empty() =>
    {
      Ok(RcLine::Setting(
        key.trim(),
        value.trim()
      ))
    }
    | _ => Err(anyhow!(
      "expected `key = value` or \
       `include <path>`, got: {raw}"
    ))
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping taskflowrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.is_empty() {
    return Err(anyhow!(
      "include needs a path"
    ));
  }

  let target =
    expand_tilde(Path::new(include));
  Ok(if target.is_absolute() {
    target
  } else {
    base_dir.join(target)
  })
}

pub(crate) fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

/// `None` when the value is neither a
/// yes nor a no spelling.
pub(crate) fn parse_bool(
  s: &str
) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::Config;

  #[test]
  fn defaults_without_rc_file() {
    let cfg = Config::default();
    assert_eq!(
      cfg.get("theme").as_deref(),
      Some("auto")
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(true)
    );
    assert!(cfg.get("missing").is_none());
  }

  #[test]
  fn loads_file_with_comments_and_includes()
   {
    let dir = tempdir().expect("tempdir");
    let main = dir.path().join("main.rc");
    let extra =
      dir.path().join("extra.rc");
    fs::write(
      &main,
      "# taskflow settings\n\
       theme = dark   # trailing\n\
       include extra.rc\n\
       include missing.rc\n"
    )
    .expect("write main");
    fs::write(
      &extra,
      "color=off\ntimezone = Europe/Berlin\n"
    )
    .expect("write extra");

    let cfg = Config::load(Some(&main))
      .expect("load config");
    assert_eq!(
      cfg.get("theme").as_deref(),
      Some("dark")
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(false)
    );
    assert_eq!(
      cfg.get("timezone").as_deref(),
      Some("Europe/Berlin")
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn include_cycle_through_dotdot_is_skipped()
   {
    let dir = tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("sub"))
      .expect("mkdir");
    let main = dir.path().join("main.rc");
    fs::write(
      &main,
      "theme = dark\n\
       include sub/../main.rc\n"
    )
    .expect("write main");

    let cfg = Config::load(Some(&main))
      .expect("load config");
    assert_eq!(cfg.loaded_files.len(), 1);
    assert_eq!(
      cfg.get("theme").as_deref(),
      Some("dark")
    );
  }

  #[test]
  fn bool_spellings() {
    use super::parse_bool;

    assert_eq!(parse_bool(" OFF "), Some(false));
    assert_eq!(parse_bool("yes"), Some(true));
    assert_eq!(parse_bool("sometimes"), None);
  }

  #[test]
  fn rejects_lines_without_equals() {
    let dir = tempdir().expect("tempdir");
    let main = dir.path().join("bad.rc");
    fs::write(&main, "theme dark\n")
      .expect("write");
    assert!(Config::load(Some(&main)).is_err());
  }

  #[test]
  fn rc_lines_classify() {
    use super::{RcLine, parse_rc_line};

    assert_eq!(
      parse_rc_line("  # note")
        .expect("comment"),
      RcLine::Blank
    );
    assert_eq!(
      parse_rc_line("seed = ~/t.toml # x")
        .expect("setting"),
      RcLine::Setting("seed", "~/t.toml")
    );
    assert_eq!(
      parse_rc_line("include  more.rc")
        .expect("include"),
      RcLine::Include("more.rc")
    );
    assert!(parse_rc_line("= dark").is_err());
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![
      (
        "rc.theme".to_string(),
        "light".to_string()
      ),
      (
        "color".to_string(),
        "no".to_string()
      ),
    ]);
    assert_eq!(
      cfg.get("theme").as_deref(),
      Some("light")
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(false)
    );
  }
}
