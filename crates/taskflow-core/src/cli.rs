use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("--rc takes key=value, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskflow",
    version,
    about = "TaskFlow: categorized, prioritized task lists in the terminal",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "taskflowrc")]
    pub taskflowrc: Option<PathBuf>,

    /// Start from the tasks in this TOML file instead of the sample data.
    #[arg(long = "seed", conflicts_with = "empty")]
    pub seed: Option<PathBuf>,

    /// Start with no tasks.
    #[arg(long = "empty")]
    pub empty: bool,

    /// Run session commands from a file, one per line, then exit.
    #[arg(long = "script")]
    pub script: Option<PathBuf>,

    /// A single session command to run before exiting.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

/// Level from `-v`/`-q` unless `RUST_LOG` is set. Logs go to stderr.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let level = match (quiet, verbose) {
        (2.., _) => "off",
        (1, _) => "error",
        (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("invalid log level {level}: {e}"))?,
    };

    let stderr = std::io::stderr();
    let ansi = stderr.is_terminal();
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(verbose >= 2)
        .try_init()
    {
        debug!(error = %err, "global subscriber was already installed");
    }

    Ok(())
}

/// Splits `rc.key=value` or `rc.key:value` into its parts.
fn split_rc_arg(arg: &str) -> Option<(String, String)> {
    let body = arg.strip_prefix("rc.")?;
    let at = body.find(['=', ':'])?;
    let (key, value) = (&body[..at], &body[at + 1..]);
    if key.is_empty() {
        return None;
    }
    Some((format!("rc.{key}"), value.to_string()))
}

/// Pulls positional `rc.` overrides out before clap parses. They may appear
/// anywhere, including after the trailing command words.
#[tracing::instrument(skip_all, fields(argc = raw.len()))]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let (bin, args) = match raw.split_first() {
        Some((bin, args)) => (Some(bin.clone()), args),
        None => (None, raw),
    };

    let mut rc_overrides = Vec::new();
    let mut cleaned_args: Vec<OsString> = bin.into_iter().collect();
    for arg in args {
        match arg.to_str().and_then(split_rc_arg) {
            Some(pair) => {
                debug!(key = %pair.0, value = %pair.1, "positional rc override");
                rc_overrides.push(pair);
            }
            None => cleaned_args.push(arg.clone()),
        }
    }

    Ok(PreprocessedArgs {
        cleaned_args,
        rc_overrides,
    })
}
