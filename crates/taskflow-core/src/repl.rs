use std::io::{self, Write};

use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info, instrument};

use crate::session::{Flow, Session};

/// Interactive loop: prints the list once, then reads commands until
/// `quit`, Ctrl-C or Ctrl-D.
#[instrument(skip_all)]
pub fn run_interactive(session: &mut Session) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
    let stdout = io::stdout();

    {
        let mut out = stdout.lock();
        session.execute("list", &mut out)?;
        writeln!(out, "Type 'help' for commands.")?;
    }

    loop {
        match editor.readline(&session.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty()
                    && let Err(err) = editor.add_history_entry(line.as_str())
                {
                    debug!(error = %err, "failed to record history entry");
                }
                let mut out = stdout.lock();
                if session.execute(&line, &mut out)? == Flow::Quit {
                    break;
                }
                out.flush()?;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                debug!("input closed");
                break;
            }
            Err(err) => return Err(err).context("failed to read input line"),
        }
    }

    info!(tasks = session.tasks().len(), "session ended");
    Ok(())
}
