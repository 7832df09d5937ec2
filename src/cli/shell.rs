use std::io::{self, BufRead};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use tracing::debug;

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;
use crate::cli::shell_context::SCRIPT_ENV;

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };
    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Script => {
            let stdin = io::stdin();
            let mut lines = stdin.lock().lines();
            drive(&mut context, || lines.next().transpose().map_err(CliError::from))
        }
        CliMode::Interactive => {
            let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
            editor.set_helper(Some(CommandHelper {
                names: context.command_names(),
            }));
            editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
            output::info("Wardrobe Budget shell. Type `help` for commands, `exit` to quit.");

            let prompt = context.prompt();
            drive(&mut context, || match editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        editor.add_history_entry(line.trim()).ok();
                    }
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
                Err(err) => Err(err.into()),
            })
        }
    }
}

/// Feeds lines to the dispatcher until input ends or a command asks to exit.
/// Blank lines and `#` comments are skipped; command errors are reported and
/// the loop carries on.
fn drive<F>(context: &mut ShellContext, mut next_line: F) -> Result<(), CliError>
where
    F: FnMut() -> Result<Option<String>, CliError>,
{
    while context.running {
        let Some(line) = next_line()? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match execute(context, line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => context.running = false,
            Err(err) => context.report_error(err)?,
        }
    }
    Ok(())
}

fn execute(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not parse command line: {err}"));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };

    let command = raw.to_lowercase();
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    debug!(command = %command, args = args.len(), "dispatching");
    context.last_command = Some(line.to_string());
    context.dispatch(&command, raw, &args)
}

/// Tab completion for the command word; arguments are left alone.
struct CommandHelper {
    names: Vec<&'static str>,
}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let start = head.len() - head.trim_start().len();
        let word = &head[start..];
        if word.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let word = word.to_ascii_lowercase();
        let candidates = self
            .names
            .iter()
            .filter(|name| name.starts_with(word.as_str()))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: format!("{name} "),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

impl Helper for CommandHelper {}
