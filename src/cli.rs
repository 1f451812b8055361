use anyhow::{ensure, Context, Result};
use std::io::Write;
use std::process::Command as Process;
use std::str::FromStr;

use crate::config::Config;
use crate::data::{self, Store};
use crate::error::Error;
use crate::filter::Pipeline;
use crate::{editor, formatter};

pub const USAGE: &str = "\
Usage: ripple COMMAND [ARGS...]

Commands:
    start, on, in, track [TEXT...]   finish running entries and start a new one
    stop, out, end, done [TEXT...]   finish the most recent entry, appending TEXT
    list, ls [FILTERS...]            show entries and the total time spent on them
    edit                             open the storage file in $EDITOR
    help, ?                          show this message

Filters:
    +TAG                             entries tagged TAG (all given tags required)
    @today, @yesterday, @YYYY-M-D    entries started or finished on that day
    @week, @month, @year             entries within the current week, month or year
    @YYYY, @YYYY-M                   entries within that year or month
    @YYYY-M-D..YYYY-M-D              entries within that range, both days included
";

/// The commands understood on the command line, along with their synonyms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    List,
    Edit,
    Help,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "start" | "on" | "in" | "track" => Ok(Command::Start),
            "stop" | "out" | "end" | "done" => Ok(Command::Stop),
            "list" | "ls" => Ok(Command::List),
            "edit" => Ok(Command::Edit),
            "help" | "?" => Ok(Command::Help),
            _ => Err(Error::UnknownCommand(s.to_string())),
        }
    }
}

/// Run the command described by `args` (program name excluded). Without any argument the
/// entries are listed.
pub fn run<W: Write>(args: &[String], config: &Config, out: &mut W) -> Result<()> {
    let (command, rest) = match args.split_first() {
        Some((word, rest)) => (word.parse::<Command>()?, rest),
        None => (Command::List, args),
    };
    tracing::debug!("running {:?} with {:?}", command, rest);

    match command {
        Command::Start => start_tracking(config, rest),
        Command::Stop => stop_tracking(config, rest),
        Command::List => list_entries(config, rest, out),
        Command::Edit => open_in_editor(config),
        Command::Help => Ok(out.write_all(USAGE.as_bytes())?),
    }
}

fn start_tracking(config: &Config, args: &[String]) -> Result<()> {
    let mut store = Store::open(&config.db_file)?;
    editor::start(&mut store, &args.join(" "), data::now());
    store.save(&config.db_file)
}

fn stop_tracking(config: &Config, args: &[String]) -> Result<()> {
    let mut store = Store::open(&config.db_file)?;
    editor::stop(&mut store, &args.join(" "), data::now())?;
    store.save(&config.db_file)
}

fn list_entries<W: Write>(config: &Config, args: &[String], out: &mut W) -> Result<()> {
    let now = data::now();
    let pipeline = Pipeline::parse(args, now.date())?;
    if !pipeline.unrecognized().is_empty() {
        tracing::warn!(
            "the following arguments have not been considered: {}",
            pipeline.unrecognized().join(" ")
        );
    }

    let store = Store::open_all(&config.read_paths()?)?;
    let entries = pipeline.apply(store.entries());
    formatter::list(out, &entries, now)?;

    Ok(())
}

fn open_in_editor(config: &Config) -> Result<()> {
    let mut words = config.editor.split_whitespace();
    let program = words.next().context("No editor configured")?;
    tracing::debug!("opening {} with {}", config.db_file.display(), config.editor);

    let status = Process::new(program)
        .args(words)
        .arg(&config.db_file)
        .status()
        .with_context(|| format!("Cannot run {program}"))?;
    ensure!(status.success(), "{program} exited with {status}");

    Ok(())
}
