mod debug_report;
mod logging;

use clap::{Arg, ArgMatches, Command, CommandFactory, FromArgMatches, Parser, ValueEnum};
use slotrun::{FileBindings, HarnessError, MAX_SLOT, Options, OutputRoute, Selection, StdStreams, is_input_slot};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "slotrun",
    version,
    about = "Run a scoring module over newline-delimited JSON slots",
    after_help = "Slots 0, 2, 4, 6 are inputs and 1, 3, 5, 7 are outputs. \
                  Slots 0 and 1 default to stdin and stdout."
)]
struct Cli {
    /// Scoring routine source; its smart comments configure the slots
    model: PathBuf,

    /// Maximum number of records per read
    #[arg(short, long, value_name = "NUM", default_value_t = slotrun::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Where callback results are written
    #[arg(long, value_enum, default_value_t = Route::Default)]
    route: Route,

    /// Seed the random input selection
    #[arg(long, value_name = "NUM", conflicts_with = "round_robin")]
    seed: Option<u64>,

    /// Visit active inputs in ascending order instead of at random
    #[arg(long)]
    round_robin: bool,

    /// Print the resolved slot table to stderr before running
    #[arg(long)]
    explain: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Route {
    /// Every result goes to slot 1
    Default,
    /// Results of input slot N go to slot N+1
    Paired,
}

fn slot_flag(slot: usize) -> String {
    let role = if is_input_slot(slot) { "input" } else { "output" };
    format!("{role}:{slot}")
}

/// Adds `--input:N` / `--output:N` for every slot; `-i` and `-o` alias the defaults.
fn command() -> Command {
    (0..MAX_SLOT).fold(Cli::command(), |cmd, slot| {
        let mut arg = Arg::new(slot_flag(slot))
            .long(slot_flag(slot))
            .value_name("FILE")
            .value_parser(clap::value_parser!(PathBuf))
            .help(if is_input_slot(slot) {
                format!("Read slot {slot} from FILE")
            } else {
                format!("Write slot {slot} to FILE")
            });
        match slot {
            0 => arg = arg.short('i'),
            1 => arg = arg.short('o'),
            _ => {}
        }
        cmd.arg(arg)
    })
}

fn file_bindings(matches: &ArgMatches) -> FileBindings {
    let mut files = FileBindings::new();
    for slot in 0..MAX_SLOT {
        if let Some(path) = matches.get_one::<PathBuf>(&slot_flag(slot)) {
            files.insert(slot, path.clone());
        }
    }
    files
}

fn main() -> ExitCode {
    let matches = command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    logging::init(&cli.log_level);

    match run(&cli, &file_bindings(&matches)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, files: &FileBindings) -> Result<(), HarnessError> {
    let source = std::fs::read_to_string(&cli.model)
        .map_err(|source| HarnessError::Io { path: cli.model.clone(), source })?;

    let options = Options {
        batch_size: cli.batch_size,
        route: match cli.route {
            Route::Default => OutputRoute::Default,
            Route::Paired => OutputRoute::Paired,
        },
        selection: match (cli.seed, cli.round_robin) {
            (_, true) => Selection::RoundRobin,
            (Some(seed), false) => Selection::Seeded(seed),
            (None, false) => Selection::Random,
        },
    };

    let color = io::stderr().is_terminal();
    if cli.explain {
        let table = slotrun::resolve_slots(&source, files)?;
        debug_report::print_slots(&cli.model.display().to_string(), &table, color);
    }

    let mut module = slotrun::stock::module();
    let report = slotrun::launch(&source, files, &mut module, StdStreams::process(), &options)?;

    if cli.explain {
        debug_report::print_run(&report, color);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Cli, FileBindings) {
        let matches = command().try_get_matches_from(args).unwrap();
        (Cli::from_arg_matches(&matches).unwrap(), file_bindings(&matches))
    }

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn per_slot_flags_bind_files() {
        let (cli, files) = parse(&["slotrun", "model.py", "-i", "a.jsonl", "--input:2", "b.jsonl", "--output:3", "c.jsonl"]);
        assert_eq!(cli.model, PathBuf::from("model.py"));
        assert_eq!(cli.batch_size, slotrun::DEFAULT_BATCH_SIZE);
        let bound: Vec<(usize, String)> = files.iter().map(|(s, p)| (s, p.display().to_string())).collect();
        assert_eq!(bound, vec![(0, "a.jsonl".to_string()), (2, "b.jsonl".to_string()), (3, "c.jsonl".to_string())]);
    }

    #[test]
    fn seed_and_round_robin_conflict() {
        assert!(command().try_get_matches_from(["slotrun", "m", "--seed", "1", "--round-robin"]).is_err());
    }
}
