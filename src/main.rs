use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use fdn::cli::{self, CliError, ConfigTarget, RunOptions};
use fdn::confirm::Confirmer;
use fdn::dictionary::Dictionary;
use fdn::ledger::{Ledger, default_ledger_path};
use fdn::walker::{Depth, EntryKind};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "FDN_LOG";

#[derive(Parser)]
#[command(name = "fdn")]
#[command(version)]
#[command(about = "Normalize file and directory names, with a ledger to undo renames")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    rename: RenameArgs,

    /// Dictionary file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ledger file
    #[arg(long, global = true, value_name = "FILE")]
    ledger: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct RenameArgs {
    /// Input paths
    #[arg(short = 'p', long = "path", value_name = "PATH", num_args = 1.., default_value = ".")]
    paths: Vec<PathBuf>,

    /// Depth to descend, -1 for unbounded
    #[arg(short, long, value_name = "N", default_value_t = 1, allow_negative_numbers = true)]
    level: i64,

    /// Rename directories instead of files
    #[arg(short, long)]
    directory: bool,

    /// Apply the renames (default is a dry run)
    #[arg(short, long)]
    in_place: bool,

    /// Confirm each rename (y/n/A/q)
    #[arg(short, long)]
    confirm: bool,

    /// Undo renames recorded in the ledger
    #[arg(short, long)]
    reverse: bool,

    /// Display full paths
    #[arg(short, long)]
    full_path: bool,

    /// No colors
    #[arg(long)]
    plain: bool,

    /// Pad changed runs so before and after line up
    #[arg(short, long)]
    align: bool,

    /// Overwrite existing destinations
    #[arg(short, long)]
    overwrite: bool,

    /// Include hidden entries
    #[arg(short = 'I', long)]
    include_hidden: bool,

    /// Exclude paths matching a glob
    #[arg(short = 'X', long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,
}

impl RenameArgs {
    fn into_options(self) -> RunOptions {
        RunOptions {
            paths: self.paths,
            depth: Depth::from_level(self.level),
            kind: if self.directory {
                EntryKind::Directories
            } else {
                EntryKind::Files
            },
            in_place: self.in_place,
            confirm: self.confirm,
            reverse: self.reverse,
            full_path: self.full_path,
            colored: !self.plain && io::stdout().is_terminal(),
            align: self.align,
            overwrite: self.overwrite,
            include_hidden: self.include_hidden,
            excludes: self.excludes,
            progress: io::stderr().is_terminal(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the dictionary
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Rename an entry and record it in the ledger
    Mv { source: PathBuf, target: PathBuf },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the dictionary
    List { target: Option<ConfigTarget> },
    /// Add values to a dictionary section
    Add {
        target: ConfigTarget,
        #[arg(required = true, allow_hyphen_values = true)]
        values: Vec<String>,
    },
    /// Remove values from a dictionary section
    Delete {
        target: ConfigTarget,
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let ledger_path = cli.ledger.unwrap_or_else(default_ledger_path);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Some(Commands::Config(command)) => {
            let path = Dictionary::edit_path(cli.config.as_deref());
            match command {
                ConfigCommand::List { target } => {
                    let dictionary = Dictionary::load(cli.config.as_deref())?;
                    cli::config_list(&dictionary, target, &mut out)
                }
                ConfigCommand::Add { target, values } => {
                    cli::config_add(&path, target, &values, &mut out)
                }
                ConfigCommand::Delete { target, values } => {
                    cli::config_delete(&path, target, &values, &mut out)
                }
            }
        }
        Some(Commands::Mv { source, target }) => {
            let mut ledger = Ledger::open(&ledger_path)?;
            cli::move_entry(&source, &target, &mut ledger)
        }
        None => {
            let dictionary = Dictionary::load(cli.config.as_deref())?;
            let mut ledger = Ledger::open(&ledger_path)?;
            let options = cli.rename.into_options();
            let mut confirmer = Confirmer::stdio();
            let report =
                cli::run_rename(&options, &dictionary, &mut ledger, &mut confirmer, &mut out)?;
            if report.failed > 0 {
                eprintln!(
                    "{} {} rename(s) failed, see the log above",
                    "⚠".yellow(),
                    report.failed
                );
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}
