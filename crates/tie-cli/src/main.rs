//! lite-tie - link portable executables into one directory.
//!
//! Thin command-line front end over `tie_core`. Logs go to stderr; command
//! output goes to stdout.

mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tie_core::TieError;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lite-tie", version)]
#[command(about = "Manage links to portable executables in one directory")]
struct Args {
    /// Directory holding the registry and links (defaults to $LITE_TIE_HOME,
    /// then the directory of this executable)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Link an executable and register it
    Add {
        /// Path to the executable
        exec_path: PathBuf,

        /// Link name (defaults to the executable's file name)
        #[arg(short, long)]
        alias: Option<String>,
    },

    /// Show registered links
    List {
        /// Only show this entry
        name: Option<String>,

        /// Print a name/availability table
        #[arg(long)]
        simple: bool,
    },

    /// Remove links and their registry entries
    Remove {
        /// Names to remove
        #[arg(required_unless_present = "clean")]
        names: Vec<String>,

        /// Don't ask before removing available entries
        #[arg(long)]
        silent: bool,

        /// Also remove every unavailable entry
        #[arg(long)]
        clean: bool,
    },

    /// Recheck every source and refresh availability
    Update,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<TieError>()
                .map(TieError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(args: Args) -> Result<()> {
    let home = tie_core::platform::resolve_home(args.home)?;
    debug!("Home: {}", home.display());

    let tie = tie_core::LiteTie::open(home)?;
    debug!("Registry: {}", tie.registry_path().display());

    match args.command {
        Command::Add { exec_path, alias } => commands::add(&tie, &exec_path, alias.as_deref()),
        Command::List { name, simple } => commands::list(&tie, name.as_deref(), simple),
        Command::Remove {
            names,
            silent,
            clean,
        } => commands::remove(&tie, &names, silent, clean),
        Command::Update => commands::update(&tie),
    }
}
