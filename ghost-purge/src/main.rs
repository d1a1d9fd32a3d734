/*!
ghost-purge: find and remove every local trace of a deactivated email account
*/

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, crate_version, value_parser};
use console::Term;
use ghost_stores::PreservationRules;
use ghost_stores::command::SystemRunner;
use ghost_stores::process::SystemProcesses;
use tracing::{error, info};

use crate::core::{
    adapter::AdapterContext,
    adapters::standard_adapters,
    config::PurgeConfig,
    confirm::TerminalConfirmer,
    identity::Identity,
    orchestrator::Orchestrator,
    report::exit,
    runner,
};

mod core;
mod logging;

fn cli() -> Command {
    Command::new("ghost-purge")
        .version(crate_version!())
        .about("Find and remove every local trace of a deactivated email account")
        .arg(
            Arg::new("identity")
                .value_name("IDENTITY")
                .help("Email address whose traces should be removed")
                .required(true),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Show what would be removed, then stop")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a TOML configuration file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .help("Directory for the run's log file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
}

/// Everything a run needs that comes from configuration.
struct Setup {
    config: PurgeConfig,
    home: PathBuf,
    rules: PreservationRules,
    log_dir: PathBuf,
}

fn load_setup(matches: &ArgMatches) -> Result<Setup> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => PurgeConfig::load(path)?,
        None => PurgeConfig::default(),
    };
    let home = config.home()?;
    let rules = config.preservation_rules(&home)?;
    let log_dir = matches
        .get_one::<PathBuf>("log-dir")
        .cloned()
        .unwrap_or_else(|| config.log_dir(&home));
    Ok(Setup {
        config,
        home,
        rules,
        log_dir,
    })
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let raw = matches.get_one::<String>("identity").map(String::as_str).unwrap_or_default();
    let identity = match Identity::parse(raw) {
        Ok(identity) => identity,
        Err(e) => {
            eprintln!("ghost-purge: {e}");
            return ExitCode::from(exit::USAGE);
        }
    };
    let setup = match load_setup(&matches) {
        Ok(setup) => setup,
        Err(e) => {
            eprintln!("ghost-purge: {e:#}");
            return ExitCode::from(exit::USAGE);
        }
    };

    if let Some(path) = logging::init(&setup.log_dir) {
        eprintln!("Logging to {}", path.display());
    }
    info!("Purging {} from {}", identity, setup.home.display());

    let commands = SystemRunner;
    let processes = SystemProcesses::new();
    let confirmer = TerminalConfirmer;
    let ctx = AdapterContext {
        home: &setup.home,
        rules: &setup.rules,
        confirm: &confirmer,
    };
    let orchestrator = Orchestrator::new(standard_adapters(&setup.config, &setup.home, &commands, &processes))
        .with_progress(Term::stderr().is_term());

    let dry_run = matches.get_flag("dry-run");
    match runner::run(&orchestrator, &identity, &ctx, dry_run, &mut io::stdout().lock()) {
        Ok(outcome) => ExitCode::from(outcome.end.exit_code()),
        Err(e) => {
            error!("Could not write the report: {}", e);
            ExitCode::from(exit::INCOMPLETE)
        }
    }
}
