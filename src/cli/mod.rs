use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::args::{Cli, Command, ConfigCommand};
use crate::cli::commands::exit_code_for;
use crate::config::load::CONFIG_FILE;
use crate::error::LoopvaultError;
use crate::types::RunMode;

pub mod args;
pub mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    println!("loopvault {}", VERSION);

    let run_mode = RunMode {
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        assume_yes: cli.yes,
    };
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    if let Err(err) = require_root() {
        println!("{}", err);
        std::process::exit(1);
    }

    if let Err(err) = dispatch(&cli.command, &config_path, run_mode) {
        let code = exit_code_for(&err);
        println!("{}", err);
        std::process::exit(code);
    }
    Ok(())
}

fn dispatch(
    command: &Command,
    config_path: &std::path::Path,
    run_mode: RunMode,
) -> crate::error::Result<()> {
    // Every verb that mutates lifecycle state runs under the exclusive lock;
    // concurrent runs would race on the snapshot path and the mount table.
    let _lock = match command {
        Command::Install
        | Command::Backup { .. }
        | Command::Expand { .. }
        | Command::Uninstall { .. }
        | Command::Purge
        | Command::Repair
        | Command::EnableBackup
        | Command::DisableBackup => Some(crate::lock::acquire()?),
        _ => None,
    };

    match command {
        Command::Install => commands::install::run_install(config_path, run_mode),
        Command::Status => commands::status::run_status(config_path, run_mode),
        Command::Backup { force } => commands::backup::run_backup_command(config_path, *force, run_mode),
        Command::Expand { gibibytes } => {
            commands::expand::run_expand(config_path, *gibibytes, run_mode)
        }
        Command::Uninstall { keep_image } => {
            commands::remove::run_uninstall(config_path, *keep_image, run_mode)
        }
        Command::Purge => commands::remove::run_purge(config_path, run_mode),
        Command::Repair => commands::repair::run_repair(config_path, run_mode),
        Command::Config { command } => match command {
            ConfigCommand::Show => commands::config::run_show(config_path),
            ConfigCommand::Edit => commands::config::run_edit(config_path),
            ConfigCommand::Validate => commands::config::run_validate(config_path),
            ConfigCommand::Reset => commands::config::run_reset(config_path, run_mode),
        },
        Command::VerifyConnection => commands::connect::run_verify(config_path),
        Command::SetupSsh => commands::connect::run_setup_ssh(config_path, run_mode),
        Command::EnableBackup => commands::toggle::run_enable(config_path),
        Command::DisableBackup => commands::toggle::run_disable(config_path),
        Command::Update => crate::update::run_update(run_mode),
    }
}

fn require_root() -> std::result::Result<(), LoopvaultError> {
    if uzers::get_effective_uid() != 0 {
        return Err(LoopvaultError::message(
            "loopvault must run as root (mount, fsfreeze, and /etc are involved); try sudo",
        ));
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();
}
