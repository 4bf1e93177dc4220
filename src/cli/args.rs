use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "loopvault", version, about = "Loopback-image backup to a remote host over SSH")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Echo external commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,
    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    /// Answer yes to confirmation prompts (purge still asks for the host name)
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Allocate, format, and mount the image; install the schedule
    #[command(alias = "init")]
    Install,
    /// Report marker, image, mount, schedule, and connectivity state
    Status,
    /// Freeze, snapshot, and ship the image to the remote host
    Backup {
        /// Run even when scheduled backups are disabled
        #[arg(long)]
        force: bool,
    },
    /// Grow the image and its filesystem by N GiB (0 heals an interrupted grow)
    Expand { gibibytes: u64 },
    /// Unmount and deregister; optionally back up and remove the image
    #[command(alias = "delete")]
    Uninstall {
        /// Keep the image file on disk
        #[arg(long)]
        keep_image: bool,
    },
    /// Remove everything without a final backup (asks twice)
    Purge,
    /// Re-create missing mount, fstab, and schedule entries
    Repair,
    /// Inspect or change the configuration record
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Run the five connectivity checks against the remote host
    VerifyConnection,
    /// Generate a key pair if needed and install it on the remote host
    SetupSsh,
    /// Allow scheduled backups again
    EnableBackup,
    /// Suppress scheduled backups (forced ones still run)
    DisableBackup,
    /// Replace this binary with the published revision
    Update,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    Show,
    Edit,
    Validate,
    Reset,
}
