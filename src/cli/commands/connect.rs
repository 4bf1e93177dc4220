use std::path::Path;

use crate::cli::commands::load_validated;
use crate::error::{BackupError, Result};
use crate::remote;
use crate::types::RunMode;

pub fn run_verify(config_path: &Path) -> Result<()> {
    let cfg = load_validated(config_path)?;
    println!(
        "checking {}@{}:{} ...",
        cfg.remote_user, cfg.remote_host, cfg.remote_port
    );
    let report = remote::verify(&cfg);
    report.print();

    // Advisory checks (ICMP) never fail the verb on their own.
    let blocking_failures: Vec<&str> = report
        .checks
        .iter()
        .filter(|c| !c.passed && !c.advisory)
        .map(|c| c.name)
        .collect();
    if blocking_failures.is_empty() {
        Ok(())
    } else {
        Err(BackupError::ConnectivityFailed(blocking_failures.join(", ")).into())
    }
}

pub fn run_setup_ssh(config_path: &Path, run_mode: RunMode) -> Result<()> {
    let cfg = load_validated(config_path)?;
    remote::setup_ssh(&cfg, run_mode)
}
