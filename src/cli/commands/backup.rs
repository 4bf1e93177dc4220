use std::path::Path;

use crate::backup::run_backup;
use crate::cli::commands::{load_validated, require_initialized};
use crate::state::PolicyRestoreGuard;
use crate::types::{BackupTrigger, RunMode};

pub fn run_backup_command(config_path: &Path, force: bool, run_mode: RunMode) -> crate::error::Result<()> {
    let cfg = load_validated(config_path)?;
    let markers = require_initialized(&cfg)?;

    if force {
        // The marker is lifted for the run and restored on drop, success or
        // failure, so a forced run never changes the standing policy.
        let _policy = PolicyRestoreGuard::lift(&markers)?;
        run_backup(&cfg, BackupTrigger::Forced, run_mode)
    } else {
        run_backup(&cfg, BackupTrigger::Scheduled, run_mode)
    }
}
