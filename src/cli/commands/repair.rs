use std::path::Path;

use crate::cli::commands::{load_validated, require_initialized};
use crate::error::{LoopvaultError, Result};
use crate::mount::{fstab, inspect, ops};
use crate::schedule;
use crate::types::RunMode;
use crate::util::paths::{ensure_base_dir, ensure_dir};

/// Re-create whatever is missing around an existing image. Every step checks
/// before it acts, so running repair twice ends in the same state as once.
pub fn run_repair(config_path: &Path, run_mode: RunMode) -> Result<()> {
    let cfg = load_validated(config_path)?;
    require_initialized(&cfg)?;
    if !cfg.image_path.exists() {
        return Err(LoopvaultError::message(format!(
            "image {} is missing; repair cannot recreate data, run `loopvault purge` then `loopvault install`",
            cfg.image_path.display()
        )));
    }

    ensure_base_dir(&cfg.base_dir)?;
    ensure_dir(&cfg.mount_point)?;

    let fstab_path = Path::new(fstab::FSTAB);
    if fstab::has_entry(fstab_path, &cfg.mount_point)? {
        println!("fstab entry: ok");
    } else {
        fstab::ensure_entry(fstab_path, &cfg.image_path, &cfg.mount_point, run_mode)?;
        println!("fstab entry: re-created");
    }

    if inspect::mountpoint_is_mounted(&cfg.mount_point)? {
        println!("mount: ok");
    } else {
        ops::mount_image(&cfg.image_path, &cfg.mount_point, run_mode)?;
        println!("mount: re-attached");
    }

    if schedule::is_installed(&schedule::current_crontab()?) {
        println!("cron entry: ok");
    } else {
        schedule::install(&cfg.schedule, run_mode)?;
        println!("cron entry: re-created");
    }

    Ok(())
}
