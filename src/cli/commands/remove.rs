use std::path::Path;

use crate::backup::run_backup;
use crate::cli::commands::{confirm, confirm_typed, load_validated, require_initialized};
use crate::error::{LoopvaultError, Result};
use crate::image;
use crate::mount::{fstab, inspect, ops};
use crate::schedule;
use crate::types::{BackupTrigger, RunMode};

pub fn run_uninstall(config_path: &Path, keep_image: bool, run_mode: RunMode) -> Result<()> {
    let cfg = load_validated(config_path)?;
    let markers = require_initialized(&cfg)?;

    if !confirm(
        &format!("uninstall loopvault for {}?", cfg.remote_host),
        run_mode,
    )? {
        return Err(LoopvaultError::message("uninstall declined"));
    }

    if cfg.image_path.exists()
        && confirm("run a final backup before uninstalling?", run_mode)?
    {
        run_backup(&cfg, BackupTrigger::Forced, run_mode)?;
    }

    teardown(&cfg, run_mode)?;

    let remove_image = !keep_image
        && cfg.image_path.exists()
        && confirm(
            &format!("remove image file {}?", cfg.image_path.display()),
            run_mode,
        )?;
    if remove_image {
        image::delete(&cfg.image_path, run_mode)?;
        image::delete(&cfg.snapshot_path, run_mode)?;
    } else if cfg.image_path.exists() {
        println!("image kept: {}", cfg.image_path.display());
    }

    clear_markers(&cfg, &markers, run_mode)?;
    println!("uninstalled");
    Ok(())
}

/// Purge never backs up and removes everything; it asks twice, the second
/// time by having the operator type the host name back.
pub fn run_purge(config_path: &Path, run_mode: RunMode) -> Result<()> {
    let cfg = load_validated(config_path)?;
    let markers = require_initialized(&cfg)?;

    println!("purge removes the image, snapshot, markers, mount, and schedule without a backup");
    if let Some(size) = image::file_size(&cfg.image_path) {
        println!("image to delete: {} ({} bytes)", cfg.image_path.display(), size);
    }
    if !confirm("continue?", run_mode)? {
        return Err(LoopvaultError::message("purge declined"));
    }
    if !confirm_typed("this cannot be undone", &cfg.remote_host)? {
        return Err(LoopvaultError::message("purge declined"));
    }

    teardown(&cfg, run_mode)?;
    image::delete(&cfg.image_path, run_mode)?;
    image::delete(&cfg.snapshot_path, run_mode)?;
    clear_markers(&cfg, &markers, run_mode)?;
    if !run_mode.dry_run {
        let _ = std::fs::remove_dir(&cfg.mount_point);
    }
    println!("purged");
    Ok(())
}

/// Shared deregistration: schedule out, filesystem down, fstab entry gone.
fn teardown(cfg: &crate::config::model::RuntimeConfig, run_mode: RunMode) -> Result<()> {
    schedule::remove(run_mode)?;
    if inspect::mountpoint_is_mounted(&cfg.mount_point)? {
        ops::unmount_path(&cfg.mount_point, run_mode)?;
    }
    fstab::remove_entry(Path::new(fstab::FSTAB), &cfg.mount_point, run_mode)
}

fn clear_markers(
    cfg: &crate::config::model::RuntimeConfig,
    markers: &crate::state::Markers,
    run_mode: RunMode,
) -> Result<()> {
    if run_mode.dry_run {
        println!("dry-run: rm -f {}", cfg.init_marker.display());
        println!("dry-run: rm -f {}", cfg.disable_marker.display());
        return Ok(());
    }
    markers.clear_initialized()?;
    markers.enable_backups()?;
    Ok(())
}
