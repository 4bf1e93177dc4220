use std::fs;
use std::path::Path;

use chrono::Local;

use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, ImageError, LoopvaultError, Result};
use crate::remote;
use crate::state::{BackupPolicy, InitState, Markers};
use crate::types::{BackupTrigger, RunMode};

pub mod freeze;
pub mod transfer;

use freeze::FreezeGuard;

/// The backup run: preflight, freeze, snapshot, thaw, transfer, cleanup.
/// Linear, with the thaw guaranteed on every exit path past the freeze.
pub fn run_backup(cfg: &RuntimeConfig, trigger: BackupTrigger, run_mode: RunMode) -> Result<()> {
    println!(
        "backup ({}) {}",
        trigger.as_str(),
        Local::now().format("%d-%m-%Y %H:%M")
    );

    let markers = Markers::from_config(cfg);
    if markers.init_state() == InitState::Uninitialized {
        return Err(ImageError::NotInitialized.into());
    }
    if !cfg.image_path.exists() {
        return Err(LoopvaultError::message(format!(
            "image {} is missing; run `loopvault repair`",
            cfg.image_path.display()
        )));
    }
    if trigger == BackupTrigger::Scheduled && markers.backup_policy() == BackupPolicy::Disabled {
        // Soft exit: the dispatcher maps this to success so cron stays quiet.
        return Err(BackupError::Disabled.into());
    }

    remote::preflight(cfg)?;

    {
        let guard = FreezeGuard::freeze(&cfg.mount_point, run_mode);
        if run_mode.verbose {
            println!(
                "  freeze: {}",
                if guard.frozen { "held" } else { "skipped (see warnings)" }
            );
        }
        snapshot(&cfg.image_path, &cfg.snapshot_path, run_mode)?;
        // guard drops here: thaw before the transfer starts
    }

    transfer::transfer_snapshot(cfg, &cfg.snapshot_path, run_mode)?;

    if !run_mode.dry_run {
        fs::remove_file(&cfg.snapshot_path)?;
    }
    println!("backup done {}", Local::now().format("%d-%m-%Y %H:%M"));
    Ok(())
}

/// Point-in-time copy of the live image. A leftover snapshot from an earlier
/// failed run is overwritten, never appended to and never an error.
pub fn snapshot(image: &Path, snapshot_path: &Path, run_mode: RunMode) -> Result<()> {
    if run_mode.dry_run {
        println!(
            "dry-run: cp {} {}",
            image.display(),
            snapshot_path.display()
        );
        return Ok(());
    }
    fs::copy(image, snapshot_path).map_err(|e| {
        LoopvaultError::message(format!(
            "snapshot {} -> {}: {}",
            image.display(),
            snapshot_path.display(),
            e
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Markers;
    use tempfile::TempDir;

    const RUN: RunMode = RunMode {
        dry_run: false,
        verbose: false,
        assume_yes: false,
    };

    fn config_in(dir: &TempDir) -> RuntimeConfig {
        let base = dir.path().to_path_buf();
        RuntimeConfig {
            base_dir: base.clone(),
            image_size: "10M".parse().expect("size"),
            remote_host: "example.com".to_string(),
            remote_port: 22,
            remote_user: "root".to_string(),
            remote_path: "/receive".into(),
            schedule: "0 3 * * *".parse().expect("schedule"),
            mount_base: base.join("mnt"),
            ssh_key: base.join("id_ed25519"),
            image_path: base.join("example.com.img"),
            snapshot_path: base.join("example.com.img.snap"),
            mount_point: base.join("mnt/example.com"),
            init_marker: base.join(".initialized"),
            disable_marker: base.join(".backup-disabled"),
        }
    }

    #[test]
    fn scheduled_run_skips_when_disabled() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = config_in(&dir);
        fs::write(&cfg.image_path, b"image").expect("seed image");
        let markers = Markers::from_config(&cfg);
        markers.set_initialized().expect("init");
        markers.disable_backups().expect("disable");

        let err = run_backup(&cfg, BackupTrigger::Scheduled, RUN).expect_err("skip");
        assert!(matches!(
            err,
            LoopvaultError::Backup(BackupError::Disabled)
        ));
        // The skip happens before any snapshot work.
        assert!(!cfg.snapshot_path.exists());
    }

    #[test]
    fn uninitialized_run_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = config_in(&dir);
        let err = run_backup(&cfg, BackupTrigger::Scheduled, RUN).expect_err("rejected");
        assert!(matches!(
            err,
            LoopvaultError::Image(ImageError::NotInitialized)
        ));
    }

    #[test]
    fn snapshot_copies_image() {
        let dir = TempDir::new().expect("tempdir");
        let image = dir.path().join("host.img");
        let snap = dir.path().join("host.img.snap");
        fs::write(&image, b"image contents").expect("seed");
        snapshot(&image, &snap, RUN).expect("snapshot");
        assert_eq!(fs::read(&snap).expect("read"), b"image contents");
    }

    #[test]
    fn snapshot_overwrites_leftover() {
        let dir = TempDir::new().expect("tempdir");
        let image = dir.path().join("host.img");
        let snap = dir.path().join("host.img.snap");
        fs::write(&image, b"fresh").expect("seed image");
        fs::write(&snap, b"leftover from a failed transfer, much longer").expect("seed snap");
        snapshot(&image, &snap, RUN).expect("snapshot");
        assert_eq!(fs::read(&snap).expect("read"), b"fresh");
    }

    #[test]
    fn snapshot_fails_without_image() {
        let dir = TempDir::new().expect("tempdir");
        let image = dir.path().join("missing.img");
        let snap = dir.path().join("missing.img.snap");
        assert!(snapshot(&image, &snap, RUN).is_err());
    }
}
