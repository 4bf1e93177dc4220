use std::path::Path;

use walkdir::WalkDir;

use crate::cli::commands::read_with_violations;
use crate::config::load::parse_runtime;
use crate::image;
use crate::mount::{fstab, inspect};
use crate::schedule;
use crate::state::{BackupPolicy, InitState, Markers};
use crate::types::RunMode;

pub fn run_status(config_path: &Path, run_mode: RunMode) -> crate::error::Result<()> {
    let (raw, violations) = read_with_violations(config_path)?;
    println!(
        "config: {} ({})",
        config_path.display(),
        if config_path.exists() {
            "present"
        } else {
            "missing, built-in defaults"
        }
    );
    if !violations.is_empty() {
        println!("config invalid ({} violation(s)):", violations.len());
        for violation in &violations {
            println!("  - {}", violation);
        }
        println!("fix with `loopvault config edit`");
        return Ok(());
    }
    let cfg = parse_runtime(&raw)?;
    let markers = Markers::from_config(&cfg);

    println!(
        "initialized: {}",
        match markers.init_state() {
            InitState::Initialized => "yes",
            InitState::Uninitialized => "no",
        }
    );
    println!(
        "scheduled backups: {}",
        match markers.backup_policy() {
            BackupPolicy::Enabled => "enabled",
            BackupPolicy::Disabled => "disabled",
        }
    );

    match image::file_size(&cfg.image_path) {
        Some(actual) => println!(
            "image: {} (declared {}, on disk {})",
            cfg.image_path.display(),
            cfg.image_size,
            format_bytes(actual)
        ),
        None => println!("image: {} (missing)", cfg.image_path.display()),
    }
    match image::file_size(&cfg.snapshot_path) {
        Some(size) => println!(
            "snapshot: {} ({}, leftover from a failed transfer)",
            cfg.snapshot_path.display(),
            format_bytes(size)
        ),
        None => println!("snapshot: none"),
    }

    let mounted = inspect::mountpoint_is_mounted(&cfg.mount_point)?;
    println!(
        "mounted: {} ({})",
        if mounted { "yes" } else { "no" },
        cfg.mount_point.display()
    );
    println!(
        "fstab entry: {}",
        if fstab::has_entry(Path::new(fstab::FSTAB), &cfg.mount_point)? {
            "present"
        } else {
            "missing"
        }
    );
    println!(
        "cron entry: {} ({})",
        if schedule::is_installed(&schedule::current_crontab()?) {
            "present"
        } else {
            "missing"
        },
        cfg.schedule
    );
    if cfg.base_dir.exists() {
        println!("base dir usage: {}", format_bytes(dir_usage(&cfg.base_dir)));
    }

    println!("remote: {}", cfg.remote_target());
    println!(
        "ssh key: {}",
        if cfg.ssh_key.exists() {
            "present"
        } else {
            "missing (run `loopvault setup-ssh`)"
        }
    );
    if run_mode.verbose {
        println!("run `loopvault verify-connection` for the full remote checks");
    }
    Ok(())
}

/// Apparent (not block-allocated) usage of everything under the base dir;
/// the image is sparse, so this is the upper bound that matters for
/// transfers.
fn dir_usage(base: &Path) -> u64 {
    let mut total = 0;
    for entry in WalkDir::new(base).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if entry.file_type().is_file() {
            if let Ok(meta) = entry.metadata() {
                total += meta.len();
            }
        }
    }
    total
}

fn format_bytes(bytes: u64) -> String {
    const GIB: u64 = 1024 * 1024 * 1024;
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if bytes >= GIB {
        format!("{:.1}G", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1}M", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1}K", bytes as f64 / KIB as f64)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(10 * 1024 * 1024 * 1024), "10.0G");
        assert_eq!(format_bytes(1536), "1.5K");
    }
}
