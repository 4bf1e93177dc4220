use std::path::Path;

use crate::cli::commands::load_validated;
use crate::config::load::read_config;
use crate::config::save::save_config;
use crate::error::{ImageError, LoopvaultError, Result};
use crate::image;
use crate::mount::{fstab, inspect, ops};
use crate::schedule;
use crate::state::{InitState, Markers};
use crate::types::RunMode;
use crate::util::paths::{ensure_base_dir, ensure_dir};

pub fn run_install(config_path: &Path, run_mode: RunMode) -> Result<()> {
    // First run: persist a default record and send the operator to fill in
    // the remote host; install never proceeds on a config it invented.
    if !config_path.exists() {
        if !run_mode.dry_run {
            save_config(config_path, &read_config(config_path)?)?;
        }
        return Err(LoopvaultError::message(format!(
            "wrote default config to {}; set remoteHost (`loopvault config edit`) and rerun install",
            config_path.display()
        )));
    }

    let cfg = load_validated(config_path)?;
    let markers = Markers::from_config(&cfg);
    if markers.init_state() == InitState::Initialized {
        return Err(ImageError::AlreadyInitialized.into());
    }
    if cfg.image_path.exists() {
        return Err(LoopvaultError::message(format!(
            "image {} already exists without the initialized marker; \
             move it aside or remove it, then rerun install",
            cfg.image_path.display()
        )));
    }

    ensure_base_dir(&cfg.base_dir)?;
    ensure_dir(&cfg.mount_point)?;

    println!(
        "creating {} ({}) for {}",
        cfg.image_path.display(),
        cfg.image_size,
        cfg.remote_host
    );
    image::create(&cfg.image_path, cfg.image_size, run_mode)?;

    fstab::ensure_entry(
        Path::new(fstab::FSTAB),
        &cfg.image_path,
        &cfg.mount_point,
        run_mode,
    )?;
    if !inspect::mountpoint_is_mounted(&cfg.mount_point)? {
        ops::mount_image(&cfg.image_path, &cfg.mount_point, run_mode)?;
    }

    if run_mode.dry_run {
        println!("dry-run: touch {}", cfg.init_marker.display());
    } else {
        markers.set_initialized()?;
    }

    schedule::install(&cfg.schedule, run_mode)?;

    println!("installed:");
    println!("  image: {}", cfg.image_path.display());
    println!("  mount: {}", cfg.mount_point.display());
    println!("  schedule: {}", cfg.schedule);
    println!("  remote: {}", cfg.remote_target());
    Ok(())
}
