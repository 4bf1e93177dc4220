use std::path::Path;
use std::process::Command;

use crate::error::{ImageError, Result};
use crate::types::RunMode;
use crate::util::command::run_command;

/// Attach the image as a loop-mounted filesystem.
pub fn mount_image(image: &Path, mountpoint: &Path, run_mode: RunMode) -> Result<()> {
    let mut cmd = Command::new("mount");
    cmd.arg("-o").arg("loop").arg(image).arg(mountpoint);
    let rc = run_command(&mut cmd, run_mode)?;
    if rc != 0 {
        return Err(ImageError::MountFailure(format!(
            "{} at {} failed with exit code {}",
            image.display(),
            mountpoint.display(),
            rc
        ))
        .into());
    }
    Ok(())
}

/// Detach the filesystem. A polite umount gets one escalation to a lazy
/// detach before the failure surfaces.
pub fn unmount_path(mountpoint: &Path, run_mode: RunMode) -> Result<()> {
    let mut cmd = Command::new("umount");
    cmd.arg(mountpoint);
    let rc = run_command(&mut cmd, run_mode)?;
    if rc == 0 {
        return Ok(());
    }
    tracing::warn!(
        mountpoint = %mountpoint.display(),
        "umount failed with exit code {}; retrying with a lazy detach",
        rc
    );
    let mut lazy = Command::new("umount");
    lazy.arg("-l").arg(mountpoint);
    let rc = run_command(&mut lazy, run_mode)?;
    if rc != 0 {
        return Err(ImageError::UmountFailure(format!(
            "{} failed with exit code {} (lazy detach included)",
            mountpoint.display(),
            rc
        ))
        .into());
    }
    Ok(())
}
