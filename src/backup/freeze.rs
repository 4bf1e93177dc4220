use std::path::{Path, PathBuf};
use std::process::Command;

use crate::types::RunMode;
use crate::util::command::run_command;

/// Holds a filesystem freeze for the duration of a snapshot copy. A failed
/// freeze degrades to a warning and the copy proceeds without consistency
/// guarantees (non-journaling or already-frozen mounts would otherwise block
/// backups entirely). The thaw runs on every exit path, even when the freeze
/// itself reported failure.
pub struct FreezeGuard {
    mountpoint: PathBuf,
    run_mode: RunMode,
    pub frozen: bool,
}

impl FreezeGuard {
    pub fn freeze(mountpoint: &Path, run_mode: RunMode) -> Self {
        let mut cmd = Command::new("fsfreeze");
        cmd.arg("-f").arg(mountpoint);
        let frozen = match run_command(&mut cmd, run_mode) {
            Ok(0) => true,
            Ok(rc) => {
                tracing::warn!(
                    mountpoint = %mountpoint.display(),
                    "fsfreeze -f exited {}; snapshot proceeds without freeze guarantees",
                    rc
                );
                false
            }
            Err(err) => {
                tracing::warn!(
                    mountpoint = %mountpoint.display(),
                    "fsfreeze unavailable ({}); snapshot proceeds without freeze guarantees",
                    err
                );
                false
            }
        };
        FreezeGuard {
            mountpoint: mountpoint.to_path_buf(),
            run_mode,
            frozen,
        }
    }
}

impl Drop for FreezeGuard {
    fn drop(&mut self) {
        let mut cmd = Command::new("fsfreeze");
        cmd.arg("-u").arg(&self.mountpoint);
        let _ = run_command(&mut cmd, self.run_mode);
    }
}
