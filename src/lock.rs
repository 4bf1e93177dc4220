use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{LoopvaultError, Result};

pub const LOCK_FILE: &str = "/var/run/loopvault.pid";

pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = unlock_file(&self.path);
    }
}

/// Take the global lifecycle lock. Two concurrent invocations would race on
/// the single snapshot path and the mount table, so every mutating command
/// holds this for its full duration.
pub fn acquire() -> Result<LockGuard> {
    acquire_at(Path::new(LOCK_FILE))
}

pub fn acquire_at(path: &Path) -> Result<LockGuard> {
    match lock_file(path) {
        Ok(true) => Ok(LockGuard {
            path: path.to_path_buf(),
        }),
        Ok(false) => Err(LoopvaultError::message(
            "another loopvault command is already running",
        )),
        Err(e) => Err(LoopvaultError::message(format!(
            "failed to lock {}: {}",
            path.display(),
            e
        ))),
    }
}

fn lock_file(path: &Path) -> io::Result<bool> {
    for _ in 0..3 {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut f) => {
                writeln!(f, "{}", std::process::id())?;
                return Ok(true);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let pid = match fs::read_to_string(path) {
                    Ok(text) => text.trim().parse::<u32>().ok(),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(err),
                };
                if let Some(pid) = pid {
                    if Path::new("/proc").join(pid.to_string()).exists() {
                        return Ok(false);
                    }
                }
                // Stale lock: holder is gone, reclaim.
                match fs::remove_file(path) {
                    Ok(()) => continue,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
    }
    Ok(false)
}

fn unlock_file(path: &Path) -> io::Result<()> {
    let pid = fs::read_to_string(path).ok();
    if let Some(pid) = pid {
        let pid = pid.trim();
        if !pid.is_empty() && pid == std::process::id().to_string() {
            let _ = fs::remove_file(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("loopvault.pid");
        let guard = acquire_at(&path).expect("first lock");
        assert!(acquire_at(&path).is_err());
        drop(guard);
        let _guard = acquire_at(&path).expect("relock after release");
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("loopvault.pid");
        // No live process has pid 0.
        fs::write(&path, "0\n").expect("seed stale lock");
        let _guard = acquire_at(&path).expect("reclaim stale lock");
    }

    #[test]
    fn garbage_pid_is_reclaimed() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("loopvault.pid");
        fs::write(&path, "not-a-pid\n").expect("seed");
        let _guard = acquire_at(&path).expect("reclaim");
    }
}
