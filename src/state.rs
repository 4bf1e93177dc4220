use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::model::RuntimeConfig;
use crate::error::Result;

/// Marker-file existence is the on-disk contract; commands read it once into
/// these enums and decide from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPolicy {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Markers {
    init: PathBuf,
    disable: PathBuf,
}

impl Markers {
    pub fn new(init: PathBuf, disable: PathBuf) -> Self {
        Markers { init, disable }
    }

    pub fn from_config(cfg: &RuntimeConfig) -> Self {
        Markers::new(cfg.init_marker.clone(), cfg.disable_marker.clone())
    }

    pub fn init_state(&self) -> InitState {
        if self.init.exists() {
            InitState::Initialized
        } else {
            InitState::Uninitialized
        }
    }

    pub fn backup_policy(&self) -> BackupPolicy {
        if self.disable.exists() {
            BackupPolicy::Disabled
        } else {
            BackupPolicy::Enabled
        }
    }

    pub fn set_initialized(&self) -> Result<()> {
        touch(&self.init)
    }

    pub fn clear_initialized(&self) -> Result<()> {
        remove_if_present(&self.init)
    }

    pub fn disable_backups(&self) -> Result<()> {
        touch(&self.disable)
    }

    pub fn enable_backups(&self) -> Result<()> {
        remove_if_present(&self.disable)
    }

    pub fn disable_marker_path(&self) -> &Path {
        &self.disable
    }
}

fn touch(path: &Path) -> Result<()> {
    File::create(path)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Lifts the disable marker for a forced backup and puts it back on drop, so
/// the marker ends up exactly as found whether the run succeeds or fails.
pub struct PolicyRestoreGuard {
    marker: PathBuf,
    was_disabled: bool,
}

impl PolicyRestoreGuard {
    pub fn lift(markers: &Markers) -> Result<Self> {
        let was_disabled = markers.backup_policy() == BackupPolicy::Disabled;
        if was_disabled {
            markers.enable_backups()?;
        }
        Ok(PolicyRestoreGuard {
            marker: markers.disable_marker_path().to_path_buf(),
            was_disabled,
        })
    }
}

impl Drop for PolicyRestoreGuard {
    fn drop(&mut self) {
        if self.was_disabled {
            let _ = File::create(&self.marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn markers_in(dir: &TempDir) -> Markers {
        Markers::new(
            dir.path().join(".initialized"),
            dir.path().join(".backup-disabled"),
        )
    }

    #[test]
    fn marker_lifecycle() {
        let dir = TempDir::new().expect("tempdir");
        let markers = markers_in(&dir);
        assert_eq!(markers.init_state(), InitState::Uninitialized);
        markers.set_initialized().expect("set");
        assert_eq!(markers.init_state(), InitState::Initialized);
        markers.clear_initialized().expect("clear");
        markers.clear_initialized().expect("clear is idempotent");
        assert_eq!(markers.init_state(), InitState::Uninitialized);
    }

    #[test]
    fn policy_follows_disable_marker() {
        let dir = TempDir::new().expect("tempdir");
        let markers = markers_in(&dir);
        assert_eq!(markers.backup_policy(), BackupPolicy::Enabled);
        markers.disable_backups().expect("disable");
        assert_eq!(markers.backup_policy(), BackupPolicy::Disabled);
        markers.enable_backups().expect("enable");
        assert_eq!(markers.backup_policy(), BackupPolicy::Enabled);
    }

    #[test]
    fn restore_guard_puts_marker_back() {
        let dir = TempDir::new().expect("tempdir");
        let markers = markers_in(&dir);
        markers.disable_backups().expect("disable");
        {
            let _guard = PolicyRestoreGuard::lift(&markers).expect("lift");
            assert_eq!(markers.backup_policy(), BackupPolicy::Enabled);
        }
        assert_eq!(markers.backup_policy(), BackupPolicy::Disabled);
    }

    #[test]
    fn restore_guard_leaves_enabled_alone() {
        let dir = TempDir::new().expect("tempdir");
        let markers = markers_in(&dir);
        {
            let _guard = PolicyRestoreGuard::lift(&markers).expect("lift");
        }
        assert_eq!(markers.backup_policy(), BackupPolicy::Enabled);
    }
}
