use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoopvaultError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Image(ImageError),
    #[error("{0}")]
    Backup(BackupError),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(String),
    #[error("invalid configuration ({} violation(s)): {}", .count, .violations.join("; "))]
    Invalid { count: usize, violations: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("already initialized; run `loopvault uninstall` first")]
    AlreadyInitialized,
    #[error("not initialized; run `loopvault install` first")]
    NotInitialized,
    #[error("allocation of {0} failed (sparse and zero-fill)")]
    AllocationFailed(String),
    #[error("format {0}")]
    FormatFailed(String),
    #[error("mount {0}")]
    MountFailure(String),
    #[error("umount {0}")]
    UmountFailure(String),
    #[error("resize {0}; image file is larger than its filesystem, rerun `loopvault expand 0` once the cause is fixed")]
    ResizeFailed(String),
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("connectivity check failed: {0}")]
    ConnectivityFailed(String),
    #[error("transfer failed with exit code {0}; snapshot kept for manual retry")]
    TransferFailed(i32),
    #[error("scheduled backups are disabled")]
    Disabled,
}

pub type Result<T> = std::result::Result<T, LoopvaultError>;

impl LoopvaultError {
    pub fn message(msg: impl Into<String>) -> Self {
        LoopvaultError::Message(msg.into())
    }
}

impl ConfigError {
    pub fn invalid(violations: Vec<String>) -> Self {
        ConfigError::Invalid {
            count: violations.len(),
            violations,
        }
    }
}

impl From<ConfigError> for LoopvaultError {
    fn from(err: ConfigError) -> Self {
        LoopvaultError::Config(err)
    }
}

impl From<ImageError> for LoopvaultError {
    fn from(err: ImageError) -> Self {
        LoopvaultError::Image(err)
    }
}

impl From<BackupError> for LoopvaultError {
    fn from(err: BackupError) -> Self {
        LoopvaultError::Backup(err)
    }
}
