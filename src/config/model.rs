use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{CronSchedule, ImageSize};

pub const DEFAULT_BASE_DIR: &str = "/var/rnas";
pub const DEFAULT_MOUNT_BASE: &str = "/mnt/rnas";
pub const DEFAULT_IMAGE_SIZE: &str = "10G";
pub const DEFAULT_REMOTE_PORT: u16 = 22;
pub const DEFAULT_REMOTE_USER: &str = "root";
pub const DEFAULT_REMOTE_PATH: &str = "/receive";
pub const DEFAULT_SCHEDULE: &str = "0 3 * * *";
pub const DEFAULT_SSH_KEY: &str = "/root/.ssh/id_ed25519";

const INIT_MARKER: &str = ".initialized";
const DISABLE_MARKER: &str = ".backup-disabled";

/// On-disk configuration record. Unknown keys are rejected so a typo cannot
/// silently fall back to a default.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_base_dir", rename = "baseDir")]
    pub base_dir: String,
    #[serde(default = "default_image_size", rename = "imageSize")]
    pub image_size: String,
    #[serde(default, rename = "remoteHost")]
    pub remote_host: String,
    #[serde(default = "default_remote_port", rename = "remotePort")]
    pub remote_port: u16,
    #[serde(default = "default_remote_user", rename = "remoteUser")]
    pub remote_user: String,
    #[serde(default = "default_remote_path", rename = "remotePath")]
    pub remote_path: String,
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_mount_base", rename = "mountBase")]
    pub mount_base: String,
    #[serde(default = "default_ssh_key", rename = "sshKey")]
    pub ssh_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_dir: default_base_dir(),
            image_size: default_image_size(),
            remote_host: String::new(),
            remote_port: default_remote_port(),
            remote_user: default_remote_user(),
            remote_path: default_remote_path(),
            schedule: default_schedule(),
            mount_base: default_mount_base(),
            ssh_key: default_ssh_key(),
        }
    }
}

/// Validated configuration with the path-derived fields recomputed from the
/// base directory and remote host. Built once per command and passed down;
/// no ambient globals.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub base_dir: PathBuf,
    pub image_size: ImageSize,
    pub remote_host: String,
    pub remote_port: u16,
    pub remote_user: String,
    pub remote_path: PathBuf,
    pub schedule: CronSchedule,
    pub mount_base: PathBuf,
    pub ssh_key: PathBuf,

    pub image_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub mount_point: PathBuf,
    pub init_marker: PathBuf,
    pub disable_marker: PathBuf,
}

impl RuntimeConfig {
    pub fn remote_target(&self) -> String {
        format!(
            "{}@{}:{}/",
            self.remote_user,
            self.remote_host,
            self.remote_path.display()
        )
    }
}

pub fn derive_paths(base_dir: &PathBuf, mount_base: &PathBuf, host: &str) -> DerivedPaths {
    DerivedPaths {
        image_path: base_dir.join(format!("{}.img", host)),
        snapshot_path: base_dir.join(format!("{}.img.snap", host)),
        mount_point: mount_base.join(host),
        init_marker: base_dir.join(INIT_MARKER),
        disable_marker: base_dir.join(DISABLE_MARKER),
    }
}

pub struct DerivedPaths {
    pub image_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub mount_point: PathBuf,
    pub init_marker: PathBuf,
    pub disable_marker: PathBuf,
}

fn default_base_dir() -> String {
    DEFAULT_BASE_DIR.to_string()
}

fn default_image_size() -> String {
    DEFAULT_IMAGE_SIZE.to_string()
}

fn default_remote_port() -> u16 {
    DEFAULT_REMOTE_PORT
}

fn default_remote_user() -> String {
    DEFAULT_REMOTE_USER.to_string()
}

fn default_remote_path() -> String {
    DEFAULT_REMOTE_PATH.to_string()
}

fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_string()
}

fn default_mount_base() -> String {
    DEFAULT_MOUNT_BASE.to_string()
}

fn default_ssh_key() -> String {
    DEFAULT_SSH_KEY.to_string()
}
