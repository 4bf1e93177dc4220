use std::path::Path;
use std::process::Command;

use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, Result};
use crate::types::RunMode;
use crate::util::command::run_command;

const TRANSFER_STALL_TIMEOUT_SECS: u32 = 300;
const SSH_CONNECT_TIMEOUT_SECS: u32 = 10;

pub fn ssh_options(cfg: &RuntimeConfig) -> String {
    format!(
        "ssh -p {} -i {} -o BatchMode=yes -o ConnectTimeout={}",
        cfg.remote_port,
        cfg.ssh_key.display(),
        SSH_CONNECT_TIMEOUT_SECS
    )
}

/// Ship the snapshot with rsync's resumable transfer. The stall timeout is
/// the only bound; a healthy transfer of a large image is expected to block
/// for minutes.
pub fn transfer_snapshot(cfg: &RuntimeConfig, snapshot: &Path, run_mode: RunMode) -> Result<()> {
    let mut cmd = Command::new("rsync");
    cmd.arg("--archive")
        .arg("--partial")
        .arg("--compress")
        .arg(format!("--timeout={}", TRANSFER_STALL_TIMEOUT_SECS))
        .arg("-e")
        .arg(ssh_options(cfg))
        .arg(snapshot)
        .arg(cfg.remote_target());
    let rc = run_command(&mut cmd, run_mode)?;
    if rc != 0 {
        return Err(BackupError::TransferFailed(rc).into());
    }
    Ok(())
}
