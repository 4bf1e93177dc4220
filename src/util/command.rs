use std::process::{Command, Output, Stdio};

use crate::error::{LoopvaultError, Result};
use crate::types::RunMode;

pub fn maybe_print_command(cmd: &Command, run_mode: RunMode) {
    if !run_mode.dry_run && !run_mode.verbose {
        return;
    }
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    println!("{} {}", program, args.join(" "));
}

/// Run a command inheriting stdio, returning its exit code. Under --dry-run
/// the command is only echoed and reported as successful.
pub fn run_command(cmd: &mut Command, run_mode: RunMode) -> Result<i32> {
    maybe_print_command(cmd, run_mode);
    if run_mode.dry_run {
        return Ok(0);
    }
    let status = cmd.status().map_err(|e| {
        LoopvaultError::message(format!("{}: {}", cmd.get_program().to_string_lossy(), e))
    })?;
    Ok(status.code().unwrap_or(1))
}

/// Run a command with captured output. Dry-run does not apply: capture is
/// only used for read-only probes (crontab -l, blkid, remote tests).
pub fn run_command_capture(cmd: &mut Command) -> Result<Output> {
    cmd.stdin(Stdio::null());
    cmd.output().map_err(|e| {
        LoopvaultError::message(format!("{}: {}", cmd.get_program().to_string_lossy(), e))
    })
}

pub fn stderr_excerpt(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        format!("exit code {}", output.status.code().unwrap_or(1))
    } else {
        line.to_string()
    }
}
