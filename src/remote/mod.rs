use std::net::ToSocketAddrs;
use std::process::Command;

use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, LoopvaultError, Result};
use crate::types::RunMode;
use crate::util::command::{run_command, run_command_capture, stderr_excerpt};

const SSH_CONNECT_TIMEOUT_SECS: u32 = 10;
const PING_TIMEOUT_SECS: u32 = 5;

#[derive(Debug)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub advisory: bool,
    pub detail: String,
}

#[derive(Debug)]
pub struct ConnectivityReport {
    pub checks: Vec<CheckResult>,
}

impl ConnectivityReport {
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn print(&self) {
        for check in &self.checks {
            let mark = if check.passed { "ok" } else { "FAIL" };
            let advisory = if check.advisory && !check.passed {
                " (advisory)"
            } else {
                ""
            };
            println!("  {:<14} {}{} - {}", check.name, mark, advisory, check.detail);
        }
        println!("{} of {} checks passed", self.passed(), self.checks.len());
    }
}

/// Run every check and report each individually; no check blocks the next,
/// so the operator sees the full picture in one pass.
pub fn verify(cfg: &RuntimeConfig) -> ConnectivityReport {
    ConnectivityReport {
        checks: vec![
            check_key(cfg),
            check_dns(cfg),
            check_ping(cfg),
            check_ssh_exec(cfg),
            check_remote_path(cfg),
        ],
    }
}

/// The reduced gate a backup runs behind: key on disk and an authenticated
/// round trip. The full five-check report is for the operator.
pub fn preflight(cfg: &RuntimeConfig) -> Result<()> {
    let mut failures = Vec::new();
    for check in [check_key(cfg), check_ssh_exec(cfg)] {
        if !check.passed {
            failures.push(format!("{}: {}", check.name, check.detail));
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(BackupError::ConnectivityFailed(failures.join("; ")).into())
    }
}

fn check_key(cfg: &RuntimeConfig) -> CheckResult {
    let present = cfg.ssh_key.exists();
    CheckResult {
        name: "ssh key",
        passed: present,
        advisory: false,
        detail: if present {
            format!("{}", cfg.ssh_key.display())
        } else {
            format!(
                "{} missing; run `loopvault setup-ssh`",
                cfg.ssh_key.display()
            )
        },
    }
}

fn check_dns(cfg: &RuntimeConfig) -> CheckResult {
    match (cfg.remote_host.as_str(), cfg.remote_port).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => CheckResult {
                name: "dns",
                passed: true,
                advisory: false,
                detail: format!("{} resolves to {}", cfg.remote_host, addr.ip()),
            },
            None => CheckResult {
                name: "dns",
                passed: false,
                advisory: false,
                detail: format!("{} resolved to no addresses", cfg.remote_host),
            },
        },
        Err(err) => CheckResult {
            name: "dns",
            passed: false,
            advisory: false,
            detail: format!("{}: {}", cfg.remote_host, err),
        },
    }
}

/// Firewalls legitimately drop ICMP, so this one never fails a run on its
/// own; it is still reported because a silent network is worth knowing about.
fn check_ping(cfg: &RuntimeConfig) -> CheckResult {
    let mut cmd = Command::new("ping");
    cmd.arg("-c")
        .arg("1")
        .arg("-W")
        .arg(PING_TIMEOUT_SECS.to_string())
        .arg(&cfg.remote_host);
    match run_command_capture(&mut cmd) {
        Ok(output) if output.status.success() => CheckResult {
            name: "ping",
            passed: true,
            advisory: true,
            detail: format!("{} answers ICMP", cfg.remote_host),
        },
        Ok(_) => CheckResult {
            name: "ping",
            passed: false,
            advisory: true,
            detail: format!("{} does not answer ICMP", cfg.remote_host),
        },
        Err(err) => CheckResult {
            name: "ping",
            passed: false,
            advisory: true,
            detail: err.to_string(),
        },
    }
}

fn check_ssh_exec(cfg: &RuntimeConfig) -> CheckResult {
    let mut cmd = ssh_command(cfg);
    cmd.arg("true");
    match run_command_capture(&mut cmd) {
        Ok(output) if output.status.success() => CheckResult {
            name: "ssh exec",
            passed: true,
            advisory: false,
            detail: format!("authenticated command on {}", cfg.remote_host),
        },
        Ok(output) => CheckResult {
            name: "ssh exec",
            passed: false,
            advisory: false,
            detail: stderr_excerpt(&output),
        },
        Err(err) => CheckResult {
            name: "ssh exec",
            passed: false,
            advisory: false,
            detail: err.to_string(),
        },
    }
}

fn check_remote_path(cfg: &RuntimeConfig) -> CheckResult {
    let path = sh_quote(&cfg.remote_path.to_string_lossy());
    let mut cmd = ssh_command(cfg);
    cmd.arg(format!("test -d {0} && test -w {0}", path));
    match run_command_capture(&mut cmd) {
        Ok(output) if output.status.success() => CheckResult {
            name: "remote path",
            passed: true,
            advisory: false,
            detail: format!("{} exists and is writable", cfg.remote_path.display()),
        },
        Ok(_) => CheckResult {
            name: "remote path",
            passed: false,
            advisory: false,
            detail: format!(
                "{} is missing or not writable on {}",
                cfg.remote_path.display(),
                cfg.remote_host
            ),
        },
        Err(err) => CheckResult {
            name: "remote path",
            passed: false,
            advisory: false,
            detail: err.to_string(),
        },
    }
}

pub fn ssh_command(cfg: &RuntimeConfig) -> Command {
    let mut cmd = Command::new("ssh");
    cmd.arg("-p")
        .arg(cfg.remote_port.to_string())
        .arg("-i")
        .arg(&cfg.ssh_key)
        .arg("-o")
        .arg("BatchMode=yes")
        .arg("-o")
        .arg(format!("ConnectTimeout={}", SSH_CONNECT_TIMEOUT_SECS))
        .arg(format!("{}@{}", cfg.remote_user, cfg.remote_host));
    cmd
}

/// Key provisioning: generate the pair if missing, then push the public half
/// with ssh-copy-id (which prompts for the password once).
pub fn setup_ssh(cfg: &RuntimeConfig, run_mode: RunMode) -> Result<()> {
    if cfg.ssh_key.exists() {
        println!("key already present: {}", cfg.ssh_key.display());
    } else {
        let mut keygen = Command::new("ssh-keygen");
        keygen
            .arg("-t")
            .arg("ed25519")
            .arg("-N")
            .arg("")
            .arg("-f")
            .arg(&cfg.ssh_key);
        let rc = run_command(&mut keygen, run_mode)?;
        if rc != 0 {
            return Err(LoopvaultError::message(format!(
                "ssh-keygen failed with exit code {}",
                rc
            )));
        }
    }
    let mut copy_id = Command::new("ssh-copy-id");
    copy_id
        .arg("-i")
        .arg(&cfg.ssh_key)
        .arg("-p")
        .arg(cfg.remote_port.to_string())
        .arg(format!("{}@{}", cfg.remote_user, cfg.remote_host));
    let rc = run_command(&mut copy_id, run_mode)?;
    if rc != 0 {
        return Err(LoopvaultError::message(format!(
            "ssh-copy-id failed with exit code {}; install the key manually",
            rc
        )));
    }
    println!("key installed for {}@{}", cfg.remote_user, cfg.remote_host);
    Ok(())
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sh_quote_wraps_and_escapes() {
        assert_eq!(sh_quote("/receive"), "'/receive'");
        assert_eq!(sh_quote("/a b"), "'/a b'");
        assert_eq!(sh_quote("it's"), "'it'\\''s'");
    }
}
