use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::{LoopvaultError, Result};
use crate::types::{CronSchedule, RunMode};
use crate::util::command::run_command_capture;

/// Trailing tag that marks our line in the crontab; install/remove filter on
/// it so operator-owned entries are never touched.
pub const CRON_TAG: &str = "# loopvault";

pub fn render_entry(schedule: &CronSchedule, exe: &str) -> String {
    format!("{} {} backup {}", schedule.as_str(), exe, CRON_TAG)
}

pub fn is_installed(crontab: &str) -> bool {
    crontab.lines().any(is_loopvault_line)
}

pub fn with_entry(crontab: &str, entry: &str) -> String {
    let mut lines: Vec<&str> = crontab
        .lines()
        .filter(|line| !is_loopvault_line(line))
        .collect();
    lines.push(entry);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn without_entry(crontab: &str) -> String {
    let lines: Vec<&str> = crontab
        .lines()
        .filter(|line| !is_loopvault_line(line))
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn is_loopvault_line(line: &str) -> bool {
    line.trim_end().ends_with(CRON_TAG)
}

/// `crontab -l` exits non-zero when the user has no crontab yet; that is an
/// empty table, not an error.
pub fn current_crontab() -> Result<String> {
    let mut cmd = Command::new("crontab");
    cmd.arg("-l");
    let output = run_command_capture(&mut cmd)?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Ok(String::new())
    }
}

pub fn install(schedule: &CronSchedule, run_mode: RunMode) -> Result<()> {
    let exe = current_exe_string()?;
    let entry = render_entry(schedule, &exe);
    if run_mode.dry_run {
        println!("dry-run: install crontab entry: {}", entry);
        return Ok(());
    }
    let updated = with_entry(&current_crontab()?, &entry);
    write_crontab(&updated)
}

pub fn remove(run_mode: RunMode) -> Result<()> {
    let current = current_crontab()?;
    if !is_installed(&current) {
        return Ok(());
    }
    if run_mode.dry_run {
        println!("dry-run: remove crontab entry");
        return Ok(());
    }
    write_crontab(&without_entry(&current))
}

fn write_crontab(contents: &str) -> Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| LoopvaultError::message(format!("crontab -: {}", e)))?;
    child
        .stdin
        .as_mut()
        .ok_or_else(|| LoopvaultError::message("crontab stdin unavailable"))?
        .write_all(contents.as_bytes())
        .map_err(|e| LoopvaultError::message(format!("write crontab: {}", e)))?;
    let status = child
        .wait()
        .map_err(|e| LoopvaultError::message(format!("crontab -: {}", e)))?;
    if !status.success() {
        return Err(LoopvaultError::message(format!(
            "crontab - failed with exit code {}",
            status.code().unwrap_or(1)
        )));
    }
    Ok(())
}

fn current_exe_string() -> Result<String> {
    let exe = std::env::current_exe()
        .map_err(|e| LoopvaultError::message(format!("resolve own executable: {}", e)))?;
    Ok(exe.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> CronSchedule {
        "0 3 * * *".parse().expect("schedule")
    }

    #[test]
    fn entry_carries_tag_and_verb() {
        let entry = render_entry(&schedule(), "/usr/bin/loopvault");
        assert_eq!(entry, "0 3 * * * /usr/bin/loopvault backup # loopvault");
        assert!(is_installed(&format!("{}\n", entry)));
    }

    #[test]
    fn with_entry_replaces_stale_line() {
        let old = "30 2 * * * /old/loopvault backup # loopvault\n0 1 * * * /usr/bin/certbot renew\n";
        let entry = render_entry(&schedule(), "/usr/bin/loopvault");
        let updated = with_entry(old, &entry);
        assert!(updated.contains("certbot"));
        assert!(!updated.contains("/old/loopvault"));
        assert_eq!(
            updated.lines().filter(|l| l.ends_with(CRON_TAG)).count(),
            1
        );
    }

    #[test]
    fn without_entry_keeps_foreign_lines() {
        let crontab = "0 1 * * * /usr/bin/certbot renew\n0 3 * * * /usr/bin/loopvault backup # loopvault\n";
        let updated = without_entry(crontab);
        assert_eq!(updated, "0 1 * * * /usr/bin/certbot renew\n");
        assert!(!is_installed(&updated));
    }

    #[test]
    fn without_entry_on_clean_table() {
        assert_eq!(without_entry(""), "");
        let crontab = "0 1 * * * /usr/bin/certbot renew\n";
        assert_eq!(without_entry(crontab), crontab);
    }
}
