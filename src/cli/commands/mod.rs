use std::io::{self, Write};
use std::path::Path;

use crate::config::load::{load_config, read_config};
use crate::config::model::RuntimeConfig;
use crate::error::{BackupError, LoopvaultError, Result};
use crate::state::{InitState, Markers};
use crate::types::RunMode;

pub mod backup;
pub mod config;
pub mod connect;
pub mod expand;
pub mod install;
pub mod remove;
pub mod repair;
pub mod status;
pub mod toggle;

/// 0 on success, 1 on any failure or declined confirmation. The disabled
/// skip is the one soft case: cron must not see it as an error.
pub fn exit_code_for(err: &LoopvaultError) -> i32 {
    match err {
        LoopvaultError::Backup(BackupError::Disabled) => 0,
        _ => 1,
    }
}

/// Load a validated config or fail with a remediation hint; every verb but
/// install and the config family goes through here.
pub fn load_validated(config_path: &Path) -> Result<RuntimeConfig> {
    load_config(config_path).map_err(|err| {
        LoopvaultError::message(format!(
            "{}\nfix with `loopvault config edit` (file: {})",
            err,
            config_path.display()
        ))
    })
}

pub fn require_initialized(cfg: &RuntimeConfig) -> Result<Markers> {
    let markers = Markers::from_config(cfg);
    if markers.init_state() == InitState::Uninitialized {
        return Err(crate::error::ImageError::NotInitialized.into());
    }
    Ok(markers)
}

pub fn confirm(prompt: &str, run_mode: RunMode) -> Result<bool> {
    if run_mode.assume_yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Second confirmation for purge: the operator types the value back, which
/// --yes deliberately does not bypass.
pub fn confirm_typed(prompt: &str, expected: &str) -> Result<bool> {
    print!("{} (type {:?} to continue): ", prompt, expected);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim() == expected)
}

/// For status and the config family: the raw record plus its violations, so
/// an invalid file can still be inspected.
pub fn read_with_violations(config_path: &Path) -> Result<(crate::config::model::Config, Vec<String>)> {
    let raw = read_config(config_path)?;
    let violations = crate::config::load::validate(&raw);
    Ok((raw, violations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_skip_is_soft() {
        assert_eq!(
            exit_code_for(&LoopvaultError::Backup(BackupError::Disabled)),
            0
        );
        assert_eq!(
            exit_code_for(&LoopvaultError::Backup(BackupError::TransferFailed(12))),
            1
        );
        assert_eq!(exit_code_for(&LoopvaultError::message("anything")), 1);
    }
}
