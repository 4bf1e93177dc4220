use std::fs;
use std::path::Path;

use crate::cli::commands::read_with_violations;
use crate::config::load::{parse_config, validate};
use crate::config::model::Config;
use crate::config::save::save_config;
use crate::error::{ConfigError, LoopvaultError, Result};
use crate::types::RunMode;

pub fn run_show(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        let contents = fs::read_to_string(config_path)?;
        print!("{}", contents);
    } else {
        println!("# {} does not exist; built-in defaults:", config_path.display());
        let rendered = serde_yaml::to_string(&Config::default())
            .map_err(|e| LoopvaultError::message(format!("encode config: {}", e)))?;
        print!("{}", rendered);
    }
    Ok(())
}

/// Edit-validate-commit: the edit happens on a scratch buffer, the result
/// must parse and validate, and only then does it atomically replace the
/// file. An aborted or invalid edit leaves the record untouched.
pub fn run_edit(config_path: &Path) -> Result<()> {
    let current = if config_path.exists() {
        fs::read_to_string(config_path)?
    } else {
        serde_yaml::to_string(&Config::default())
            .map_err(|e| LoopvaultError::message(format!("encode config: {}", e)))?
    };

    let edited = edit::edit(&current)
        .map_err(|e| LoopvaultError::message(format!("editor: {}", e)))?;
    if edited == current {
        println!("no changes");
        return Ok(());
    }

    let cfg = parse_config(&edited)?;
    let violations = validate(&cfg);
    if !violations.is_empty() {
        return Err(ConfigError::invalid(violations).into());
    }

    save_config(config_path, &cfg)?;
    println!("config updated: {}", config_path.display());
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<()> {
    let (_, violations) = read_with_violations(config_path)?;
    if violations.is_empty() {
        println!("config valid: {}", config_path.display());
        return Ok(());
    }
    Err(ConfigError::invalid(violations).into())
}

pub fn run_reset(config_path: &Path, run_mode: RunMode) -> Result<()> {
    if !crate::cli::commands::confirm(
        &format!("overwrite {} with built-in defaults?", config_path.display()),
        run_mode,
    )? {
        return Err(LoopvaultError::message("reset declined"));
    }
    if run_mode.dry_run {
        println!("dry-run: reset {}", config_path.display());
        return Ok(());
    }
    save_config(config_path, &Config::default())?;
    println!(
        "config reset: {} (set remoteHost before installing)",
        config_path.display()
    );
    Ok(())
}
