use std::path::Path;

use crate::cli::commands::{load_validated, require_initialized};
use crate::error::Result;

pub fn run_enable(config_path: &Path) -> Result<()> {
    let cfg = load_validated(config_path)?;
    let markers = require_initialized(&cfg)?;
    markers.enable_backups()?;
    println!("scheduled backups enabled");
    Ok(())
}

pub fn run_disable(config_path: &Path) -> Result<()> {
    let cfg = load_validated(config_path)?;
    let markers = require_initialized(&cfg)?;
    markers.disable_backups()?;
    println!("scheduled backups disabled (forced backups still run)");
    Ok(())
}
