use std::path::Path;

use crate::cli::commands::{load_validated, require_initialized};
use crate::error::{LoopvaultError, Result};
use crate::image;
use crate::types::{ImageSize, RunMode};

pub fn run_expand(config_path: &Path, gibibytes: u64, run_mode: RunMode) -> Result<()> {
    let cfg = load_validated(config_path)?;
    require_initialized(&cfg)?;
    if !cfg.image_path.exists() {
        return Err(LoopvaultError::message(format!(
            "image {} is missing; run `loopvault repair`",
            cfg.image_path.display()
        )));
    }

    let before = image::file_size(&cfg.image_path).unwrap_or(0);
    let add = ImageSize::gibibytes(gibibytes);
    if gibibytes == 0 {
        println!("growing filesystem to the current image size");
    } else {
        println!("expanding {} by {}", cfg.image_path.display(), add);
    }
    image::expand(&cfg.image_path, &cfg.mount_point, add, run_mode)?;

    if !run_mode.dry_run {
        let after = image::file_size(&cfg.image_path).unwrap_or(0);
        println!("image size: {} -> {} bytes", before, after);
    }
    Ok(())
}
