use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{LoopvaultError, Result};
use crate::types::RunMode;

const RELEASE_BASE_URL: &str = "https://dl.loopvault.dev/latest";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Replace the running binary with the published revision, keeping the old
/// one next to it as `.bak`. The swap is a same-directory rename, so an
/// interrupted update leaves either the old or the new binary, never a torn
/// one.
pub fn run_update(run_mode: RunMode) -> Result<()> {
    let latest = fetch_version()?;
    if latest == VERSION {
        println!("already up to date ({})", VERSION);
        return Ok(());
    }
    println!("update available: {} -> {}", VERSION, latest);

    let exe = std::env::current_exe()
        .map_err(|e| LoopvaultError::message(format!("resolve own executable: {}", e)))?;
    let backup = backup_path(&exe);

    if run_mode.dry_run {
        println!("dry-run: download {}/loopvault", RELEASE_BASE_URL);
        println!("dry-run: keep current binary as {}", backup.display());
        println!("dry-run: replace {}", exe.display());
        return Ok(());
    }

    let dir = exe.parent().ok_or_else(|| {
        LoopvaultError::message(format!("{} has no parent directory", exe.display()))
    })?;
    let mut staged = NamedTempFile::new_in(dir)
        .map_err(|e| LoopvaultError::message(format!("temp file in {}: {}", dir.display(), e)))?;

    let url = format!("{}/loopvault", RELEASE_BASE_URL);
    let response = ureq::get(&url)
        .call()
        .map_err(|e| LoopvaultError::message(format!("fetch {}: {}", url, e)))?;
    io::copy(&mut response.into_reader(), &mut staged)
        .map_err(|e| LoopvaultError::message(format!("download {}: {}", url, e)))?;

    let mut perms = staged.as_file().metadata()?.permissions();
    perms.set_mode(0o755);
    staged.as_file().set_permissions(perms)?;

    fs::copy(&exe, &backup)
        .map_err(|e| LoopvaultError::message(format!("keep backup {}: {}", backup.display(), e)))?;
    staged
        .persist(&exe)
        .map_err(|e| LoopvaultError::message(format!("replace {}: {}", exe.display(), e)))?;

    println!(
        "installed {} (previous revision kept at {})",
        latest,
        backup.display()
    );
    Ok(())
}

fn fetch_version() -> Result<String> {
    let url = format!("{}/VERSION", RELEASE_BASE_URL);
    let text = ureq::get(&url)
        .call()
        .map_err(|e| LoopvaultError::message(format!("fetch {}: {}", url, e)))?
        .into_string()
        .map_err(|e| LoopvaultError::message(format!("read {}: {}", url, e)))?;
    let version = text.trim().to_string();
    if version.is_empty() {
        return Err(LoopvaultError::message(format!("{} returned no version", url)));
    }
    Ok(version)
}

fn backup_path(exe: &Path) -> PathBuf {
    let mut name = exe.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    exe.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_path_appends_bak() {
        assert_eq!(
            backup_path(Path::new("/usr/bin/loopvault")),
            PathBuf::from("/usr/bin/loopvault.bak")
        );
    }
}
