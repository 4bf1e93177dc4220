use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use crate::error::{LoopvaultError, Result};

pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Create `path` if missing and pin it to root-owned mode 0700. The base
/// directory holds the image and markers, so nothing else may write there.
pub fn ensure_base_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| LoopvaultError::message(format!("create {}: {}", path.display(), e)))?;
    }
    let meta = fs::metadata(path)
        .map_err(|e| LoopvaultError::message(format!("stat {}: {}", path.display(), e)))?;
    if !meta.is_dir() {
        return Err(LoopvaultError::message(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    if meta.uid() != 0 {
        return Err(LoopvaultError::message(format!(
            "{} must be owned by root",
            path.display()
        )));
    }
    let mut perms = meta.permissions();
    perms.set_mode(0o700);
    fs::set_permissions(path, perms)
        .map_err(|e| LoopvaultError::message(format!("chmod {}: {}", path.display(), e)))?;
    Ok(())
}

/// Create a plain directory without the ownership requirements; used for
/// mount points, which the kernel covers once the image is mounted.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        let meta = fs::metadata(path)
            .map_err(|e| LoopvaultError::message(format!("stat {}: {}", path.display(), e)))?;
        if !meta.is_dir() {
            return Err(LoopvaultError::message(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(path)
        .map_err(|e| LoopvaultError::message(format!("create {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_rules() {
        assert!(is_safe_name("nas.example.com"));
        assert!(is_safe_name("host-1_a"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name("."));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name("a/b"));
        assert!(!is_safe_name("a b"));
    }
}
