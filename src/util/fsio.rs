use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{LoopvaultError, Result};

/// Replace a file through a same-directory temp file and rename, so a crash
/// mid-write never leaves a partially written record behind.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        LoopvaultError::message(format!("{} has no parent directory", path.display()))
    })?;
    let mut file = NamedTempFile::new_in(dir)
        .map_err(|e| LoopvaultError::message(format!("temp file in {}: {}", dir.display(), e)))?;
    file.write_all(data)
        .map_err(|e| LoopvaultError::message(format!("write {}: {}", path.display(), e)))?;
    file.persist(path)
        .map_err(|e| LoopvaultError::message(format!("replace {}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replaces_existing_content() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("record");
        std::fs::write(&path, b"old").expect("seed");
        write_atomic(&path, b"new").expect("write");
        assert_eq!(std::fs::read(&path).expect("read"), b"new");
    }

    #[test]
    fn creates_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("record");
        write_atomic(&path, b"data").expect("write");
        assert_eq!(std::fs::read(&path).expect("read"), b"data");
    }
}
