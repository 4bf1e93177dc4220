use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use crate::error::{ImageError, Result};
use crate::mount::inspect::device_for_mountpoint;
use crate::types::{ImageSize, RunMode};
use crate::util::command::run_command;

use crate::backup::freeze::FreezeGuard;

const ZERO_FILL_CHUNK: usize = 1024 * 1024;

/// Allocate, format, and lock down a fresh image file.
pub fn create(path: &Path, size: ImageSize, run_mode: RunMode) -> Result<()> {
    if run_mode.dry_run {
        println!("dry-run: allocate {} ({})", path.display(), size);
    } else {
        allocate(path, size.bytes())?;
    }
    format_ext4(path, run_mode)?;
    if !run_mode.dry_run {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Sparse allocation first; filesystems without sparse-file support get a
/// zero-fill write instead. Only both failing is fatal.
fn allocate(path: &Path, bytes: u64) -> Result<()> {
    match allocate_sparse(path, bytes) {
        Ok(()) => return Ok(()),
        Err(err) => {
            tracing::warn!(
                image = %path.display(),
                "sparse allocation failed ({}); falling back to zero-fill",
                err
            );
            let _ = fs::remove_file(path);
        }
    }
    allocate_zero_fill(path, bytes).map_err(|e| {
        let _ = fs::remove_file(path);
        ImageError::AllocationFailed(format!("{}: {}", path.display(), e)).into()
    })
}

fn allocate_sparse(path: &Path, bytes: u64) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.seek(SeekFrom::Start(bytes - 1))?;
    file.write_all(&[0])?;
    file.sync_all()?;
    Ok(())
}

fn allocate_zero_fill(path: &Path, bytes: u64) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let chunk = vec![0u8; ZERO_FILL_CHUNK];
    let mut remaining = bytes;
    while remaining > 0 {
        let step = remaining.min(ZERO_FILL_CHUNK as u64) as usize;
        file.write_all(&chunk[..step])?;
        remaining -= step as u64;
    }
    file.sync_all()?;
    Ok(())
}

fn format_ext4(path: &Path, run_mode: RunMode) -> Result<()> {
    let mut cmd = Command::new("mkfs.ext4");
    cmd.arg("-F").arg("-q").arg(path);
    let rc = run_command(&mut cmd, run_mode)?;
    if rc != 0 {
        return Err(ImageError::FormatFailed(format!(
            "{} failed with exit code {}",
            path.display(),
            rc
        ))
        .into());
    }
    Ok(())
}

/// Append `add` to the image, then grow the filesystem into the new space.
/// The file is extended under a freeze so live metadata is quiescent; the
/// filesystem grow runs after the thaw. A grow failure leaves the file
/// larger than its filesystem, which is surfaced (not retried) and healed by
/// the next expand because resize2fs always grows to the current file end.
pub fn expand(image: &Path, mountpoint: &Path, add: ImageSize, run_mode: RunMode) -> Result<()> {
    if add.bytes() > 0 {
        if run_mode.dry_run {
            println!("dry-run: extend {} by {}", image.display(), add);
        } else {
            let guard = FreezeGuard::freeze(mountpoint, run_mode);
            extend(image, add.bytes())?;
            drop(guard);
        }
    }
    grow_filesystem(image, mountpoint, run_mode)
}

fn extend(path: &Path, add: u64) -> Result<()> {
    let current = fs::metadata(path)?.len();
    let target = current + add;
    match extend_sparse(path, target) {
        Ok(()) => return Ok(()),
        Err(err) => {
            tracing::warn!(
                image = %path.display(),
                "sparse extend failed ({}); falling back to zero-fill append",
                err
            );
        }
    }
    extend_zero_fill(path, current, target)
        .map_err(|e| ImageError::AllocationFailed(format!("{}: {}", path.display(), e)).into())
}

fn extend_sparse(path: &Path, target: u64) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(target - 1))?;
    file.write_all(&[0])?;
    file.sync_all()?;
    Ok(())
}

fn extend_zero_fill(path: &Path, current: u64, target: u64) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(current))?;
    let chunk = vec![0u8; ZERO_FILL_CHUNK];
    let mut remaining = target - current;
    while remaining > 0 {
        let step = remaining.min(ZERO_FILL_CHUNK as u64) as usize;
        file.write_all(&chunk[..step])?;
        remaining -= step as u64;
    }
    file.sync_all()?;
    Ok(())
}

fn grow_filesystem(image: &Path, mountpoint: &Path, run_mode: RunMode) -> Result<()> {
    match device_for_mountpoint(mountpoint)? {
        Some(device) => {
            // Loop device capacity must be refreshed before the online grow
            // sees the appended space.
            let mut refresh = Command::new("losetup");
            refresh.arg("-c").arg(&device);
            let rc = run_command(&mut refresh, run_mode)?;
            if rc != 0 {
                return Err(ImageError::ResizeFailed(format!(
                    "losetup -c {} failed with exit code {}",
                    device.display(),
                    rc
                ))
                .into());
            }
            let mut resize = Command::new("resize2fs");
            resize.arg(&device);
            let rc = run_command(&mut resize, run_mode)?;
            if rc != 0 {
                return Err(ImageError::ResizeFailed(format!(
                    "resize2fs {} failed with exit code {}",
                    device.display(),
                    rc
                ))
                .into());
            }
        }
        None => {
            // Offline grow; resize2fs insists on a preceding forced fsck.
            let mut fsck = Command::new("e2fsck");
            fsck.arg("-f").arg("-p").arg(image);
            let rc = run_command(&mut fsck, run_mode)?;
            if rc > 1 {
                return Err(ImageError::ResizeFailed(format!(
                    "e2fsck {} failed with exit code {}",
                    image.display(),
                    rc
                ))
                .into());
            }
            let mut resize = Command::new("resize2fs");
            resize.arg(image);
            let rc = run_command(&mut resize, run_mode)?;
            if rc != 0 {
                return Err(ImageError::ResizeFailed(format!(
                    "resize2fs {} failed with exit code {}",
                    image.display(),
                    rc
                ))
                .into());
            }
        }
    }
    Ok(())
}

/// Idempotent: a missing image is not an error.
pub fn delete(path: &Path, run_mode: RunMode) -> Result<()> {
    if run_mode.dry_run {
        println!("dry-run: rm -f {}", path.display());
        return Ok(());
    }
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|meta| meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sparse_allocation_reaches_declared_size() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("host.img");
        allocate(&path, 4 * 1024 * 1024).expect("allocate");
        assert_eq!(file_size(&path), Some(4 * 1024 * 1024));
    }

    #[test]
    fn allocate_refuses_to_clobber() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("host.img");
        fs::write(&path, b"existing").expect("seed");
        assert!(allocate(&path, 1024).is_err());
    }

    #[test]
    fn zero_fill_matches_sparse_size() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("host.img");
        allocate_zero_fill(&path, 3 * 1024 * 1024 + 17).expect("zero fill");
        assert_eq!(file_size(&path), Some(3 * 1024 * 1024 + 17));
    }

    #[test]
    fn extend_is_monotonic() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("host.img");
        allocate(&path, 1024 * 1024).expect("allocate");
        extend(&path, 2 * 1024 * 1024).expect("extend n");
        extend(&path, 3 * 1024 * 1024).expect("extend m");
        assert_eq!(file_size(&path), Some(6 * 1024 * 1024));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("host.img");
        let run = RunMode {
            dry_run: false,
            verbose: false,
            assume_yes: false,
        };
        allocate(&path, 1024).expect("allocate");
        delete(&path, run).expect("delete");
        delete(&path, run).expect("delete again");
        assert!(file_size(&path).is_none());
    }
}
