use std::fs;
use std::path::Path;

use crate::error::{LoopvaultError, Result};
use crate::util::fsio::write_atomic;
use crate::types::RunMode;

pub const FSTAB: &str = "/etc/fstab";

pub fn render_entry(image: &Path, mountpoint: &Path) -> String {
    format!(
        "{} {} ext4 loop,defaults 0 0",
        image.display(),
        mountpoint.display()
    )
}

pub fn has_entry(fstab: &Path, mountpoint: &Path) -> Result<bool> {
    let contents = read_fstab(fstab)?;
    Ok(find_mountpoint_line(&contents, mountpoint).is_some())
}

/// Append the mount entry unless one for the mountpoint already exists.
pub fn ensure_entry(
    fstab: &Path,
    image: &Path,
    mountpoint: &Path,
    run_mode: RunMode,
) -> Result<()> {
    let contents = read_fstab(fstab)?;
    if find_mountpoint_line(&contents, mountpoint).is_some() {
        return Ok(());
    }
    let entry = render_entry(image, mountpoint);
    if run_mode.dry_run {
        println!("dry-run: append to {}: {}", fstab.display(), entry);
        return Ok(());
    }
    let mut updated = contents;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&entry);
    updated.push('\n');
    write_atomic(fstab, updated.as_bytes())
}

/// Drop any entry for the mountpoint; a no-op when none exists.
pub fn remove_entry(fstab: &Path, mountpoint: &Path, run_mode: RunMode) -> Result<()> {
    let contents = read_fstab(fstab)?;
    if find_mountpoint_line(&contents, mountpoint).is_none() {
        return Ok(());
    }
    if run_mode.dry_run {
        println!(
            "dry-run: remove {} entry from {}",
            mountpoint.display(),
            fstab.display()
        );
        return Ok(());
    }
    let kept: Vec<&str> = contents
        .lines()
        .filter(|line| !line_matches_mountpoint(line, mountpoint))
        .collect();
    let mut updated = kept.join("\n");
    if !updated.is_empty() {
        updated.push('\n');
    }
    write_atomic(fstab, updated.as_bytes())
}

fn read_fstab(fstab: &Path) -> Result<String> {
    fs::read_to_string(fstab)
        .map_err(|e| LoopvaultError::message(format!("read {}: {}", fstab.display(), e)))
}

fn find_mountpoint_line<'a>(contents: &'a str, mountpoint: &Path) -> Option<&'a str> {
    contents
        .lines()
        .find(|line| line_matches_mountpoint(line, mountpoint))
}

fn line_matches_mountpoint(line: &str, mountpoint: &Path) -> bool {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return false;
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    fields.len() >= 2 && Path::new(fields[1]) == mountpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RUN: RunMode = RunMode {
        dry_run: false,
        verbose: false,
        assume_yes: false,
    };

    fn seed_fstab(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("fstab");
        fs::write(
            &path,
            "# /etc/fstab\nUUID=abcd / ext4 errors=remount-ro 0 1\n",
        )
        .expect("seed");
        path
    }

    #[test]
    fn ensure_entry_appends_once() {
        let dir = TempDir::new().expect("tempdir");
        let fstab = seed_fstab(&dir);
        let image = Path::new("/var/rnas/example.com.img");
        let mountpoint = Path::new("/mnt/rnas/example.com");

        ensure_entry(&fstab, image, mountpoint, RUN).expect("ensure");
        assert!(has_entry(&fstab, mountpoint).expect("has"));
        ensure_entry(&fstab, image, mountpoint, RUN).expect("ensure again");

        let contents = fs::read_to_string(&fstab).expect("read");
        let hits = contents
            .lines()
            .filter(|l| l.contains("/mnt/rnas/example.com"))
            .count();
        assert_eq!(hits, 1);
        assert!(contents.contains("loop,defaults"));
    }

    #[test]
    fn remove_entry_keeps_other_lines() {
        let dir = TempDir::new().expect("tempdir");
        let fstab = seed_fstab(&dir);
        let image = Path::new("/var/rnas/example.com.img");
        let mountpoint = Path::new("/mnt/rnas/example.com");

        ensure_entry(&fstab, image, mountpoint, RUN).expect("ensure");
        remove_entry(&fstab, mountpoint, RUN).expect("remove");
        remove_entry(&fstab, mountpoint, RUN).expect("remove is idempotent");

        let contents = fs::read_to_string(&fstab).expect("read");
        assert!(!has_entry(&fstab, mountpoint).expect("has"));
        assert!(contents.contains("UUID=abcd"));
        assert!(contents.starts_with("# /etc/fstab"));
    }

    #[test]
    fn comments_do_not_match() {
        let dir = TempDir::new().expect("tempdir");
        let fstab = dir.path().join("fstab");
        fs::write(&fstab, "# /var/x.img /mnt/rnas/example.com ext4 loop 0 0\n").expect("seed");
        assert!(!has_entry(&fstab, Path::new("/mnt/rnas/example.com")).expect("has"));
    }
}
