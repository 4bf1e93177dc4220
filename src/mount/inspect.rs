use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LoopvaultError, Result};

fn read_mounts() -> Result<String> {
    fs::read_to_string("/proc/self/mounts")
        .map_err(|e| LoopvaultError::message(format!("read /proc/self/mounts: {}", e)))
}

/// Live-table truth: the image may have been unmounted behind our back, so
/// status is always re-derived from here rather than from cached state.
pub fn mountpoint_is_mounted(mountpoint: &Path) -> Result<bool> {
    Ok(find_mountpoint(&read_mounts()?, mountpoint).is_some())
}

pub fn device_for_mountpoint(mountpoint: &Path) -> Result<Option<PathBuf>> {
    Ok(find_mountpoint(&read_mounts()?, mountpoint))
}

fn find_mountpoint(contents: &str, mountpoint: &Path) -> Option<PathBuf> {
    for line in contents.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }
        if Path::new(&unescape_mount_field(fields[1])) == mountpoint {
            return Some(PathBuf::from(fields[0]));
        }
    }
    None
}

/// /proc/self/mounts octal-escapes whitespace in paths (\040 etc).
fn unescape_mount_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let digits: String = chars.clone().take(3).collect();
        if digits.len() == 3 {
            if let Ok(value) = u8::from_str_radix(&digits, 8) {
                out.push(value as char);
                chars.nth(2);
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUNTS: &str = "\
/dev/sda1 / ext4 rw,relatime 0 0
/dev/loop3 /mnt/rnas/example.com ext4 rw,relatime 0 0
tmpfs /run tmpfs rw,nosuid,nodev 0 0
/dev/loop4 /mnt/with\\040space ext4 rw 0 0
";

    #[test]
    fn finds_loop_device_for_mountpoint() {
        let device = find_mountpoint(MOUNTS, Path::new("/mnt/rnas/example.com"));
        assert_eq!(device, Some(PathBuf::from("/dev/loop3")));
    }

    #[test]
    fn missing_mountpoint_is_none() {
        assert!(find_mountpoint(MOUNTS, Path::new("/mnt/rnas/other.host")).is_none());
    }

    #[test]
    fn unescapes_octal_whitespace() {
        let device = find_mountpoint(MOUNTS, Path::new("/mnt/with space"));
        assert_eq!(device, Some(PathBuf::from("/dev/loop4")));
    }
}
