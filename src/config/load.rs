use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::model::{derive_paths, Config, RuntimeConfig};
use crate::error::{ConfigError, LoopvaultError, Result};
use crate::types::{CronSchedule, ImageSize};
use crate::util::paths::is_safe_name;

pub const CONFIG_FILE: &str = "/etc/loopvault.yaml";

/// Read the config file, falling back to built-in defaults when it does not
/// exist yet (first install). A present-but-unreadable file is an error.
pub fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let mut contents = String::new();
    File::open(path)
        .map_err(LoopvaultError::Io)?
        .read_to_string(&mut contents)
        .map_err(LoopvaultError::Io)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    serde_yaml::from_str(contents)
        .map_err(|e| ConfigError::Parse(e.to_string()).into())
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let cfg = read_config(path)?;
    parse_runtime(&cfg)
}

/// Every check runs independently so the operator sees all violations at
/// once, not just the first.
pub fn validate(cfg: &Config) -> Vec<String> {
    let mut violations = Vec::new();
    if let Err(e) = cfg.image_size.parse::<ImageSize>() {
        violations.push(format!("imageSize: {}", e));
    }
    if let Err(e) = cfg.schedule.parse::<CronSchedule>() {
        violations.push(format!("schedule: {}", e));
    }
    if cfg.remote_port == 0 {
        violations.push("remotePort: must be in 1..=65535".to_string());
    }
    if cfg.remote_host.trim().is_empty() {
        violations.push("remoteHost: must be non-empty".to_string());
    } else if !is_safe_name(cfg.remote_host.trim()) {
        violations.push(format!(
            "remoteHost: {:?} must use only letters, digits, '.', '-', '_'",
            cfg.remote_host
        ));
    }
    if cfg.remote_user.trim().is_empty() {
        violations.push("remoteUser: must be non-empty".to_string());
    }
    for (key, value) in [
        ("baseDir", &cfg.base_dir),
        ("remotePath", &cfg.remote_path),
        ("mountBase", &cfg.mount_base),
        ("sshKey", &cfg.ssh_key),
    ] {
        if !Path::new(value).is_absolute() {
            violations.push(format!("{}: {:?} must be an absolute path", key, value));
        }
    }
    violations
}

pub fn parse_runtime(cfg: &Config) -> Result<RuntimeConfig> {
    let violations = validate(cfg);
    if !violations.is_empty() {
        return Err(ConfigError::invalid(violations).into());
    }

    // Both parses were checked by validate(); propagate anyway.
    let image_size = cfg
        .image_size
        .parse::<ImageSize>()
        .map_err(|e| ConfigError::invalid(vec![format!("imageSize: {}", e)]))?;
    let schedule = cfg
        .schedule
        .parse::<CronSchedule>()
        .map_err(|e| ConfigError::invalid(vec![format!("schedule: {}", e)]))?;

    let base_dir = PathBuf::from(&cfg.base_dir);
    let mount_base = PathBuf::from(&cfg.mount_base);
    let host = cfg.remote_host.trim().to_string();
    let derived = derive_paths(&base_dir, &mount_base, &host);

    Ok(RuntimeConfig {
        image_size,
        schedule,
        remote_host: host,
        remote_port: cfg.remote_port,
        remote_user: cfg.remote_user.trim().to_string(),
        remote_path: PathBuf::from(&cfg.remote_path),
        ssh_key: PathBuf::from(&cfg.ssh_key),
        image_path: derived.image_path,
        snapshot_path: derived.snapshot_path,
        mount_point: derived.mount_point,
        init_marker: derived.init_marker,
        disable_marker: derived.disable_marker,
        base_dir,
        mount_base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_config() -> Config {
        Config {
            remote_host: "example.com".to_string(),
            remote_port: 2222,
            remote_path: "/receive".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn load_config_from_file() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let yaml = r#"
baseDir: /var/rnas
imageSize: 10G
remoteHost: example.com
remotePort: 2222
remotePath: /receive
schedule: "0 3 * * *"
"#;
        file.write_all(yaml.as_bytes()).expect("write");
        let cfg = load_config(file.path()).expect("load");
        assert_eq!(cfg.remote_host, "example.com");
        assert_eq!(cfg.remote_port, 2222);
        assert_eq!(cfg.image_size.bytes(), 10 * 1024 * 1024 * 1024);
    }

    #[test]
    fn derived_paths_from_base_dir_and_host() {
        let cfg = parse_runtime(&sample_config()).expect("runtime");
        assert_eq!(cfg.image_path, PathBuf::from("/var/rnas/example.com.img"));
        assert_eq!(cfg.snapshot_path, PathBuf::from("/var/rnas/example.com.img.snap"));
        assert_eq!(cfg.mount_point, PathBuf::from("/mnt/rnas/example.com"));
        assert_eq!(cfg.init_marker, PathBuf::from("/var/rnas/.initialized"));
        assert_eq!(cfg.disable_marker, PathBuf::from("/var/rnas/.backup-disabled"));
        assert_eq!(cfg.remote_target(), "root@example.com:/receive/");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = read_config(Path::new("/nonexistent/loopvault.yaml")).expect("defaults");
        assert_eq!(cfg.base_dir, "/var/rnas");
        assert_eq!(cfg.remote_port, 22);
        // Defaults alone are not runnable: remoteHost is empty.
        assert!(parse_runtime(&cfg).is_err());
    }

    #[test]
    fn validation_aggregates_violations() {
        let cfg = Config {
            base_dir: "relative/dir".to_string(),
            image_size: "10T".to_string(),
            remote_host: String::new(),
            remote_port: 0,
            remote_path: "receive".to_string(),
            schedule: "0 3 * *".to_string(),
            ..Config::default()
        };
        let violations = validate(&cfg);
        assert_eq!(violations.len(), 6);
        let err = parse_runtime(&cfg).expect_err("invalid");
        let text = err.to_string();
        assert!(text.contains("6 violation"), "got: {}", text);
        assert!(text.contains("imageSize"));
        assert!(text.contains("remotePort"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("remoteHost: example.com\nimagSize: 10G\n").expect_err("typo");
        assert!(err.to_string().contains("parse config"));
    }
}
