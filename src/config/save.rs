use std::path::Path;

use crate::config::model::Config;
use crate::error::{LoopvaultError, Result};
use crate::util::fsio::write_atomic;

/// Commit a config record atomically; partial writes must never be
/// observable at the fixed path.
pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let data = serde_yaml::to_string(cfg)
        .map_err(|e| LoopvaultError::message(format!("encode config: {}", e)))?;
    write_atomic(path, data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load::{load_config, read_config};
    use tempfile::TempDir;

    #[test]
    fn save_then_load_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("loopvault.yaml");
        let cfg = Config {
            remote_host: "nas.example.com".to_string(),
            ..Config::default()
        };
        save_config(&path, &cfg).expect("save");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded.remote_host, "nas.example.com");
        assert_eq!(loaded.remote_port, 22);
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("loopvault.yaml");
        std::fs::write(&path, "remoteHost: old.example.com\n").expect("seed");
        let cfg = Config {
            remote_host: "new.example.com".to_string(),
            ..Config::default()
        };
        save_config(&path, &cfg).expect("save");
        let loaded = read_config(&path).expect("read");
        assert_eq!(loaded.remote_host, "new.example.com");
    }
}
