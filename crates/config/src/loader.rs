use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::ChainballConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chainball.toml",
    "chainball.yaml",
    "chainball.yml",
    "chainball.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ChainballConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    let config = parse_config(&raw, path)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chainball.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chainball/chainball.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChainballConfig::default()` if nothing is found or the file found
/// cannot be loaded.
pub fn discover_and_load() -> ChainballConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return ChainballConfig::default();
    };

    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            ChainballConfig::default()
        },
    }
}

/// Load an explicitly requested config file, or fall back to discovery.
///
/// An explicit path that cannot be loaded is an error, never a silent default.
pub fn load_or_discover(explicit: Option<&Path>) -> anyhow::Result<ChainballConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => Ok(discover_and_load()),
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns `~/.config/chainball/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("chainball"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ChainballConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "chainball.toml",
            r#"
            [scoreboard]
            request_endpoint = "tcp://10.1.1.1:5555"
            call_timeout_ms = 500

            [events]
            reconnect = false
            "#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.scoreboard.request_endpoint, "tcp://10.1.1.1:5555");
        assert_eq!(cfg.scoreboard.call_timeout_ms, 500);
        assert!(!cfg.events.reconnect);
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write(
            &dir,
            "chainball.yaml",
            "scoreboard:\n  event_endpoint: tcp://10.2.2.2:5556\n",
        );
        assert_eq!(
            load_config(&yaml).unwrap().scoreboard.event_endpoint,
            "tcp://10.2.2.2:5556"
        );

        let json = write(
            &dir,
            "chainball.json",
            r#"{"events": {"max_backoff_ms": 1000}}"#,
        );
        assert_eq!(load_config(&json).unwrap().events.max_backoff_ms, 1000);
    }

    #[test]
    fn substitutes_env_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "chainball.toml",
            "[scoreboard]\nrequest_endpoint = \"tcp://${CHAINBALL_UNSET_HOST_XYZ:-127.0.0.9}:5555\"\n",
        );
        assert_eq!(
            load_config(&path).unwrap().scoreboard.request_endpoint,
            "tcp://127.0.0.9:5555"
        );
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "chainball.ini", "x=1");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported config format"));
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "chainball.toml", "[scoreboard]\ncall_timeout_ms = 0\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_or_discover(Some(&missing)).is_err());
    }

    #[test]
    fn find_in_respects_order() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "chainball.json", "{}");
        write(&dir, "chainball.toml", "");
        let found = find_in(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "chainball.toml");
    }
}
