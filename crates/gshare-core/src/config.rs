//! gshare.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GshareConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deepest hierarchy level accepted while loading shares. Guards
    /// against parent cycles in the store.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Seconds between background distribution refreshes.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_max_depth() -> usize {
    32
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/gshare/gshare.redb")
}

fn default_port() -> u16 {
    8480
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl EngineConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl GshareConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GshareConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: GshareConfig = toml::from_str("").unwrap();
        assert_eq!(config, GshareConfig::default());
        assert_eq!(config.engine.max_depth, 32);
        assert_eq!(config.engine.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.api.port, 8480);
    }

    #[test]
    fn test_parse_partial() {
        let toml_str = r#"
[engine]
refresh_interval_secs = 15

[store]
path = "/tmp/gshare.redb"
"#;
        let config: GshareConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.refresh_interval_secs, 15);
        assert_eq!(config.engine.max_depth, 32);
        assert_eq!(config.store.path, PathBuf::from("/tmp/gshare.redb"));
        assert_eq!(config.api.port, 8480);
    }

    #[test]
    fn test_from_file_and_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nport = 9000").unwrap();
        let config = GshareConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.port, 9000);

        let rendered = config.to_toml_string().unwrap();
        let reparsed: GshareConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(GshareConfig::from_file(Path::new("/nonexistent/gshare.toml")).is_err());
    }
}
