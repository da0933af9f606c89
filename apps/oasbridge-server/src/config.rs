//! Layered configuration for the standalone server.
//!
//! Sources, later ones winning: built-in defaults, the YAML file passed via
//! `--config`, environment variables prefixed with `OASBRIDGE_` (nested keys
//! separated by `__`, e.g. `OASBRIDGE_SERVER__PORT=9000`).

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub ip: IpAddr,
    pub port: u16,
    /// Forward upstream error bodies into problem documents instead of
    /// scrubbing them. Never enable outside local development.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// One API document to mount at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEntry {
    /// Path to the `OpenAPI` document, relative paths are resolved against
    /// the configuration file's directory.
    pub spec: PathBuf,
    /// Mount prefix override. Defaults to the document's first server URL.
    #[serde(default)]
    pub base_path: Option<String>,
    /// Template arguments substituted into the raw document.
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub apis: Vec<ApiEntry>,
}

impl AppConfig {
    /// Loads the layered configuration.
    ///
    /// # Errors
    /// Returns an error when the YAML file is malformed or a key has the
    /// wrong shape.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }
        let mut config: Self = figment
            .merge(Env::prefixed("OASBRIDGE_").split("__"))
            .extract()
            .context("Failed to load layered configuration")?;

        if let Some(base_dir) = config_path.and_then(Path::parent) {
            config.anchor_spec_paths(base_dir);
        }
        Ok(config)
    }

    /// CLI flags win over every other source.
    pub fn apply_cli_overrides(&mut self, port: Option<u16>) {
        if let Some(port) = port {
            self.server.port = port;
        }
    }

    /// Renders the effective configuration as YAML.
    ///
    /// # Errors
    /// Returns an error when serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to render configuration")
    }

    /// Resolves relative document paths against the config file's directory.
    fn anchor_spec_paths(&mut self, base_dir: &Path) {
        for entry in &mut self.apis {
            if entry.spec.is_relative() {
                entry.spec = base_dir.join(&entry.spec);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.debug);
        assert_eq!(config.logging.level, "info");
        assert!(config.apis.is_empty());
    }

    #[test]
    fn yaml_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 9999\napis:\n  - spec: petstore.yaml\n    base_path: /api/v1"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.apis.len(), 1);
        assert_eq!(config.apis[0].base_path.as_deref(), Some("/api/v1"));
    }

    #[test]
    fn relative_spec_paths_follow_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("server.yaml");
        std::fs::write(&config_path, "apis:\n  - spec: docs/petstore.yaml\n").unwrap();

        let config = AppConfig::load(Some(&config_path)).unwrap();
        assert_eq!(config.apis[0].spec, dir.path().join("docs/petstore.yaml"));
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(Some(4321));
        assert_eq!(config.server.port, 4321);

        config.apply_cli_overrides(None);
        assert_eq!(config.server.port, 4321);
    }
}
