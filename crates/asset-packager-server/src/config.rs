use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory whose files are indexed and packaged.
    pub asset_dir: PathBuf,
    pub bind_addr: String,
    /// Prefix applied to every entry name inside served packages.
    pub package_prefix: String,
    /// Allow cross-origin requests from any origin.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::new(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            package_prefix: String::new(),
            cors: true,
        }
    }
}

impl ServerConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            ServerError::Config(format!("failed to read {}: {error}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|error| {
            ServerError::Config(format!("failed to parse {}: {error}", path.display()))
        })
    }

    /// Applies command-line overrides on top of the loaded values.
    pub fn with_overrides(
        mut self,
        asset_dir: Option<PathBuf>,
        bind_addr: Option<String>,
        package_prefix: Option<String>,
    ) -> Self {
        if let Some(asset_dir) = asset_dir {
            self.asset_dir = asset_dir;
        }
        if let Some(bind_addr) = bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(package_prefix) = package_prefix {
            self.package_prefix = package_prefix;
        }
        self
    }

    /// Checks the config and returns the parsed bind address.
    pub fn validate(&self) -> ServerResult<SocketAddr> {
        if self.asset_dir.as_os_str().is_empty() {
            return Err(ServerError::Config("asset_dir is required".to_string()));
        }
        if self
            .package_prefix
            .split('/')
            .any(|segment| segment == "..")
        {
            return Err(ServerError::Config(format!(
                "package_prefix must not contain '..': {}",
                self.package_prefix
            )));
        }
        self.bind_addr.parse().map_err(|error| {
            ServerError::Config(format!("invalid bind_addr {}: {error}", self.bind_addr))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("packager.json");
        std::fs::write(&path, r#"{ "asset_dir": "/srv/assets" }"#).expect("write config");

        let config = ServerConfig::load(&path).expect("load");
        assert_eq!(config.asset_dir, PathBuf::from("/srv/assets"));
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.package_prefix, "");
        assert!(config.cors);
    }

    #[test]
    fn load_reports_malformed_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("packager.json");
        std::fs::write(&path, "{ not json").expect("write config");

        let error = ServerConfig::load(&path).expect_err("malformed config");
        match error {
            ServerError::Config(message) => {
                assert!(message.contains("failed to parse"), "unexpected message: {message}");
            }
            other => panic!("expected config error, got: {other:?}"),
        }
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let config = ServerConfig {
            asset_dir: PathBuf::from("/from/file"),
            package_prefix: "file".to_string(),
            ..ServerConfig::default()
        }
        .with_overrides(None, Some("0.0.0.0:9000".to_string()), None);

        assert_eq!(config.asset_dir, PathBuf::from("/from/file"));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.package_prefix, "file");
    }

    #[test]
    fn validate_requires_asset_dir_and_parsable_address() {
        assert!(ServerConfig::default().validate().is_err());

        let bad_addr = ServerConfig {
            asset_dir: PathBuf::from("/srv/assets"),
            bind_addr: "localhost".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad_addr.validate().is_err());

        let bad_prefix = ServerConfig {
            asset_dir: PathBuf::from("/srv/assets"),
            package_prefix: "../up".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad_prefix.validate().is_err());

        let ok = ServerConfig {
            asset_dir: PathBuf::from("/srv/assets"),
            ..ServerConfig::default()
        };
        assert_eq!(ok.validate().expect("valid").port(), 8080);
    }
}
