//! Server configuration.
//!
//! The daemon reads a YAML (or JSON) document; every key is optional:
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 8080
//! model_file: model.yaml
//! interfaces_file: interfaces.yaml
//! population_file: population.yaml
//! absolute_path: /srv/app
//! upload_path: uploads
//! production_env: false
//! default_roles: []
//! ```
//!
//! Relative file paths resolve against `absolute_path`. Command-line flags override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::model::load_document;

/// Configuration of the `trellisd` server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind the HTTP server.
    pub host: String,
    /// Port to bind the HTTP server.
    pub port: u16,
    /// Concepts, relations and views.
    pub model_file: PathBuf,
    /// Interface definitions.
    pub interfaces_file: PathBuf,
    /// Atoms and tuples loaded at startup.
    pub population_file: Option<PathBuf>,
    /// Application root.
    pub absolute_path: PathBuf,
    /// Upload directory relative to `absolute_path`; recorded in `filePath` tuples.
    pub upload_path: String,
    /// Hides the concept listing.
    pub production_env: bool,
    /// Active roles for requests that name none.
    pub default_roles: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            model_file: PathBuf::from("model.yaml"),
            interfaces_file: PathBuf::from("interfaces.yaml"),
            population_file: None,
            absolute_path: PathBuf::from("."),
            upload_path: "uploads".to_string(),
            production_env: false,
            default_roles: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads a configuration document.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        load_document(path)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ModelError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves `path` against the application root unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.absolute_path.join(path)
        }
    }

    /// Where uploaded files are stored.
    pub fn upload_dir(&self) -> PathBuf {
        self.absolute_path.join(&self.upload_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.yaml");
        std::fs::write(&path, "port: 9000\nproduction_env: true\ndefault_roles: [Reader]\n").unwrap();
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.production_env);
        assert_eq!(config.default_roles, vec!["Reader"]);
        assert_eq!(config.upload_path, "uploads");
    }

    #[test]
    fn overrides_win_over_file() {
        let config = ServerConfig::default().with_overrides(Some("0.0.0.0".to_string()), None);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        let config = config.with_overrides(None, Some(1234));
        assert_eq!(config.bind_address(), "0.0.0.0:1234");
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let config = ServerConfig {
            absolute_path: PathBuf::from("/srv/app"),
            ..ServerConfig::default()
        };
        assert_eq!(
            config.resolve(Path::new("model.yaml")),
            PathBuf::from("/srv/app/model.yaml")
        );
        assert_eq!(config.resolve(Path::new("/etc/m.yaml")), PathBuf::from("/etc/m.yaml"));
        assert_eq!(config.upload_dir(), PathBuf::from("/srv/app/uploads"));
        assert!(ServerConfig::load_or_default(None).is_ok());
    }
}
