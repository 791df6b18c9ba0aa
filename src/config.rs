//! Configuration loading.
//!
//! Settings come from an optional YAML file named by `KEEL_CONFIG`, with the
//! listen address overridable through `LISTEN`. Every field has a default, so
//! running without a file works.
//!
//! ```yaml
//! server:
//!   listen_addr: "0.0.0.0:8080"
//! http:
//!   maximum_body_size: 32      # Mb
//!   public_folder: "./public"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::http::protocol::{HttpSettingsBuilder, DEFAULT_MAX_BODY_MB};
use crate::http::static_files::PublicFolder;
use crate::http::HttpSettings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Largest accepted request body, in Mb.
    pub maximum_body_size: usize,
    /// Directory served when the application does not handle a request.
    pub public_folder: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            maximum_body_size: DEFAULT_MAX_BODY_MB,
            public_folder: None,
        }
    }
}

impl Config {
    /// Loads `KEEL_CONFIG` if set, then applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os("KEEL_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = addr;
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

impl HttpConfig {
    /// Settings builder carrying the configured limits and public folder.
    ///
    /// The caller adds the `on_request` callback, if any, and builds.
    pub fn settings(&self) -> Result<HttpSettingsBuilder, ConfigError> {
        let mut builder = HttpSettings::builder().maximum_body_size(self.maximum_body_size);
        if let Some(folder) = &self.public_folder {
            builder = builder.public_folder(PublicFolder::new(folder)?);
        }
        Ok(builder)
    }
}
