//! Server configuration for the `gitway` binary.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::handlers::archive;
use crate::observability::LogFormat;
use crate::GitHttp;

/// Configuration loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("repository root {0} is not a directory")]
    MissingRoot(PathBuf),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address.
    pub listen: SocketAddr,
    /// Directory holding the served repositories. Empty means the current
    /// directory.
    pub root: PathBuf,
    /// Path of the git executable.
    pub git_bin: PathBuf,
    /// Serve `git-upload-pack` (fetch, clone).
    pub upload_pack: bool,
    /// Serve `git-receive-pack` (push).
    pub receive_pack: bool,
    /// Register the dumb-protocol file routes.
    pub dumb_proto: bool,
    /// Register the `archive/<tree>.(zip|tar)` download route.
    pub archive: bool,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            root: PathBuf::new(),
            git_bin: PathBuf::from("git"),
            upload_pack: true,
            receive_pack: true,
            dumb_proto: true,
            archive: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Loads a YAML configuration file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks that the repository root exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.as_os_str().is_empty() && !self.root.is_dir() {
            return Err(ConfigError::MissingRoot(self.root.clone()));
        }
        Ok(())
    }

    /// Builds the engine described by this configuration.
    pub fn build_engine(&self) -> std::io::Result<GitHttp> {
        let mut builder = GitHttp::builder(&self.root, &self.git_bin);
        if !self.upload_pack {
            builder = builder.disable_upload_pack();
        }
        if !self.receive_pack {
            builder = builder.disable_receive_pack();
        }
        if !self.dumb_proto {
            builder = builder.without_dumb_proto();
        }
        if self.archive {
            builder = builder.route(archive::route());
        }
        builder.build()
    }
}
