//! Configuration loading and data directory resolution
//!
//! Settings resolve in priority order: command-line argument, environment
//! variable (handled by the clap layer), `cropwatch.toml`, built-in
//! default. The config file is optional; a missing file at the default
//! location is not an error, but an explicitly named file must exist.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Default TCP port for the outbreak engine
pub const DEFAULT_PORT: u16 = 5830;

/// Optional `cropwatch.toml` contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// HTTP listen port
    pub port: Option<u16>,
    /// Data directory holding the engine database
    pub root_dir: Option<String>,
    /// Database file, absolute or relative to the data directory
    pub database: Option<String>,
}

/// Parse a TOML config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&raw)
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
}

/// Load the config file named on the command line, or probe the default
/// location. Absence of the default file yields an empty config.
pub fn load_file_config_opt(cli_path: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = cli_path {
        return load_file_config(path);
    }
    let default_path = default_config_path();
    if default_path.exists() {
        debug!("loading config file {}", default_path.display());
        load_file_config(&default_path)
    } else {
        Ok(FileConfig::default())
    }
}

/// Default config file location: `<os config dir>/cropwatch/cropwatch.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("cropwatch"))
        .unwrap_or_else(|| PathBuf::from(".cropwatch"))
        .join("cropwatch.toml")
}

/// Resolve the data directory from CLI argument, config file, or OS default.
pub fn resolve_root_dir(cli_arg: Option<&Path>, file: &FileConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = &file.root_dir {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    default_root_dir()
}

/// Resolve the listen port from CLI argument, config file, or default.
pub fn resolve_port(cli_arg: Option<u16>, file: &FileConfig) -> u16 {
    cli_arg.or(file.port).unwrap_or(DEFAULT_PORT)
}

/// OS default data directory: `<os data dir>/cropwatch`, falling back to
/// `~/.cropwatch`, then `./cropwatch-data` for stripped-down environments.
pub fn default_root_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cropwatch"))
        .or_else(|| dirs::home_dir().map(|d| d.join(".cropwatch")))
        .unwrap_or_else(|| PathBuf::from("./cropwatch-data"))
}

/// Database file location inside the data directory, unless the config
/// file points somewhere absolute.
pub fn database_path(root_dir: &Path, file: &FileConfig) -> PathBuf {
    match &file.database {
        Some(name) => {
            let path = PathBuf::from(name);
            if path.is_absolute() {
                path
            } else {
                root_dir.join(path)
            }
        }
        None => root_dir.join("cropwatch.db"),
    }
}
