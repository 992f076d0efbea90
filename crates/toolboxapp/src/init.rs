//! # Data Directory and Startup
//!
//! Everything the toolbox persists lives under one data directory:
//!
//! 1. `--data DIR` on the command line (`data_override`), else
//! 2. the `TOOLBOX_DATA` environment variable, else
//! 3. the OS data directory from the `directories` crate.
//!
//! [`initialize`] resolves that directory, loads `toolbox.toml` from it, and
//! builds a filesystem-backed [`Toolbox`]. It does not load preferences; the
//! caller decides when to call [`Toolbox::start`].

use crate::api::Toolbox;
use crate::config::ToolboxConfig;
use crate::error::{Result, ToolboxError};
use crate::store::fs_backend::{FsBackend, FsFlatStore};
use confique::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "TOOLBOX_DATA";
pub const CONFIG_FILE_NAME: &str = "toolbox.toml";
pub const FLAT_FILE_NAME: &str = "flat.json";
pub const STRUCTURED_DIR_NAME: &str = "structured";

pub struct ToolboxContext {
    pub toolbox: Toolbox<FsBackend, FsFlatStore>,
    pub config: ToolboxConfig,
    pub data_dir: PathBuf,
}

pub fn resolve_data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(path));
    }
    ProjectDirs::from("com", "toolbox", "toolbox")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            ToolboxError::StorageUnavailable("could not determine a data directory".to_string())
        })
}

/// Environment first, then `<data_dir>/toolbox.toml`, then defaults.
pub fn load_config(data_dir: &Path) -> Result<ToolboxConfig> {
    ToolboxConfig::builder()
        .env()
        .file(data_dir.join(CONFIG_FILE_NAME))
        .load()
        .map_err(|e| ToolboxError::Config(e.to_string()))
}

pub fn initialize(data_override: Option<PathBuf>) -> Result<ToolboxContext> {
    let data_dir = resolve_data_dir(data_override)?;
    let config = load_config(&data_dir)?;

    let backend = FsBackend::new(data_dir.join(STRUCTURED_DIR_NAME))
        .with_quota(config.structured_quota_bytes);
    let flat = FsFlatStore::new(data_dir.join(FLAT_FILE_NAME));
    let toolbox = Toolbox::new(backend, flat, config.clone());

    Ok(ToolboxContext {
        toolbox,
        config,
        data_dir,
    })
}
