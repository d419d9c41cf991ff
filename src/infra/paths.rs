// src/infra/paths.rs — Config and data path management
//
// All paths respect the DEVFLOW_HOME environment variable for isolation.
// When unset, config lives in ~/.devflow/ and data in XDG_DATA_HOME/devflow.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the DEVFLOW_HOME override, if set.
fn devflow_home() -> Option<PathBuf> {
    std::env::var_os("DEVFLOW_HOME").map(PathBuf::from)
}

/// Configuration directory: $DEVFLOW_HOME/ or ~/.devflow/
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = devflow_home() {
        return Some(home);
    }
    BaseDirs::new().map(|b| b.home_dir().join(".devflow"))
}

/// Data directory: $DEVFLOW_HOME/data/ or the platform data dir.
pub fn data_dir() -> Option<PathBuf> {
    if let Some(home) = devflow_home() {
        return Some(home.join("data"));
    }
    ProjectDirs::from("", "", "devflow").map(|p| p.data_local_dir().to_path_buf())
}

/// Config file path
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Default dataset catalog location used by `devflow datasets`.
pub fn dataset_catalog_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("datasets.jsonl"))
}
