//! Runtime configuration for the `dotdb` binary.
//!
//! Defaults can be overridden from a JSON file, then by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::embed::{DEFAULT_TOP_K, MAX_TOP_K};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding one `<store_name>.dotdb` file per store.
    pub data_dir: PathBuf,
    pub store_name: String,
    pub dimension: usize,
    pub bind: String,
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("dotdb-data"),
            store_name: "dotdb-demo".to_string(),
            // bge-small-en-v1.5 output size
            dimension: 384,
            bind: "0.0.0.0:7878".to_string(),
            default_top_k: DEFAULT_TOP_K,
            max_top_k: MAX_TOP_K,
        }
    }
}

impl Config {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Config, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Fail to read config '{}': {}", path.display(), e))?;

        serde_json::from_str(&text)
            .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))
    }
}
