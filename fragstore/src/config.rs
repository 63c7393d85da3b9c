//! On-disk configuration (§7): a TOML document describing which backend
//! and catalog a session should open, plus default pipeline/assembler
//! tuning. Loaded from `--config`, `$FRAGSTORE_CONFIG`, or the default
//! XDG path, in that order, by the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fragstore_core::codec::{EncapsulationSpec, Layer};
use fragstore_core::{Compression, Wrapper};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no home directory available to resolve the default config path")]
    NoHomeDir,
}

/// Which backend a session should open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Memory,
    FileSystem { root: PathBuf },
    Smb { share: String },
    StubCloud { endpoint: String },
}

impl Default for BackendConfig {
    fn default() -> BackendConfig {
        BackendConfig::FileSystem {
            root: PathBuf::from("./fragstore-data"),
        }
    }
}

/// Which catalog a session should open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogConfig {
    Memory,
    Sled { path: PathBuf },
}

impl Default for CatalogConfig {
    fn default() -> CatalogConfig {
        CatalogConfig::Sled {
            path: PathBuf::from("./fragstore-catalog"),
        }
    }
}

/// Top-level configuration document. Every field has a sensible default,
/// so an absent config file is equivalent to one containing only
/// `[backend] kind = "file_system"` / `[catalog] kind = "sled"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FragstoreConfig {
    pub backend: BackendConfig,
    pub catalog: CatalogConfig,
    /// Bytes a session's resource cache is allowed to hold.
    pub resource_cache_bytes: u64,
    pub fragment_size: u64,
    pub target_resource_size: u64,
    pub max_fragments_per_resource: usize,
    pub first_layer_spec: EncapsulationSpec,
    pub second_layer_spec: EncapsulationSpec,
    pub retry_attempts: u32,
}

impl Default for FragstoreConfig {
    fn default() -> FragstoreConfig {
        FragstoreConfig {
            backend: BackendConfig::default(),
            catalog: CatalogConfig::default(),
            resource_cache_bytes: 64 * 1024 * 1024,
            fragment_size: 64 * 1024,
            target_resource_size: 4 * 1024 * 1024,
            max_fragments_per_resource: 256,
            first_layer_spec: vec![Layer::Compress(Compression::Zstd { level: 3 })],
            second_layer_spec: vec![Layer::Wrap(Wrapper::Identity)],
            retry_attempts: 3,
        }
    }
}

impl FragstoreConfig {
    pub fn from_file(path: &Path) -> Result<FragstoreConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves the config path in the order the CLI documents it: an
    /// explicit path, then `$FRAGSTORE_CONFIG`, then the XDG default,
    /// falling back to built-in defaults if nothing is found.
    pub fn load(explicit_path: Option<&Path>) -> Result<FragstoreConfig, ConfigError> {
        if let Some(path) = explicit_path {
            return FragstoreConfig::from_file(path);
        }
        if let Ok(env_path) = std::env::var("FRAGSTORE_CONFIG") {
            return FragstoreConfig::from_file(Path::new(&env_path));
        }
        let default_path = default_config_path()?;
        if default_path.exists() {
            FragstoreConfig::from_file(&default_path)
        } else {
            Ok(FragstoreConfig::default())
        }
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".config").join("fragstore").join("config.toml"))
}
