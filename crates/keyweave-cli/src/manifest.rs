//! Manifest loading.
//!
//! A manifest is a JSON file listing component groups plus an optional
//! `config` object for the key manager:
//!
//! ```json
//! {
//!   "config": { "id_prefix": "g" },
//!   "groups": [[{ "name": "mover", "speed": 2 }, { "name": "renderer" }]]
//! }
//! ```

use keyweave_keys::{KeyError, KeyManager, ManagerConfig, Named};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Group id prefix used when the manifest does not set one.
const DEFAULT_ID_PREFIX: &str = "g";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Keys(#[from] KeyError),
}

/// A named component with free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,

    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl Named for Component {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub config: ManagerConfig,

    #[serde(default)]
    pub groups: Vec<Vec<Component>>,
}

impl Manifest {
    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds a key manager holding every group, in file order.
    ///
    /// Group ids are sequential so that the same manifest always yields the
    /// same ids.
    pub fn into_manager(self) -> Result<KeyManager<Component>, ManifestError> {
        let mut config = self.config;
        config
            .id_prefix
            .get_or_insert_with(|| DEFAULT_ID_PREFIX.to_string());

        let mut manager = KeyManager::from_config(config);
        let group_count = self.groups.len();
        for group in self.groups {
            manager.add_group(group)?;
        }
        debug!(
            "Loaded {} groups ({} distinct components)",
            group_count,
            manager.len()
        );
        Ok(manager)
    }
}

/// Loads a manifest file straight into a key manager.
pub fn load_manager(path: &Path) -> Result<KeyManager<Component>, ManifestError> {
    Manifest::load(path)?.into_manager()
}
