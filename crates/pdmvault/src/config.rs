//! # Configuration
//!
//! Vault configuration is loaded with [`confique`] from TOML files layered under
//! environment variables. The resulting [`VaultConfig`] is handed to the facade
//! when a vault is opened; nothing reads configuration from globals.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `PDMVAULT_ROOT`, `PDMVAULT_USER`, `PDMVAULT_GID`.
//! 2. **Files**, in the order given to [`VaultConfig::load`]. The CLI passes an
//!    explicit `--config` file, then `<vault>/.pdmvault.toml`, then the user config.
//! 3. **Compiled defaults** via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `root` | none | Vault root directory |
//! | `user` | none | Identity used as lock holder |
//! | `vault_gid` | none | Group id given to everything written into the vault |
//! | `owners` | none | Table of username → uid |
//! | `documents_only` | `false` | Hide plain files in listings |
//! | `hide_superseded` | `true` | Hide legacy revision files (`part.FCStd1`) |
//! | `document_extensions` | `[".FCStd"]` | Suffixes of versionable documents |

use crate::error::Result;
use crate::model::ListFilter;
use crate::owner::ConfigOwners;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

fn default_document_extensions() -> Vec<String> {
    vec![".FCStd".to_string()]
}

/// Configuration for a vault, stored in `pdmvault.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Vault root directory.
    #[config(env = "PDMVAULT_ROOT")]
    pub root: Option<PathBuf>,

    /// Identity recorded as lock holder.
    #[config(env = "PDMVAULT_USER")]
    pub user: Option<String>,

    /// Group id applied to files written into the vault.
    #[config(env = "PDMVAULT_GID")]
    pub vault_gid: Option<u32>,

    /// Username to uid table used when assigning file ownership.
    pub owners: Option<HashMap<String, u32>>,

    #[config(default = false)]
    pub documents_only: bool,

    #[config(default = true)]
    pub hide_superseded: bool,

    /// Suffixes of versionable documents. Defaults to [".FCStd"].
    pub document_extensions: Option<Vec<String>>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: None,
            user: None,
            vault_gid: None,
            owners: None,
            documents_only: false,
            hide_superseded: true,
            document_extensions: None,
        }
    }
}

impl VaultConfig {
    /// Loads environment variables over the given files, first file winning.
    /// Missing files are skipped.
    pub fn load(files: &[PathBuf]) -> Result<Self> {
        let mut builder = Self::builder().env();
        for file in files {
            builder = builder.file(file);
        }
        Ok(builder.load()?)
    }

    pub fn document_extensions(&self) -> Vec<String> {
        self.document_extensions
            .clone()
            .unwrap_or_else(default_document_extensions)
    }

    pub fn list_filter(&self) -> ListFilter {
        ListFilter {
            documents_only: self.documents_only,
            hide_superseded: self.hide_superseded,
        }
    }

    pub fn owner_resolver(&self) -> ConfigOwners {
        ConfigOwners::new(self.owners.clone().unwrap_or_default())
    }
}
