//! # Command Layer
//!
//! This module contains the **core business logic** of the vault. Each operation
//! lives in its own submodule as plain functions over a [`VaultCtx`].
//!
//! ## Role and Responsibilities
//!
//! Commands compose the catalog, version store, lock manager and view into the
//! operations a caller performs, and own the ordering between them: the
//! filesystem side of an operation is always written before the catalog commit,
//! so a crash leaves at most an orphaned container that `doctor` adopts.
//!
//! ## What Commands Do NOT Do
//!
//! - **Terminal I/O**: no stdout, stderr or formatting
//! - **Argument parsing**: that is the CLI's job
//! - **Exit codes**: they return `Result` and let the caller decide
//!
//! ## Testing Strategy
//!
//! Command tests run against [`MemFs`](crate::store::memory::MemFs) through the
//! fixtures in `test_utils`; end-to-end behaviour on a real directory lives in
//! the crate's `tests/` directory.
//!
//! ## Command Modules
//!
//! - [`init`]: create the root tables of a new vault
//! - [`import`]: bring a file in as a new item
//! - [`versioning`]: checkout, checkin, new versions, lock status
//! - [`rename`]: rename an item and resolve names
//! - [`history`]: read back an item's versions
//! - [`listing`]: list, purge, inspect and create directories
//! - [`export`]: copy a version's document out of the vault
//! - [`move_item`]: relocate an item's container
//! - [`remove`]: tombstone an item
//! - [`doctor`]: reconcile the catalog with the containers on disk

use crate::catalog::Catalog;
use crate::error::{Result, VaultError};
use crate::locks::LockManager;
use crate::owner::OwnerResolver;
use crate::store::VaultFs;
use crate::versions::VersionStore;
use crate::view::VaultView;
use std::path::Path;
use tracing::debug;

pub mod doctor;
pub mod export;
pub mod history;
pub mod import;
pub mod init;
pub mod listing;
pub mod move_item;
pub mod remove;
pub mod rename;
pub mod versioning;

/// Everything a command needs to act on one vault as one user.
pub struct VaultCtx<F: VaultFs> {
    pub fs: F,
    pub catalog: Catalog<F>,
    pub versions: VersionStore<F>,
    pub locks: LockManager<F>,
    pub view: VaultView<F>,
    pub user: Option<String>,
    pub vault_gid: Option<u32>,
    pub owners: Box<dyn OwnerResolver>,
}

impl<F: VaultFs> VaultCtx<F> {
    pub fn new(
        fs: F,
        user: Option<String>,
        vault_gid: Option<u32>,
        owners: Box<dyn OwnerResolver>,
        document_extensions: Vec<String>,
    ) -> Self {
        Self {
            catalog: Catalog::new(fs.clone()),
            versions: VersionStore::new(fs.clone()),
            locks: LockManager::new(fs.clone()),
            view: VaultView::new(fs.clone(), document_extensions),
            fs,
            user,
            vault_gid,
            owners,
        }
    }

    /// The identity recorded as lock holder.
    pub fn user(&self) -> Result<&str> {
        self.user
            .as_deref()
            .ok_or_else(|| VaultError::Config("no user configured".to_string()))
    }

    /// Hands `path` and everything below it to the configured user and vault
    /// group. Does nothing unless both ids are known.
    pub fn own(&self, path: &Path) -> Result<()> {
        let uid = self.user.as_deref().and_then(|u| self.owners.uid(u));
        let (Some(uid), Some(gid)) = (uid, self.vault_gid) else {
            debug!(path = %path.display(), "ownership not configured; left as is");
            return Ok(());
        };
        self.own_tree(path, uid, gid)
    }

    fn own_tree(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        self.fs.set_owner(path, uid, gid)?;
        if self.fs.is_dir(path) {
            for child in self.fs.read_dir(path)? {
                self.own_tree(&path.join(&child.name), uid, gid)?;
            }
        }
        Ok(())
    }
}
