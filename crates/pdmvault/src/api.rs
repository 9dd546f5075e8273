//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer and the single entry
//! point for vault operations, whichever client is driving them.
//!
//! ## Role and Responsibilities
//!
//! - **Wires** a [`VaultCtx`] from an explicit [`VaultConfig`]
//! - **Normalizes inputs** (reads source files from outside the vault, applies the
//!   configured listing filter)
//! - **Dispatches** to the command functions and returns their structured results
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **Terminal I/O**: no stdout or stderr
//! - **Presentation**: returns data, not strings
//!
//! ## Generic Over VaultFs
//!
//! `Vault<F: VaultFs>` works the same over both backends:
//! - Production: `Vault<LocalFs>`
//! - Testing: `Vault<MemFs>`

use crate::commands::{self, doctor::DoctorReport, history::ItemHistory, VaultCtx};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::metadata::DocumentProperties;
use crate::model::{Item, ListFilter, Listing, LockStatus, SourceFile, VersionRef};
use crate::store::VaultFs;
use std::fs;
use std::path::{Path, PathBuf};

/// An open vault, acting as the configured user.
pub struct Vault<F: VaultFs> {
    ctx: VaultCtx<F>,
    filter: ListFilter,
}

impl<F: VaultFs> Vault<F> {
    /// Creates the root tables if they are missing, then opens the vault.
    pub fn init(fs: F, config: &VaultConfig) -> Result<Self> {
        commands::init::run(&fs)?;
        Self::open(fs, config)
    }

    /// Opens an existing vault. Fails with `NotFound` if a root table is missing.
    pub fn open(fs: F, config: &VaultConfig) -> Result<Self> {
        commands::init::verify(&fs)?;
        let ctx = VaultCtx::new(
            fs,
            config.user.clone(),
            config.vault_gid,
            Box::new(config.owner_resolver()),
            config.document_extensions(),
        );
        Ok(Self {
            ctx,
            filter: config.list_filter(),
        })
    }

    pub fn ctx(&self) -> &VaultCtx<F> {
        &self.ctx
    }

    /// Imports the file at `path` into the vault root.
    pub fn import(&self, path: &Path, description: &str) -> Result<u64> {
        self.import_into(path, "", description, &[])
    }

    pub fn import_into(
        &self,
        path: &Path,
        dir: &str,
        description: &str,
        long_description: &[String],
    ) -> Result<u64> {
        let source = read_source(path)?;
        commands::import::run(&self.ctx, dir, &source, description, long_description)
    }

    pub fn import_bytes(
        &self,
        dir: &str,
        source: &SourceFile,
        description: &str,
        long_description: &[String],
    ) -> Result<u64> {
        commands::import::run(&self.ctx, dir, source, description, long_description)
    }

    pub fn checkout(&self, number: u64) -> Result<()> {
        commands::versioning::checkout(&self.ctx, number)
    }

    pub fn checkin(&self, number: u64) -> Result<bool> {
        commands::versioning::checkin(&self.ctx, number)
    }

    /// Stores the file at `path` as the item's next version and releases the lock.
    pub fn commit(
        &self,
        number: u64,
        path: &Path,
        description: &str,
        long_description: &[String],
    ) -> Result<u32> {
        let source = read_source(path)?;
        commands::versioning::commit(&self.ctx, number, &source, description, long_description)
    }

    pub fn new_version(
        &self,
        number: u64,
        source: &SourceFile,
        description: &str,
        long_description: &[String],
    ) -> Result<u32> {
        commands::versioning::new_version(&self.ctx, number, source, description, long_description)
    }

    pub fn status(&self, number: u64) -> Result<LockStatus> {
        commands::versioning::status(&self.ctx, number)
    }

    pub fn force_checkin(&self, number: u64) -> Result<Option<String>> {
        commands::versioning::force_checkin(&self.ctx, number)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<Item> {
        commands::rename::run(&self.ctx, old, new)
    }

    pub fn resolve(&self, name: &str) -> Result<Option<u64>> {
        commands::rename::resolve(&self.ctx, name)
    }

    pub fn item(&self, number: u64) -> Result<Item> {
        self.ctx.catalog.get(number)
    }

    pub fn latest_version(&self, number: u64) -> Result<Option<VersionRef>> {
        let dir = self.ctx.catalog.item_dir(number)?;
        self.ctx.versions.latest_version(&dir)
    }

    /// Lists `dir` with the configured filter.
    pub fn list(&self, dir: &str) -> Result<Listing> {
        commands::listing::list(&self.ctx, dir, self.filter)
    }

    pub fn list_with(&self, dir: &str, filter: ListFilter) -> Result<Listing> {
        commands::listing::list(&self.ctx, dir, filter)
    }

    pub fn default_filter(&self) -> ListFilter {
        self.filter
    }

    pub fn purge(&self, dir: &str) -> Result<usize> {
        commands::listing::purge(&self.ctx, dir)
    }

    pub fn mkdir(&self, dir: &str) -> Result<String> {
        commands::listing::mkdir(&self.ctx, dir)
    }

    pub fn inspect(&self, number: u64) -> Result<DocumentProperties> {
        commands::listing::inspect(&self.ctx, number)
    }

    pub fn history(&self, number: u64) -> Result<ItemHistory> {
        commands::history::run(&self.ctx, number)
    }

    pub fn export(&self, number: u64, sequence: Option<u32>, dest_dir: &Path) -> Result<PathBuf> {
        commands::export::run(&self.ctx, number, sequence, dest_dir)
    }

    pub fn move_item(&self, number: u64, dest_dir: &str) -> Result<String> {
        commands::move_item::run(&self.ctx, number, dest_dir)
    }

    pub fn remove(&self, name: &str) -> Result<u64> {
        commands::remove::run(&self.ctx, name)
    }

    pub fn doctor(&self) -> Result<DoctorReport> {
        commands::doctor::run(&self.ctx)
    }
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| VaultError::InvalidName(path.display().to_string()))?
        .to_string();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VaultError::NotFound(path.to_path_buf()),
        _ => VaultError::Io(e),
    })?;
    Ok(SourceFile { name, bytes })
}
