//! # Storage Layer
//!
//! Every byte the engine reads from or writes to a vault goes through the
//! [`VaultFs`] capability. Paths handed to it are always **relative to the vault
//! root**; the implementation decides where that root lives.
//!
//! ## Implementations
//!
//! - [`local::LocalFs`]: production backend over a real directory tree. The tree may be
//!   a local disk or a network mount; the engine does not care.
//! - [`memory::MemFs`]: in-memory tree for tests. Clones share the same tree, so two
//!   clones behave like two processes working on one vault.
//!
//! ## Atomicity
//!
//! Whole-file writes go through [`VaultFs::write_atomic`], which must write a
//! temporary sibling and rename it into place so a killed process never leaves a
//! half-written table or document behind. Appends are used only for the
//! line-oriented ledgers, where a torn last line is detected by the parser.
//!
//! ## Advisory locking
//!
//! [`VaultFs::try_lock`] takes an exclusive advisory lock and never blocks: if
//! another holder has it, the call fails with [`VaultError::CatalogBusy`].
//! The returned guard releases the lock on drop.
//!
//! [`VaultError::CatalogBusy`]: crate::error::VaultError::CatalogBusy

use crate::error::{Result, VaultError};
use std::io;
use std::path::Path;

pub mod local;
pub mod memory;

/// An immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Abstract interface for raw vault I/O.
///
/// This trait handles the "how" of storage (real directory vs memory), while the
/// catalog, version store and lock manager handle the "what".
pub trait VaultFs: Clone {
    /// Held for as long as the advisory lock should stay taken.
    type Guard;

    /// Immediate children of `dir`, unsorted, including hidden entries.
    fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>>;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn file_size(&self, path: &Path) -> Result<u64>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace the file's content. MUST be atomic (write to tmp, then rename).
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Append to a file, creating it if missing.
    fn append(&self, path: &Path, data: &[u8]) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Rename a file or a whole directory.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    fn set_owner(&self, path: &Path, uid: u32, gid: u32) -> Result<()>;

    /// Take the exclusive advisory lock backed by `path`, failing fast when held.
    fn try_lock(&self, path: &Path) -> Result<Self::Guard>;

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            VaultError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: {}", path.display(), e),
            ))
        })
    }
}
