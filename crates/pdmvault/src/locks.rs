//! # Lock Manager
//!
//! One table, `Locked.txt`, records which items are checked out and by whom
//! (`<number>=<holder>`). A missing row means the item is unlocked.
//!
//! The table is the single authority the version store consults before adding a
//! version to an item. All calls fail fast: a conflicting holder is reported as
//! [`VaultError::LockConflict`], never waited on.

use crate::error::{Result, VaultError};
use crate::model::{validate_name, LockStatus};
use crate::store::VaultFs;
use crate::tables::{self, LOCKED, VAULT_LOCK};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct LockManager<F: VaultFs> {
    fs: F,
}

impl<F: VaultFs> LockManager<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    fn holder_of(rows: &[(u64, String)], number: u64) -> Option<&str> {
        rows.iter()
            .find(|(n, _)| *n == number)
            .map(|(_, holder)| holder.as_str())
    }

    fn persist(&self, rows: &[(u64, String)]) -> Result<()> {
        tables::write_rows(&self.fs, LOCKED, rows.iter().map(|(n, h)| (*n, h.as_str())))
    }

    /// Checks the item out to `holder`. Checking out again as the same holder
    /// succeeds without change.
    pub fn checkout(&self, number: u64, holder: &str) -> Result<()> {
        validate_name(holder)?;
        let _guard = self.fs.try_lock(Path::new(VAULT_LOCK))?;
        let rows = tables::read_rows(&self.fs, LOCKED)?;
        match Self::holder_of(&rows, number) {
            Some(current) if current == holder => Ok(()),
            Some(current) => Err(VaultError::LockConflict {
                number,
                holder: current.to_string(),
            }),
            None => {
                tables::append_row(&self.fs, LOCKED, number, holder)?;
                info!(number, holder, "item checked out");
                Ok(())
            }
        }
    }

    /// Releases the lock held by `holder`.
    ///
    /// Returns `false` when the item was not checked out at all. A release by
    /// anyone other than the holder is a [`VaultError::LockConflict`].
    pub fn checkin(&self, number: u64, holder: &str) -> Result<bool> {
        let _guard = self.fs.try_lock(Path::new(VAULT_LOCK))?;
        let mut rows = tables::read_rows(&self.fs, LOCKED)?;
        let current = Self::holder_of(&rows, number).map(str::to_string);
        match current {
            None => Ok(false),
            Some(current) if current != holder => Err(VaultError::LockConflict {
                number,
                holder: current,
            }),
            Some(_) => {
                rows.retain(|(n, _)| *n != number);
                self.persist(&rows)?;
                info!(number, holder, "item checked in");
                Ok(true)
            }
        }
    }

    /// Administrative release regardless of holder. Returns the previous holder.
    pub fn force_checkin(&self, number: u64) -> Result<Option<String>> {
        let _guard = self.fs.try_lock(Path::new(VAULT_LOCK))?;
        let mut rows = tables::read_rows(&self.fs, LOCKED)?;
        let previous = Self::holder_of(&rows, number).map(str::to_string);
        if let Some(holder) = &previous {
            rows.retain(|(n, _)| *n != number);
            self.persist(&rows)?;
            warn!(number, holder = %holder, "lock forcibly released");
        }
        Ok(previous)
    }

    pub fn status(&self, number: u64) -> Result<LockStatus> {
        let rows = tables::read_rows(&self.fs, LOCKED)?;
        Ok(match Self::holder_of(&rows, number) {
            Some(holder) => LockStatus::LockedBy(holder.to_string()),
            None => LockStatus::Unlocked,
        })
    }

    /// Every lock record, in table order.
    pub fn records(&self) -> Result<Vec<(u64, String)>> {
        tables::read_rows(&self.fs, LOCKED)
    }

    /// Drops lock records whose item number does not satisfy `keep`.
    /// Returns the numbers dropped.
    pub fn retain(&self, keep: impl Fn(u64) -> bool) -> Result<Vec<u64>> {
        let _guard = self.fs.try_lock(Path::new(VAULT_LOCK))?;
        let rows = tables::read_rows(&self.fs, LOCKED)?;
        let (kept, dropped): (Vec<_>, Vec<_>) = rows.into_iter().partition(|(n, _)| keep(*n));
        if dropped.is_empty() {
            return Ok(Vec::new());
        }
        self.persist(&kept)?;
        Ok(dropped.into_iter().map(|(n, _)| n).collect())
    }
}
