//! # Vault View
//!
//! Read-only projection of one vault directory.
//!
//! Item containers (numeric directories holding a version ledger) collapse into a
//! single row named after the item's current catalog name, classified from the
//! latest version's document. Older versions never appear as rows; their document
//! files become purge candidates. Legacy revision files (`part.FCStd1`) are purge
//! candidates too, and appear as plain files only when superseded revisions are
//! not hidden.
//!
//! Dot-prefixed entries (temporary files, the vault lock) are always skipped, as
//! are the catalog tables at the vault root.

use crate::catalog::Catalog;
use crate::error::{Result, VaultError};
use crate::locks::LockManager;
use crate::metadata;
use crate::model::{dir_path, Entry, EntryKind, ItemDir, ListFilter, Listing};
use crate::store::VaultFs;
use crate::tables;
use crate::versions::VersionStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// True for names like `part.FCStd1`: a document extension followed by digits.
pub fn is_legacy_revision(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    let stem = lower.trim_end_matches(|c: char| c.is_ascii_digit());
    if stem.len() == lower.len() {
        return false;
    }
    extensions
        .iter()
        .any(|ext| stem.len() > ext.len() && stem.ends_with(&ext.to_lowercase()))
}

fn is_item_number(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[derive(Debug, Clone)]
pub struct VaultView<F: VaultFs> {
    fs: F,
    catalog: Catalog<F>,
    versions: VersionStore<F>,
    locks: LockManager<F>,
    extensions: Vec<String>,
}

impl<F: VaultFs> VaultView<F> {
    pub fn new(fs: F, extensions: Vec<String>) -> Self {
        Self {
            catalog: Catalog::new(fs.clone()),
            versions: VersionStore::new(fs.clone()),
            locks: LockManager::new(fs.clone()),
            fs,
            extensions,
        }
    }

    /// Classifies document bytes, degrading unreadable documents to plain files.
    fn classify(&self, path: &Path) -> Result<EntryKind> {
        let bytes = self.fs.read(path)?;
        Ok(match metadata::inspect_bytes(&bytes) {
            Ok(props) => EntryKind::VersionedDocument(props.variant),
            Err(VaultError::CorruptDocument(reason)) => {
                warn!(path = %path.display(), %reason, "unreadable document listed as plain file");
                EntryKind::PlainFile
            }
            Err(e) => return Err(e),
        })
    }

    /// Lists `dir` (normalized, relative to the vault root).
    pub fn list(&self, dir: &str, filter: ListFilter) -> Result<Listing> {
        let base = dir_path(dir);
        if !self.fs.is_dir(&base) {
            return Err(VaultError::NotFound(base));
        }

        let names: HashMap<u64, String> = self
            .catalog
            .items()?
            .into_iter()
            .map(|item| (item.number, item.current_name))
            .collect();
        let holders: HashMap<u64, String> = self.locks.records()?.into_iter().collect();

        let mut listing = Listing::default();
        for child in self.fs.read_dir(&base)? {
            if child.name.starts_with('.') {
                continue;
            }
            if dir.is_empty() && tables::REQUIRED.contains(&child.name.as_str()) {
                continue;
            }
            let path = base.join(&child.name);

            if !child.is_dir {
                let size = self.fs.file_size(&path)?;
                if is_legacy_revision(&child.name, &self.extensions) {
                    listing.purge_candidates.push(path);
                    if filter.hide_superseded {
                        continue;
                    }
                }
                listing.entries.push(Entry::plain_file(child.name, size));
                continue;
            }

            if !is_item_number(&child.name) {
                listing.entries.push(Entry::directory(child.name));
                continue;
            }

            let Ok(number) = child.name.parse::<u64>() else {
                continue;
            };
            let item = ItemDir { number, path };
            if !self.versions.is_container(&item.path) || self.versions.is_tombstoned(&item) {
                debug!(number, "skipping container outside the catalog view");
                continue;
            }
            let Some(name) = names.get(&number) else {
                debug!(number, "skipping uncatalogued container");
                continue;
            };
            let Some(latest) = self.versions.latest_version(&item)? else {
                continue;
            };

            let document = self.versions.version_dir(&item, latest.sequence).join(&latest.file_name);
            let (kind, size) = if self.fs.is_file(&document) {
                (self.classify(&document)?, self.fs.file_size(&document)?)
            } else {
                (EntryKind::PlainFile, 0)
            };
            listing
                .purge_candidates
                .extend(self.versions.superseded_documents(&item)?);
            listing.entries.push(Entry {
                name: name.clone(),
                kind,
                size,
                number: Some(number),
                sequence: Some(latest.sequence),
                locked_by: holders.get(&number).cloned(),
            });
        }

        if filter.documents_only {
            listing
                .entries
                .retain(|e| !matches!(e.kind, EntryKind::PlainFile));
        }
        sort_entries(&mut listing.entries);
        listing.purge_candidates.sort();
        Ok(listing)
    }

    /// Whether `path` is still safe to purge: it must not be the latest document
    /// of its container.
    fn still_superseded(&self, path: &Path) -> Result<bool> {
        let container = path.parent().and_then(Path::parent);
        let Some(container) = container.filter(|c| self.versions.is_container(c)) else {
            return Ok(true);
        };
        let number = container
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse::<u64>().ok());
        let Some(number) = number else {
            return Ok(false);
        };
        let item = ItemDir {
            number,
            path: container.to_path_buf(),
        };
        Ok(match self.versions.latest_version(&item)? {
            Some(latest) => {
                self.versions.version_dir(&item, latest.sequence).join(&latest.file_name) != path
            }
            None => false,
        })
    }

    /// Deletes every purge candidate of `dir` and returns how many files went.
    pub fn purge(&self, dir: &str) -> Result<usize> {
        let listing = self.list(
            dir,
            ListFilter {
                documents_only: false,
                hide_superseded: true,
            },
        )?;

        let mut removed = 0;
        for path in listing.purge_candidates {
            if !self.still_superseded(&path)? {
                warn!(path = %path.display(), "purge candidate became current; kept");
                continue;
            }
            self.fs.remove_file(&path)?;
            debug!(path = %path.display(), "purged");
            removed += 1;
        }
        info!(dir, removed, "purge complete");
        Ok(removed)
    }

    /// Every purge candidate under `dir`, without deleting anything.
    pub fn purge_candidates(&self, dir: &str) -> Result<Vec<PathBuf>> {
        Ok(self.list(dir, ListFilter::default())?.purge_candidates)
    }
}
