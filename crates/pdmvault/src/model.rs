use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, VaultError};

/// Characters that would break the line-oriented root tables.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '<', '>', '=', '\n', '\r'];

/// One entry of an item's rename history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub old_name: String,
    pub date: NaiveDate,
}

/// A logical, renameable unit of versioned content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub number: u64,
    pub current_name: String,
    /// Oldest first.
    pub rename_history: Vec<Rename>,
}

impl Item {
    pub fn new(number: u64, name: impl Into<String>) -> Self {
        Self {
            number,
            current_name: name.into(),
            rename_history: Vec::new(),
        }
    }
}

/// Where an item's container lives, as a directory relative to the vault root.
/// The root itself is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub number: u64,
    pub dir: String,
}

/// The on-disk container of an item: `<dir>/<number>`, relative to the vault root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDir {
    pub number: u64,
    pub path: PathBuf,
}

impl ItemDir {
    pub fn new(number: u64, dir: &str) -> Self {
        Self {
            number,
            path: dir_path(dir).join(number.to_string()),
        }
    }
}

/// The bytes of a document being brought into the vault, with the name it had outside.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// The highest version of an item and the document file it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRef {
    pub sequence: u32,
    pub file_name: String,
}

/// A complete version record as read back from its version directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub sequence: u32,
    pub created_at: NaiveDate,
    pub source_filename: String,
    pub description: String,
    pub long_description: Vec<String>,
    /// The document bytes were removed by a purge.
    pub purged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LockStatus {
    Unlocked,
    LockedBy(String),
}

impl LockStatus {
    pub fn holder(&self) -> Option<&str> {
        match self {
            LockStatus::Unlocked => None,
            LockStatus::LockedBy(holder) => Some(holder),
        }
    }
}

/// Structural classification of a document. Assemblies reference other documents
/// as components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentVariant {
    #[default]
    Plain,
    A2plus,
    Assembly3,
    Assembly4,
}

impl DocumentVariant {
    pub fn is_assembly(self) -> bool {
        !matches!(self, DocumentVariant::Plain)
    }
}

impl fmt::Display for DocumentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentVariant::Plain => "Document",
            DocumentVariant::A2plus => "A2-Assy",
            DocumentVariant::Assembly3 => "A3-Assy",
            DocumentVariant::Assembly4 => "A4-Assy",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    Directory,
    VersionedDocument(DocumentVariant),
    PlainFile,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub number: Option<u64>,
    pub sequence: Option<u32>,
    pub locked_by: Option<String>,
}

impl Entry {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            number: None,
            sequence: None,
            locked_by: None,
        }
    }

    pub fn plain_file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::PlainFile,
            size,
            number: None,
            sequence: None,
            locked_by: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

/// The result of listing a directory: visible rows plus the superseded files that
/// a purge would delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub entries: Vec<Entry>,
    pub purge_candidates: Vec<PathBuf>,
}

/// List-level predicates, applied independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub documents_only: bool,
    pub hide_superseded: bool,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            documents_only: false,
            hide_superseded: true,
        }
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Checks that an item name can be stored in the catalog tables.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains(FORBIDDEN_CHARS) || name == "." || name == ".." {
        return Err(VaultError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Normalizes a vault-relative directory ("", ".", "a/b/", "/a") into `a/b` form.
///
/// Components must be valid names and must not be purely numeric, since numeric
/// directories are item containers.
pub fn normalize_dir(dir: &str) -> Result<String> {
    let mut parts = Vec::new();
    for part in dir.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        validate_name(part).map_err(|_| VaultError::InvalidName(dir.to_string()))?;
        if part.starts_with('.') || part.chars().all(|c| c.is_ascii_digit()) {
            return Err(VaultError::InvalidName(dir.to_string()));
        }
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Converts a normalized directory into a relative path.
pub fn dir_path(dir: &str) -> PathBuf {
    if dir.is_empty() {
        PathBuf::new()
    } else {
        dir.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_names_that_break_tables() {
        assert!(validate_name("part.FCStd").is_ok());
        assert!(validate_name("bracket [x] & co, ltd.doc").is_ok());
        for bad in ["", "  ", "a/b", "a<b", "a>b", "a=b", "line\nbreak", ".."] {
            assert!(validate_name(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn normalizes_relative_dirs() {
        assert_eq!(normalize_dir("").unwrap(), "");
        assert_eq!(normalize_dir(".").unwrap(), "");
        assert_eq!(normalize_dir("/parts/brackets/").unwrap(), "parts/brackets");
        assert_eq!(normalize_dir("parts//bolts").unwrap(), "parts/bolts");
    }

    #[test]
    fn rejects_numeric_and_hidden_dirs() {
        assert!(matches!(
            normalize_dir("parts/42"),
            Err(VaultError::InvalidName(_))
        ));
        assert!(normalize_dir(".git").is_err());
        assert!(normalize_dir("../outside").is_err());
    }

    #[test]
    fn item_dir_joins_location_and_number() {
        assert_eq!(ItemDir::new(7, "").path, PathBuf::from("7"));
        assert_eq!(
            ItemDir::new(12, "parts/bolts").path,
            PathBuf::from("parts").join("bolts").join("12")
        );
    }

    #[test]
    fn variant_labels() {
        assert_eq!(DocumentVariant::Assembly4.to_string(), "A4-Assy");
        assert!(!DocumentVariant::Plain.is_assembly());
        assert!(DocumentVariant::A2plus.is_assembly());
    }
}
