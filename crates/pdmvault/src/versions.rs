//! # Version Store
//!
//! Each item owns a container directory `<dir>/<number>/` laid out as:
//!
//! ```text
//! 7/
//!   VER.txt            ledger: alternating VERnn / YYYY-MM-DD lines
//!   VER01/
//!     Description.txt  line 1: description, then the long description
//!     File.txt         name of the file as it was brought in
//!     bracket.FCStd    verbatim copy of the document
//!   VER02/
//!     ...
//! ```
//!
//! The ledger doubles as the marker that a directory is an item container.
//! Versions are immutable once their ledger line is written; a purge only removes
//! the copied document bytes of superseded versions.

use crate::error::{Result, VaultError};
use crate::locks::LockManager;
use crate::model::{today, validate_name, ItemDir, LockStatus, SourceFile, VersionInfo, VersionRef};
use crate::store::VaultFs;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

pub const LEDGER: &str = "VER.txt";
pub const DESCRIPTION: &str = "Description.txt";
pub const SOURCE_NAME: &str = "File.txt";
pub const TOMBSTONE: &str = "Removed.txt";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn version_tag(sequence: u32) -> String {
    format!("VER{:02}", sequence)
}

pub fn parse_tag(tag: &str) -> Option<u32> {
    let digits = tag.strip_prefix("VER")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub sequence: u32,
    pub created_at: NaiveDate,
}

/// Parses a ledger. Sequences must run 1, 2, 3, ... without gaps.
pub fn parse_ledger(file: &str, text: &str) -> Result<Vec<LedgerEntry>> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l.trim()))
        .collect();

    let parse_err = |line: usize, reason: String| VaultError::Parse {
        file: file.to_string(),
        line,
        reason,
    };

    let mut entries = Vec::with_capacity(lines.len() / 2);
    for pair in lines.chunks(2) {
        let (tag_line, tag) = pair[0];
        let sequence =
            parse_tag(tag).ok_or_else(|| parse_err(tag_line, format!("bad version tag {:?}", tag)))?;
        let (date_line, date) = pair
            .get(1)
            .copied()
            .ok_or_else(|| parse_err(tag_line, format!("{} has no date", tag)))?;
        let created_at = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| parse_err(date_line, format!("bad date {:?}", date)))?;

        let expected = entries.len() as u32 + 1;
        if sequence != expected {
            return Err(parse_err(
                tag_line,
                format!("expected {}, found {}", version_tag(expected), tag),
            ));
        }
        entries.push(LedgerEntry {
            sequence,
            created_at,
        });
    }
    Ok(entries)
}

#[derive(Debug, Clone)]
pub struct VersionStore<F: VaultFs> {
    fs: F,
}

impl<F: VaultFs> VersionStore<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// A directory is an item container when it holds a ledger.
    pub fn is_container(&self, path: &Path) -> bool {
        self.fs.is_file(&path.join(LEDGER))
    }

    pub fn is_tombstoned(&self, item: &ItemDir) -> bool {
        self.fs.is_file(&item.path.join(TOMBSTONE))
    }

    /// Hides the container from listings and reconciliation for good.
    pub fn mark_removed(&self, item: &ItemDir) -> Result<()> {
        self.fs.write_atomic(
            &item.path.join(TOMBSTONE),
            format!("{}\n", today().format(DATE_FORMAT)).as_bytes(),
        )
    }

    pub fn version_dir(&self, item: &ItemDir, sequence: u32) -> PathBuf {
        item.path.join(version_tag(sequence))
    }

    pub fn ledger(&self, item: &ItemDir) -> Result<Vec<LedgerEntry>> {
        let path = item.path.join(LEDGER);
        if !self.fs.is_file(&path) {
            return Ok(Vec::new());
        }
        let file = path.to_string_lossy().into_owned();
        parse_ledger(&file, &self.fs.read_to_string(&path)?)
    }

    /// Adds the next version of an item.
    ///
    /// Refused with [`VaultError::LockConflict`] when the item is checked out by
    /// anyone other than `caller`. The version directory is written completely
    /// before its ledger line is appended.
    pub fn create_version(
        &self,
        locks: &LockManager<F>,
        caller: &str,
        item: &ItemDir,
        source: &SourceFile,
        description: &str,
        long_description: &[String],
    ) -> Result<u32> {
        validate_name(&source.name)?;
        if source.name == DESCRIPTION || source.name == SOURCE_NAME {
            return Err(VaultError::InvalidName(source.name.clone()));
        }
        if let LockStatus::LockedBy(holder) = locks.status(item.number)? {
            if holder != caller {
                return Err(VaultError::LockConflict {
                    number: item.number,
                    holder,
                });
            }
        }

        let sequence = self.ledger(item)?.last().map_or(0, |e| e.sequence) + 1;
        let dir = self.version_dir(item, sequence);
        self.fs.create_dir_all(&dir)?;

        let mut text = description.replace(['\n', '\r'], " ");
        text.push('\n');
        for line in long_description {
            text.push_str(&line.replace(['\n', '\r'], " "));
            text.push('\n');
        }
        self.fs.write_atomic(&dir.join(DESCRIPTION), text.as_bytes())?;
        self.fs
            .write_atomic(&dir.join(SOURCE_NAME), format!("{}\n", source.name).as_bytes())?;
        self.fs.write_atomic(&dir.join(&source.name), &source.bytes)?;

        self.fs.append(
            &item.path.join(LEDGER),
            format!("{}\n{}\n", version_tag(sequence), today().format(DATE_FORMAT)).as_bytes(),
        )?;

        info!(
            number = item.number,
            sequence,
            file = %source.name,
            "version created"
        );
        Ok(sequence)
    }

    /// The file name recorded for a version.
    pub fn source_name(&self, item: &ItemDir, sequence: u32) -> Result<String> {
        let path = self.version_dir(item, sequence).join(SOURCE_NAME);
        if !self.fs.is_file(&path) {
            return Err(VaultError::NotFound(path));
        }
        let text = self.fs.read_to_string(&path)?;
        Ok(text.trim_end_matches(['\n', '\r']).to_string())
    }

    pub fn document_path(&self, item: &ItemDir, sequence: u32) -> Result<PathBuf> {
        let name = self.source_name(item, sequence)?;
        Ok(self.version_dir(item, sequence).join(name))
    }

    pub fn latest_version(&self, item: &ItemDir) -> Result<Option<VersionRef>> {
        let Some(last) = self.ledger(item)?.last().copied() else {
            return Ok(None);
        };
        Ok(Some(VersionRef {
            sequence: last.sequence,
            file_name: self.source_name(item, last.sequence)?,
        }))
    }

    pub fn history(&self, item: &ItemDir) -> Result<Vec<VersionInfo>> {
        let mut history = Vec::new();
        for entry in self.ledger(item)? {
            let dir = self.version_dir(item, entry.sequence);
            let source_filename = self.source_name(item, entry.sequence)?;

            let text = match self.fs.is_file(&dir.join(DESCRIPTION)) {
                true => self.fs.read_to_string(&dir.join(DESCRIPTION))?,
                false => String::new(),
            };
            let mut lines = text.lines();
            let description = lines.next().unwrap_or_default().to_string();
            let long_description = lines.map(str::to_string).collect();

            history.push(VersionInfo {
                sequence: entry.sequence,
                created_at: entry.created_at,
                purged: !self.fs.is_file(&dir.join(&source_filename)),
                source_filename,
                description,
                long_description,
            });
        }
        Ok(history)
    }

    /// Document files of every version except the latest that still hold bytes.
    pub fn superseded_documents(&self, item: &ItemDir) -> Result<Vec<PathBuf>> {
        let ledger = self.ledger(item)?;
        let Some(latest) = ledger.last() else {
            return Ok(Vec::new());
        };
        let mut paths = Vec::new();
        for entry in ledger.iter().filter(|e| e.sequence < latest.sequence) {
            let path = self.document_path(item, entry.sequence)?;
            if self.fs.is_file(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}
