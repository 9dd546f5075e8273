use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// A vault structure file or directory is missing.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Item {0} not found in the catalog")]
    ItemNotFound(u64),

    #[error("No live item named \"{0}\"")]
    NameNotFound(String),

    #[error("Duplicate name in catalog: {0}")]
    DuplicateName(String),

    #[error("Item {number} is checked out by {holder}")]
    LockConflict { number: u64, holder: String },

    #[error("Item {0} must be checked out first")]
    NotCheckedOut(u64),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Feature not available: {0}")]
    Unsupported(&'static str),

    #[error("The vault is busy: another process is updating its tables")]
    CatalogBusy,

    #[error("Invalid name: \"{0}\"")]
    InvalidName(String),

    #[error("Malformed line {line} in {file}: {reason}")]
    Parse {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<confique::Error> for VaultError {
    fn from(err: confique::Error) -> Self {
        VaultError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
