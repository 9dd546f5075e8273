use crate::error::{Result, VaultError};
use crate::store::VaultFs;
use crate::tables::{self, ALL_FILES, COUNTER, LOCATIONS, LOCKED, REQUIRED};
use std::path::Path;
use tracing::info;

/// Creates whichever root tables are missing. Existing tables are left alone,
/// so running it on an initialized vault changes nothing.
pub fn run<F: VaultFs>(fs: &F) -> Result<()> {
    fs.create_dir_all(Path::new(""))?;
    let mut created = Vec::new();
    for table in [ALL_FILES, LOCATIONS, LOCKED] {
        if !fs.is_file(Path::new(table)) {
            tables::write_rows(fs, table, [])?;
            created.push(table);
        }
    }
    if !fs.is_file(Path::new(COUNTER)) {
        tables::write_counter(fs, 0)?;
        created.push(COUNTER);
    }
    if !created.is_empty() {
        info!(tables = ?created, "vault initialized");
    }
    Ok(())
}

/// Fails with `NotFound` for the first missing root table.
pub fn verify<F: VaultFs>(fs: &F) -> Result<()> {
    for table in REQUIRED {
        if !fs.is_file(Path::new(table)) {
            return Err(VaultError::NotFound(Path::new(table).to_path_buf()));
        }
    }
    Ok(())
}
