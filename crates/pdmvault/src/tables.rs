//! Line codec for the text tables kept at the vault root.
//!
//! Every table row is `<number>=<value>`, one per line. The counter file is a
//! single integer.

use crate::error::{Result, VaultError};
use crate::store::VaultFs;
use std::path::Path;
use tracing::debug;

pub const ALL_FILES: &str = "All Files.txt";
pub const LOCATIONS: &str = "FileLocation.txt";
pub const COUNTER: &str = "IndexNumber.txt";
pub const LOCKED: &str = "Locked.txt";

/// Advisory lock serializing every table mutation.
pub const VAULT_LOCK: &str = ".vault.lock";

/// Tables whose presence marks a directory as a vault.
pub const REQUIRED: [&str; 4] = [ALL_FILES, LOCATIONS, COUNTER, LOCKED];

/// Parses one table line; blank lines yield `None`.
pub fn parse_line(file: &str, line_no: usize, line: &str) -> Result<Option<(u64, String)>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let parse_err = |reason: &str| VaultError::Parse {
        file: file.to_string(),
        line: line_no,
        reason: reason.to_string(),
    };
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| parse_err("missing '='"))?;
    let number = key
        .trim()
        .parse::<u64>()
        .map_err(|_| parse_err("key is not an item number"))?;
    Ok(Some((number, value.to_string())))
}

pub fn parse_rows(file: &str, text: &str) -> Result<Vec<(u64, String)>> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(row) = parse_line(file, idx + 1, line)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub fn format_row(number: u64, value: &str) -> String {
    format!("{}={}\n", number, value)
}

pub fn read_rows<F: VaultFs>(fs: &F, file: &str) -> Result<Vec<(u64, String)>> {
    let path = Path::new(file);
    if !fs.is_file(path) {
        return Err(VaultError::NotFound(path.to_path_buf()));
    }
    let rows = parse_rows(file, &fs.read_to_string(path)?)?;
    debug!(table = file, rows = rows.len(), "table read");
    Ok(rows)
}

pub fn write_rows<'a, F, I>(fs: &F, file: &str, rows: I) -> Result<()>
where
    F: VaultFs,
    I: IntoIterator<Item = (u64, &'a str)>,
{
    let text: String = rows
        .into_iter()
        .map(|(number, value)| format_row(number, value))
        .collect();
    fs.write_atomic(Path::new(file), text.as_bytes())
}

pub fn append_row<F: VaultFs>(fs: &F, file: &str, number: u64, value: &str) -> Result<()> {
    fs.append(Path::new(file), format_row(number, value).as_bytes())
}

pub fn read_counter<F: VaultFs>(fs: &F) -> Result<u64> {
    let path = Path::new(COUNTER);
    if !fs.is_file(path) {
        return Err(VaultError::NotFound(path.to_path_buf()));
    }
    let text = fs.read_to_string(path)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse::<u64>().map_err(|_| VaultError::Parse {
        file: COUNTER.to_string(),
        line: 1,
        reason: format!("not a number: {:?}", trimmed),
    })
}

pub fn write_counter<F: VaultFs>(fs: &F, value: u64) -> Result<()> {
    fs.write_atomic(Path::new(COUNTER), format!("{}\n", value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemFs;

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let rows = parse_rows("Locked.txt", "1=alice\n\n12=bob smith\n").unwrap();
        assert_eq!(
            rows,
            vec![(1, "alice".to_string()), (12, "bob smith".to_string())]
        );
    }

    #[test]
    fn value_may_contain_separator() {
        let rows = parse_rows("x", "3=a=b").unwrap();
        assert_eq!(rows[0].1, "a=b");
    }

    #[test]
    fn reports_line_of_bad_row() {
        let err = parse_rows("FileLocation.txt", "1=parts\nbogus\n").unwrap_err();
        match err {
            VaultError::Parse { file, line, .. } => {
                assert_eq!(file, "FileLocation.txt");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_rows("x", "abc=1").is_err());
    }

    #[test]
    fn missing_table_is_not_found() {
        let fs = MemFs::new();
        assert!(matches!(
            read_rows(&fs, LOCKED),
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(read_counter(&fs), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn rows_survive_write_and_append() {
        let fs = MemFs::new();
        write_rows(&fs, LOCKED, [(1, "alice")]).unwrap();
        append_row(&fs, LOCKED, 4, "bob").unwrap();
        let rows = read_rows(&fs, LOCKED).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], (4, "bob".to_string()));
    }

    #[test]
    fn counter_reads_back() {
        let fs = MemFs::new();
        write_counter(&fs, 41).unwrap();
        assert_eq!(read_counter(&fs).unwrap(), 41);
    }
}
