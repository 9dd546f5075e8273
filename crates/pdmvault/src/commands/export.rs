use crate::commands::VaultCtx;
use crate::error::{Result, VaultError};
use crate::store::VaultFs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Copies a version's document out of the vault into `dest_dir`, under the
/// item's current name. Defaults to the latest version.
///
/// Existing files are never overwritten. A purged version cannot be exported.
pub fn run<F: VaultFs>(
    ctx: &VaultCtx<F>,
    number: u64,
    sequence: Option<u32>,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let item = ctx.catalog.get(number)?;
    let dir = ctx.catalog.item_dir(number)?;
    let sequence = match sequence {
        Some(seq) => seq,
        None => {
            ctx.versions
                .latest_version(&dir)?
                .ok_or(VaultError::ItemNotFound(number))?
                .sequence
        }
    };
    if !ctx.versions.ledger(&dir)?.iter().any(|e| e.sequence == sequence) {
        return Err(VaultError::NotFound(ctx.versions.version_dir(&dir, sequence)));
    }

    let document = ctx.versions.document_path(&dir, sequence)?;
    if !ctx.fs.is_file(&document) {
        return Err(VaultError::NotFound(document));
    }
    let bytes = ctx.fs.read(&document)?;

    let target = dest_dir.join(&item.current_name);
    if target.exists() {
        return Err(VaultError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        )));
    }
    fs::write(&target, bytes)?;
    info!(number, sequence, target = %target.display(), "exported");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{import, listing, versioning};
    use crate::test_utils::{mem_ctx, source};

    #[test]
    fn exports_latest_and_specific_versions() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source("part.doc", b"one"), "d", &[]).unwrap();
        versioning::checkout(&ctx, n).unwrap();
        versioning::commit(&ctx, n, &source("part.doc", b"two"), "d", &[]).unwrap();

        let out = tempfile::tempdir().unwrap();
        let latest = run(&ctx, n, None, out.path()).unwrap();
        assert_eq!(fs::read(&latest).unwrap(), b"two");

        let out_v1 = tempfile::tempdir().unwrap();
        let first = run(&ctx, n, Some(1), out_v1.path()).unwrap();
        assert_eq!(fs::read(&first).unwrap(), b"one");
    }

    #[test]
    fn names_with_surrounding_spaces_round_trip() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source(" part.doc", b"hello"), "d", &[]).unwrap();

        let rows = listing::list(&ctx, "", Default::default()).unwrap();
        assert_eq!(rows.entries[0].name, " part.doc");
        assert_eq!(rows.entries[0].size, 5);

        let out = tempfile::tempdir().unwrap();
        let exported = run(&ctx, n, None, out.path()).unwrap();
        assert_eq!(exported, out.path().join(" part.doc"));
        assert_eq!(fs::read(&exported).unwrap(), b"hello");
    }

    #[test]
    fn refuses_to_overwrite() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source("part.doc", b"one"), "d", &[]).unwrap();
        let out = tempfile::tempdir().unwrap();
        run(&ctx, n, None, out.path()).unwrap();
        assert!(matches!(run(&ctx, n, None, out.path()), Err(VaultError::Io(_))));
    }

    #[test]
    fn purged_or_unknown_versions_are_not_found() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source("part.doc", b"one"), "d", &[]).unwrap();
        versioning::checkout(&ctx, n).unwrap();
        versioning::commit(&ctx, n, &source("part.doc", b"two"), "d", &[]).unwrap();
        listing::purge(&ctx, "").unwrap();

        let out = tempfile::tempdir().unwrap();
        assert!(matches!(
            run(&ctx, n, Some(1), out.path()),
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            run(&ctx, n, Some(7), out.path()),
            Err(VaultError::NotFound(_))
        ));
    }
}
