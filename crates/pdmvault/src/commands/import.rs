use crate::commands::VaultCtx;
use crate::error::{Result, VaultError};
use crate::model::{dir_path, normalize_dir, validate_name, ItemDir, SourceFile};
use crate::store::VaultFs;
use tracing::{info, warn};

/// Brings `source` into the vault as a new item in `dir`, holding version 1.
///
/// Order of writes: the item number is issued, then the container and its first
/// version are written, and only then is the item catalogued. A failed catalog
/// commit leaves a tombstoned container behind, never a half-visible item. The
/// new item is not checked out.
pub fn run<F: VaultFs>(
    ctx: &VaultCtx<F>,
    dir: &str,
    source: &SourceFile,
    description: &str,
    long_description: &[String],
) -> Result<u64> {
    let dir = normalize_dir(dir)?;
    validate_name(&source.name)?;
    let user = ctx.user()?;
    if !ctx.fs.is_dir(&dir_path(&dir)) {
        return Err(VaultError::NotFound(dir_path(&dir)));
    }
    if ctx.catalog.resolve(&source.name)?.is_some() {
        return Err(VaultError::DuplicateName(source.name.clone()));
    }

    let number = ctx.catalog.reserve_number()?;
    let item = ItemDir::new(number, &dir);
    ctx.fs.create_dir_all(&item.path)?;
    ctx.versions
        .create_version(&ctx.locks, user, &item, source, description, long_description)?;

    if let Err(e) = ctx.catalog.insert(number, &source.name, &dir) {
        warn!(number, error = %e, "catalog commit failed; container tombstoned");
        ctx.versions.mark_removed(&item)?;
        return Err(e);
    }
    ctx.own(&item.path)?;

    info!(number, name = %source.name, dir = %dir, "imported");
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListFilter;
    use crate::test_utils::{mem_ctx, source};

    #[test]
    fn first_import_is_item_one_with_version_one() {
        let ctx = mem_ctx("alice");
        let n = run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        assert_eq!(n, 1);

        let item = ctx.catalog.item_dir(n).unwrap();
        let latest = ctx.versions.latest_version(&item).unwrap().unwrap();
        assert_eq!(latest.sequence, 1);
        assert_eq!(latest.file_name, "part.doc");
        assert!(ctx.locks.status(n).unwrap().holder().is_none());
    }

    #[test]
    fn imports_into_subdirectory() {
        let ctx = mem_ctx("alice");
        ctx.fs.create_dir_all(std::path::Path::new("parts")).unwrap();
        let n = run(&ctx, "parts/", &source("bolt.doc", b"x"), "d", &[]).unwrap();
        assert_eq!(ctx.catalog.location(n).unwrap().dir, "parts");

        let listing = ctx.view.list("parts", ListFilter::default()).unwrap();
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].name, "bolt.doc");
    }

    #[test]
    fn duplicate_name_consumes_no_number() {
        let ctx = mem_ctx("alice");
        run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        assert!(matches!(
            run(&ctx, "", &source("part.doc", b"y"), "d", &[]),
            Err(VaultError::DuplicateName(_))
        ));
        assert_eq!(ctx.catalog.counter().unwrap(), 1);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let ctx = mem_ctx("alice");
        assert!(matches!(
            run(&ctx, "nowhere", &source("part.doc", b"x"), "d", &[]),
            Err(VaultError::NotFound(_))
        ));
    }
}
