use crate::commands::VaultCtx;
use crate::error::{Result, VaultError};
use crate::model::{dir_path, normalize_dir, ItemDir, LockStatus};
use crate::store::VaultFs;
use tracing::{info, warn};

/// Moves an item's container to `dest_dir`, then updates its location record.
///
/// Refused while someone other than the caller has the item checked out.
pub fn run<F: VaultFs>(ctx: &VaultCtx<F>, number: u64, dest_dir: &str) -> Result<String> {
    let dest_dir = normalize_dir(dest_dir)?;
    let location = ctx.catalog.location(number)?;
    if location.dir == dest_dir {
        return Ok(dest_dir);
    }
    if !ctx.fs.is_dir(&dir_path(&dest_dir)) {
        return Err(VaultError::NotFound(dir_path(&dest_dir)));
    }
    if let LockStatus::LockedBy(holder) = ctx.locks.status(number)? {
        if holder != ctx.user()? {
            return Err(VaultError::LockConflict { number, holder });
        }
    }

    let from = ItemDir::new(number, &location.dir);
    let to = ItemDir::new(number, &dest_dir);
    if ctx.fs.is_dir(&to.path) {
        return Err(VaultError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.path.display()),
        )));
    }
    ctx.fs.rename(&from.path, &to.path)?;
    if let Err(e) = ctx.catalog.relocate(number, &dest_dir) {
        warn!(number, error = %e, "location update failed; container moved back");
        ctx.fs.rename(&to.path, &from.path)?;
        return Err(e);
    }

    info!(number, from = %location.dir, to = %dest_dir, "item moved");
    Ok(dest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{import, listing, versioning};
    use crate::model::ListFilter;
    use crate::tables::VAULT_LOCK;
    use crate::test_utils::{mem_ctx, mem_ctx_on, source};
    use std::path::Path;

    #[test]
    fn moves_container_and_location() {
        let ctx = mem_ctx("alice");
        listing::mkdir(&ctx, "archive").unwrap();
        let n = import::run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();

        assert_eq!(run(&ctx, n, "archive").unwrap(), "archive");
        assert_eq!(ctx.catalog.location(n).unwrap().dir, "archive");
        assert!(list_names(&ctx, "").is_empty());
        assert_eq!(list_names(&ctx, "archive"), vec!["part.doc".to_string()]);
    }

    fn list_names(ctx: &VaultCtx<crate::store::memory::MemFs>, dir: &str) -> Vec<String> {
        listing::list(ctx, dir, ListFilter::default())
            .unwrap()
            .entries
            .into_iter()
            .filter(|e| !e.is_dir())
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn refused_while_checked_out_by_someone_else() {
        let alice = mem_ctx("alice");
        let bob = mem_ctx_on(&alice.fs, "bob");
        listing::mkdir(&alice, "archive").unwrap();
        let n = import::run(&alice, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        versioning::checkout(&bob, n).unwrap();

        assert!(matches!(
            run(&alice, n, "archive"),
            Err(VaultError::LockConflict { .. })
        ));
        run(&bob, n, "archive").unwrap();
    }

    #[test]
    fn busy_catalog_puts_container_back() {
        let ctx = mem_ctx("alice");
        listing::mkdir(&ctx, "archive").unwrap();
        let n = import::run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        ctx.catalog.rename(n, "part-v2.doc").unwrap();

        let held = ctx.fs.try_lock(Path::new(VAULT_LOCK)).unwrap();
        assert!(matches!(
            run(&ctx, n, "archive"),
            Err(VaultError::CatalogBusy)
        ));
        drop(held);

        assert_eq!(ctx.catalog.location(n).unwrap().dir, "");
        assert!(ctx.versions.is_container(&ItemDir::new(n, "").path));
        assert!(!ctx.fs.is_dir(&ItemDir::new(n, "archive").path));
        assert_eq!(list_names(&ctx, ""), vec!["part-v2.doc".to_string()]);
    }

    #[test]
    fn destination_must_exist() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        assert!(matches!(run(&ctx, n, "nowhere"), Err(VaultError::NotFound(_))));
    }
}
