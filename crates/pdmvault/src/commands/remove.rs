use crate::commands::VaultCtx;
use crate::error::{Result, VaultError};
use crate::model::LockStatus;
use crate::store::VaultFs;
use tracing::info;

/// Removes the live item called `name`: its container is tombstoned first, then
/// its catalog entries are dropped. The item number is never issued again.
pub fn run<F: VaultFs>(ctx: &VaultCtx<F>, name: &str) -> Result<u64> {
    let number = ctx
        .catalog
        .resolve(name)?
        .ok_or_else(|| VaultError::NameNotFound(name.to_string()))?;
    if let LockStatus::LockedBy(holder) = ctx.locks.status(number)? {
        if holder != ctx.user()? {
            return Err(VaultError::LockConflict { number, holder });
        }
    }

    let item = ctx.catalog.item_dir(number)?;
    ctx.versions.mark_removed(&item)?;
    ctx.catalog.remove(name)?;
    ctx.locks.retain(|n| n != number)?;

    info!(number, name, "item removed");
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{import, listing, versioning};
    use crate::model::ListFilter;
    use crate::test_utils::{mem_ctx, mem_ctx_on, source};

    #[test]
    fn removed_numbers_are_not_reused() {
        let ctx = mem_ctx("alice");
        import::run(&ctx, "", &source("a.doc", b"x"), "d", &[]).unwrap();
        let b = import::run(&ctx, "", &source("b.doc", b"x"), "d", &[]).unwrap();

        assert_eq!(run(&ctx, "b.doc").unwrap(), b);
        assert_eq!(ctx.catalog.resolve("b.doc").unwrap(), None);

        let c = import::run(&ctx, "", &source("b.doc", b"x"), "d", &[]).unwrap();
        assert!(c > b);
    }

    #[test]
    fn removed_item_disappears_from_listing() {
        let ctx = mem_ctx("alice");
        import::run(&ctx, "", &source("a.doc", b"x"), "d", &[]).unwrap();
        run(&ctx, "a.doc").unwrap();
        assert!(listing::list(&ctx, "", ListFilter::default())
            .unwrap()
            .entries
            .is_empty());
    }

    #[test]
    fn drops_own_lock_but_respects_others() {
        let alice = mem_ctx("alice");
        let bob = mem_ctx_on(&alice.fs, "bob");
        let a = import::run(&alice, "", &source("a.doc", b"x"), "d", &[]).unwrap();
        import::run(&alice, "", &source("b.doc", b"x"), "d", &[]).unwrap();

        versioning::checkout(&alice, a).unwrap();
        run(&alice, "a.doc").unwrap();
        assert!(alice.locks.records().unwrap().is_empty());

        let b = alice.catalog.resolve("b.doc").unwrap().unwrap();
        versioning::checkout(&bob, b).unwrap();
        assert!(matches!(
            run(&alice, "b.doc"),
            Err(VaultError::LockConflict { .. })
        ));
    }

    #[test]
    fn unknown_name() {
        let ctx = mem_ctx("alice");
        assert!(matches!(run(&ctx, "x"), Err(VaultError::NameNotFound(_))));
    }
}
