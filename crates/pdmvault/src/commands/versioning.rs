use crate::commands::VaultCtx;
use crate::error::{Result, VaultError};
use crate::model::{LockStatus, SourceFile};
use crate::store::VaultFs;
use crate::versions::LEDGER;
use tracing::info;

pub fn checkout<F: VaultFs>(ctx: &VaultCtx<F>, number: u64) -> Result<()> {
    ctx.catalog.get(number)?;
    ctx.locks.checkout(number, ctx.user()?)
}

/// Releases the caller's lock. Returns `false` if the item was not checked out.
pub fn checkin<F: VaultFs>(ctx: &VaultCtx<F>, number: u64) -> Result<bool> {
    ctx.catalog.get(number)?;
    ctx.locks.checkin(number, ctx.user()?)
}

/// Adds the next version of an item from `source`.
pub fn new_version<F: VaultFs>(
    ctx: &VaultCtx<F>,
    number: u64,
    source: &SourceFile,
    description: &str,
    long_description: &[String],
) -> Result<u32> {
    let item = ctx.catalog.item_dir(number)?;
    if ctx.versions.is_tombstoned(&item) {
        return Err(VaultError::ItemNotFound(number));
    }
    let sequence = ctx.versions.create_version(
        &ctx.locks,
        ctx.user()?,
        &item,
        source,
        description,
        long_description,
    )?;
    ctx.own(&ctx.versions.version_dir(&item, sequence))?;
    ctx.own(&item.path.join(LEDGER))?;
    Ok(sequence)
}

/// Stores `source` as a new version and releases the lock in one step.
pub fn commit<F: VaultFs>(
    ctx: &VaultCtx<F>,
    number: u64,
    source: &SourceFile,
    description: &str,
    long_description: &[String],
) -> Result<u32> {
    match ctx.locks.status(number)? {
        LockStatus::LockedBy(holder) if holder == ctx.user()? => {}
        LockStatus::LockedBy(holder) => return Err(VaultError::LockConflict { number, holder }),
        LockStatus::Unlocked => return Err(VaultError::NotCheckedOut(number)),
    }
    let sequence = new_version(ctx, number, source, description, long_description)?;
    checkin(ctx, number)?;
    Ok(sequence)
}

pub fn status<F: VaultFs>(ctx: &VaultCtx<F>, number: u64) -> Result<LockStatus> {
    ctx.catalog.get(number)?;
    ctx.locks.status(number)
}

/// Administrative unlock. Returns the holder that was evicted, if any.
pub fn force_checkin<F: VaultFs>(ctx: &VaultCtx<F>, number: u64) -> Result<Option<String>> {
    let previous = ctx.locks.force_checkin(number)?;
    if let Some(holder) = &previous {
        info!(number, holder = %holder, by = ?ctx.user, "forced checkin");
    }
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::import;
    use crate::test_utils::{mem_ctx, mem_ctx_on, source};

    #[test]
    fn alice_and_bob_take_turns() {
        let alice = mem_ctx("alice");
        let bob = mem_ctx_on(&alice.fs, "bob");
        let n = import::run(&alice, "", &source("part.doc", b"x"), "d", &[]).unwrap();

        checkout(&alice, n).unwrap();
        match checkout(&bob, n) {
            Err(VaultError::LockConflict { holder, .. }) => assert_eq!(holder, "alice"),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(checkin(&alice, n).unwrap());
        checkout(&bob, n).unwrap();
        assert_eq!(status(&alice, n).unwrap(), LockStatus::LockedBy("bob".into()));
    }

    #[test]
    fn new_version_refused_while_other_holds_lock() {
        let alice = mem_ctx("alice");
        let bob = mem_ctx_on(&alice.fs, "bob");
        let n = import::run(&alice, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        checkout(&bob, n).unwrap();

        assert!(matches!(
            new_version(&alice, n, &source("part.doc", b"y"), "d", &[]),
            Err(VaultError::LockConflict { .. })
        ));
        assert_eq!(new_version(&bob, n, &source("part.doc", b"y"), "d", &[]).unwrap(), 2);
    }

    #[test]
    fn commit_requires_holding_the_lock() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        assert!(matches!(
            commit(&ctx, n, &source("part.doc", b"y"), "d", &[]),
            Err(VaultError::NotCheckedOut(_))
        ));

        checkout(&ctx, n).unwrap();
        assert_eq!(commit(&ctx, n, &source("part.doc", b"y"), "v2", &[]).unwrap(), 2);
        assert_eq!(status(&ctx, n).unwrap(), LockStatus::Unlocked);
    }

    #[test]
    fn unknown_items_are_reported() {
        let ctx = mem_ctx("alice");
        assert!(matches!(checkout(&ctx, 42), Err(VaultError::ItemNotFound(42))));
        assert!(matches!(status(&ctx, 42), Err(VaultError::ItemNotFound(42))));
    }

    #[test]
    fn force_checkin_evicts_holder() {
        let alice = mem_ctx("alice");
        let admin = mem_ctx_on(&alice.fs, "admin");
        let n = import::run(&alice, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        checkout(&alice, n).unwrap();
        assert_eq!(force_checkin(&admin, n).unwrap(), Some("alice".to_string()));
        assert_eq!(status(&admin, n).unwrap(), LockStatus::Unlocked);
    }
}
