use crate::commands::VaultCtx;
use crate::error::{Result, VaultError};
use crate::model::Item;
use crate::store::VaultFs;

/// Renames the live item called `old` to `new`.
pub fn run<F: VaultFs>(ctx: &VaultCtx<F>, old: &str, new: &str) -> Result<Item> {
    let number = resolve(ctx, old)?.ok_or_else(|| VaultError::NameNotFound(old.to_string()))?;
    ctx.catalog.rename(number, new)
}

pub fn resolve<F: VaultFs>(ctx: &VaultCtx<F>, name: &str) -> Result<Option<u64>> {
    ctx.catalog.resolve(name)
}
