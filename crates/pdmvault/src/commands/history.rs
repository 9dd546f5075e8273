use crate::commands::VaultCtx;
use crate::error::Result;
use crate::model::{Item, VersionInfo};
use crate::store::VaultFs;
use serde::Serialize;

/// An item together with every version it has had, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ItemHistory {
    pub item: Item,
    pub dir: String,
    pub versions: Vec<VersionInfo>,
}

pub fn run<F: VaultFs>(ctx: &VaultCtx<F>, number: u64) -> Result<ItemHistory> {
    let item = ctx.catalog.get(number)?;
    let location = ctx.catalog.location(number)?;
    let versions = ctx.versions.history(&ctx.catalog.item_dir(number)?)?;
    Ok(ItemHistory {
        item,
        dir: location.dir,
        versions,
    })
}
