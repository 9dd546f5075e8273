use crate::commands::VaultCtx;
use crate::error::{Result, VaultError};
use crate::metadata::{self, DocumentProperties};
use crate::model::{dir_path, normalize_dir, ListFilter, Listing};
use crate::store::VaultFs;
use tracing::info;

pub fn list<F: VaultFs>(ctx: &VaultCtx<F>, dir: &str, filter: ListFilter) -> Result<Listing> {
    ctx.view.list(&normalize_dir(dir)?, filter)
}

pub fn purge<F: VaultFs>(ctx: &VaultCtx<F>, dir: &str) -> Result<usize> {
    ctx.view.purge(&normalize_dir(dir)?)
}

/// Creates a directory (and its parents) inside the vault.
pub fn mkdir<F: VaultFs>(ctx: &VaultCtx<F>, dir: &str) -> Result<String> {
    let dir = normalize_dir(dir)?;
    if dir.is_empty() {
        return Err(VaultError::InvalidName(dir));
    }
    let path = dir_path(&dir);
    ctx.fs.create_dir_all(&path)?;
    ctx.own(&path)?;
    info!(dir = %dir, "directory created");
    Ok(dir)
}

/// Reads the properties of an item's latest document.
pub fn inspect<F: VaultFs>(ctx: &VaultCtx<F>, number: u64) -> Result<DocumentProperties> {
    let item = ctx.catalog.item_dir(number)?;
    let latest = ctx
        .versions
        .latest_version(&item)?
        .ok_or(VaultError::ItemNotFound(number))?;
    let bytes = ctx
        .fs
        .read(&ctx.versions.version_dir(&item, latest.sequence).join(latest.file_name))?;
    metadata::inspect_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::import;
    use crate::model::{DocumentVariant, EntryKind};
    use crate::test_utils::{document_xml, fcstd_bytes, mem_ctx, source};

    #[test]
    fn import_then_list_shows_one_classified_entry() {
        let ctx = mem_ctx("alice");
        let before = list(&ctx, "", ListFilter::default()).unwrap();
        assert!(before.entries.is_empty());

        let objects = r#"<Object name="a"><Properties>
            <Property name="a2p_Version" type="App::PropertyString"><String value="0.4"/></Property>
        </Properties></Object>"#;
        let bytes = fcstd_bytes(&document_xml("Assy", objects), false);
        import::run(&ctx, "", &source("assy.FCStd", &bytes), "d", &[]).unwrap();

        let after = list(&ctx, ".", ListFilter::default()).unwrap();
        assert_eq!(after.entries.len(), 1);
        assert_eq!(after.entries[0].name, "assy.FCStd");
        assert_eq!(
            after.entries[0].kind,
            EntryKind::VersionedDocument(DocumentVariant::A2plus)
        );
    }

    #[test]
    fn mkdir_rejects_numeric_and_root() {
        let ctx = mem_ctx("alice");
        assert_eq!(mkdir(&ctx, "parts/bolts").unwrap(), "parts/bolts");
        assert!(matches!(mkdir(&ctx, "parts/12"), Err(VaultError::InvalidName(_))));
        assert!(matches!(mkdir(&ctx, "/"), Err(VaultError::InvalidName(_))));

        let listing = list(&ctx, "parts", ListFilter::default()).unwrap();
        assert!(listing.entries[0].is_dir());
    }

    #[test]
    fn inspect_reads_latest_document() {
        let ctx = mem_ctx("alice");
        let bytes = fcstd_bytes(&document_xml("Bracket", ""), true);
        let n = import::run(&ctx, "", &source("bracket.FCStd", &bytes), "d", &[]).unwrap();
        let props = inspect(&ctx, n).unwrap();
        assert_eq!(props.label.as_deref(), Some("Bracket"));
        assert!(props.thumbnail.is_some());
    }

    #[test]
    fn inspect_surfaces_corruption() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source("notes.txt", b"hello"), "d", &[]).unwrap();
        assert!(matches!(
            inspect(&ctx, n),
            Err(VaultError::CorruptDocument(_))
        ));
    }
}
