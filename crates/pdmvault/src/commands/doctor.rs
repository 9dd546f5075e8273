//! Reconciles the catalog with the item containers actually on disk.
//!
//! Every operation writes its filesystem side before its catalog side, so a crash
//! leaves one of two shapes behind: a container the catalog does not know about,
//! or a catalog entry pointing at a directory the container has left. `doctor`
//! re-points entries whose container turned up elsewhere, adopts orphans, drops
//! entries with no container at all, drops lock records of unknown items, and
//! makes sure the counter is at least the highest number found anywhere so no
//! number is issued twice.

use crate::commands::VaultCtx;
use crate::error::Result;
use crate::model::{dir_path, ItemDir};
use crate::store::VaultFs;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    /// Catalogued items whose container was found in another directory.
    pub relocated: Vec<(u64, String)>,
    /// Orphan containers adopted into the catalog, with the name they got.
    pub adopted: Vec<(u64, String)>,
    /// Catalog entries dropped because their container is missing.
    pub dropped_entries: Vec<u64>,
    pub dropped_locks: Vec<u64>,
    pub counter_raised_to: Option<u64>,
}

impl DoctorReport {
    pub fn is_clean(&self) -> bool {
        self.relocated.is_empty()
            && self.adopted.is_empty()
            && self.dropped_entries.is_empty()
            && self.dropped_locks.is_empty()
            && self.counter_raised_to.is_none()
    }
}

#[derive(Debug)]
struct FoundContainer {
    dir: String,
    tombstoned: bool,
}

/// Walks the vault for numbered containers, without descending into them.
fn scan<F: VaultFs>(
    ctx: &VaultCtx<F>,
    dir: &str,
    found: &mut BTreeMap<u64, FoundContainer>,
) -> Result<()> {
    let base = dir_path(dir);
    for child in ctx.fs.read_dir(&base)? {
        if !child.is_dir || child.name.starts_with('.') {
            continue;
        }
        if let Ok(number) = child.name.parse::<u64>() {
            let item = ItemDir::new(number, dir);
            if ctx.versions.is_container(&item.path) {
                if let Some(previous) = found.get(&number) {
                    warn!(number, first = %previous.dir, second = %dir, "item container found twice");
                    continue;
                }
                found.insert(
                    number,
                    FoundContainer {
                        dir: dir.to_string(),
                        tombstoned: ctx.versions.is_tombstoned(&item),
                    },
                );
            }
            continue;
        }
        let sub = if dir.is_empty() {
            child.name
        } else {
            format!("{}/{}", dir, child.name)
        };
        scan(ctx, &sub, found)?;
    }
    Ok(())
}

pub fn run<F: VaultFs>(ctx: &VaultCtx<F>) -> Result<DoctorReport> {
    let mut found = BTreeMap::new();
    scan(ctx, "", &mut found)?;

    let items = ctx.catalog.items()?;
    let locations = ctx.catalog.locations()?;
    let mut report = DoctorReport::default();

    // Catalog entries must point at a live container. One that moved keeps its
    // name and history and only gets its location fixed.
    let mut stale = Vec::new();
    for item in &items {
        let location = locations.iter().find(|l| l.number == item.number);
        let healthy = location.is_some_and(|loc| {
            let dir = ItemDir::new(item.number, &loc.dir);
            ctx.versions.is_container(&dir.path) && !ctx.versions.is_tombstoned(&dir)
        });
        if healthy {
            continue;
        }
        match found.get(&item.number) {
            Some(container) if !container.tombstoned => {
                warn!(number = item.number, dir = %container.dir, "container moved; fixing location");
                ctx.catalog.relocate(item.number, &container.dir)?;
                report.relocated.push((item.number, container.dir.clone()));
            }
            _ => stale.push(item.number),
        }
    }
    let catalogued: HashSet<u64> = items.iter().map(|i| i.number).collect();
    stale.extend(
        locations
            .iter()
            .map(|l| l.number)
            .filter(|n| !catalogued.contains(n)),
    );

    let highest = found
        .keys()
        .copied()
        .chain(catalogued.iter().copied())
        .max()
        .unwrap_or(0);
    let repair = ctx.catalog.repair(&stale, highest)?;
    report.dropped_entries = repair.dropped;
    report.counter_raised_to = repair.counter_raised_to;

    // Orphans: live containers the catalog does not know about.
    let mut live_names: HashSet<String> = ctx
        .catalog
        .items()?
        .into_iter()
        .map(|i| i.current_name)
        .collect();
    for (number, container) in &found {
        if container.tombstoned || (catalogued.contains(number) && !stale.contains(number)) {
            continue;
        }
        let item = ItemDir::new(*number, &container.dir);
        let Some(latest) = ctx.versions.latest_version(&item)? else {
            continue;
        };
        let mut name = latest.file_name;
        if live_names.contains(&name) {
            name = format!("{} ({})", name, number);
        }
        ctx.catalog.insert(*number, &name, &container.dir)?;
        live_names.insert(name.clone());
        report.adopted.push((*number, name));
    }

    let known: HashSet<u64> = ctx.catalog.items()?.into_iter().map(|i| i.number).collect();
    report.dropped_locks = ctx.locks.retain(|n| known.contains(&n))?;

    if report.is_clean() {
        info!("doctor found no inconsistencies");
    } else {
        info!(
            relocated = report.relocated.len(),
            adopted = report.adopted.len(),
            dropped_entries = report.dropped_entries.len(),
            dropped_locks = report.dropped_locks.len(),
            counter = ?report.counter_raised_to,
            "doctor repaired the vault"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{history, import, listing, move_item, remove, versioning};
    use crate::error::VaultError;
    use crate::model::SourceFile;
    use crate::tables;
    use crate::test_utils::{mem_ctx, source};
    use std::path::Path;

    #[test]
    fn clean_vault_reports_nothing() {
        let ctx = mem_ctx("alice");
        import::run(&ctx, "", &source("a.doc", b"x"), "d", &[]).unwrap();
        assert!(run(&ctx).unwrap().is_clean());
    }

    #[test]
    fn adopts_orphan_container() {
        let ctx = mem_ctx("alice");
        // A crash after writing the container but before cataloguing it.
        let n = ctx.catalog.reserve_number().unwrap();
        let item = ItemDir::new(n, "");
        ctx.fs.create_dir_all(&item.path).unwrap();
        ctx.versions
            .create_version(
                &ctx.locks,
                "alice",
                &item,
                &SourceFile {
                    name: "orphan.doc".into(),
                    bytes: b"x".to_vec(),
                },
                "d",
                &[],
            )
            .unwrap();

        let report = run(&ctx).unwrap();
        assert_eq!(report.adopted, vec![(n, "orphan.doc".to_string())]);
        assert_eq!(ctx.catalog.resolve("orphan.doc").unwrap(), Some(n));
        assert!(run(&ctx).unwrap().is_clean());
    }

    #[test]
    fn adopted_name_collision_gets_suffix() {
        let ctx = mem_ctx("alice");
        import::run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        let item = ItemDir::new(7, "");
        ctx.fs.create_dir_all(&item.path).unwrap();
        ctx.versions
            .create_version(&ctx.locks, "alice", &item, &source("part.doc", b"y"), "d", &[])
            .unwrap();

        let report = run(&ctx).unwrap();
        assert_eq!(report.adopted, vec![(7, "part.doc (7)".to_string())]);
        assert_eq!(report.counter_raised_to, Some(7));
        assert_eq!(
            import::run(&ctx, "", &source("next.doc", b"z"), "d", &[]).unwrap(),
            8
        );
    }

    #[test]
    fn drops_entries_without_container_and_their_locks() {
        let ctx = mem_ctx("alice");
        let n = import::run(&ctx, "", &source("a.doc", b"x"), "d", &[]).unwrap();
        versioning::checkout(&ctx, n).unwrap();
        tables::append_row(&ctx.fs, tables::LOCKED, 99, "ghost").unwrap();

        let ledger = ctx.catalog.item_dir(n).unwrap().path.join(crate::versions::LEDGER);
        ctx.fs.remove_file(&ledger).unwrap();

        let report = run(&ctx).unwrap();
        assert_eq!(report.dropped_entries, vec![n]);
        let mut locks = report.dropped_locks.clone();
        locks.sort();
        assert_eq!(locks, vec![n, 99]);
        assert!(ctx.catalog.items().unwrap().is_empty());
    }

    #[test]
    fn tombstoned_containers_stay_removed() {
        let ctx = mem_ctx("alice");
        import::run(&ctx, "", &source("a.doc", b"x"), "d", &[]).unwrap();
        remove::run(&ctx, "a.doc").unwrap();
        let report = run(&ctx).unwrap();
        assert!(report.adopted.is_empty());
        assert!(ctx.catalog.resolve("a.doc").unwrap().is_none());
    }

    #[test]
    fn finds_containers_in_subdirectories() {
        let ctx = mem_ctx("alice");
        ctx.fs.create_dir_all(Path::new("parts/bolts")).unwrap();
        let item = ItemDir::new(3, "parts/bolts");
        ctx.fs.create_dir_all(&item.path).unwrap();
        ctx.versions
            .create_version(&ctx.locks, "alice", &item, &source("m6.doc", b"y"), "d", &[])
            .unwrap();

        let report = run(&ctx).unwrap();
        assert_eq!(report.adopted, vec![(3, "m6.doc".to_string())]);
        assert_eq!(ctx.catalog.location(3).unwrap().dir, "parts/bolts");
    }

    #[test]
    fn moved_container_keeps_name_and_history() {
        let ctx = mem_ctx("alice");
        listing::mkdir(&ctx, "archive").unwrap();
        let n = import::run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        ctx.catalog.rename(n, "part-v2.doc").unwrap();
        // The container left its directory but the catalog was never told.
        ctx.fs
            .rename(&ItemDir::new(n, "").path, &ItemDir::new(n, "archive").path)
            .unwrap();

        let report = run(&ctx).unwrap();
        assert_eq!(report.relocated, vec![(n, "archive".to_string())]);
        assert!(report.adopted.is_empty());
        assert!(report.dropped_entries.is_empty());

        let item = ctx.catalog.get(n).unwrap();
        assert_eq!(item.current_name, "part-v2.doc");
        assert_eq!(item.rename_history.len(), 1);
        assert_eq!(ctx.catalog.resolve("part-v2.doc").unwrap(), Some(n));
        assert_eq!(ctx.catalog.location(n).unwrap().dir, "archive");
        assert_eq!(history::run(&ctx, n).unwrap().versions.len(), 1);
        assert!(run(&ctx).unwrap().is_clean());
    }

    #[test]
    fn busy_move_leaves_nothing_to_repair() {
        let ctx = mem_ctx("alice");
        listing::mkdir(&ctx, "archive").unwrap();
        let n = import::run(&ctx, "", &source("part.doc", b"x"), "d", &[]).unwrap();
        ctx.catalog.rename(n, "part-v2.doc").unwrap();

        let held = ctx.fs.try_lock(Path::new(tables::VAULT_LOCK)).unwrap();
        assert!(matches!(
            move_item::run(&ctx, n, "archive"),
            Err(VaultError::CatalogBusy)
        ));
        drop(held);

        assert!(run(&ctx).unwrap().is_clean());
        assert_eq!(ctx.catalog.resolve("part-v2.doc").unwrap(), Some(n));
        assert_eq!(ctx.catalog.get(n).unwrap().rename_history.len(), 1);
    }
}
