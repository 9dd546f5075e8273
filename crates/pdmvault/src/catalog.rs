//! # Index Catalog
//!
//! The authoritative record of which items exist: number, current name, rename
//! history and location. It is backed by three root tables:
//!
//! - `All Files.txt`: `<number>=<current_name>` followed by `<old_name,YYYY-MM-DD>`
//!   groups, oldest first.
//! - `FileLocation.txt`: `<number>=<relative_dir>`.
//! - `IndexNumber.txt`: the last number issued.
//!
//! ## Concurrency
//!
//! The tables have no transactional storage behind them. Every mutation therefore
//! takes the vault's advisory lock (failing fast with `CatalogBusy`), re-reads the
//! tables it touches, applies the change, persists it, and reads it back. Inserts
//! append; edits and removals rewrite the table atomically.
//!
//! Names are unique across the whole vault among live items.

use crate::error::{Result, VaultError};
use crate::model::{today, validate_name, Item, ItemDir, Location, Rename};
use crate::store::VaultFs;
use crate::tables::{self, ALL_FILES, LOCATIONS, VAULT_LOCK};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_item(item: &Item) -> String {
    let mut value = item.current_name.clone();
    for rename in &item.rename_history {
        value.push_str(&format!(
            "<{},{}>",
            rename.old_name,
            rename.date.format(DATE_FORMAT)
        ));
    }
    value
}

pub fn decode_item(line: usize, number: u64, value: &str) -> Result<Item> {
    let parse_err = |reason: String| VaultError::Parse {
        file: ALL_FILES.to_string(),
        line,
        reason,
    };

    let (name, mut rest) = match value.find('<') {
        Some(pos) => (&value[..pos], &value[pos..]),
        None => (value, ""),
    };
    let mut item = Item::new(number, name);

    while !rest.is_empty() {
        let group = rest
            .strip_prefix('<')
            .and_then(|r| r.split_once('>'))
            .ok_or_else(|| parse_err(format!("unterminated rename group in {:?}", value)))?;
        let (body, tail) = group;
        let (old_name, date) = body
            .rsplit_once(',')
            .ok_or_else(|| parse_err(format!("rename group without date: {:?}", body)))?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| parse_err(format!("bad rename date: {:?}", date)))?;
        item.rename_history.push(Rename {
            old_name: old_name.to_string(),
            date,
        });
        rest = tail;
    }
    Ok(item)
}

/// Counter and table state that `doctor` adjusts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRepair {
    pub dropped: Vec<u64>,
    pub counter_raised_to: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Catalog<F: VaultFs> {
    fs: F,
}

impl<F: VaultFs> Catalog<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    fn exclusive(&self) -> Result<F::Guard> {
        self.fs.try_lock(Path::new(VAULT_LOCK))
    }

    fn load_items(&self) -> Result<Vec<Item>> {
        let path = Path::new(ALL_FILES);
        if !self.fs.is_file(path) {
            return Err(VaultError::NotFound(path.to_path_buf()));
        }
        let text = self.fs.read_to_string(path)?;
        let mut items = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some((number, value)) = tables::parse_line(ALL_FILES, idx + 1, line)? {
                items.push(decode_item(idx + 1, number, &value)?);
            }
        }
        Ok(items)
    }

    fn load_locations(&self) -> Result<Vec<Location>> {
        Ok(tables::read_rows(&self.fs, LOCATIONS)?
            .into_iter()
            .map(|(number, dir)| Location { number, dir })
            .collect())
    }

    fn persist_items(&self, items: &[Item]) -> Result<Vec<Item>> {
        let encoded: Vec<(u64, String)> = items
            .iter()
            .map(|item| (item.number, encode_item(item)))
            .collect();
        tables::write_rows(
            &self.fs,
            ALL_FILES,
            encoded.iter().map(|(n, v)| (*n, v.as_str())),
        )?;
        let after = self.load_items()?;
        debug!(items = after.len(), "catalog refreshed after write");
        Ok(after)
    }

    fn persist_locations(&self, locations: &[Location]) -> Result<()> {
        tables::write_rows(
            &self.fs,
            LOCATIONS,
            locations.iter().map(|l| (l.number, l.dir.as_str())),
        )?;
        let after = self.load_locations()?;
        debug!(locations = after.len(), "locations refreshed after write");
        Ok(())
    }

    fn ensure_name_free(items: &[Item], name: &str, except: Option<u64>) -> Result<()> {
        let taken = items
            .iter()
            .any(|item| item.current_name == name && Some(item.number) != except);
        if taken {
            return Err(VaultError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn next_number(&self) -> Result<u64> {
        let number = tables::read_counter(&self.fs)? + 1;
        tables::write_counter(&self.fs, number)?;
        Ok(number)
    }

    /// Appends a fresh item row and its location. Caller holds the vault lock.
    fn append_item(&self, number: u64, name: &str, dir: &str) -> Result<()> {
        tables::append_row(&self.fs, ALL_FILES, number, &encode_item(&Item::new(number, name)))?;
        tables::append_row(&self.fs, LOCATIONS, number, dir)?;

        let after = self.load_items()?;
        debug!(items = after.len(), "catalog refreshed after insert");
        info!(number, name, dir, "item registered");
        Ok(())
    }

    /// All live items, in catalog order.
    pub fn items(&self) -> Result<Vec<Item>> {
        self.load_items()
    }

    pub fn locations(&self) -> Result<Vec<Location>> {
        self.load_locations()
    }

    pub fn get(&self, number: u64) -> Result<Item> {
        self.load_items()?
            .into_iter()
            .find(|item| item.number == number)
            .ok_or(VaultError::ItemNotFound(number))
    }

    pub fn location(&self, number: u64) -> Result<Location> {
        self.load_locations()?
            .into_iter()
            .find(|loc| loc.number == number)
            .ok_or(VaultError::ItemNotFound(number))
    }

    pub fn item_dir(&self, number: u64) -> Result<ItemDir> {
        let location = self.location(number)?;
        Ok(ItemDir::new(number, &location.dir))
    }

    pub fn counter(&self) -> Result<u64> {
        tables::read_counter(&self.fs)
    }

    /// Issues the next item number without cataloguing anything.
    ///
    /// The number is consumed even if the caller never inserts it.
    pub fn reserve_number(&self) -> Result<u64> {
        let _guard = self.exclusive()?;
        let number = self.next_number()?;
        debug!(number, "item number reserved");
        Ok(number)
    }

    /// Catalogs an item under a number obtained from [`Catalog::reserve_number`].
    pub fn insert(&self, number: u64, name: &str, dir: &str) -> Result<()> {
        validate_name(name)?;
        let _guard = self.exclusive()?;
        let items = self.load_items()?;
        Self::ensure_name_free(&items, name, None)?;
        if items.iter().any(|item| item.number == number) {
            return Err(VaultError::DuplicateName(format!("item {}", number)));
        }

        self.append_item(number, name, dir)
    }

    /// Allocates a number and catalogs `name` at `dir` in one step.
    pub fn register(&self, name: &str, dir: &str) -> Result<u64> {
        validate_name(name)?;
        let _guard = self.exclusive()?;
        let items = self.load_items()?;
        Self::ensure_name_free(&items, name, None)?;

        let number = self.next_number()?;
        self.append_item(number, name, dir)?;
        Ok(number)
    }

    /// Renames an item, recording the old name with today's date.
    pub fn rename(&self, number: u64, new_name: &str) -> Result<Item> {
        validate_name(new_name)?;
        let _guard = self.exclusive()?;
        let mut items = self.load_items()?;
        Self::ensure_name_free(&items, new_name, Some(number))?;

        let item = items
            .iter_mut()
            .find(|item| item.number == number)
            .ok_or(VaultError::ItemNotFound(number))?;
        if item.current_name == new_name {
            return Ok(item.clone());
        }
        let old_name = std::mem::replace(&mut item.current_name, new_name.to_string());
        item.rename_history.push(Rename {
            old_name: old_name.clone(),
            date: today(),
        });

        let after = self.persist_items(&items)?;
        info!(number, from = %old_name, to = new_name, "item renamed");
        after
            .into_iter()
            .find(|item| item.number == number)
            .ok_or(VaultError::ItemNotFound(number))
    }

    /// Linear scan over current names.
    pub fn resolve(&self, name: &str) -> Result<Option<u64>> {
        Ok(self
            .load_items()?
            .into_iter()
            .find(|item| item.current_name == name)
            .map(|item| item.number))
    }

    /// Drops the item and location entries of the live item called `name`.
    /// The counter is left alone, so the number is never issued again.
    pub fn remove(&self, name: &str) -> Result<Option<u64>> {
        let _guard = self.exclusive()?;
        let mut items = self.load_items()?;
        let Some(pos) = items.iter().position(|item| item.current_name == name) else {
            return Ok(None);
        };
        let number = items.remove(pos).number;
        self.persist_items(&items)?;

        let mut locations = self.load_locations()?;
        locations.retain(|loc| loc.number != number);
        self.persist_locations(&locations)?;

        info!(number, name, "item removed from catalog");
        Ok(Some(number))
    }

    /// Points an item's location record at a new directory, adding the record
    /// if only the item entry survived.
    pub fn relocate(&self, number: u64, dir: &str) -> Result<()> {
        let _guard = self.exclusive()?;
        if !self.load_items()?.iter().any(|item| item.number == number) {
            return Err(VaultError::ItemNotFound(number));
        }
        let mut locations = self.load_locations()?;
        match locations.iter_mut().find(|loc| loc.number == number) {
            Some(location) => location.dir = dir.to_string(),
            None => locations.push(Location {
                number,
                dir: dir.to_string(),
            }),
        }
        self.persist_locations(&locations)?;
        info!(number, dir, "item relocated");
        Ok(())
    }

    /// Drops entries for the given numbers and raises the counter to at least
    /// `min_counter`.
    pub fn repair(&self, drop: &[u64], min_counter: u64) -> Result<CatalogRepair> {
        let _guard = self.exclusive()?;
        let mut repair = CatalogRepair::default();

        if !drop.is_empty() {
            let mut items = self.load_items()?;
            let before = items.len();
            items.retain(|item| !drop.contains(&item.number));
            if items.len() != before {
                self.persist_items(&items)?;
            }
            let mut locations = self.load_locations()?;
            locations.retain(|loc| !drop.contains(&loc.number));
            self.persist_locations(&locations)?;
            repair.dropped = drop.to_vec();
        }

        if tables::read_counter(&self.fs)? < min_counter {
            tables::write_counter(&self.fs, min_counter)?;
            repair.counter_raised_to = Some(min_counter);
        }
        Ok(repair)
    }
}
