use super::{DirEntry, VaultFs};
use crate::error::{Result, VaultError};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemTree {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    owners: HashMap<PathBuf, (u32, u32)>,
    locks: HashSet<PathBuf>,
}

/// In-memory vault storage. Clones share one tree.
#[derive(Debug, Clone)]
pub struct MemFs {
    inner: Arc<Mutex<MemTree>>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &Path) -> VaultError {
    VaultError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    ))
}

impl MemFs {
    pub fn new() -> Self {
        let mut tree = MemTree::default();
        tree.dirs.insert(PathBuf::new());
        Self {
            inner: Arc::new(Mutex::new(tree)),
        }
    }

    fn tree(&self) -> MutexGuard<'_, MemTree> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The (uid, gid) last applied to `path`, if any.
    pub fn owner(&self, path: &Path) -> Option<(u32, u32)> {
        self.tree().owners.get(path).copied()
    }

    fn require_parent(tree: &MemTree, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or(Path::new(""));
        if tree.dirs.contains(parent) {
            Ok(())
        } else {
            Err(not_found(parent))
        }
    }
}

/// Releases the in-memory lock when dropped.
#[derive(Debug)]
pub struct MemLock {
    inner: Arc<Mutex<MemTree>>,
    path: PathBuf,
}

impl Drop for MemLock {
    fn drop(&mut self) {
        let mut tree = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        tree.locks.remove(&self.path);
    }
}

impl VaultFs for MemFs {
    type Guard = MemLock;

    fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let tree = self.tree();
        if !tree.dirs.contains(dir) {
            return Err(not_found(dir));
        }
        let child_name = |p: &PathBuf| -> Option<String> {
            if p.parent() == Some(dir) {
                p.file_name().map(|n| n.to_string_lossy().into_owned())
            } else {
                None
            }
        };
        let mut entries: Vec<DirEntry> = tree
            .dirs
            .iter()
            .filter_map(|p| child_name(p).map(|name| DirEntry { name, is_dir: true }))
            .collect();
        entries.extend(
            tree.files
                .keys()
                .filter_map(|p| child_name(p).map(|name| DirEntry { name, is_dir: false })),
        );
        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.tree().dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.tree().files.contains_key(path)
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        self.tree()
            .files
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| not_found(path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree();
        for ancestor in path.ancestors() {
            if tree.files.contains_key(ancestor) {
                return Err(VaultError::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a file", ancestor.display()),
                )));
            }
            tree.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.tree()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut tree = self.tree();
        Self::require_parent(&tree, path)?;
        tree.files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn append(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut tree = self.tree();
        Self::require_parent(&tree, path)?;
        tree.files
            .entry(path.to_path_buf())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree();
        tree.owners.remove(path);
        tree.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut tree = self.tree();
        Self::require_parent(&tree, to)?;

        if let Some(data) = tree.files.remove(from) {
            tree.files.insert(to.to_path_buf(), data);
            return Ok(());
        }
        if !tree.dirs.contains(from) {
            return Err(not_found(from));
        }

        let moved_dirs: Vec<PathBuf> = tree
            .dirs
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved_dirs {
            tree.dirs.remove(&old);
            if let Ok(rest) = old.strip_prefix(from) {
                tree.dirs.insert(to.join(rest));
            }
        }
        let moved_files: Vec<PathBuf> = tree
            .files
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved_files {
            if let (Some(data), Ok(rest)) = (tree.files.remove(&old), old.strip_prefix(from)) {
                tree.files.insert(to.join(rest), data);
            }
        }
        Ok(())
    }

    fn set_owner(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        let mut tree = self.tree();
        if !tree.files.contains_key(path) && !tree.dirs.contains(path) {
            return Err(not_found(path));
        }
        tree.owners.insert(path.to_path_buf(), (uid, gid));
        Ok(())
    }

    fn try_lock(&self, path: &Path) -> Result<MemLock> {
        let mut tree = self.tree();
        if !tree.locks.insert(path.to_path_buf()) {
            return Err(VaultError::CatalogBusy);
        }
        Ok(MemLock {
            inner: Arc::clone(&self.inner),
            path: path.to_path_buf(),
        })
    }
}
