use super::{DirEntry, VaultFs};
use crate::error::{Result, VaultError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Vault storage over a real directory tree.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn abs(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }
}

/// Releases the advisory lock when dropped.
#[derive(Debug)]
pub struct LocalLock {
    file: File,
}

impl Drop for LocalLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl VaultFs for LocalFs {
    type Guard = LocalLock;

    fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.abs(dir))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type()?.is_dir();
            entries.push(DirEntry { name, is_dir });
        }
        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.abs(path).is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.abs(path).is_file()
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        Ok(fs::metadata(self.abs(path))?.len())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(self.abs(path))?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(self.abs(path))?)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let target = self.abs(path);
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tmp = parent.join(format!(".{}-{}.tmp", file_name, Uuid::new_v4()));
        fs::write(&tmp, data)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn append(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.abs(path))?;
        file.write_all(data)?;
        file.sync_data()?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(self.abs(path))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(self.abs(from), self.abs(to))?;
        Ok(())
    }

    #[cfg(unix)]
    fn set_owner(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        std::os::unix::fs::chown(self.abs(path), Some(uid), Some(gid))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn set_owner(&self, _path: &Path, _uid: u32, _gid: u32) -> Result<()> {
        Err(VaultError::Unsupported("setting file ownership"))
    }

    fn try_lock(&self, path: &Path) -> Result<LocalLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.abs(path))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(LocalLock { file }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(VaultError::CatalogBusy)
            }
            Err(e) => Err(e.into()),
        }
    }
}
