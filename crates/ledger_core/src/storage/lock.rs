use crate::error::LedgerError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Advisory lock on `<store>.lock`, held for the lifetime of the value.
///
/// Writers take it exclusively around load, apply and save, so separate
/// processes sharing one snapshot still commit one at a time.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn exclusive(store_path: &Path) -> Result<Self, LedgerError> {
        let lock = Self::open(store_path)?;
        FileExt::lock_exclusive(&lock.file)
            .map_err(|err| LedgerError::io(format!("{}: {}", lock.path.display(), err)))?;
        Ok(lock)
    }

    pub fn shared(store_path: &Path) -> Result<Self, LedgerError> {
        let lock = Self::open(store_path)?;
        FileExt::lock_shared(&lock.file)
            .map_err(|err| LedgerError::io(format!("{}: {}", lock.path.display(), err)))?;
        Ok(lock)
    }

    fn open(store_path: &Path) -> Result<Self, LedgerError> {
        let path = lock_path(store_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|err| LedgerError::io(format!("{}: {}", path.display(), err)))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::StoreLock;
    use fs2::FileExt;
    use std::fs::File;

    #[test]
    fn lock_file_sits_next_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("ledger.json");

        let lock = StoreLock::exclusive(&store).unwrap();
        assert_eq!(lock.path(), dir.path().join("ledger.json.lock"));
        assert!(lock.path().exists());
    }

    #[test]
    fn exclusive_lock_blocks_other_handles_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("ledger.json");

        let lock = StoreLock::exclusive(&store).unwrap();
        let other = File::open(lock.path()).unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_err());

        drop(lock);
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
        FileExt::unlock(&other).unwrap();
    }
}
