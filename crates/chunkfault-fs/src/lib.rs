//! Filesystem access on the storage node that holds the chunk store.
//!
//! All harness mutations of on-disk chunk data go through [`StorageNodeFs`]
//! so tests can run against a local scratch tree while a deployment can back
//! the same trait with a remote agent. [`LocalFs`] is the direct
//! `std::fs` implementation.

use std::fs;
use std::path::Path;

use chunkfault_error::Result;
use tracing::debug;

/// Filesystem operations the harness performs on a storage node.
///
/// Paths are the physical paths derived from catalog rows. Implementations
/// must treat `delete_dir` as recursive: chunk and volume directories are
/// removed with their entire contents.
pub trait StorageNodeFs {
    fn file_exists(&self, path: &Path) -> bool;
    fn dir_exists(&self, path: &Path) -> bool;

    /// File names (not full paths) of the regular files directly inside
    /// `dir`, in an unspecified order.
    fn list_files(&self, dir: &Path) -> Result<Vec<String>>;

    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or truncate `path` with the given contents.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn delete_file(&self, path: &Path) -> Result<()>;

    /// Remove `dir` and everything beneath it.
    fn delete_dir(&self, dir: &Path) -> Result<()>;

    /// Neutralize any delete-protection guarding `path` so subsequent
    /// deletions succeed. A no-op where no such protection exists.
    fn allow_delete(&self, path: &Path) -> Result<()>;
}

/// [`StorageNodeFs`] backed directly by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl StorageNodeFs for LocalFs {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        debug!(path = %path.display(), "deleted file");
        Ok(())
    }

    fn delete_dir(&self, dir: &Path) -> Result<()> {
        fs::remove_dir_all(dir)?;
        debug!(path = %dir.display(), "deleted directory tree");
        Ok(())
    }

    fn allow_delete(&self, _path: &Path) -> Result<()> {
        // Plain local filesystems carry no store-level delete protection.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn list_files_skips_subdirectories() {
        let dir = tempdir().expect("tempdir should be created");
        fs::write(dir.path().join("a.bin"), b"a").expect("file a should be written");
        fs::write(dir.path().join("b.bin"), b"b").expect("file b should be written");
        fs::create_dir(dir.path().join("nested")).expect("subdir should be created");

        let fs_impl = LocalFs::new();
        let mut names = fs_impl
            .list_files(dir.path())
            .expect("listing should succeed");
        names.sort();
        assert_eq!(names, vec!["a.bin".to_owned(), "b.bin".to_owned()]);
    }

    #[test]
    fn delete_dir_is_recursive() {
        let dir = tempdir().expect("tempdir should be created");
        let target = dir.path().join("volume");
        fs::create_dir_all(target.join("chunk")).expect("nested dirs should be created");
        fs::write(target.join("chunk").join("data"), b"x").expect("file should be written");

        let fs_impl = LocalFs::new();
        fs_impl
            .delete_dir(&target)
            .expect("recursive delete should succeed");
        assert!(!target.exists());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().expect("tempdir should be created");
        let path = dir.path().join("marker");
        let fs_impl = LocalFs::new();
        fs_impl
            .write_file(&path, b"payload")
            .expect("write should succeed");
        assert_eq!(
            fs_impl.read_file(&path).expect("read should succeed"),
            b"payload"
        );
    }

    #[test]
    fn missing_file_read_surfaces_io_error() {
        let dir = tempdir().expect("tempdir should be created");
        let err = LocalFs::new()
            .read_file(&dir.path().join("absent"))
            .expect_err("reading a missing file should fail");
        assert!(err.is_fatal());
    }
}
