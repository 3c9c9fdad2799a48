use crate::backup::driver::StorageBackend;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::validate_dir_exist;

use getset::Getters;

use std::path::{Path, PathBuf};

/// Keeps iterations as plain files directly under `dir`.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct FsBackend {
    dir: PathBuf,
}

impl FsBackend {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        validate_dir_exist(&dir).map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self { dir })
    }
}

impl StorageBackend for FsBackend {
    /// Copies next to the target first, then renames, so a partial copy never
    /// carries an iteration name.
    fn save_file(&mut self, local: &Path, remote_name: &str) -> Result<()> {
        let target = self.dir.join(remote_name);
        let target_tmp = self.dir.join(format!("{remote_name}.tmp"));

        let res = std::fs::copy(local, &target_tmp)
            .and_then(|_| std::fs::rename(&target_tmp, &target))
            .map_err(Error::from);
        if let Err(e) = res {
            let e = match std::fs::remove_file(&target_tmp) {
                Err(e2) if e2.kind() != std::io::ErrorKind::NotFound => e.chain(e2.into()),
                _ => e,
            };
            return Err(e.with_msg(format!("Copying {:?} to {:?} failed", local, target)));
        }

        tracing::debug!("Copied {:?} to {:?}", local, target);
        Ok(())
    }

    fn delete_file(&mut self, remote_name: &str) -> Result<()> {
        let target = self.dir.join(remote_name);
        std::fs::remove_file(&target)
            .map_err(Error::from)
            .with_msg(format!("Removing {:?} failed", target))
    }

    fn list_files(&mut self) -> Result<Vec<String>> {
        std::fs::read_dir(&self.dir)?
            .map(|entry| {
                entry
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .map_err(Error::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::driver::Driver;
    use itertools::Itertools;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_new_requires_directory() {
        let dir = TempDir::new().unwrap();
        assert!(FsBackend::new(dir.path()).is_ok());
        assert!(matches!(
            FsBackend::new(dir.path().join("missing")),
            Err(Error::InvalidInput(_))
        ));

        let file = dir.path().join("file");
        std::fs::write(&file, "content").unwrap();
        assert!(matches!(FsBackend::new(&file), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_save_list_delete() {
        let dir = TempDir::new().unwrap();
        let mut backend = FsBackend::new(dir.path()).unwrap();

        let mut local = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut local, b"archive").unwrap();

        backend.save_file(local.path(), "s.bak1").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("s.bak1")).unwrap(),
            "archive"
        );
        assert!(!dir.path().join("s.bak1.tmp").exists());

        std::fs::write(dir.path().join("unrelated"), "x").unwrap();
        assert_eq!(
            backend.list_files().unwrap().into_iter().sorted().collect_vec(),
            vec!["s.bak1", "unrelated"]
        );

        backend.delete_file("s.bak1").unwrap();
        assert!(!dir.path().join("s.bak1").exists());
        assert!(backend.delete_file("s.bak1").is_err());
    }

    #[test]
    fn test_save_missing_local_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let mut backend = FsBackend::new(dir.path()).unwrap();

        assert!(backend
            .save_file(&dir.path().join("missing"), "s.bak1")
            .is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_driver_over_fs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.zip.bak1"), "1").unwrap();
        std::fs::write(dir.path().join("x.zip.bak3"), "3").unwrap();
        std::fs::write(dir.path().join("other"), "o").unwrap();

        let mut driver = Driver::new(FsBackend::new(dir.path()).unwrap());
        driver.set_name("x.zip").unwrap();
        assert_eq!(driver.iterations().unwrap(), &[1, 3]);
        assert_eq!(driver.current_iteration().unwrap(), 3);

        let local = NamedTempFile::new().unwrap();
        driver.save(local.path()).unwrap();
        assert!(dir.path().join("x.zip.bak4").is_file());

        driver.delete(1).unwrap();
        assert!(!dir.path().join("x.zip.bak1").exists());
        assert_eq!(driver.iterations().unwrap(), &[3, 4]);
    }
}
