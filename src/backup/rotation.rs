//! Rotating backup of one named series.

use crate::backup::archive::ArchiveBuilder;
use crate::backup::driver::{BackupName, Driver};
use crate::backup::logger::SharedLogger;
use crate::backup::repository::Repository;
use crate::backup::result_error::error::{ConfigurationError, Error};
use crate::backup::result_error::result::{chain_results, Result};
use crate::backup::retention::RetentionConfig;

use std::num::NonZeroUsize;
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Ties a series name, a [`Repository`], a [`Driver`] and a retention count together.
///
/// Every [`Backup::backup`] call is one independent run: build the archive,
/// `begin`, save it as the next iteration, drop the local copy, prune the oldest
/// iterations beyond the retention count, `end`. Runs for the same series must
/// not overlap, numbering is read-then-write on the backend.
#[derive(Debug)]
pub struct Backup {
    name: BackupName,
    repository: Option<Repository>,
    driver: Option<Driver>,
    retention: RetentionConfig,
    archive_builder: ArchiveBuilder,
    logger: Option<SharedLogger>,
}

impl Backup {
    /// New backup of series `name`, keeping 7 iterations. Fails with `InvalidName`.
    pub fn new(name: &str, logger: Option<SharedLogger>) -> Result<Self> {
        let name = BackupName::from_str(name)?;
        Ok(Self {
            name,
            repository: None,
            driver: None,
            retention: RetentionConfig::default(),
            archive_builder: ArchiveBuilder::builder().maybe_logger(logger.clone()).build(),
            logger,
        })
    }

    /// [`Backup::new`] followed by [`Backup::set_driver`].
    pub fn with_driver(name: &str, driver: Driver, logger: Option<SharedLogger>) -> Result<Self> {
        let mut backup = Self::new(name, logger)?;
        backup.set_driver(driver)?;
        Ok(backup)
    }

    pub fn name(&self) -> &BackupName {
        &self.name
    }

    /// Binds the series name and the logger to `driver`.
    pub fn set_driver(&mut self, mut driver: Driver) -> Result<()> {
        driver.set_name(&self.name)?;
        if let Some(logger) = &self.logger {
            driver.set_logger(logger.clone());
        }
        self.driver = Some(driver);
        Ok(())
    }

    /// Bound driver, if any.
    pub fn driver(&self) -> Option<&Driver> {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> Option<&mut Driver> {
        self.driver.as_mut()
    }

    /// Binds the manifest to archive. Fails with `EmptyRepository` when it has no entry.
    pub fn set_repository(&mut self, repository: Repository) -> Result<()> {
        if repository.is_empty() {
            return Err(ConfigurationError::EmptyRepository.into());
        }
        self.repository = Some(repository);
        Ok(())
    }

    /// Bound manifest, if any.
    pub fn repository(&self) -> Option<&Repository> {
        self.repository.as_ref()
    }

    /// Repository to register files and folders on, created empty if needed.
    pub fn repository_mut(&mut self) -> &mut Repository {
        self.repository.get_or_insert_with(Repository::new)
    }

    /// Number of iterations to keep, must be positive.
    pub fn set_number_iteration(&mut self, count: usize) -> Result<()> {
        let keep = NonZeroUsize::new(count).ok_or_else(|| {
            Error::InvalidInput(format!("The number of iteration {count} is not valid"))
        })?;
        self.retention = keep.into();
        Ok(())
    }

    pub fn number_iteration(&self) -> usize {
        self.retention.keep.get()
    }

    /// Adds an explicit entry for every folder when enabled.
    pub fn set_empty_dir_markers(&mut self, enabled: bool) {
        self.archive_builder = ArchiveBuilder::builder()
            .empty_dir_markers(enabled)
            .maybe_logger(self.logger.clone())
            .build();
    }

    /// Runs one backup.
    ///
    /// Once `begin` succeeded, `end` is always called and its failure is chained
    /// to any earlier one. A failed prune leaves the new iteration in place.
    pub fn backup(&mut self) -> Result<()> {
        let driver = self
            .driver
            .as_mut()
            .ok_or(Error::Configuration(ConfigurationError::DriverNotSet))?;
        let repository = self
            .repository
            .as_ref()
            .ok_or(Error::Configuration(ConfigurationError::RepositoryNotSet))?;
        if repository.is_empty() {
            return Err(ConfigurationError::EmptyRepository.into());
        }

        tracing::info!("Starting backup of {} ({} entries)", self.name, repository.len());
        let archive = self
            .archive_builder
            .build_temp_file(repository, &format!("{}.", self.name))?;

        if let Err(e) = driver.begin() {
            remove_archive(archive);
            return Err(e);
        }

        let saved = driver.save(archive.path());
        remove_archive(archive);
        let res = saved.and_then(|_| prune(driver, &self.retention));

        let res = chain_results(res, driver.end());
        if res.is_ok() {
            tracing::info!("Backup of {} finished", self.name);
        }
        res
    }
}

/// Deletes the iterations beyond retention, oldest first, stopping at the first failure.
fn prune(driver: &mut Driver, retention: &RetentionConfig) -> Result<()> {
    let to_delete = retention.get_delete(driver.iterations()?).to_vec();
    for iteration in to_delete {
        driver.delete(iteration)?;
    }
    Ok(())
}

fn remove_archive(archive: NamedTempFile) {
    let path = archive.path().to_path_buf();
    if let Err(e) = archive.close() {
        tracing::warn!("Removing temporary archive {:?} failed: {e}", path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::driver::testing::MemoryBackend;
    use crate::backup::logger::{Level, MemoryLogger};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("file1"), "file1").unwrap();
        let mut repo = Repository::new();
        repo.add_file(dir.path().join("file1"), None, None).unwrap();
        (dir, repo)
    }

    fn backup_over(backend: &MemoryBackend, repo: Repository, keep: usize) -> Backup {
        let mut backup = Backup::with_driver("s.tar", Driver::new(backend.clone()), None).unwrap();
        backup.set_repository(repo).unwrap();
        backup.set_number_iteration(keep).unwrap();
        backup
    }

    fn temp_archives(prefix: &str) -> usize {
        std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.starts_with(prefix) && name.ends_with(".tmp")
            })
            .count()
    }

    #[test]
    fn test_preconditions() {
        let (_dir, repo) = fixture();

        let mut backup = Backup::new("s", None).unwrap();
        assert!(matches!(
            backup.backup(),
            Err(Error::Configuration(ConfigurationError::DriverNotSet))
        ));

        backup.set_driver(Driver::new(MemoryBackend::default())).unwrap();
        assert!(matches!(
            backup.backup(),
            Err(Error::Configuration(ConfigurationError::RepositoryNotSet))
        ));

        assert!(matches!(
            backup.set_repository(Repository::new()),
            Err(Error::Configuration(ConfigurationError::EmptyRepository))
        ));
        backup.repository_mut();
        assert!(matches!(
            backup.backup(),
            Err(Error::Configuration(ConfigurationError::EmptyRepository))
        ));

        backup.set_repository(repo).unwrap();
        backup.backup().unwrap();
    }

    #[test]
    fn test_invalid_name_and_retention() {
        assert!(matches!(
            Backup::new("a/b", None),
            Err(Error::InvalidName { .. })
        ));
        let mut backup = Backup::new("a", None).unwrap();
        assert_eq!(backup.number_iteration(), 7);
        assert!(matches!(
            backup.set_number_iteration(0),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(backup.number_iteration(), 7);
    }

    #[test]
    fn test_three_runs_keep_two() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::default();
        let mut backup = backup_over(&backend, repo, 2);

        for _ in 0..3 {
            backup.backup().unwrap();
        }

        let state = backend.state.borrow();
        assert_eq!(
            state.files.iter().collect::<Vec<_>>(),
            vec!["s.tar.bak2", "s.tar.bak3"]
        );
        assert_eq!(
            state.calls,
            vec![
                "begin",
                "list",
                "save s.tar.bak1",
                "end",
                "begin",
                "save s.tar.bak2",
                "end",
                "begin",
                "save s.tar.bak3",
                "delete s.tar.bak1",
                "end",
            ]
        );
    }

    #[test]
    fn test_many_runs_keep_cache_in_sync() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::default();
        let mut backup = backup_over(&backend, repo, 2);

        for _ in 0..6 {
            backup.backup().unwrap();
        }
        assert_eq!(
            backend.state.borrow().files.iter().collect::<Vec<_>>(),
            vec!["s.tar.bak5", "s.tar.bak6"]
        );
    }

    #[test]
    fn test_prunes_preexisting_iterations() {
        let (_dir, repo) = fixture();
        let backend =
            MemoryBackend::with_files(["s.tar.bak3", "s.tar.bak8", "s.tar.bak9", "other"]);
        let mut backup = backup_over(&backend, repo, 2);
        backup.backup().unwrap();

        assert_eq!(
            backend.state.borrow().files.iter().collect::<Vec<_>>(),
            vec!["other", "s.tar.bak10", "s.tar.bak9"]
        );
    }

    #[test]
    fn test_failed_begin_aborts_before_save() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::default();
        backend.state.borrow_mut().fail_begin = true;
        let mut backup = backup_over(&backend, repo, 2);

        assert!(matches!(
            backup.backup(),
            Err(Error::BackendUnavailable { .. })
        ));
        assert_eq!(backend.state.borrow().calls, vec!["begin"]);
    }

    #[test]
    fn test_failed_save_still_ends() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::default();
        backend.state.borrow_mut().fail_save = true;
        let mut backup = backup_over(&backend, repo, 2);

        assert!(matches!(backup.backup(), Err(Error::BackendWrite { .. })));
        assert_eq!(
            backend.state.borrow().calls.last().map(String::as_str),
            Some("end")
        );
        assert!(backend.state.borrow().files.is_empty());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failure_is_left_to_the_caller_to_log() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::default();
        backend.state.borrow_mut().fail_save = true;
        let mut backup = backup_over(&backend, repo, 2);

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let res = tracing::subscriber::with_default(subscriber, || backup.backup());

        assert!(res.is_err());
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Starting backup of s.tar"));
        assert!(!output.contains("ERROR"));
    }

    #[test]
    fn test_failed_prune_keeps_new_iteration_and_ends() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::with_files(["s.tar.bak1", "s.tar.bak2"]);
        backend.state.borrow_mut().fail_delete = true;
        let mut backup = backup_over(&backend, repo, 1);

        assert!(matches!(backup.backup(), Err(Error::BackendDelete { .. })));
        let state = backend.state.borrow();
        assert!(state.files.contains("s.tar.bak3"));
        assert_eq!(
            state.calls,
            vec!["begin", "list", "save s.tar.bak3", "delete s.tar.bak1", "end"]
        );
    }

    #[test]
    fn test_failed_save_and_end_reports_both() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::default();
        backend.state.borrow_mut().fail_save = true;
        backend.state.borrow_mut().fail_end = true;
        let mut backup = backup_over(&backend, repo, 2);

        match backup.backup() {
            Err(Error::LotsOfError(errors)) => {
                assert!(matches!(errors[0], Error::BackendWrite { .. }));
                assert!(matches!(errors[1], Error::BackendUnavailable { .. }));
            }
            other => panic!("Expected LotsOfError, got {other:?}"),
        }
    }

    #[test]
    fn test_temporary_archive_removed() {
        let (_dir, repo) = fixture();
        let backend = MemoryBackend::default();
        backend.state.borrow_mut().fail_save = true;
        let mut backup =
            Backup::with_driver("cleanup-check", Driver::new(backend.clone()), None).unwrap();
        backup.set_repository(repo).unwrap();

        backup.backup().unwrap_err();
        assert_eq!(temp_archives("cleanup-check."), 0);
        backend.state.borrow_mut().fail_save = false;
        backup.backup().unwrap();
        assert_eq!(temp_archives("cleanup-check."), 0);
    }

    #[test]
    fn test_logger_reaches_driver_and_archive() {
        let (_dir, repo) = fixture();
        let memory = Arc::new(MemoryLogger::default());
        let backend = MemoryBackend::with_files(["s.tar.bak1"]);
        let mut backup =
            Backup::with_driver("s.tar", Driver::new(backend.clone()), Some(memory.clone() as SharedLogger))
                .unwrap();
        backup.set_repository(repo).unwrap();
        backup.set_number_iteration(1).unwrap();
        backup.backup().unwrap();

        let infos = memory.messages(Level::Info);
        assert_eq!(infos[0], "Archive: File 'file1' added");
        assert!(infos[1].ends_with("saved as 's.tar.bak2'"));
        assert_eq!(infos[2], "Driver: Archive 's.tar.bak1' deleted");
    }
}
