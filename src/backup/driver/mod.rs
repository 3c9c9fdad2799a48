//! Storage drivers and the iteration numbering shared by all of them.
//!
//! A series named `x.zip` is stored on a backend as `x.zip.bak1`, `x.zip.bak2`, ...
//! The existing iterations are never stored anywhere: they are parsed back from
//! the names the backend lists.

pub mod fs;
pub mod ftp;

use crate::backup::logger::{log_with, Level, SharedLogger};
use crate::backup::result_error::error::{ConfigurationError, Error};
use crate::backup::result_error::result::Result;
use crate::backup::validate::validate_backup_name;

use derive_more::{Deref, Display};
use itertools::Itertools;

use std::fmt::Debug;
use std::path::Path;
use std::str::FromStr;

pub static BACKUP_SUFFIX: &str = ".bak";

/// Validated name of a backup series.
#[derive(Clone, Debug, Display, Deref, PartialEq, Eq, Hash)]
pub struct BackupName(String);

impl FromStr for BackupName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        validate_backup_name(name).map_err(|e| Error::InvalidName {
            name: name.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self(name.to_owned()))
    }
}

impl BackupName {
    /// Backend artifact name of `iteration`, e.g. `x.zip.bak3`.
    pub fn artifact(&self, iteration: u64) -> String {
        format!("{}{}{}", self.0, BACKUP_SUFFIX, iteration)
    }

    /// Extracts the iteration from a listed backend name.
    ///
    /// Only the last `/` separated component is considered, and it must be
    /// exactly `{name}.bak{digits}` with a positive number.
    pub fn parse_iteration(&self, listed: &str) -> Option<u64> {
        let file_name = listed.rsplit('/').next()?;
        let digits = file_name
            .strip_prefix(self.0.as_str())?
            .strip_prefix(BACKUP_SUFFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|i| *i > 0)
    }

    /// Sorted, distinct iterations found in `listed`.
    pub fn iterations<I, S>(&self, listed: I) -> Vec<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        listed
            .into_iter()
            .filter_map(|f| self.parse_iteration(f.as_ref()))
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

/// Primitives a storage target has to offer.
///
/// `begin`/`end` bracket one backup run; backends holding a connection open it
/// in `begin` and release it in `end`.
pub trait StorageBackend: Debug {
    fn begin(&mut self, _logger: &Option<SharedLogger>) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Stores the local file `local` as `remote_name`.
    fn save_file(&mut self, local: &Path, remote_name: &str) -> Result<()>;

    fn delete_file(&mut self, remote_name: &str) -> Result<()>;

    /// Names of everything the backend holds for this driver.
    fn list_files(&mut self) -> Result<Vec<String>>;
}

/// Numbers, saves and deletes the iterations of one series on a backend.
///
/// Iterations are listed from the backend once, then kept in sync locally:
/// a successful `save` appends, a successful `delete` removes.
#[derive(Debug)]
pub struct Driver {
    name: Option<BackupName>,
    logger: Option<SharedLogger>,
    iterations: Option<Vec<u64>>,
    backend: Box<dyn StorageBackend>,
}

impl Driver {
    /// Unnamed driver over `backend`; bind a name before any other call.
    pub fn new<B: StorageBackend + 'static>(backend: B) -> Self {
        Self {
            name: None,
            logger: None,
            iterations: None,
            backend: Box::new(backend),
        }
    }

    /// Binds the series name. Validation happens before any backend access.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let name = BackupName::from_str(name)?;
        if self.name.as_ref() != Some(&name) {
            self.iterations = None;
        }
        self.name = Some(name);
        Ok(())
    }

    pub fn name(&self) -> Option<&BackupName> {
        self.name.as_ref()
    }

    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = Some(logger);
    }

    fn bound_name(&self) -> Result<&BackupName> {
        self.name
            .as_ref()
            .ok_or(Error::Configuration(ConfigurationError::NameNotSet))
    }

    /// Opens a backend session. Failures are `BackendUnavailable`.
    pub fn begin(&mut self) -> Result<()> {
        self.backend
            .begin(&self.logger)
            .map_err(Error::backend_unavailable)
    }

    /// Closes the backend session.
    pub fn end(&mut self) -> Result<()> {
        self.backend.end().map_err(Error::backend_unavailable)
    }

    /// Sorted iterations of the series, listed from the backend on first use.
    pub fn iterations(&mut self) -> Result<&[u64]> {
        if self.iterations.is_none() {
            let name = self.bound_name()?.clone();
            let listed = self
                .backend
                .list_files()
                .map_err(Error::backend_unavailable)?;
            let iterations = name.iterations(listed);
            tracing::debug!("Found iterations {:?} for {}", iterations, name);
            self.iterations = Some(iterations);
        }
        Ok(self.iterations.as_deref().unwrap_or_default())
    }

    /// Highest existing iteration, 0 when the series is empty.
    pub fn current_iteration(&mut self) -> Result<u64> {
        Ok(self.iterations()?.last().copied().unwrap_or(0))
    }

    /// Artifact name of `iteration`, without backend access.
    pub fn backup_name(&self, iteration: u64) -> Result<String> {
        Ok(self.bound_name()?.artifact(iteration))
    }

    /// Iteration the next `save` writes, one past the current one.
    pub fn next_iteration(&mut self) -> Result<u64> {
        let current = self.current_iteration()?;
        current.checked_add(1).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Iteration {current} of {} cannot be followed by another one",
                self.name.as_ref().map(|n| n.as_str()).unwrap_or_default()
            ))
        })
    }

    pub fn next_backup_name(&mut self) -> Result<String> {
        let next = self.next_iteration()?;
        self.backup_name(next)
    }

    /// Stores `archive` as the next iteration.
    pub fn save(&mut self, archive: &Path) -> Result<()> {
        let next = self.next_iteration()?;
        let next_name = self.backup_name(next)?;
        self.backend
            .save_file(archive, &next_name)
            .map_err(|e| Error::backend_write(next_name.as_str(), e))?;

        if let Some(iterations) = self.iterations.as_mut() {
            iterations.push(next);
        }
        log_with(
            &self.logger,
            "Driver",
            Level::Info,
            &format!("Archive '{}' saved as '{}'", archive.display(), next_name),
        );
        Ok(())
    }

    /// Removes `iteration` from the backend. A missing artifact is a `BackendDelete` error.
    pub fn delete(&mut self, iteration: u64) -> Result<()> {
        let file_name = self.backup_name(iteration)?;
        self.backend
            .delete_file(&file_name)
            .map_err(|e| Error::backend_delete(file_name.as_str(), e))?;

        if let Some(iterations) = self.iterations.as_mut() {
            iterations.retain(|i| *i != iteration);
        }
        log_with(
            &self.logger,
            "Driver",
            Level::Info,
            &format!("Archive '{}' deleted", file_name),
        );
        Ok(())
    }
}
