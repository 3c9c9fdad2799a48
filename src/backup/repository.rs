//! Manifest of the files and folders that go into the next archive.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::validate::{validate_entry_name, validate_entry_path};

use derive_more::Display;
use getset::Getters;

use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Folder,
}

/// One registered file or folder.
///
/// `name` is the rename given at registration, or the basename of `source`.
/// Entries are never edited in place; to change one, remove it and add it again.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RepositoryEntry {
    source: PathBuf,
    kind: EntryKind,
    name: String,
    destination: Option<String>,
}

impl RepositoryEntry {
    /// Path of the entry inside the archive, `destination/name` or just `name`.
    pub fn internal_path(&self) -> String {
        join_internal(self.destination.as_deref(), &self.name)
    }
}

pub(crate) fn join_internal(destination: Option<&str>, name: &str) -> String {
    match destination {
        Some(destination) if !destination.is_empty() => format!("{destination}/{name}"),
        _ => name.to_owned(),
    }
}

#[derive(Clone, Debug, Default, Getters)]
#[getset(get = "pub")]
pub struct Repository {
    files: Vec<RepositoryEntry>,
    folders: Vec<RepositoryEntry>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file. Empty `rename`/`destination` behave like `None`.
    pub fn add_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        rename: Option<&str>,
        destination: Option<&str>,
    ) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidInput(format!("{:?} is not a file", path)));
        }
        self.add(EntryKind::File, path, rename, destination)
    }

    /// Registers a folder. Empty `rename`/`destination` behave like `None`.
    pub fn add_folder<P: AsRef<Path>>(
        &mut self,
        path: P,
        rename: Option<&str>,
        destination: Option<&str>,
    ) -> Result<()> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::InvalidInput(format!("{:?} is not a folder", path)));
        }
        self.add(EntryKind::Folder, path, rename, destination)
    }

    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        Self::remove(&mut self.files, path.as_ref())
    }

    pub fn remove_folder<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        Self::remove(&mut self.folders, path.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.folders.len()
    }

    /// Files first, then folders, each in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &RepositoryEntry> {
        self.files.iter().chain(self.folders.iter())
    }

    fn add(
        &mut self,
        kind: EntryKind,
        path: &Path,
        rename: Option<&str>,
        destination: Option<&str>,
    ) -> Result<()> {
        let name = match rename.filter(|r| !r.is_empty()) {
            Some(rename) => {
                validate_entry_name(rename).map_err(|e| Error::InvalidName {
                    name: rename.to_owned(),
                    reason: e.to_string(),
                })?;
                rename.to_owned()
            }
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::InvalidInput(format!("{:?} has no file name", path)))?,
        };

        let destination = destination.filter(|d| !d.is_empty());
        if let Some(destination) = destination {
            validate_entry_path(destination).map_err(|e| Error::InvalidPath {
                path: destination.to_owned(),
                reason: e.to_string(),
            })?;
        }

        let set = match kind {
            EntryKind::File => &self.files,
            EntryKind::Folder => &self.folders,
        };
        if set.iter().any(|e| e.source.as_path() == path) {
            return Err(Error::DuplicateEntry(format!("{kind} {:?}", path)));
        }

        let entry = RepositoryEntry {
            source: path.to_path_buf(),
            kind,
            name,
            destination: destination.map(str::to_owned),
        };

        let internal_path = entry.internal_path();
        if let Some(clash) = self.entries().find(|e| e.internal_path() == internal_path) {
            return Err(Error::DuplicateEntry(format!(
                "Internal path {:?} of {:?} (used by {:?})",
                internal_path, path, clash.source
            )));
        }

        tracing::debug!("Registered {kind} {:?} as {:?}", path, internal_path);
        match kind {
            EntryKind::File => self.files.push(entry),
            EntryKind::Folder => self.folders.push(entry),
        }
        Ok(())
    }

    fn remove(set: &mut Vec<RepositoryEntry>, path: &Path) -> Result<()> {
        match set.iter().position(|e| e.source.as_path() == path) {
            Some(idx) => {
                set.remove(idx);
                Ok(())
            }
            None => Err(Error::NotFound(format!("{:?}", path))),
        }
    }
}
