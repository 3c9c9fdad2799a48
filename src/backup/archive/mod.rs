use crate::backup::logger::SharedLogger;
use crate::backup::repository::{join_internal, EntryKind, Repository};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::tar::write_tar_archive;

use bon::Builder;
use walkdir::WalkDir;

use std::collections::HashSet;
use std::io::{BufWriter, IntoInnerError, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// A single item to write into the archive
///
/// Folders only show up here when explicit directory markers are enabled;
/// otherwise a folder exists in the archive through the paths of its files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Source file or folder on the local filesystem
    pub src: Arc<Path>,

    /// `/` separated path inside the archive
    pub dst: Arc<str>,

    pub kind: EntryKind,
}

impl ArchiveEntry {
    pub fn file<A: Into<Arc<Path>>, B: Into<Arc<str>>>(src: A, dst: B) -> ArchiveEntry {
        Self {
            src: src.into(),
            dst: dst.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory<A: Into<Arc<Path>>, B: Into<Arc<str>>>(src: A, dst: B) -> ArchiveEntry {
        Self {
            src: src.into(),
            dst: dst.into(),
            kind: EntryKind::Folder,
        }
    }
}

/// Turns a [`Repository`] into a single tar container.
///
/// Path computation ([`ArchiveBuilder::plan`]) is kept apart from writing, so the
/// layout of an archive can be checked without producing one.
#[derive(Clone, Debug, Default, Builder)]
pub struct ArchiveBuilder {
    /// Also write an explicit entry for every folder, including empty ones
    #[builder(default)]
    empty_dir_markers: bool,
    logger: Option<SharedLogger>,
}

impl ArchiveBuilder {
    /// Lists every archive entry for `repository`, files first, then folders
    /// recursively expanded in file name order.
    ///
    /// Fails with an io error when a registered path is neither a file nor a
    /// folder anymore, and with `DuplicateEntry` when two sources land on the
    /// same internal path.
    pub fn plan(&self, repository: &Repository) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        for entry in repository.entries() {
            self.plan_path(
                entry.source(),
                entry.name(),
                entry.destination().as_deref(),
                &mut entries,
            )?;
        }

        let mut seen = HashSet::new();
        if let Some(dup) = entries.iter().find(|e| !seen.insert(e.dst.clone())) {
            return Err(Error::DuplicateEntry(format!(
                "Internal path {:?} from {:?}",
                dup.dst, dup.src
            )));
        }

        Ok(entries)
    }

    fn plan_path(
        &self,
        src: &Path,
        name: &str,
        destination: Option<&str>,
        entries: &mut Vec<ArchiveEntry>,
    ) -> Result<()> {
        let dst = join_internal(destination, name);
        if src.is_dir() {
            if self.empty_dir_markers {
                entries.push(ArchiveEntry::directory(src, dst.as_str()));
            }
            for child in WalkDir::new(src)
                .min_depth(1)
                .max_depth(1)
                .follow_links(true)
                .sort_by_file_name()
            {
                let child = child?;
                let child_name = child.file_name().to_string_lossy();
                self.plan_path(child.path(), &child_name, Some(&dst), entries)?;
            }
        } else if src.is_file() {
            tracing::trace!("Including file: {:?} -> {:?}", src, dst);
            entries.push(ArchiveEntry::file(src, dst));
        } else {
            return Err(Error::from(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{:?} is neither a file nor a folder", src),
            )));
        }

        Ok(())
    }

    /// Writes the archive for `repository` into `writer` and returns it once
    /// the container is closed.
    pub fn build<W: Write>(&self, repository: &Repository, writer: W) -> Result<W> {
        let entries = self.plan(repository)?;
        write_tar_archive(&entries, writer, &self.logger)
    }

    /// Writes the archive into a new temporary file whose name starts with `prefix`.
    ///
    /// The file is removed when the returned handle is dropped or closed.
    pub fn build_temp_file(&self, repository: &Repository, prefix: &str) -> Result<NamedTempFile> {
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".tmp")
            .tempfile()?;
        tracing::debug!("Building archive into {:?}", temp.path());

        let temp = self
            .build(repository, BufWriter::new(temp))?
            .into_inner()
            .map_err(IntoInnerError::into_error)
            .map_err(Error::from)
            .with_msg("Flushing temporary archive failed")?;
        temp.as_file().sync_all()?;
        Ok(temp)
    }
}
