use crate::backup::archive::ArchiveEntry;
use crate::backup::logger::{log_with, Level, SharedLogger};
use crate::backup::repository::EntryKind;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::result_error::error::Error;
use std::io::Write;

/// Writes planned entries into a TAR container and closes it
///
/// Returns the underlying writer once the archive trailer has been written
pub fn write_tar_archive<W: Write>(
    entries: &[ArchiveEntry],
    writer: W,
    logger: &Option<SharedLogger>,
) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(true);

    for entry in entries {
        match entry.kind {
            EntryKind::File => {
                builder
                    .append_path_with_name(entry.src.as_ref(), entry.dst.as_ref())
                    .map_err(Error::from)
                    .with_msg(format!("Adding {:?} as {:?} failed", entry.src, entry.dst))?;
                log_with(
                    logger,
                    "Archive",
                    Level::Info,
                    &format!("File '{}' added", entry.dst),
                );
            }
            EntryKind::Folder => {
                builder
                    .append_dir(entry.dst.as_ref(), entry.src.as_ref())
                    .map_err(Error::from)
                    .with_msg(format!("Adding directory {:?} failed", entry.dst))?;
                log_with(
                    logger,
                    "Archive",
                    Level::Info,
                    &format!("Directory '{}' created", entry.dst),
                );
            }
        }
    }
    tracing::debug!("Processed {} archive entries", entries.len());

    Ok(builder.into_inner()?)
}
