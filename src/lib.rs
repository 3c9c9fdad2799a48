//! # rotating_backup
//!
//! Packs a set of files and folders into one archive and keeps the newest
//! iterations of it on a storage backend.
//!
//! Each run writes `{name}.bak{n}` where `n` is one more than the highest
//! iteration already on the backend, then deletes the oldest iterations beyond
//! the retention count.
//!
//! ## Backends
//!
//! - **Local filesystem**: a directory that must already exist
//! - **FTP**: binary uploads into the login directory
//!
//! ## Quick Start
//!
//! ```no_run
//! use rotating_backup::backup::driver::fs::FsBackend;
//! use rotating_backup::backup::driver::Driver;
//! use rotating_backup::backup::rotation::Backup;
//!
//! let mut backup = Backup::with_driver("documents.tar", Driver::new(FsBackend::new("/srv/backups")?), None)?;
//! backup.repository_mut().add_folder("/home/me/Documents", None, None)?;
//! backup.set_number_iteration(3)?;
//! backup.backup()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The same setup can be read from YAML, see
//! [`BackupConfig`](backup::backup_config::BackupConfig).

pub mod backup;
