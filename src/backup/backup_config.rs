use crate::backup::driver::fs::FsBackend;
use crate::backup::driver::ftp::{FtpBackend, FtpConfig};
use crate::backup::driver::Driver;
use crate::backup::function_path;
use crate::backup::logger::{SharedLogger, TracingLogger};
use crate::backup::repository::Repository;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use crate::backup::retention::RetentionConfig;
use crate::backup::rotation::Backup;
use crate::backup::validate::{
    validate_backup_name, validate_cron_str, validate_dir_exist, validate_entry_name,
    validate_entry_path,
};

use bon::Builder;
use chrono::Utc;
use derive_more::From;
use function_name::named;
use getset::Getters;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::path::PathBuf;
use std::result;
use std::sync::Arc;
use tracing::{error, info};
use validator::{Validate, ValidationErrors};

/// Everything needed to run backups of one series, usually read from YAML.
///
/// ```yaml
/// name: documents.tar
/// retention: 7
/// cron: "0 3 * * *"
/// driver:
///   type: ftp
///   host: ftp.example.com
///   login: backup
///   password: secret
/// files:
///   - path: /etc/hosts
///     destination: etc
/// folders:
///   - path: /home/me/Documents
///     rename: docs
/// ```
#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    #[validate(custom(function = validate_backup_name))]
    pub name: Arc<str>,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[validate(custom(function = validate_cron_str))]
    pub cron: Option<Arc<str>>,
    #[serde(default)]
    pub empty_dir_markers: bool,
    #[validate(nested)]
    pub driver: DriverConfig,
    #[serde(default)]
    #[validate(nested)]
    pub files: Vec<EntryConfig>,
    #[serde(default)]
    #[validate(nested)]
    pub folders: Vec<EntryConfig>,
}

#[derive(Clone, From, Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum DriverConfig {
    Fs(FsConfig),
    Ftp(FtpConfig),
}

impl Validate for DriverConfig {
    fn validate(&self) -> result::Result<(), ValidationErrors> {
        match self {
            DriverConfig::Fs(inner) => inner.validate(),
            DriverConfig::Ftp(inner) => inner.validate(),
        }
    }
}

impl DriverConfig {
    pub fn build_driver(&self) -> Result<Driver> {
        Ok(match self {
            DriverConfig::Fs(fs) => Driver::new(FsBackend::new(fs.dir.clone())?),
            DriverConfig::Ftp(ftp) => Driver::new(FtpBackend::new(ftp.clone())),
        })
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct FsConfig {
    #[validate(custom(function = validate_dir_exist))]
    #[builder(into)]
    dir: PathBuf,
}

/// A file or folder to put in the archive.
#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct EntryConfig {
    #[builder(into)]
    path: PathBuf,
    #[validate(custom(function = validate_entry_name))]
    #[builder(into)]
    rename: Option<String>,
    #[validate(custom(function = validate_entry_path))]
    #[builder(into)]
    destination: Option<String>,
}

impl BackupConfig {
    pub fn build_repository(&self) -> Result<Repository> {
        let mut repository = Repository::new();
        for file in &self.files {
            repository.add_file(&file.path, file.rename.as_deref(), file.destination.as_deref())?;
        }
        for folder in &self.folders {
            repository.add_folder(
                &folder.path,
                folder.rename.as_deref(),
                folder.destination.as_deref(),
            )?;
        }
        Ok(repository)
    }

    #[named]
    pub fn build_backup(&self, logger: Option<SharedLogger>) -> Result<Backup> {
        let build = || -> Result<Backup> {
            let mut backup = Backup::new(&self.name, logger)?;
            backup.set_driver(self.driver.build_driver()?)?;
            backup.set_repository(self.build_repository()?)?;
            backup.set_number_iteration(self.retention.keep.get())?;
            backup.set_empty_dir_markers(self.empty_dir_markers);
            Ok(backup)
        };
        build().with_debug_object_and_fn_name(self.name.clone(), function_path!())
    }

    /// Runs one backup, or keeps running on the cron schedule when one is set.
    pub fn run(&self) -> Result<()> {
        match &self.cron {
            None => self.run_once(),
            Some(cron) => self.start_loop(cron),
        }
    }

    pub fn run_once(&self) -> Result<()> {
        self.build_backup(Some(Arc::new(TracingLogger)))?
            .backup()
            .with_msg(format!("Backup {:?} failed", self.name))
    }

    /// Every scheduled run starts from a fresh driver, so iterations are listed
    /// again from the backend each time.
    pub fn start_loop(&self, cron: &str) -> Result<()> {
        loop {
            let now = Utc::now();
            let next = cron_parser::parse(cron, &now).map_err(|e| Error::InvalidCron {
                cron: cron.to_owned(),
                reason: format!("{e:?}"),
            })?;
            info!("Sleeping until {next}");
            std::thread::sleep((next - now).to_std().unwrap_or_default());

            info!("Trying to create backup...");
            if let Err(e) = self.run_once() {
                error!("{e}");
            }
        }
    }
}
