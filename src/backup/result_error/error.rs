use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use itertools::Itertools;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[error(transparent)]
    Ftp(#[from] suppaftp::FtpError),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("{0} already added")]
    DuplicateEntry(String),
    #[error("{0} is not present")]
    NotFound(String),
    #[error("Invalid cron string {cron:?}: {reason}")]
    InvalidCron { cron: String, reason: String },
    #[error("Backend unavailable:\n{}", indent::indent_all_with("  ", error.to_string()))]
    BackendUnavailable { error: Box<Error> },
    #[error("Backend failed to write {name:?}:\n{}", indent::indent_all_with("  ", error.to_string()))]
    BackendWrite { name: String, error: Box<Error> },
    #[error("Backend failed to delete {name:?}:\n{}", indent::indent_all_with("  ", error.to_string()))]
    BackendDelete { name: String, error: Box<Error> },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{:?} {} failed:\n{}", obj_debug, fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithDebugObjAndFnName {
        error: Box<Error>,
        obj_debug: Box<dyn Debug + Send>,
        fn_name: String,
    },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

/// Missing or unusable wiring detected when a backup is started.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Driver is not set")]
    DriverNotSet,
    #[error("Repository is not set")]
    RepositoryNotSet,
    #[error("The backup is empty")]
    EmptyRepository,
    #[error("Backup name is not bound to the driver")]
    NameNotSet,
}

impl<S: Into<String>, O: Debug + Send + 'static> WithDebugObjectAndFnName<S, O> for Error {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self {
        Error::WithDebugObjAndFnName {
            error: Box::new(self),
            obj_debug: Box::new(obj),
            fn_name: fn_name.into(),
        }
    }
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl Error {
    pub fn backend_unavailable<E: Into<Error>>(error: E) -> Self {
        Self::BackendUnavailable {
            error: Box::new(error.into()),
        }
    }

    pub fn backend_write<S: Into<String>, E: Into<Error>>(name: S, error: E) -> Self {
        Self::BackendWrite {
            name: name.into(),
            error: Box::new(error.into()),
        }
    }

    pub fn backend_delete<S: Into<String>, E: Into<Error>>(name: S, error: E) -> Self {
        Self::BackendDelete {
            name: name.into(),
            error: Box::new(error.into()),
        }
    }

    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(|e| e.into_iter())),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }

    /// Strips message and debug wrappers down to the error that was first raised.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithMsg { error, .. } | Error::WithDebugObjAndFnName { error, .. } => {
                error.root()
            }
            e => e,
        }
    }
}
