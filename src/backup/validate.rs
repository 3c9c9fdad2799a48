//! Validation functions for names, paths and configuration values.
//!
//! Every validator returns a `validator::ValidationError` so it can be used
//! directly in `#[validate(custom(...))]` attributes as well as at runtime.

use chrono::Utc;
use validator::ValidationError;

use std::path::Path;

/// Characters allowed in an entry rename or a destination path segment,
/// besides `.` which only renames accept.
fn is_entry_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '_' | ',' | '(' | ')' | '@' | '-')
}

fn is_backup_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Backup series name: one or more `[-_a-zA-Z0-9]+` segments joined by `.`.
pub fn validate_backup_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    let valid = name
        .split('.')
        .all(|segment| !segment.is_empty() && segment.chars().all(is_backup_name_char));
    if !valid {
        return Err(ValidationError::new("InvalidBackupName").with_message(
            format!(
                "Name {name:?} must be segments of [-_a-zA-Z0-9] separated by single '.'"
            )
            .into(),
        ));
    }

    Ok(())
}

/// Name of an entry inside the archive.
///
/// An optional single leading `.`, at least one non-dot character, then any
/// allowed character including `.`.
pub fn validate_entry_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    let rest = name.strip_prefix('.').unwrap_or(name);
    let mut chars = rest.chars();
    let valid = chars.next().is_some_and(is_entry_char)
        && chars.all(|c| c == '.' || is_entry_char(c));
    if !valid {
        return Err(ValidationError::new("InvalidEntryName").with_message(
            format!("Name {name:?} may only contain word characters, spaces and ,()@_-.").into(),
        ));
    }

    Ok(())
}

/// Destination folder inside the archive, like `folderA/folderB`.
pub fn validate_entry_path<S: AsRef<str>>(path: S) -> Result<(), ValidationError> {
    let path = path.as_ref();
    let valid = path
        .split('/')
        .all(|segment| !segment.is_empty() && segment.chars().all(is_entry_char));
    if !valid {
        return Err(ValidationError::new("InvalidEntryPath").with_message(
            format!(
                "Path {path:?} must be '/' separated segments of word characters, spaces and ,()@_-"
            )
            .into(),
        ));
    }

    Ok(())
}

pub fn validate_dir_exist<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("{:?} not found", dir).into()));
    }

    Ok(())
}

pub fn validate_cron_str<S: AsRef<str>>(cron: S) -> Result<(), ValidationError> {
    let cron = cron.as_ref();
    if cron_parser::parse(cron, &Utc::now()).is_err() {
        return Err(ValidationError::new("InvalidCron")
            .with_message(format!("Invalid cron string: {cron:?}").into()));
    }

    Ok(())
}
