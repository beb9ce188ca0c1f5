//! File name validation for the flat shared and download directories.

use std::path::{Component, Path};

use crate::FileOpsError;

/// Checks that `name` is a single plain file name.
///
/// Rejects empty names, `.` and `..`, absolute paths, and anything with a
/// separator (`/` or `\`) or a NUL byte, so the name can never leave the
/// directory it is joined onto.
pub fn validate_file_name(name: &str) -> Result<(), FileOpsError> {
    let invalid = || FileOpsError::InvalidName(name.to_string());

    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}
