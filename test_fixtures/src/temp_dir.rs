// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{ops::Deref,
          path::{Path, PathBuf}};

use miette::IntoDiagnostic;

/// A temporary directory that is deleted when this struct is dropped.
#[derive(Debug)]
pub struct TempDir {
    pub path: PathBuf,
    _guard: tempfile::TempDir,
}

/// Create a temporary directory. The directory is automatically deleted when the
/// [`TempDir`] struct is dropped. The path is canonicalized so that it can be compared
/// against `$PWD` after a `cd` (eg: `/tmp` is a symlink on macOS).
///
/// # Errors
///
/// Returns an error if the directory can't be created.
pub fn create_temp_dir() -> miette::Result<TempDir> {
    let guard = tempfile::Builder::new()
        .prefix("r3bl_shell_")
        .tempdir()
        .into_diagnostic()?;
    let path = guard.path().canonicalize().into_diagnostic()?;
    Ok(TempDir {
        path,
        _guard: guard,
    })
}

impl Deref for TempDir {
    type Target = Path;

    fn deref(&self) -> &Self::Target { &self.path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir() {
        let temp_dir = create_temp_dir().unwrap();
        assert!(temp_dir.path.exists());
        assert!(temp_dir.join("file.txt").starts_with(&temp_dir.path));
    }

    #[test]
    fn test_temp_dir_drop() {
        let temp_dir = create_temp_dir().unwrap();
        let copy_of_path = temp_dir.path.clone();

        drop(temp_dir);

        assert!(!copy_of_path.exists());
    }
}
