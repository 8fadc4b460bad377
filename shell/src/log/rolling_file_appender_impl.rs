// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::{Path, PathBuf};

/// An appender that never rolls over, writing to `path_str`. A bare file name is
/// relative to the current directory.
///
/// # Errors
///
/// Returns an error if the path has no file name, or its directory does not exist.
pub fn try_create(path_str: &str) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let path = PathBuf::from(path_str);

    let parent = match path.parent() {
        Some(it) if !it.as_os_str().is_empty() => it,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(miette::miette!(
            "Can't access log folder {}. It might not exist, or don't have required permissions.",
            parent.display()
        ));
    }

    let file_name = path.file_name().ok_or_else(|| {
        miette::miette!("Log file path {} has no file name.", path.display())
    })?;

    Ok(tracing_appender::rolling::never(parent, file_name))
}

#[cfg(test)]
mod tests_rolling_file_appender {
    use r3bl_test_fixtures::create_temp_dir;

    use super::*;

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = create_temp_dir().unwrap();
        let path = dir.join("no_such_folder").join("shell.log");
        assert!(try_create(&path.to_string_lossy()).is_err());
    }

    #[test]
    fn test_no_file_name_is_an_error() {
        assert!(try_create("/").is_err());
    }
}
