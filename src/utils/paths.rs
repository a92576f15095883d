//! Path utilities

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::LuauBuildError;

/// Ensure a directory exists
pub fn ensure_dir(path: &Path) -> Result<(), LuauBuildError> {
    fs::create_dir_all(path).map_err(|e| LuauBuildError::io("create directory", path, e))
}

/// Remove a file; a missing file is not an error. Returns whether it existed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, LuauBuildError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LuauBuildError::io("remove", path, e)),
    }
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool, LuauBuildError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LuauBuildError::io("remove directory", path, e)),
    }
}

/// Files directly inside `dir` matching `pattern` (e.g. `*.o`), sorted
pub fn glob_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, LuauBuildError> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = format!("{}/{}", escaped, pattern);
    let entries = glob::glob(&full).map_err(|e| {
        LuauBuildError::io(
            "list",
            dir,
            std::io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            LuauBuildError::io("read", path, e.into_error())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Relative display form of `path` under `base`, for log lines
pub fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_missing_is_ok() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(!remove_file_if_exists(&temp_dir.path().join("nope")).unwrap());
        assert!(!remove_dir_if_exists(&temp_dir.path().join("nope")).unwrap());
    }

    #[test]
    fn test_remove_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("a.o");
        fs::write(&file, b"obj").unwrap();
        assert!(remove_file_if_exists(&file).unwrap());
        assert!(!file.exists());

        let dir = temp_dir.path().join("luau/Ast");
        ensure_dir(&dir).unwrap();
        assert!(remove_dir_if_exists(&temp_dir.path().join("luau")).unwrap());
        assert!(!dir.exists());
    }

    #[test]
    fn test_glob_files_matches_only_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("b.o"), b"").unwrap();
        fs::write(temp_dir.path().join("a.o"), b"").unwrap();
        fs::write(temp_dir.path().join("main.cpp"), b"").unwrap();
        fs::create_dir(temp_dir.path().join("dir.o")).unwrap();

        let files = glob_files(temp_dir.path(), "*.o").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.o", "b.o"]);
    }

    #[test]
    fn test_display_relative() {
        assert_eq!(
            display_relative(Path::new("/w/luau/libluau.a"), Path::new("/w")),
            "luau/libluau.a"
        );
    }
}
