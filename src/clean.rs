//! Removal of everything `deps` and `build` produce
//!
//! Order: staging directory, output binary, stray object files in the
//! working directory, then the CMake build directory. The build directory is
//! only touched while the working-directory CMakeLists.txt is one we
//! generated; otherwise it belongs to the user. Targets that do not exist are
//! skipped, so cleaning twice is fine. Any other failure stops the remaining
//! steps.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::build::cmake::{is_generated_cmake_lists, CMAKE_LISTS};
use crate::config::Layout;
use crate::error::LuauBuildError;
use crate::utils::paths::{display_relative, glob_files, remove_dir_if_exists, remove_file_if_exists};

/// Object file patterns swept from the working directory
pub const OBJECT_PATTERNS: &[&str] = &["*.o", "*.obj"];

/// What was (or, in a dry run, would be) removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub freed_bytes: u64,
}

pub struct Cleaner<'a> {
    layout: &'a Layout,
    dry_run: bool,
}

impl<'a> Cleaner<'a> {
    pub fn new(layout: &'a Layout, dry_run: bool) -> Self {
        Self { layout, dry_run }
    }

    pub fn clean(&self) -> Result<CleanReport, LuauBuildError> {
        let mut report = CleanReport::default();

        self.remove_dir(&self.layout.staging_dir, &mut report)?;
        self.remove_file(&self.layout.output_binary, &mut report)?;
        for pattern in OBJECT_PATTERNS {
            for object in glob_files(&self.layout.working_dir, pattern)? {
                self.remove_file(&object, &mut report)?;
            }
        }
        if is_generated_cmake_lists(&self.layout.working_dir.join(CMAKE_LISTS)) {
            self.remove_dir(&self.layout.cmake_build_dir, &mut report)?;
        }

        Ok(report)
    }

    fn remove_dir(&self, path: &Path, report: &mut CleanReport) -> Result<(), LuauBuildError> {
        if !path.is_dir() {
            return Ok(());
        }
        let size = dir_size(path);
        if self.dry_run || remove_dir_if_exists(path)? {
            self.record(path, size, report);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path, report: &mut CleanReport) -> Result<(), LuauBuildError> {
        let Ok(metadata) = path.metadata() else {
            return Ok(());
        };
        if self.dry_run || remove_file_if_exists(path)? {
            self.record(path, metadata.len(), report);
        }
        Ok(())
    }

    fn record(&self, path: &Path, size: u64, report: &mut CleanReport) {
        let name = display_relative(path, &self.layout.working_dir);
        if self.dry_run {
            println!("  [DRY RUN] Would remove: {}", name);
        } else {
            println!("  ✅ Removed: {}", name);
        }
        report.removed.push(path.to_path_buf());
        report.freed_bytes += size;
    }
}

fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::cmake::render_cmake_lists;
    use crate::config::Config;
    use std::fs;

    fn populated(temp: &Path) -> Layout {
        let layout = Config::default().layout(temp);
        fs::create_dir_all(layout.staging_dir.join("VM/src")).unwrap();
        fs::write(layout.staging_dir.join("VM/src/lapi.cpp"), "0123456789").unwrap();
        fs::write(&layout.library, "!<arch>\n").unwrap();
        fs::write(&layout.output_binary, "bin").unwrap();
        fs::write(temp.join("lapi.o"), "o").unwrap();
        fs::write(temp.join("Lexer.obj"), "o").unwrap();
        fs::write(&layout.main_source, "int main() {}").unwrap();
        layout
    }

    #[test]
    fn test_clean_removes_everything_but_sources() {
        let temp = tempfile::tempdir().unwrap();
        let layout = populated(temp.path());

        let report = Cleaner::new(&layout, false).clean().unwrap();

        assert!(!layout.staging_dir.exists());
        assert!(!layout.output_binary.exists());
        assert!(!temp.path().join("lapi.o").exists());
        assert!(!temp.path().join("Lexer.obj").exists());
        assert!(layout.main_source.exists());
        assert_eq!(report.removed.len(), 4);
        assert!(report.freed_bytes >= 10);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let layout = populated(temp.path());
        let cleaner = Cleaner::new(&layout, false);

        cleaner.clean().unwrap();
        let second = cleaner.clean().unwrap();
        assert!(second.removed.is_empty());
    }

    #[test]
    fn test_clean_on_empty_tree() {
        let temp = tempfile::tempdir().unwrap();
        let layout = Config::default().layout(temp.path());

        let report = Cleaner::new(&layout, false).clean().unwrap();
        assert_eq!(report, CleanReport::default());
    }

    #[test]
    fn test_clean_removes_generated_cmake_build_dir() {
        let temp = tempfile::tempdir().unwrap();
        let layout = Config::default().layout(temp.path());
        fs::create_dir_all(layout.cmake_build_dir.join("CMakeFiles")).unwrap();
        fs::write(
            temp.path().join(CMAKE_LISTS),
            render_cmake_lists(&layout, "17"),
        )
        .unwrap();

        Cleaner::new(&layout, false).clean().unwrap();
        assert!(!layout.cmake_build_dir.exists());
        assert!(temp.path().join(CMAKE_LISTS).exists());
    }

    #[test]
    fn test_clean_keeps_unrelated_build_dir() {
        let temp = tempfile::tempdir().unwrap();
        let layout = populated(temp.path());
        let script = layout.cmake_build_dir.join("my_script.sh");
        fs::create_dir_all(&layout.cmake_build_dir).unwrap();
        fs::write(&script, "#!/bin/sh\n").unwrap();

        let report = Cleaner::new(&layout, false).clean().unwrap();
        assert!(script.exists());
        assert!(!report.removed.contains(&layout.cmake_build_dir));

        // A hand-written CMakeLists.txt does not make build/ ours either
        fs::write(temp.path().join(CMAKE_LISTS), "project(Mine)\n").unwrap();
        Cleaner::new(&layout, false).clean().unwrap();
        assert!(script.exists());
    }

    #[test]
    fn test_dry_run_keeps_files() {
        let temp = tempfile::tempdir().unwrap();
        let layout = populated(temp.path());

        let report = Cleaner::new(&layout, true).clean().unwrap();

        assert_eq!(report.removed.len(), 4);
        assert!(layout.staging_dir.exists());
        assert!(layout.output_binary.exists());
        assert!(temp.path().join("lapi.o").exists());
    }
}
