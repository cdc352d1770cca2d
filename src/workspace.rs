//! Source discovery and crash-safe writes for the command-line front end.

use crate::safety::{is_forbidden_name, SafetyError, WorkspaceGuard};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Safety(#[from] SafetyError),
}

fn is_java(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("java")
}

fn skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(is_forbidden_name)
}

/// All `.java` files under `roots`, sorted and de-duplicated.
///
/// A root that is itself a file is taken as-is. Build output and VCS
/// directories are not descended into.
pub fn discover_java_files(roots: &[PathBuf]) -> Result<Vec<PathBuf>, WorkspaceError> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        let walker = WalkDir::new(root).follow_links(false).into_iter();
        for entry in walker.filter_entry(|entry| !skipped_dir(entry)) {
            let entry = entry.map_err(|source| WorkspaceError::Walk {
                path: root.clone(),
                source,
            })?;
            if entry.file_type().is_file() && is_java(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Atomic file write: tempfile in the same directory, fsync, rename, then
/// bump the mtime so incremental builds notice the change.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), WorkspaceError> {
    let io = |source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().ok_or_else(|| {
        io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io)?;
    temp.write_all(content).map_err(io)?;
    temp.as_file().sync_all().map_err(io)?;
    temp.persist(path).map_err(|e| io(e.error))?;

    filetime::set_file_mtime(path, filetime::FileTime::now()).map_err(io)?;
    Ok(())
}

/// Re-check `path` against `guard`, then write it atomically.
pub fn guarded_write(guard: &WorkspaceGuard, path: &Path, content: &str) -> Result<(), WorkspaceError> {
    let canonical = guard.revalidate(path)?;
    atomic_write(&canonical, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_java_files_and_skips_build_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for file in [
            "src/main/java/a/App.java",
            "src/main/java/a/notes.txt",
            "target/classes/Gen.java",
            "lib/build/Gen.java",
            ".git/Hook.java",
        ] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "class A {}").unwrap();
        }

        let files = discover_java_files(&[root.to_path_buf()]).unwrap();
        assert_eq!(files, vec![root.join("src/main/java/a/App.java")]);
    }

    #[test]
    fn explicit_file_roots_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("B.java");
        fs::write(&file, "class B {}").unwrap();
        let files = discover_java_files(&[file.clone(), file.clone()]).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.java");
        fs::write(&file, "old").unwrap();
        atomic_write(&file, b"class A {}").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "class A {}");
        // No temp files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn guarded_write_refuses_outside_paths() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ws");
        fs::create_dir_all(&workspace).unwrap();
        let outside = dir.path().join("A.java");
        fs::write(&outside, "class A {}").unwrap();

        let guard = WorkspaceGuard::new(&workspace).unwrap();
        let err = guarded_write(&guard, &outside, "class B {}").unwrap_err();
        assert!(matches!(err, WorkspaceError::Safety(SafetyError::OutsideWorkspace { .. })));
        assert_eq!(fs::read_to_string(&outside).unwrap(), "class A {}");
    }
}
