//! Utility functions for common operations.
//!
//! - Parent directory creation for output paths
//! - Atomic file writes (temp file in the target directory, then rename)

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, SnatchError};

/// Ensure the directory that will hold `path` exists.
///
/// A bare file name resolves to the current directory, which always exists.
pub fn ensure_parent_dir(path: &Path) -> Result<&Path> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SnatchError::io(
                format!("Failed to create directory: {}", parent.display()),
                e,
            )
        })?;
    }

    Ok(parent)
}

/// Atomically write content to a file.
///
/// The content goes to a temporary file in the same directory, which is then
/// renamed over the target. If any step fails the original file (if it exists)
/// remains unchanged.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    atomic_write_with(path, |writer| {
        writer.write_all(content)?;
        Ok(())
    })
}

/// Atomically write a file using a writer function.
///
/// The writer is buffered. Temporary files are removed on every error path
/// because [`NamedTempFile`] deletes itself when dropped unpersisted.
pub fn atomic_write_with<F>(path: impl AsRef<Path>, write_fn: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let path = path.as_ref();
    let parent = ensure_parent_dir(path)?;

    // Same directory keeps the rename on one filesystem
    let temp_file = NamedTempFile::new_in(parent).map_err(|e| {
        SnatchError::io(
            format!("Failed to create temporary file in: {}", parent.display()),
            e,
        )
    })?;

    let mut writer = BufWriter::new(temp_file);
    write_fn(&mut writer)?;

    let temp_file = writer.into_inner().map_err(|e| {
        SnatchError::io(
            format!("Failed to flush temporary file for: {}", path.display()),
            e.into_error(),
        )
    })?;

    temp_file.as_file().sync_all().map_err(|e| {
        SnatchError::io(format!("Failed to sync file: {}", path.display()), e)
    })?;

    temp_file.persist(path).map_err(|e| {
        SnatchError::io(
            format!("Failed to atomically write file: {}", path.display()),
            e.error,
        )
    })?;

    Ok(())
}

/// Read a file's raw bytes, mapping "not found" to `None`.
pub fn read_optional_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SnatchError::io(
            format!("Failed to read file: {}", path.display()),
            e,
        )),
    }
}

/// Read a file to a string, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SnatchError::io(
            format!("Failed to read file: {}", path.display()),
            e,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");

        atomic_write(&path, b"Hello, world!").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Hello, world!");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("test.txt");

        atomic_write(&path, b"Nested content").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_atomic_write_with_closure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("closure.txt");

        atomic_write_with(&path, |w| {
            writeln!(w, "Line 1")?;
            writeln!(w, "Line 2")?;
            Ok(())
        })
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Line 1\nLine 2\n");
    }

    #[test]
    fn test_failed_write_keeps_original_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keep.txt");
        std::fs::write(&path, "Original content").unwrap();

        let result = atomic_write_with(&path, |w| {
            writeln!(w, "New content")?;
            Err(SnatchError::export("serializer gave up"))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Original content");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_parent_dir_failure_is_reported() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let err = atomic_write(blocker.join("out.json"), b"[]").unwrap_err();
        assert!(matches!(err, SnatchError::IoError { .. }));
    }

    #[test]
    fn test_read_optional() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maybe.txt");
        assert_eq!(read_optional(&path).unwrap(), None);

        std::fs::write(&path, "present").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("present"));
    }

    #[test]
    fn test_read_optional_bytes_accepts_any_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.bin");
        assert_eq!(read_optional_bytes(&path).unwrap(), None);

        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert_eq!(read_optional_bytes(&path).unwrap(), Some(vec![0xff, 0xfe, 0x00]));

        let err = read_optional_bytes(dir.path()).unwrap_err();
        assert!(matches!(err, SnatchError::IoError { .. }));
    }
}
