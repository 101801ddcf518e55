//! Filesystem primitives used by the executor.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use blake3::Hasher;

/// Copy a single file, creating parent directories and replacing any
/// existing destination. Returns the number of bytes copied.
pub(crate) fn copy_file(source: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)
}

/// Recursively copy a directory.
pub(crate) fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<u64> {
    fs::create_dir_all(dest)?;

    let mut total_bytes = 0u64;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            total_bytes += copy_dir_recursive(&path, &dest_path)?;
        } else {
            total_bytes += fs::copy(&path, &dest_path)?;
        }
    }

    Ok(total_bytes)
}

/// Copy a file or directory tree. Returns the number of bytes copied.
pub(crate) fn copy_any(source: &Path, dest: &Path) -> io::Result<u64> {
    if source.is_dir() {
        copy_dir_recursive(source, dest)
    } else {
        copy_file(source, dest)
    }
}

/// Full BLAKE3 hash of a file.
pub(crate) fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Check that `copy` holds the same bytes as `original`, file by file.
pub(crate) fn verify_copy(original: &Path, copy: &Path) -> Result<(), String> {
    if original.is_dir() {
        let entries = fs::read_dir(original).map_err(|e| format!("cannot list {}: {e}", original.display()))?;
        for entry in entries {
            let entry = entry.map_err(|e| e.to_string())?;
            verify_copy(&entry.path(), &copy.join(entry.file_name()))?;
        }
        return Ok(());
    }

    let expected = hash_file(original).map_err(|e| format!("cannot hash {}: {e}", original.display()))?;
    let actual = hash_file(copy).map_err(|e| format!("cannot hash {}: {e}", copy.display()))?;
    if expected == actual {
        Ok(())
    } else {
        Err(format!("{} does not match the original", copy.display()))
    }
}

/// Remove a file or a directory tree.
pub(crate) fn remove_any(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Check whether two paths name the same existing entry.
pub(crate) fn same_entry(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Check whether `path` is `root` or lies below it. Either may not exist yet.
pub(crate) fn lies_under(path: &Path, root: &Path) -> bool {
    resolve(path).starts_with(resolve(root))
}

/// Canonicalize the longest existing ancestor and re-append the rest.
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }
    absolute
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_and_verify() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "alpha").unwrap();
        fs::write(src.join("nested/b.txt"), "beta").unwrap();

        let dest = temp.path().join("copy");
        assert_eq!(copy_any(&src, &dest).unwrap(), 9);
        assert!(verify_copy(&src, &dest).is_ok());

        fs::write(dest.join("nested/b.txt"), "BETA").unwrap();
        assert!(verify_copy(&src, &dest).is_err());
    }

    #[test]
    fn test_copy_file_creates_parents_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        fs::write(&src, "new").unwrap();

        let dest = temp.path().join("deep/er/a.txt");
        copy_file(&src, &dest).unwrap();
        fs::write(&src, "newer").unwrap();
        copy_file(&src, &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "newer");
    }

    #[test]
    fn test_same_entry_and_lies_under() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), "a").unwrap();

        assert!(same_entry(&dir.join("a.txt"), &dir.join("../dir/a.txt")));
        assert!(!same_entry(&dir.join("a.txt"), &dir.join("missing.txt")));

        assert!(lies_under(&dir.join("a.txt"), temp.path()));
        assert!(lies_under(&dir.join("not/yet/there"), &dir));
        assert!(lies_under(&dir, &dir));
        assert!(!lies_under(&temp.path().join("dir-sibling"), &dir));
    }
}
