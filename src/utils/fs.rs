use crate::error::{Result, SweepError};
use regex::Regex;
use std::path::Path;

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => SweepError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => SweepError::from(e),
        })?;
    }
    Ok(())
}

pub fn file_size(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Removes every regular file below `dir` whose name matches `pattern`.
/// Python sources are never touched. Returns the number of files removed.
pub fn purge_matching(dir: &Path, pattern: &Regex) -> Result<usize> {
    let mut count = 0;

    if !dir.is_dir() {
        return Ok(count);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            count += purge_matching(&path, pattern)?;
            continue;
        }

        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if pattern.is_match(&name) && !name.ends_with(".py") {
            std::fs::remove_file(&path)?;
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_exists_creates_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir_exists(&nested).unwrap();
    }

    #[test]
    fn test_purge_matching() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("Export_1.csv"), "x").unwrap();
        std::fs::write(root.join("sub").join("Export_2.csv"), "x").unwrap();
        std::fs::write(root.join("Export_tool.py"), "x").unwrap();
        std::fs::write(root.join("keep.csv"), "x").unwrap();

        let pattern = Regex::new("^Export_").unwrap();
        let removed = purge_matching(root, &pattern).unwrap();

        assert_eq!(removed, 2);
        assert!(!root.join("Export_1.csv").exists());
        assert!(!root.join("sub").join("Export_2.csv").exists());
        assert!(root.join("Export_tool.py").exists());
        assert!(root.join("keep.csv").exists());
        assert!(root.join("sub").is_dir());
    }

    #[test]
    fn test_purge_missing_dir_is_noop() {
        let temp = TempDir::new().unwrap();
        let pattern = Regex::new(".*").unwrap();
        assert_eq!(purge_matching(&temp.path().join("missing"), &pattern).unwrap(), 0);
    }
}
