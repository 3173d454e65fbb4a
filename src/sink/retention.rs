//! Backup file retention
//!
//! Rotated backups live next to the active file as `name.1`, `name.2`, ...
//! with `.1` the most recent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Path of the `index`-th backup of `base`
pub fn backup_path(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// List the numbered backups of `base` that exist on disk, sorted by index
pub fn existing_backups(base: &Path) -> io::Result<Vec<(u32, PathBuf)>> {
    let (Some(dir), Some(file_name)) = (base.parent(), base.file_name()) else {
        return Ok(Vec::new());
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("{}.", file_name.to_string_lossy());
    let mut backups = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(index) = name
            .strip_prefix(&prefix)
            .and_then(|suffix| suffix.parse::<u32>().ok())
        else {
            continue;
        };
        if index > 0 {
            backups.push((index, path));
        }
    }

    backups.sort_by_key(|(index, _)| *index);
    Ok(backups)
}

/// Delete backups of `base` numbered above `keep`
///
/// Returns the number of files deleted.
pub fn prune_backups(base: &Path, keep: u32) -> io::Result<usize> {
    let mut deleted_count = 0;
    for (index, path) in existing_backups(base)? {
        if index > keep && fs::remove_file(&path).is_ok() {
            deleted_count += 1;
        }
    }
    Ok(deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path() {
        let base = Path::new("/var/log/app/info.log");
        assert_eq!(backup_path(base, 3), PathBuf::from("/var/log/app/info.log.3"));
    }

    #[test]
    fn test_prune_nonexistent_dir() {
        let base = Path::new("/nonexistent/path/for/testing/info.log");
        assert_eq!(prune_backups(base, 0).unwrap(), 0);
    }

    #[test]
    fn test_existing_backups_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("info.log");

        for name in ["info.log", "info.log.2", "info.log.1", "info.log.old", "errors.log.1"] {
            File::create(temp_dir.path().join(name))
                .unwrap()
                .write_all(b"test")
                .unwrap();
        }

        let backups = existing_backups(&base).unwrap();
        let indexes: Vec<u32> = backups.iter().map(|(index, _)| *index).collect();
        assert_eq!(indexes, vec![1, 2]);
    }

    #[test]
    fn test_prune_removes_only_excess_backups() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("errors.log");

        for index in 1..=5 {
            File::create(backup_path(&base, index))
                .unwrap()
                .write_all(b"old")
                .unwrap();
        }

        let count = prune_backups(&base, 3).unwrap();
        assert_eq!(count, 2);
        assert!(backup_path(&base, 3).exists());
        assert!(!backup_path(&base, 4).exists());
        assert!(!backup_path(&base, 5).exists());
    }
}
