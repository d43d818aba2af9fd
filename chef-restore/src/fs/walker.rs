//! Directory traversal for backup artifacts and cookbook trees.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Follow symbolic links (a staged cookbook root is itself a link)
    pub follow_links: bool,

    /// Maximum depth (None = unlimited)
    pub max_depth: Option<usize>,

    /// Entry names to skip, directories included with their contents
    pub exclude_patterns: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_links: true,
            max_depth: None,
            exclude_patterns: vec![
                ".git".to_string(),
                ".svn".to_string(),
                ".DS_Store".to_string(),
            ],
        }
    }
}

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,
}

impl FileInfo {
    fn from_entry(entry: &DirEntry, root: &Path) -> Self {
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        Self {
            path,
            relative_path,
        }
    }
}

/// Walk a directory tree and collect all regular files, sorted by path.
pub fn walk_directory(root: &Path, options: &WalkOptions) -> io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    let mut walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name();

    if let Some(max_depth) = options.max_depth {
        walker = walker.max_depth(max_depth);
    }

    let entries = walker
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_exclude(entry, &options.exclude_patterns));

    for entry in entries {
        let entry = entry?;

        if entry.file_type().is_dir() {
            continue;
        }

        files.push(FileInfo::from_entry(&entry, root));
    }

    Ok(files)
}

/// Recursively copy `src` to `dst`, returning the number of bytes copied.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut copied = 0u64;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            copied += fs::copy(entry.path(), &target)?;
        }
    }

    Ok(copied)
}

/// Check if a directory entry should be excluded based on patterns
fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| file_name == pattern.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_walk_empty_directory() -> io::Result<()> {
        let temp_dir = TempDir::new()?;
        let files = walk_directory(temp_dir.path(), &WalkOptions::default())?;
        assert_eq!(files.len(), 0);
        Ok(())
    }

    #[test]
    fn test_walk_with_subdirectories_sorted() -> io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join("recipes"))?;
        fs::write(temp_dir.path().join("metadata.json"), b"{}")?;
        fs::write(temp_dir.path().join("recipes/default.rb"), b"log 'hi'")?;

        let files = walk_directory(temp_dir.path(), &WalkOptions::default())?;
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect();
        assert_eq!(relative, vec!["metadata.json", "recipes/default.rb"]);

        Ok(())
    }

    #[test]
    fn test_excluded_directories_are_not_descended() -> io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join(".git"))?;
        fs::write(temp_dir.path().join(".git/HEAD"), b"ref")?;
        fs::write(temp_dir.path().join(".gitignore"), b"keep")?;

        let files = walk_directory(temp_dir.path(), &WalkOptions::default())?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, PathBuf::from(".gitignore"));

        Ok(())
    }

    #[test]
    fn test_copy_tree() -> io::Result<()> {
        let src = TempDir::new()?;
        let dst = TempDir::new()?;

        fs::create_dir(src.path().join("templates"))?;
        fs::write(src.path().join("README.md"), b"12345")?;
        fs::write(src.path().join("templates/a.erb"), b"1234567")?;

        let target = dst.path().join("copy");
        let copied = copy_tree(src.path(), &target)?;

        assert_eq!(copied, 12);
        assert_eq!(fs::read(target.join("templates/a.erb"))?, b"1234567");

        Ok(())
    }
}
