//! Backup directory layout and artifact listing.
//!
//! ```text
//! <root>/nodes/<name>.json            (also roles, environments, clients, users)
//! <root>/data_bags/<bag>/<item>.json
//! <root>/cookbooks/<name>-<version>/...
//! ```

use crate::component::ComponentKind;
use crate::utils::errors::Result;
use chrono::{DateTime, Duration, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One backed-up entity: a JSON file, or a cookbook directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Full path to the file or directory
    pub path: PathBuf,

    /// Entity name: file stem for documents, directory name otherwise
    pub name: String,
}

impl Artifact {
    fn from_path(path: PathBuf, strip_extension: bool) -> Self {
        let name = if strip_extension {
            path.file_stem()
        } else {
            path.file_name()
        }
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

        Self { path, name }
    }
}

#[derive(Debug, Clone, Copy)]
enum EntryFilter {
    JsonFiles,
    Directories,
}

/// A backup directory on disk
#[derive(Debug, Clone)]
pub struct BackupDir {
    root: PathBuf,
}

impl BackupDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn component_dir(&self, kind: ComponentKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// `*.json` documents of a flat component (nodes, roles, clients, ...)
    pub fn json_files(&self, kind: ComponentKind) -> Result<Vec<Artifact>> {
        list(&self.component_dir(kind), EntryFilter::JsonFiles)
    }

    /// One artifact per data bag directory
    pub fn data_bags(&self) -> Result<Vec<Artifact>> {
        list(&self.component_dir(ComponentKind::DataBags), EntryFilter::Directories)
    }

    /// Item documents inside one data bag
    pub fn data_bag_items(&self, bag: &Artifact) -> Result<Vec<Artifact>> {
        list(&bag.path, EntryFilter::JsonFiles)
    }

    /// One artifact per `<name>-<version>` cookbook directory
    pub fn cookbooks(&self) -> Result<Vec<Artifact>> {
        list(&self.component_dir(ComponentKind::Cookbooks), EntryFilter::Directories)
    }

    /// Last access time of the backup root
    pub fn last_accessed(&self) -> io::Result<DateTime<Utc>> {
        let accessed = std::fs::metadata(&self.root)?.accessed()?;
        Ok(DateTime::<Utc>::from(accessed))
    }

    /// True when the backup root was last accessed more than `max_age` before `now`
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> io::Result<bool> {
        Ok(now.signed_duration_since(self.last_accessed()?) > max_age)
    }
}

/// List the direct children of `dir` matching `filter`, sorted by name.
/// A missing directory yields no artifacts.
fn list(dir: &Path, filter: EntryFilter) -> Result<Vec<Artifact>> {
    if !dir.is_dir() {
        debug!(path = %dir.display(), "No backup directory, nothing to restore");
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut artifacts = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let is_dir = entry.file_type().is_dir();

        let artifact = match filter {
            EntryFilter::Directories if is_dir => Artifact::from_path(entry.into_path(), false),
            EntryFilter::JsonFiles
                if !is_dir && entry.path().extension().is_some_and(|ext| ext == "json") =>
            {
                Artifact::from_path(entry.into_path(), true)
            }
            _ => continue,
        };
        artifacts.push(artifact);
    }

    Ok(artifacts)
}
