//! Cookbook loading: metadata, file checksums and the upload manifest.

use crate::fs::walker::{walk_directory, WalkOptions};
use crate::utils::errors::{RestoreError, Result};
use serde_json::{json, Map, Value};
use std::path::{Component, Path, PathBuf};

/// Top-level directories with their own manifest segment; anything else is a root file.
const SEGMENTS: [&str; 8] = [
    "recipes",
    "attributes",
    "files",
    "templates",
    "definitions",
    "libraries",
    "providers",
    "resources",
];

/// Logical cookbook name of a backup directory: `mysql-1.2.0` is `mysql`.
///
/// Splits once from the right on `-`; a name without `-` is returned as is.
pub fn logical_name(dir_name: &str) -> &str {
    dir_name.rsplit_once('-').map_or(dir_name, |(name, _)| name)
}

/// Version suffix of a backup directory name, if any.
pub fn version_suffix(dir_name: &str) -> Option<&str> {
    dir_name
        .rsplit_once('-')
        .map(|(_, version)| version)
        .filter(|version| !version.is_empty())
}

/// One file of a cookbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookbookFile {
    /// Manifest name, `<segment>/<path>` for root files
    pub name: String,

    /// Path relative to the cookbook root, `/`-separated
    pub path: String,

    /// Location on disk
    pub full_path: PathBuf,

    /// Hex MD5 of the content
    pub checksum: String,
}

/// A cookbook ready for upload
#[derive(Debug, Clone)]
pub struct Cookbook {
    pub name: String,
    pub version: String,
    pub root: PathBuf,
    pub metadata: Map<String, Value>,
    pub files: Vec<CookbookFile>,
}

impl Cookbook {
    /// Load the cookbook at `root`. `dir_name` is the backup directory name,
    /// used in errors and as the fallback for a missing name or version.
    ///
    /// Unparseable `metadata.json` is a [`RestoreError::MetadataParse`].
    pub async fn load(root: &Path, dir_name: &str) -> Result<Self> {
        let root = root.to_path_buf();
        let dir_name = dir_name.to_string();

        tokio::task::spawn_blocking(move || Self::load_blocking(root, &dir_name))
            .await
            .map_err(|e| RestoreError::Worker(e.to_string()))?
    }

    fn load_blocking(root: PathBuf, dir_name: &str) -> Result<Self> {
        let mut metadata = read_metadata(&root, dir_name)?;

        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| root.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| logical_name(dir_name).to_string());
        let version = metadata
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| version_suffix(dir_name).map(str::to_string))
            .unwrap_or_else(|| "0.0.0".to_string());

        metadata.insert("name".to_string(), Value::String(name.clone()));
        metadata.insert("version".to_string(), Value::String(version.clone()));

        let mut files = Vec::new();
        for file in walk_directory(&root, &WalkOptions::default())? {
            let content = std::fs::read(&file.path)?;
            let path = manifest_path(&file.relative_path);
            files.push(CookbookFile {
                name: manifest_name(&path),
                path,
                full_path: file.path,
                checksum: format!("{:x}", md5::compute(&content)),
            });
        }

        Ok(Self {
            name,
            version,
            root,
            metadata,
            files,
        })
    }

    /// The cookbook version document sent to the server
    pub fn manifest(&self) -> Value {
        let all_files: Vec<Value> = self
            .files
            .iter()
            .map(|file| {
                json!({
                    "name": file.name,
                    "path": file.path,
                    "checksum": file.checksum,
                    "specificity": "default",
                })
            })
            .collect();

        json!({
            "name": format!("{}-{}", self.name, self.version),
            "cookbook_name": self.name,
            "version": self.version,
            "json_class": "Chef::CookbookVersion",
            "chef_type": "cookbook_version",
            "frozen?": false,
            "metadata": self.metadata,
            "all_files": all_files,
        })
    }
}

fn read_metadata(root: &Path, dir_name: &str) -> Result<Map<String, Value>> {
    let json_path = root.join("metadata.json");
    if json_path.is_file() {
        let content = std::fs::read_to_string(&json_path)?;
        return serde_json::from_str(&content).map_err(|source| RestoreError::MetadataParse {
            cookbook: dir_name.to_string(),
            source,
        });
    }

    let rb_path = root.join("metadata.rb");
    if rb_path.is_file() {
        return Ok(parse_metadata_rb(&std::fs::read_to_string(&rb_path)?));
    }

    Ok(Map::new())
}

/// Pull `name`, `version` and `depends` out of a metadata.rb without evaluating it.
fn parse_metadata_rb(content: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    let mut dependencies = Map::new();

    for line in content.lines() {
        let line = line.trim();
        let Some((keyword, rest)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let args = quoted_args(rest);

        match (keyword, args.as_slice()) {
            ("name", [name, ..]) => {
                metadata.insert("name".to_string(), Value::String(name.clone()));
            }
            ("version", [version, ..]) => {
                metadata.insert("version".to_string(), Value::String(version.clone()));
            }
            ("depends", [dependency]) => {
                dependencies.insert(dependency.clone(), Value::String(">= 0.0.0".to_string()));
            }
            ("depends", [dependency, constraint, ..]) => {
                dependencies.insert(dependency.clone(), Value::String(constraint.clone()));
            }
            _ => {}
        }
    }

    metadata.insert("dependencies".to_string(), Value::Object(dependencies));
    metadata
}

/// Quoted string arguments of a Ruby call, up to a trailing comment.
fn quoted_args(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => args.push(chars.by_ref().take_while(|&ch| ch != c).collect()),
            '#' => break,
            _ => {}
        }
    }

    args
}

fn manifest_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn manifest_name(path: &str) -> String {
    match path.split_once('/') {
        Some((segment, _)) if SEGMENTS.contains(&segment) => path.to_string(),
        _ => format!("root_files/{path}"),
    }
}
