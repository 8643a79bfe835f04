//! Filesystem catalogs
//!
//! Two layouts are understood:
//!
//! ```text
//! directory layout            plain layout
//! migrations/                 migrations/
//!   0001/                       0001.up.sql
//!     up.sql                    0001.down.sql
//!     down.sql                  0002.up.sql
//!   0002/
//!     up.sql
//! ```
//!
//! Versions sort lexically by name, so zero-padded or timestamp prefixes give the
//! expected order. A missing down script makes that version irreversible.

use crate::migration::catalog::VersionCatalog;
use crate::migration::stage::{SqlStage, Stage};
use crate::migration::version::Version;
use crate::migration::MigrationError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const UP_SCRIPT: &str = "up.sql";
const DOWN_SCRIPT: &str = "down.sql";

/// Scripts found on disk for one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFiles {
    pub version: Version,
    pub up: PathBuf,
    pub down: Option<PathBuf>,
}

impl StageFiles {
    fn into_stage(self) -> Result<SqlStage, MigrationError> {
        let up = read_script(&self.up)?;
        let down = self.down.as_deref().map(read_script).transpose()?;
        Ok(SqlStage::new(self.version, up, down))
    }
}

fn read_script(path: &Path) -> Result<String, MigrationError> {
    fs::read_to_string(path).map_err(|source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_entries(root: &Path) -> Result<Vec<PathBuf>, MigrationError> {
    if !root.exists() {
        return Err(MigrationError::CatalogNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(MigrationError::InvalidFormat(format!(
            "Path is not a directory: {}",
            root.display()
        )));
    }

    let io_err = |source| MigrationError::Io {
        path: root.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}

fn file_name(path: &Path) -> Result<&str, MigrationError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            MigrationError::InvalidFormat(format!("Invalid filename: {}", path.display()))
        })
}

fn lookup<'a>(
    stages: &'a [StageFiles],
    version: &Version,
) -> Result<&'a StageFiles, MigrationError> {
    stages
        .iter()
        .find(|s| &s.version == version)
        .ok_or_else(|| MigrationError::UnavailableVersion {
            version: Some(version.clone()),
            all_versions: stages.iter().map(|s| s.version.clone()).collect(),
        })
}

/// Catalog with one sub-directory per version
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the catalog, oldest version first
    ///
    /// Plain files next to the version directories are ignored. A version directory
    /// without `up.sql` is an error.
    pub fn discover(&self) -> Result<Vec<StageFiles>, MigrationError> {
        let mut stages = Vec::new();
        for path in read_entries(&self.root)? {
            if !path.is_dir() {
                continue;
            }
            let name = file_name(&path)?;
            if name.starts_with('.') {
                continue;
            }

            let up = path.join(UP_SCRIPT);
            if !up.is_file() {
                return Err(MigrationError::InvalidFormat(format!(
                    "Version directory {} has no {}",
                    path.display(),
                    UP_SCRIPT
                )));
            }
            let down = path.join(DOWN_SCRIPT);
            stages.push(StageFiles {
                version: Version::from(name),
                up,
                down: down.is_file().then_some(down),
            });
        }

        stages.sort_by(|a, b| a.version.as_str().cmp(b.version.as_str()));
        log::debug!(
            "Discovered {} version(s) in {}",
            stages.len(),
            self.root.display()
        );
        Ok(stages)
    }
}

impl VersionCatalog for DirectoryCatalog {
    fn available_versions(&self) -> Result<Vec<Version>, MigrationError> {
        Ok(self.discover()?.into_iter().map(|s| s.version).collect())
    }

    fn load_stage(&self, version: &Version) -> Result<Box<dyn Stage>, MigrationError> {
        let stages = self.discover()?;
        let files = lookup(&stages, version)?.clone();
        Ok(Box::new(files.into_stage()?))
    }
}

/// Catalog of `<version>.up.sql` / `<version>.down.sql` files in one directory
#[derive(Debug, Clone)]
pub struct PlainFilesCatalog {
    root: PathBuf,
}

impl PlainFilesCatalog {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Split a file name into its version and direction
    ///
    /// `0003_add_index.up.sql` gives `("0003_add_index", true)`. Files that are not
    /// `.up.sql` or `.down.sql` give `None`.
    pub fn parse_filename(filename: &str) -> Result<Option<(Version, bool)>, MigrationError> {
        let re = Regex::new(r"^(.+)\.(up|down)\.sql$")
            .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {}", e)))?;

        Ok(re.captures(filename).and_then(|caps| {
            let version = caps.get(1)?.as_str();
            let is_up = caps.get(2)?.as_str() == "up";
            Some((Version::from(version), is_up))
        }))
    }

    /// Scan the catalog, oldest version first
    ///
    /// A `.down.sql` with no matching `.up.sql` is an error.
    pub fn discover(&self) -> Result<Vec<StageFiles>, MigrationError> {
        let mut ups: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut downs: BTreeMap<String, PathBuf> = BTreeMap::new();

        for path in read_entries(&self.root)? {
            if !path.is_file() {
                continue;
            }
            let Some((version, is_up)) = Self::parse_filename(file_name(&path)?)? else {
                continue;
            };
            let key = version.as_str().to_string();
            if is_up {
                ups.insert(key, path);
            } else {
                downs.insert(key, path);
            }
        }

        if let Some(orphan) = downs.keys().find(|k| !ups.contains_key(*k)) {
            return Err(MigrationError::InvalidFormat(format!(
                "{}.down.sql has no matching {}.up.sql",
                orphan, orphan
            )));
        }

        let stages: Vec<StageFiles> = ups
            .into_iter()
            .map(|(name, up)| {
                let down = downs.remove(&name);
                StageFiles {
                    version: Version::from(name),
                    up,
                    down,
                }
            })
            .collect();
        log::debug!(
            "Discovered {} version(s) in {}",
            stages.len(),
            self.root.display()
        );
        Ok(stages)
    }
}

impl VersionCatalog for PlainFilesCatalog {
    fn available_versions(&self) -> Result<Vec<Version>, MigrationError> {
        Ok(self.discover()?.into_iter().map(|s| s.version).collect())
    }

    fn load_stage(&self, version: &Version) -> Result<Box<dyn Stage>, MigrationError> {
        let stages = self.discover()?;
        let files = lookup(&stages, version)?.clone();
        Ok(Box::new(files.into_stage()?))
    }
}
