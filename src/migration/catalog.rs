//! Version catalogs
//!
//! A catalog knows which versions exist, in what order, and how to build the stage
//! for one of them. Stages are only built for versions a plan actually runs.

use crate::migration::file::{DirectoryCatalog, PlainFilesCatalog};
use crate::migration::stage::Stage;
use crate::migration::version::Version;
use crate::migration::MigrationError;
use serde::Deserialize;
use std::path::Path;

/// Source of versions and their stages
pub trait VersionCatalog {
    /// All known versions, oldest first, without duplicates
    fn available_versions(&self) -> Result<Vec<Version>, MigrationError>;

    /// Build the stage for `version`
    fn load_stage(&self, version: &Version) -> Result<Box<dyn Stage>, MigrationError>;
}

type StageFactory = Box<dyn Fn() -> Box<dyn Stage>>;

/// In-process registry of stage factories
///
/// Registration order is catalog order.
///
/// # Example
///
/// ```rust
/// use dbshift::migration::{SqlStage, StaticCatalog, Version, VersionCatalog};
///
/// let mut catalog = StaticCatalog::new();
/// catalog
///     .register("0001", || {
///         Box::new(SqlStage::new(
///             Version::from("0001"),
///             "CREATE TABLE users (id BIGINT PRIMARY KEY)",
///             Some("DROP TABLE users".to_string()),
///         ))
///     })
///     .unwrap();
/// assert_eq!(catalog.available_versions().unwrap(), vec![Version::from("0001")]);
/// ```
#[derive(Default)]
pub struct StaticCatalog {
    entries: Vec<(Version, StageFactory)>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `version`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if `version` is already present.
    pub fn register<F>(
        &mut self,
        version: impl Into<Version>,
        factory: F,
    ) -> Result<(), MigrationError>
    where
        F: Fn() -> Box<dyn Stage> + 'static,
    {
        let version = version.into();
        if self.entries.iter().any(|(v, _)| *v == version) {
            return Err(MigrationError::AlreadyRegistered(version));
        }
        self.entries.push((version, Box::new(factory)));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VersionCatalog for StaticCatalog {
    fn available_versions(&self) -> Result<Vec<Version>, MigrationError> {
        Ok(self.entries.iter().map(|(v, _)| v.clone()).collect())
    }

    fn load_stage(&self, version: &Version) -> Result<Box<dyn Stage>, MigrationError> {
        self.entries
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, factory)| factory())
            .ok_or_else(|| MigrationError::UnavailableVersion {
                version: Some(version.clone()),
                all_versions: self.entries.iter().map(|(v, _)| v.clone()).collect(),
            })
    }
}

/// On-disk shape of a catalog directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogLayout {
    /// One sub-directory per version holding `up.sql` and optionally `down.sql`
    #[default]
    Directory,
    /// `<version>.up.sql` and `<version>.down.sql` files side by side
    Plain,
}

/// Open the filesystem catalog at `path` with the given layout
pub fn open_catalog(layout: CatalogLayout, path: impl AsRef<Path>) -> Box<dyn VersionCatalog> {
    match layout {
        CatalogLayout::Directory => Box::new(DirectoryCatalog::new(path)),
        CatalogLayout::Plain => Box::new(PlainFilesCatalog::new(path)),
    }
}

impl<C: VersionCatalog + ?Sized> VersionCatalog for Box<C> {
    fn available_versions(&self) -> Result<Vec<Version>, MigrationError> {
        (**self).available_versions()
    }

    fn load_stage(&self, version: &Version) -> Result<Box<dyn Stage>, MigrationError> {
        (**self).load_stage(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::stage::SqlStage;

    fn sql_stage(name: &'static str) -> impl Fn() -> Box<dyn Stage> {
        move || Box::new(SqlStage::new(Version::from(name), "SELECT 1", None))
    }

    #[test]
    fn test_registration_order_is_catalog_order() {
        let mut catalog = StaticCatalog::new();
        catalog.register("b", sql_stage("b")).unwrap();
        catalog.register("a", sql_stage("a")).unwrap();
        assert_eq!(
            catalog.available_versions().unwrap(),
            vec![Version::from("b"), Version::from("a")]
        );
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut catalog = StaticCatalog::new();
        catalog.register("1.0", sql_stage("1.0")).unwrap();
        let err = catalog.register("1.0", sql_stage("1.0")).unwrap_err();
        assert!(matches!(err, MigrationError::AlreadyRegistered(v) if v.as_str() == "1.0"));
    }

    #[test]
    fn test_load_unknown_version() {
        let catalog = StaticCatalog::new();
        assert!(catalog.is_empty());
        let err = catalog.load_stage(&Version::from("x")).err().unwrap();
        assert!(matches!(err, MigrationError::UnavailableVersion { .. }));
    }

    #[test]
    fn test_default_layout_is_directory() {
        assert_eq!(CatalogLayout::default(), CatalogLayout::Directory);
    }
}
