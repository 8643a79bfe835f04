//! Schema version shifting
//!
//! This module provides:
//! - `resolve` / `resolve_uninstall`: which versions to run, in which direction
//! - `Migrator`: runs a plan's stages and the version marker update as one group
//! - `VersionStore` / `SqlVersionStore`: the installed-version marker
//! - `VersionCatalog`: `StaticCatalog`, `DirectoryCatalog`, `PlainFilesCatalog`
//! - `Stage` / `SqlStage`: one version's forward and backward change
//! - `MigrationObserver`: progress notifications
//!
//! # Example
//!
//! ```rust
//! use dbshift::migration::{resolve, Direction, Version};
//!
//! let available: Vec<Version> = ["1.0", "2.0", "3.0"].into_iter().map(Version::from).collect();
//!
//! let plan = resolve(Some(&Version::from("1.0")), None, &available).unwrap();
//! assert_eq!(plan.direction, Direction::Forward);
//! assert_eq!(plan.versions, vec![Version::from("2.0"), Version::from("3.0")]);
//!
//! let plan = resolve(Some(&Version::from("3.0")), Some(&Version::from("1.0")), &available).unwrap();
//! assert_eq!(plan.direction, Direction::Backward);
//! assert_eq!(plan.versions, vec![Version::from("3.0"), Version::from("2.0")]);
//! ```

pub mod catalog;
pub mod error;
pub mod file;
pub mod migrator;
pub mod observer;
pub mod resolver;
pub mod script;
pub mod stage;
pub mod state_table;
pub mod status;
pub mod version;

pub use catalog::{open_catalog, CatalogLayout, StaticCatalog, VersionCatalog};
pub use error::MigrationError;
pub use file::{DirectoryCatalog, PlainFilesCatalog, StageFiles};
pub use migrator::{Migrator, Operation};
pub use observer::{ChannelObserver, LogObserver, MigrationEvent, MigrationObserver, NoopObserver};
pub use resolver::{resolve, resolve_uninstall, Plan, ResolveError};
pub use script::split_statements;
pub use stage::{SqlStage, Stage};
pub use state_table::{SqlVersionStore, VersionStore, DEFAULT_VERSION_TABLE};
pub use status::{MigrationReport, MigrationStatus};
pub use version::{Action, Direction, Version};

// Re-export for convenience
pub use crate::ShiftError;
