//! Versioned manifest schemas.
//!
//! - [`typegraph`] reads the declared shape of a manifest version;
//! - [`generator`] turns it into a JSON Schema [`definition::SchemaDocument`];
//! - [`schemas`] keeps one schema file per entry of [`versions::SCHEMA_VERSIONS`];
//! - [`config`] holds the frozen manifest models and [`migrate`] upgrades
//!   manifests between them.
pub mod cli;
pub mod config;
pub mod definition;
pub mod generator;
pub mod migrate;
pub mod path_de;
pub mod schemas;
pub mod typegraph;
pub mod versions;

pub use generator::{GenerateError, generate};
pub use migrate::{MigrateError, Upgraded, Warning, upgrade_to_latest};
pub use typegraph::{ReadError, TypeGraph};
