//! Model-definition migration for an LLM assistant's `models.json`.
//!
//! On startup the assistant compares the version tag stored in its models
//! document with its own version and walks an ordered chain of
//! version-gated steps to bring the document up to date.
//!
//! # Architecture
//!
//! - **Version**: numeric `major.minor.patch` ordering ([`version`])
//! - **Documents**: typed model records and the `models.json` envelope ([`models`])
//! - **Migrator**: the step table and the walk over it ([`migrate`])
//! - **Collaborators**: template reload ([`templates`]), application
//!   settings ([`settings`]) and the models store, each behind a trait so
//!   the walk can be tested in memory
//! - **Persistence**: atomic file writes and backups ([`persist`]) under the
//!   directories resolved by [`app_dirs`]

pub mod app_dirs;
pub mod error;
pub mod migrate;
pub mod models;
pub mod persist;
pub mod settings;
pub mod templates;
pub mod version;

pub use error::{MigrateError, Result};
pub use migrate::{
    MigrationEnv, MigrationOutcome, MigrationStep, Migrator, PatchContext, StepAction,
    run_startup_migration,
};
pub use models::{JsonModelStore, ModelDocument, ModelRecord, ModelStore};
pub use settings::{ConfigStore, TomlConfigStore};
pub use templates::{BundledTemplates, TemplateSource};
pub use version::Version;
