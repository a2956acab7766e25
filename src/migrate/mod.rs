//! Version-gated migration of the models document.
//!
//! A [`Migrator`] holds an ordered table of [`MigrationStep`]s. Running it
//! against a stored version applies every step whose threshold is above
//! that version, oldest first:
//!
//! - [`StepAction::Edit`] mutates the document (and may write to the
//!   application config through [`PatchContext::config`])
//! - [`StepAction::ForceReload`] overwrites the user file from the shipped
//!   template and continues the walk on the reloaded document
//! - [`StepAction::Touch`] changes nothing itself but marks the run as
//!   updated so that missing records get reconciled
//!
//! When any step ran, the document is saved through the [`ModelStore`] and
//! the store is asked to reconcile records missing from it. The migrator
//! never writes the stored version tag itself; the store's save path does.

pub mod edits;
pub mod steps;

use crate::error::{MigrateError, Result};
use crate::models::{ModelDocument, ModelStore};
use crate::settings::ConfigStore;
use crate::templates::TemplateSource;
use crate::version::Version;
use tracing::{debug, info};

/// Signature of an in-place document edit.
pub type EditFn = fn(&mut PatchContext<'_>) -> Result<()>;

/// What a step does when it runs.
#[derive(Debug, Clone, Copy)]
pub enum StepAction {
    /// Nothing beyond marking the run as updated.
    Touch,
    /// Replace the user copy of `resource` with the shipped default and reload.
    ForceReload { resource: &'static str },
    /// Edit the document in place.
    Edit(EditFn),
}

/// One entry of the migration table.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    /// The step runs when the stored version is below this.
    pub threshold: Version,
    pub description: &'static str,
    pub action: StepAction,
}

impl MigrationStep {
    pub const fn touch(threshold: Version, description: &'static str) -> Self {
        Self {
            threshold,
            description,
            action: StepAction::Touch,
        }
    }

    pub const fn reload(
        threshold: Version,
        description: &'static str,
        resource: &'static str,
    ) -> Self {
        Self {
            threshold,
            description,
            action: StepAction::ForceReload { resource },
        }
    }

    pub const fn edit(threshold: Version, description: &'static str, edit: EditFn) -> Self {
        Self {
            threshold,
            description,
            action: StepAction::Edit(edit),
        }
    }

    /// Whether this step applies to a document stored at `stored`.
    pub fn is_pending(&self, stored: Version) -> bool {
        stored < self.threshold
    }
}

/// Mutable state handed to an [`EditFn`].
pub struct PatchContext<'a> {
    pub document: &'a mut ModelDocument,
    /// Application settings; edits that move values out of records write here.
    pub config: &'a mut dyn ConfigStore,
}

/// Collaborators a migration run talks to.
pub struct MigrationEnv<'a> {
    pub store: &'a mut dyn ModelStore,
    pub templates: &'a dyn TemplateSource,
    pub config: &'a mut dyn ConfigStore,
}

/// Result of a migration run.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub document: ModelDocument,
    /// `true` if any step ran and the document was saved.
    pub updated: bool,
    /// Thresholds of the steps that ran, in order.
    pub applied: Vec<Version>,
    /// Records inserted by reconciliation after the walk.
    pub reconciled: usize,
}

impl MigrationOutcome {
    fn unchanged(document: ModelDocument) -> Self {
        Self {
            document,
            updated: false,
            applied: Vec::new(),
            reconciled: 0,
        }
    }
}

/// Ordered table of version-gated steps.
#[derive(Debug, Clone)]
pub struct Migrator {
    steps: Vec<MigrationStep>,
}

impl Migrator {
    /// Build a migrator from `steps`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::InvalidStepTable`] unless thresholds are
    /// strictly increasing.
    pub fn new(steps: Vec<MigrationStep>) -> Result<Self> {
        if let Some(pair) = steps.windows(2).find(|w| w[0].threshold >= w[1].threshold) {
            return Err(MigrateError::InvalidStepTable(format!(
                "threshold {} ({}) is not above {} ({})",
                pair[1].threshold, pair[1].description, pair[0].threshold, pair[0].description
            )));
        }
        Ok(Self { steps })
    }

    /// The built-in `models.json` chain.
    pub fn builtin() -> Self {
        Self {
            steps: steps::builtin_steps(),
        }
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Steps a run from `stored` would apply, in order.
    pub fn pending(&self, stored: Version) -> Vec<&MigrationStep> {
        self.steps.iter().filter(|s| s.is_pending(stored)).collect()
    }

    /// Migrate `document` from `stored` towards `target`.
    ///
    /// Returns the document untouched with `updated = false` when
    /// `stored >= target`.
    ///
    /// # Errors
    ///
    /// Propagates store, template and config failures. Nothing is rolled
    /// back; a failed run is retried in full on the next start because the
    /// stored version tag is only advanced by a successful save.
    pub fn migrate(
        &self,
        stored: Version,
        target: Version,
        mut document: ModelDocument,
        env: &mut MigrationEnv<'_>,
    ) -> Result<MigrationOutcome> {
        if stored >= target {
            debug!(%stored, %target, "models up to date");
            return Ok(MigrationOutcome::unchanged(document));
        }

        let mut applied = Vec::new();

        for step in self.steps.iter().filter(|s| s.is_pending(stored)) {
            info!(
                from = %stored,
                threshold = %step.threshold,
                step = step.description,
                "migrating models"
            );
            match step.action {
                StepAction::Touch => {}
                StepAction::ForceReload { resource } => {
                    env.templates.force_replace(resource)?;
                    document = env.store.load()?;
                }
                StepAction::Edit(edit) => {
                    let mut ctx = PatchContext {
                        document: &mut document,
                        config: &mut *env.config,
                    };
                    edit(&mut ctx)?;
                }
            }
            applied.push(step.threshold);
        }

        if applied.is_empty() {
            return Ok(MigrationOutcome::unchanged(document));
        }

        env.store.save(&document)?;
        let reconciled = env.store.reconcile_missing(&mut document)?;
        info!(
            from = %stored,
            to = %target,
            steps = applied.len(),
            reconciled,
            "models migrated"
        );

        Ok(MigrationOutcome {
            document,
            updated: true,
            applied,
            reconciled,
        })
    }
}

/// Load the stored document and its version tag, then migrate to `target`.
///
/// Intended to run once at startup, before anything else reads the models.
///
/// # Errors
///
/// Propagates version-tag, load and migration failures.
pub fn run_startup_migration(
    migrator: &Migrator,
    env: &mut MigrationEnv<'_>,
    target: Version,
) -> Result<MigrationOutcome> {
    let stored = env.store.stored_version()?;
    let document = env.store.load()?;
    migrator.migrate(stored, target, document, env)
}
