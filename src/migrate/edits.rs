//! Reusable edit primitives for migration steps.
//!
//! Every primitive re-checks document state before mutating so that running
//! a step twice leaves the document as running it once.

use crate::error::Result;
use crate::models::{Capability, ModelDocument, ModelRecord};
use crate::settings::ConfigStore;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Returns `true` for `{name}` tokens resolved from config at call time.
pub fn is_placeholder(value: &str) -> bool {
    value.len() > 2 && value.starts_with('{') && value.ends_with('}')
}

/// `api_key_google` → `{api_key_google}`.
pub fn placeholder_for(config_key: &str) -> String {
    format!("{{{config_key}}}")
}

/// Whether `record.id` starts with any of `prefixes`.
pub fn id_has_prefix(record: &ModelRecord, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| record.id.starts_with(p))
}

/// Add `mode` to every record accepted by `filter`. Returns the number of
/// records changed.
pub fn add_mode_where<F>(document: &mut ModelDocument, mode: &str, filter: F) -> usize
where
    F: Fn(&ModelRecord) -> bool,
{
    let mut changed = 0usize;
    for record in document.records_mut() {
        if filter(record) && record.add_mode(mode) {
            debug!(model = %record.id, mode, "added mode");
            changed += 1;
        }
    }
    changed
}

/// Set the display name of `id` to its identifier, if present.
pub fn name_after_id(document: &mut ModelDocument, id: &str) {
    if let Some(record) = document.get_mut(id) {
        record.name = id.to_owned();
    }
}

/// Secret values captured while hoisting, keyed by config key.
#[derive(Debug, Default)]
pub struct HoistedSecrets {
    values: BTreeMap<&'static str, String>,
}

impl HoistedSecrets {
    /// Record `value` for `config_key`. A later capture for the same key
    /// replaces an earlier one.
    pub fn capture(&mut self, config_key: &'static str, value: &str) {
        if let Some(previous) = self.values.insert(config_key, value.to_owned())
            && previous != value
        {
            warn!(key = config_key, "conflicting inline values; keeping the last one");
        }
    }

    pub fn get(&self, config_key: &str) -> Option<&str> {
        self.values.get(config_key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write every captured value into `config` and save it.
    ///
    /// Returns `false` without touching `config` when nothing was captured.
    pub fn write_to(&self, config: &mut dyn ConfigStore) -> Result<bool> {
        if self.values.is_empty() {
            return Ok(false);
        }
        for (key, value) in &self.values {
            config.set(key, value);
            debug!(key = *key, "moved inline value to config");
        }
        config.save()?;
        Ok(true)
    }
}

/// Point binding `env_name` at the `{config_key}` placeholder.
///
/// A literal value found in the binding is captured into `secrets` before
/// it is overwritten. A missing binding is added. Returns `true` if the
/// block changed.
pub fn hoist_env(
    capability: &mut Capability,
    env_name: &str,
    config_key: &'static str,
    secrets: &mut HoistedSecrets,
) -> bool {
    let placeholder = placeholder_for(config_key);
    if let Some(binding) = capability.env(env_name)
        && !binding.value.is_empty()
        && !is_placeholder(&binding.value)
    {
        secrets.capture(config_key, &binding.value);
    }
    capability.upsert_env(env_name, &placeholder)
}
