//! Model definition schema.
//!
//! Mirrors the `items` section of `models.json`. Unknown keys are preserved
//! on round-trip via flattened `extra` maps.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Backend name of the LangChain capability block.
pub const LANGCHAIN: &str = "langchain";

/// Backend name of the LlamaIndex capability block.
pub const LLAMA_INDEX: &str = "llama_index";

/// A single invocation argument passed to a backend client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArg {
    pub name: String,
    pub value: serde_json::Value,
    /// Declared value type (`"str"`, `"int"`, `"float"`, `"bool"`).
    #[serde(rename = "type", default = "default_arg_type")]
    pub kind: String,
}

/// An explicit `null` reads as the type's default, same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn default_arg_type() -> String {
    "str".to_owned()
}

impl ModelArg {
    /// A string-typed argument.
    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: serde_json::Value::String(value.to_owned()),
            kind: default_arg_type(),
        }
    }
}

/// An environment variable exported before a backend client is created.
///
/// Values are either literals or `{placeholder}` tokens resolved from the
/// application config at call time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvBinding {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

impl EnvBinding {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }
}

/// Per-backend capability block of a model record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capability {
    /// Backend provider tag (`"openai"`, `"anthropic"`, ...).
    pub provider: Option<String>,
    /// Backend-specific modes.
    #[serde(deserialize_with = "null_as_default")]
    pub mode: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub args: Vec<ModelArg>,
    /// Environment bindings. Names are unique within a block.
    #[serde(deserialize_with = "null_as_default")]
    pub env: Vec<EnvBinding>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Capability {
    /// Look up an environment binding by exact name.
    pub fn env(&self, name: &str) -> Option<&EnvBinding> {
        self.env.iter().find(|b| b.name == name)
    }

    /// Mutable lookup of an environment binding by exact name.
    pub fn env_mut(&mut self, name: &str) -> Option<&mut EnvBinding> {
        self.env.iter_mut().find(|b| b.name == name)
    }

    /// Set `name` to `value`, updating an existing binding in place.
    ///
    /// Returns `true` if the block changed.
    pub fn upsert_env(&mut self, name: &str, value: &str) -> bool {
        match self.env_mut(name) {
            Some(binding) if binding.value == value => false,
            Some(binding) => {
                binding.value = value.to_owned();
                true
            }
            None => {
                self.env.push(EnvBinding::new(name, value));
                true
            }
        }
    }

    /// Add `name = value` only if no binding with that name exists.
    ///
    /// Returns `true` if a binding was added.
    pub fn ensure_env(&mut self, name: &str, value: &str) -> bool {
        if self.env(name).is_some() {
            return false;
        }
        self.env.push(EnvBinding::new(name, value));
        true
    }

    /// Drop provider, args and env.
    pub fn clear(&mut self) {
        self.provider = None;
        self.args.clear();
        self.env.clear();
    }
}

/// A model definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Supported operating modes (`chat`, `completion`, `agent`, ...). No duplicates.
    #[serde(deserialize_with = "null_as_default")]
    pub mode: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub langchain: Capability,
    #[serde(deserialize_with = "null_as_default")]
    pub llama_index: Capability,
    /// Context window in tokens.
    #[serde(deserialize_with = "null_as_default")]
    pub ctx: u64,
    /// Maximum output tokens.
    #[serde(deserialize_with = "null_as_default")]
    pub tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub default: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModelRecord {
    /// A record whose id and display name are both `id`.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: id.to_owned(),
            ..Self::default()
        }
    }

    pub fn has_mode(&self, mode: &str) -> bool {
        self.mode.iter().any(|m| m == mode)
    }

    /// Append `mode` if absent. Returns `true` if it was added.
    pub fn add_mode(&mut self, mode: &str) -> bool {
        if self.has_mode(mode) {
            return false;
        }
        self.mode.push(mode.to_owned());
        true
    }

    /// Remove every occurrence of `mode`. Returns `true` if anything was removed.
    pub fn remove_mode(&mut self, mode: &str) -> bool {
        let before = self.mode.len();
        self.mode.retain(|m| m != mode);
        self.mode.len() != before
    }

    /// Both capability blocks, tagged with their backend name.
    pub fn capabilities_mut(&mut self) -> [(&'static str, &mut Capability); 2] {
        [
            (LANGCHAIN, &mut self.langchain),
            (LLAMA_INDEX, &mut self.llama_index),
        ]
    }
}

/// The persisted mapping of model identifiers to records.
///
/// Keys are kept in ascending lexicographic order, which is also the order
/// they are written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelDocument {
    items: BTreeMap<String, ModelRecord>,
}

impl ModelDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ModelRecord> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ModelRecord> {
        self.items.get_mut(id)
    }

    /// Insert or replace the record stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, record: ModelRecord) -> Option<ModelRecord> {
        self.items.insert(key.into(), record)
    }

    pub fn remove(&mut self, id: &str) -> Option<ModelRecord> {
        self.items.remove(id)
    }

    /// Move the record under `from` to `to` unless `to` is already taken.
    ///
    /// Returns `true` if the record moved.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if self.items.contains_key(to) {
            return false;
        }
        match self.items.remove(from) {
            Some(record) => {
                self.items.insert(to.to_owned(), record);
                true
            }
            None => false,
        }
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelRecord)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ModelRecord> {
        self.items.values_mut()
    }
}

impl FromIterator<(String, ModelRecord)> for ModelDocument {
    fn from_iter<I: IntoIterator<Item = (String, ModelRecord)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
