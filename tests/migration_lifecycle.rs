//! Integration tests: startup migration against real files.
//!
//! Each test lays out a config directory (user `models.json`, `config.toml`)
//! and a templates directory holding the shipped `data/models.json`, then
//! drives the migrator through the JSON, TOML and template implementations.

use model_migrate::app_dirs::{CONFIG_FILE, MODELS_FILE};
use model_migrate::models::read_models_file;
use model_migrate::{
    BundledTemplates, ConfigStore, JsonModelStore, MigrationEnv, MigrationOutcome, Migrator,
    ModelStore, TomlConfigStore, Version, run_startup_migration,
};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TARGET: Version = Version::new(2, 4, 47);

struct Layout {
    _dir: tempfile::TempDir,
    config_dir: PathBuf,
    templates: BundledTemplates,
}

impl Layout {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_dir = dir.path().join("config");
        let templates_dir = dir.path().join("templates");
        std::fs::create_dir_all(&config_dir).expect("create config dir");
        std::fs::create_dir_all(&templates_dir).expect("create templates dir");

        let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(MODELS_FILE);
        std::fs::copy(shipped, templates_dir.join(MODELS_FILE)).expect("copy shipped template");

        let templates = BundledTemplates::new(templates_dir, config_dir.clone());
        Self {
            _dir: dir,
            config_dir,
            templates,
        }
    }

    fn models_path(&self) -> PathBuf {
        self.config_dir.join(MODELS_FILE)
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn write_models(&self, json: &serde_json::Value) {
        let raw = serde_json::to_string_pretty(json).expect("serialize models");
        std::fs::write(self.models_path(), raw).expect("write models");
    }

    fn store(&self) -> JsonModelStore {
        JsonModelStore::new(
            self.models_path(),
            self.templates.bundled_path(MODELS_FILE),
            TARGET,
        )
    }

    fn run(&self) -> model_migrate::Result<MigrationOutcome> {
        let mut store = self.store();
        let mut config = TomlConfigStore::load(self.config_path())?;
        let mut env = MigrationEnv {
            store: &mut store,
            templates: &self.templates,
            config: &mut config,
        };
        run_startup_migration(&Migrator::builtin(), &mut env, TARGET)
    }
}

fn legacy_document() -> serde_json::Value {
    serde_json::json!({
        "__meta__": {"version": "2.4.33", "app.version": "2.4.33"},
        "items": {
            "gemini-1.5-pro": {
                "id": "gemini-1.5-pro",
                "name": "Gemini 1.5 Pro",
                "mode": ["chat", "langchain"],
                "langchain": {
                    "provider": "google",
                    "args": [{"name": "model", "value": "gemini-1.5-pro", "type": "str"}],
                    "env": [{"name": "GOOGLE_API_KEY", "value": "AIza-literal-key"}]
                },
                "llama_index": {},
                "ctx": 2097152,
                "tokens": 8192,
                "default": false
            },
            "my-finetune": {
                "id": "my-finetune",
                "name": "My finetune",
                "mode": ["chat"],
                "endpoint": "http://localhost:8080"
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn legacy_document_is_migrated_and_completed() {
    let layout = Layout::new();
    layout.write_models(&legacy_document());
    std::fs::write(layout.config_path(), "theme = \"dark\"\n").expect("write config");

    let outcome = layout.run().expect("migration succeeds");

    assert!(outcome.updated);
    assert_eq!(
        outcome.applied,
        vec![
            Version::new(2, 4, 34),
            Version::new(2, 4, 46),
            Version::new(2, 4, 47)
        ]
    );
    assert_eq!(outcome.reconciled, 6);

    let file = read_models_file(&layout.models_path()).expect("read migrated file");
    assert_eq!(file.version().expect("version tag"), TARGET);
    assert_eq!(file.items, outcome.document);

    let gemini = file.items.get("gemini-1.5-pro").expect("gemini kept");
    assert_eq!(
        gemini.langchain.env("GOOGLE_API_KEY").expect("binding").value,
        "{api_key_google}"
    );
    assert_eq!(gemini.name, "Gemini 1.5 Pro");

    let custom = file.items.get("my-finetune").expect("user model kept");
    assert_eq!(
        custom.extra.get("endpoint"),
        Some(&serde_json::json!("http://localhost:8080"))
    );
    assert!(file.items.contains("gemini-2.0-flash-exp"));

    let config = TomlConfigStore::load(layout.config_path()).expect("reload config");
    assert_eq!(config.get("api_key_google").as_deref(), Some("AIza-literal-key"));
    assert_eq!(config.get("theme").as_deref(), Some("dark"));

    let raw = std::fs::read_to_string(layout.models_path()).expect("read raw");
    assert!(!raw.contains("AIza-literal-key"));
}

#[test]
fn second_run_is_a_no_op() {
    let layout = Layout::new();
    layout.write_models(&legacy_document());

    let first = layout.run().expect("first run");
    let before = std::fs::read_to_string(layout.models_path()).expect("read after first run");

    let second = layout.run().expect("second run");

    assert!(!second.updated);
    assert_eq!(second.document, first.document);
    let after = std::fs::read_to_string(layout.models_path()).expect("read after second run");
    assert_eq!(before, after);
}

#[test]
fn pre_2_0_96_document_is_replaced_from_template() {
    let layout = Layout::new();
    layout.write_models(&serde_json::json!({
        "__meta__": {"version": "2.0.50"},
        "items": {
            "text-davinci-003": {"id": "text-davinci-003", "name": "Davinci", "mode": ["completion"]},
            "my-finetune": {"id": "my-finetune", "name": "My finetune", "mode": ["chat"]}
        }
    }));

    let outcome = layout.run().expect("migration succeeds");

    assert!(outcome.updated);
    assert_eq!(outcome.applied.first(), Some(&Version::new(2, 0, 96)));
    assert!(!outcome.document.contains("my-finetune"));
    assert!(!outcome.document.contains("text-davinci-003"));
    assert!(outcome.document.contains("gpt-3.5-turbo-instruct"));

    // Two forced reloads ran; the backup still holds the user's file.
    let backup = read_models_file(&layout.models_path().with_file_name("models.json.backup"))
        .expect("read backup");
    assert_eq!(backup.version().expect("backup tag"), Version::new(2, 0, 50));
    assert!(backup.items.contains("my-finetune"));

    let store = layout.store();
    assert_eq!(store.stored_version().expect("stored version"), TARGET);
}

#[test]
fn null_binding_values_are_migrated_not_rejected() {
    let layout = Layout::new();
    let mut doc = legacy_document();
    doc["items"]["gemini-1.5-pro"]["langchain"]["env"][0]["value"] = serde_json::Value::Null;
    doc["items"]["gemini-1.5-pro"]["llama_index"] = serde_json::Value::Null;
    doc["items"]["my-finetune"]["ctx"] = serde_json::Value::Null;
    layout.write_models(&doc);

    let outcome = layout.run().expect("migration succeeds");

    assert!(outcome.updated);
    let gemini = outcome.document.get("gemini-1.5-pro").expect("gemini kept");
    assert_eq!(
        gemini.langchain.env("GOOGLE_API_KEY").expect("binding").value,
        "{api_key_google}"
    );
    assert_eq!(
        gemini.llama_index.env("GOOGLE_API_KEY").expect("binding").value,
        "{api_key_google}"
    );
    assert!(!layout.config_path().exists());
}

#[test]
fn envelope_keys_survive_migration() {
    let layout = Layout::new();
    let mut doc = legacy_document();
    doc["__meta__"]["channel"] = serde_json::json!("beta");
    doc["profiles"] = serde_json::json!({"default": "gpt-4o"});
    layout.write_models(&doc);

    layout.run().expect("migration succeeds");

    let file = read_models_file(&layout.models_path()).expect("read migrated file");
    assert_eq!(file.version().expect("version tag"), TARGET);
    let meta = file.meta.expect("meta");
    assert_eq!(meta.extra.get("channel"), Some(&serde_json::json!("beta")));
    assert_eq!(
        file.extra.get("profiles"),
        Some(&serde_json::json!({"default": "gpt-4o"}))
    );
}

#[test]
fn first_run_installs_template_without_migrating() {
    let layout = Layout::new();
    assert!(
        layout
            .templates
            .patch_file(MODELS_FILE, false)
            .expect("install")
    );

    let outcome = layout.run().expect("migration succeeds");

    assert!(!outcome.updated);
    assert_eq!(outcome.document.len(), 6);
    assert!(!layout.config_path().exists());
}

#[test]
fn unparseable_version_tag_fails_and_leaves_file_alone() {
    let layout = Layout::new();
    let mut doc = legacy_document();
    doc["__meta__"]["version"] = serde_json::json!("two.four");
    layout.write_models(&doc);
    let before = std::fs::read_to_string(layout.models_path()).expect("read");

    let err = layout.run().expect_err("migration should fail");

    assert_eq!(err.code(), "VERSION_INVALID");
    let after = std::fs::read_to_string(layout.models_path()).expect("read");
    assert_eq!(before, after);
}

#[cfg(unix)]
#[test]
fn migrated_files_are_private() {
    use std::os::unix::fs::PermissionsExt;

    let layout = Layout::new();
    layout.write_models(&legacy_document());
    layout.run().expect("migration succeeds");

    for path in [layout.models_path(), layout.config_path()] {
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "{}", path.display());
    }
}
