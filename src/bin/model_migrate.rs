//! Inspect and run the `models.json` migration from the command line.

use anyhow::{Context, bail};
use model_migrate::app_dirs::{self, CONFIG_FILE, MODELS_FILE};
use model_migrate::{
    BundledTemplates, JsonModelStore, MigrationEnv, Migrator, ModelStore, TomlConfigStore,
    Version, run_startup_migration,
};
use std::path::PathBuf;

struct Options {
    command: String,
    config_dir: PathBuf,
    data_dir: PathBuf,
    app_version: Version,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the command's report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(opts) = parse_args(std::env::args().skip(1))? else {
        print_usage();
        return Ok(());
    };

    match opts.command.as_str() {
        "run" => run(&opts),
        "status" => status(&opts),
        other => bail!("unknown subcommand `{other}` (use run|status|help)"),
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Options>> {
    let Some(command) = args.next() else {
        return Ok(None);
    };
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        return Ok(None);
    }

    let mut config_dir = None;
    let mut data_dir = None;
    let mut app_version = None;

    while let Some(flag) = args.next() {
        let value = args
            .next()
            .with_context(|| format!("{flag} requires a value"))?;
        match flag.as_str() {
            "--config-dir" => config_dir = Some(PathBuf::from(value)),
            "--data-dir" => data_dir = Some(PathBuf::from(value)),
            "--app-version" => app_version = Some(Version::parse(&value)?),
            other => bail!("unknown option `{other}`"),
        }
    }

    let app_version = match app_version {
        Some(v) => v,
        None => Version::parse(env!("CARGO_PKG_VERSION"))?,
    };

    Ok(Some(Options {
        command,
        config_dir: config_dir.unwrap_or_else(app_dirs::config_dir),
        data_dir: data_dir.unwrap_or_else(app_dirs::data_dir),
        app_version,
    }))
}

fn templates(opts: &Options) -> BundledTemplates {
    BundledTemplates::new(opts.data_dir.join("templates"), opts.config_dir.clone())
}

fn store(opts: &Options, templates: &BundledTemplates) -> JsonModelStore {
    JsonModelStore::new(
        opts.config_dir.join(MODELS_FILE),
        templates.bundled_path(MODELS_FILE),
        opts.app_version,
    )
}

fn run(opts: &Options) -> anyhow::Result<()> {
    let templates = templates(opts);
    if templates.patch_file(MODELS_FILE, false)? {
        println!("installed default {MODELS_FILE}");
    }

    let mut store = store(opts, &templates);
    let mut config = TomlConfigStore::load(opts.config_dir.join(CONFIG_FILE))?;
    let mut env = MigrationEnv {
        store: &mut store,
        templates: &templates,
        config: &mut config,
    };

    let outcome = run_startup_migration(&Migrator::builtin(), &mut env, opts.app_version)
        .context("migration failed")?;

    if outcome.updated {
        println!(
            "migrated to {}: {} step(s), {} model(s) added, {} model(s) total",
            opts.app_version,
            outcome.applied.len(),
            outcome.reconciled,
            outcome.document.len()
        );
    } else {
        println!("models up to date ({} model(s))", outcome.document.len());
    }
    Ok(())
}

fn status(opts: &Options) -> anyhow::Result<()> {
    let templates = templates(opts);
    let store = store(opts, &templates);
    let path = store.path().display().to_string();

    let stored = match store.stored_version() {
        Ok(v) => v,
        Err(e) if !store.path().exists() => {
            println!("{path}: not installed ({e})");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{path}");
    println!("stored version: {stored}");
    println!("app version:    {}", opts.app_version);

    let migrator = Migrator::builtin();
    let pending = migrator.pending(stored);
    if stored >= opts.app_version || pending.is_empty() {
        println!("no pending steps");
        return Ok(());
    }
    for step in pending {
        println!("  {}\t{}", step.threshold, step.description);
    }
    Ok(())
}

fn print_usage() {
    println!(
        "usage: model-migrate <run|status|help> [--config-dir DIR] [--data-dir DIR] [--app-version VERSION]"
    );
}
