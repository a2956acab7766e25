//! Built-in `models.json` version chain.
//!
//! Thresholds are strictly increasing. A step runs when the stored version
//! is below its threshold. Steps that only mark a release in which new
//! records were shipped are [`StepAction::Touch`]: the records themselves
//! arrive through [`ModelStore::reconcile_missing`].
//!
//! [`ModelStore::reconcile_missing`]: crate::models::ModelStore::reconcile_missing

use crate::error::Result;
use crate::models::{ModelArg, ModelRecord};
use crate::version::Version;

use super::edits::{HoistedSecrets, add_mode_where, hoist_env, id_has_prefix, name_after_id};
use super::{MigrationStep, PatchContext};

const MODELS_FILE: &str = "models.json";

const INSTRUCT: &str = "gpt-3.5-turbo-instruct";
const VISION_PREVIEW: &str = "gpt-4-vision-preview";
const DALL_E_2: &str = "dall-e-2";
const DALL_E_3: &str = "dall-e-3";
const ENDPOINT_ENV: &str = "OPENAI_API_BASE";

/// The full chain, oldest threshold first.
pub fn builtin_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::touch(Version::new(0, 9, 1), "attach metadata"),
        MigrationStep::reload(Version::new(2, 0, 1), "reset models", MODELS_FILE),
        MigrationStep::reload(Version::new(2, 0, 96), "llama-index modes", MODELS_FILE),
        MigrationStep::reload(Version::new(2, 0, 105), "llama-index gpt-4-turbo", MODELS_FILE),
        MigrationStep::edit(
            Version::new(2, 0, 107),
            "replace deprecated davinci with gpt-3.5-turbo-instruct",
            replace_davinci,
        ),
        MigrationStep::edit(Version::new(2, 0, 123), "names from ids", gpt4_preview_names),
        MigrationStep::edit(Version::new(2, 0, 134), "agent mode for gpt", agent_mode_for_gpt),
        MigrationStep::edit(
            Version::new(2, 1, 15),
            "fix gpt-4-turbo-preview llama-index args",
            fix_gpt4_turbo_preview_args,
        ),
        MigrationStep::edit(Version::new(2, 1, 19), "api endpoint binding", api_endpoint_binding),
        MigrationStep::touch(Version::new(2, 1, 45), "gpt-4-turbo-2024-04-09"),
        MigrationStep::touch(Version::new(2, 2, 6), "gpt-4-turbo"),
        MigrationStep::edit(Version::new(2, 2, 7), "expert mode for gpt", expert_mode_for_gpt),
        MigrationStep::touch(Version::new(2, 2, 19), "gpt-4o"),
        MigrationStep::touch(Version::new(2, 2, 20), "gpt-4o-mini"),
        MigrationStep::touch(Version::new(2, 2, 22), "gemini, claude, llama3, mistral"),
        MigrationStep::touch(Version::new(2, 2, 28), "llama3.1 70b/405b, mistral-large"),
        MigrationStep::edit(
            Version::new(2, 2, 33),
            "agent and expert modes for all",
            agent_and_expert_for_all,
        ),
        MigrationStep::touch(Version::new(2, 3, 3), "o1-preview, o1-mini, bielik v2.2"),
        MigrationStep::edit(Version::new(2, 4, 0), "langchain mode for bielik", bielik_langchain),
        MigrationStep::edit(
            Version::new(2, 4, 10),
            "agent_llama mode for gpt",
            agent_llama_for_gpt,
        ),
        MigrationStep::edit(
            Version::new(2, 4, 11),
            "agent_llama mode for all",
            agent_llama_for_all,
        ),
        MigrationStep::touch(
            Version::new(2, 4, 34),
            "gpt-4o-audio-preview, gpt-4o-2024-11-20",
        ),
        MigrationStep::edit(
            Version::new(2, 4, 46),
            "separate provider api keys",
            hoist_provider_secrets,
        ),
        MigrationStep::touch(Version::new(2, 4, 47), "gemini-2.0-flash-exp"),
    ]
}

fn replace_davinci(ctx: &mut PatchContext<'_>) -> Result<()> {
    const OLD: &str = "text-davinci-003";

    ctx.document.remove("text-davinci-002");

    let Some(record) = ctx.document.get_mut(OLD) else {
        return Ok(());
    };
    record.id = INSTRUCT.to_owned();
    record.name = INSTRUCT.to_owned();
    record.remove_mode("llama_index");
    if let Some(arg) = record.langchain.args.first_mut()
        && arg.name == "model_name"
    {
        arg.value = serde_json::Value::String(INSTRUCT.to_owned());
    }
    record.llama_index.clear();

    // An existing instruct entry wins; the edited davinci record stays put.
    ctx.document.rename(OLD, INSTRUCT);
    Ok(())
}

fn gpt4_preview_names(ctx: &mut PatchContext<'_>) -> Result<()> {
    name_after_id(ctx.document, "gpt-4-1106-preview");
    name_after_id(ctx.document, VISION_PREVIEW);
    Ok(())
}

fn gpt_except_instruct_and_vision(record: &ModelRecord) -> bool {
    id_has_prefix(record, &["gpt-"]) && record.id != INSTRUCT && record.id != VISION_PREVIEW
}

fn agent_mode_for_gpt(ctx: &mut PatchContext<'_>) -> Result<()> {
    add_mode_where(ctx.document, "agent", gpt_except_instruct_and_vision);
    Ok(())
}

fn fix_gpt4_turbo_preview_args(ctx: &mut PatchContext<'_>) -> Result<()> {
    const ID: &str = "gpt-4-turbo-preview";
    if let Some(record) = ctx.document.get_mut(ID) {
        record.llama_index.args = vec![ModelArg::string("model", ID)];
    }
    Ok(())
}

fn api_endpoint_binding(ctx: &mut PatchContext<'_>) -> Result<()> {
    for record in ctx.document.records_mut() {
        if !id_has_prefix(record, &["gpt-"]) {
            continue;
        }
        for (_, capability) in record.capabilities_mut() {
            // Any binding whose name contains the variable counts, e.g. AZURE_OPENAI_API_BASE.
            if !capability.env.iter().any(|b| b.name.contains(ENDPOINT_ENV)) {
                capability.ensure_env(ENDPOINT_ENV, "{api_endpoint}");
            }
        }
    }
    Ok(())
}

fn expert_mode_for_gpt(ctx: &mut PatchContext<'_>) -> Result<()> {
    add_mode_where(ctx.document, "expert", gpt_except_instruct_and_vision);
    Ok(())
}

fn agent_and_expert_for_all(ctx: &mut PatchContext<'_>) -> Result<()> {
    let eligible = |r: &ModelRecord| ![DALL_E_2, DALL_E_3, INSTRUCT].contains(&r.id.as_str());
    add_mode_where(ctx.document, "agent", eligible);
    add_mode_where(ctx.document, "expert", eligible);
    name_after_id(ctx.document, DALL_E_2);
    name_after_id(ctx.document, DALL_E_3);
    Ok(())
}

fn bielik_langchain(ctx: &mut PatchContext<'_>) -> Result<()> {
    if let Some(record) = ctx.document.get_mut("bielik-11b-v2.2-instruct:Q4_K_M") {
        record.add_mode("langchain");
    }
    Ok(())
}

fn agent_llama_for_gpt(ctx: &mut PatchContext<'_>) -> Result<()> {
    add_mode_where(ctx.document, "agent_llama", |r| {
        id_has_prefix(r, &["gpt-"]) && r.id != INSTRUCT
    });
    Ok(())
}

fn agent_llama_for_all(ctx: &mut PatchContext<'_>) -> Result<()> {
    const EXCLUDE: [&str; 5] = [INSTRUCT, DALL_E_2, DALL_E_3, "o1-preview", "o1-mini"];
    add_mode_where(ctx.document, "agent_llama", |r| {
        !EXCLUDE.contains(&r.id.as_str())
    });
    Ok(())
}

/// Which bindings move to which config key, per model id prefix.
struct HoistRule {
    prefixes: &'static [&'static str],
    bindings: &'static [(&'static str, &'static str)],
}

const HOIST_RULES: &[HoistRule] = &[
    HoistRule {
        prefixes: &["gpt-", "o1-"],
        bindings: &[
            ("AZURE_OPENAI_ENDPOINT", "api_azure_endpoint"),
            ("OPENAI_API_VERSION", "api_azure_version"),
        ],
    },
    HoistRule {
        prefixes: &["claude-"],
        bindings: &[("ANTHROPIC_API_KEY", "api_key_anthropic")],
    },
    HoistRule {
        prefixes: &["gemini-"],
        bindings: &[("GOOGLE_API_KEY", "api_key_google")],
    },
];

fn hoist_rule_for(record: &ModelRecord) -> Option<&'static HoistRule> {
    HOIST_RULES
        .iter()
        .find(|rule| id_has_prefix(record, rule.prefixes))
}

fn hoist_provider_secrets(ctx: &mut PatchContext<'_>) -> Result<()> {
    let mut secrets = HoistedSecrets::default();
    for record in ctx.document.records_mut() {
        let Some(rule) = hoist_rule_for(record) else {
            continue;
        };
        for (_, capability) in record.capabilities_mut() {
            for &(env_name, config_key) in rule.bindings {
                hoist_env(capability, env_name, config_key, &mut secrets);
            }
        }
    }
    secrets.write_to(&mut *ctx.config)?;
    Ok(())
}
