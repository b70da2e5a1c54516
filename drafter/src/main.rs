//! Contract clause drafting CLI.
//!
//! Inspects the source corpus and constraint presets, checks structured
//! outputs against a profile, and runs the drafting agent through the
//! configured generation command.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use drafter::agent::{AgentConfig, DraftingAgent};
use drafter::core::profile::{ConstraintProfile, preset, preset_summaries};
use drafter::core::validator::validate;
use drafter::exit_codes;
use drafter::io::document_store::DocumentStore;
use drafter::io::gateway::{CommandGateway, OutputParser};
use drafter::io::profiles::{load_profile, resolve_profile};
use drafter::io::settings::{DEFAULT_SETTINGS_PATH, load_settings};
use drafter::logging;

#[derive(Parser)]
#[command(
    name = "drafter",
    version,
    about = "Constraint-checked contract clause drafting"
)]
struct Cli {
    /// Settings file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the citation index, or a single citation, as JSON.
    Citations {
        /// Source id to look up (exit code 3 when absent).
        #[arg(long)]
        id: Option<String>,
    },
    /// Print metadata for every ingested document as JSON.
    Documents,
    /// Print the built-in constraint presets as JSON.
    Presets,
    /// Validate a structured output JSON file against a constraint profile.
    Check {
        /// Structured output JSON file.
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        profile: CheckProfile,
    },
    /// Draft clauses with the generation command and validate them.
    Draft {
        /// Drafting request in natural language.
        #[arg(long)]
        prompt: String,
        #[command(flatten)]
        profile: DraftProfile,
        /// Jurisdiction for a `--contract-type` profile (default: European Union).
        #[arg(long)]
        jurisdiction: Option<String>,
        /// Print each agent event to stderr as a JSON line while the run progresses.
        #[arg(long)]
        events: bool,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct CheckProfile {
    /// Built-in preset name (dpa, msa, privacy).
    #[arg(long)]
    preset: Option<String>,
    /// Constraint profile file (.json or .toml).
    #[arg(long)]
    profile: Option<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct DraftProfile {
    /// Built-in preset name (dpa, msa, privacy).
    #[arg(long)]
    preset: Option<String>,
    /// Constraint profile file (.json or .toml).
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Default profile for this contract type (slug or full name).
    #[arg(long)]
    contract_type: Option<String>,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Citations { id } => cmd_citations(&cli.settings, id.as_deref()),
        Command::Documents => cmd_documents(&cli.settings),
        Command::Presets => cmd_presets(),
        Command::Check { output, profile } => cmd_check(&output, &profile),
        Command::Draft {
            prompt,
            profile,
            jurisdiction,
            events,
        } => cmd_draft(
            &cli.settings,
            &prompt,
            &profile,
            jurisdiction.as_deref(),
            events,
        ),
    }
}

fn cmd_citations(settings_path: &Path, id: Option<&str>) -> Result<i32> {
    let settings = load_settings(settings_path)?;
    let store = DocumentStore::from_settings(&settings);
    let corpus = store.corpus()?;
    match id {
        Some(id) => match corpus.citation(id) {
            Some(citation) => print_json(citation)?,
            None => {
                eprintln!("citation '{id}' not found");
                return Ok(exit_codes::NOT_FOUND);
            }
        },
        None => print_json(&json!({
            "citations": corpus.citation_index(),
            "total": corpus.citation_index().len(),
        }))?,
    }
    Ok(exit_codes::OK)
}

fn cmd_documents(settings_path: &Path) -> Result<i32> {
    let settings = load_settings(settings_path)?;
    let store = DocumentStore::from_settings(&settings);
    let corpus = store.corpus()?;
    print_json(&json!({
        "documents": corpus.documents(),
        "total": corpus.documents().len(),
        "duplicate_anchors": corpus.duplicate_anchors(),
    }))?;
    Ok(exit_codes::OK)
}

fn cmd_presets() -> Result<i32> {
    let presets = preset_summaries()?;
    print_json(&json!({ "presets": presets }))?;
    Ok(exit_codes::OK)
}

fn cmd_check(output_path: &Path, profile: &CheckProfile) -> Result<i32> {
    let profile = match (&profile.preset, &profile.profile) {
        (Some(name), _) => preset(name)?,
        (None, Some(path)) => load_profile(path)?,
        (None, None) => return Err(anyhow!("either --preset or --profile is required")),
    };
    let raw = fs::read_to_string(output_path)
        .with_context(|| format!("read {}", output_path.display()))?;
    let output = OutputParser::new()?
        .parse(&raw)
        .with_context(|| format!("parse {}", output_path.display()))?;

    let validation = validate(&output, &profile);
    print_json(&validation)?;
    if validation.is_valid() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::VIOLATIONS)
    }
}

fn cmd_draft(
    settings_path: &Path,
    prompt: &str,
    profile: &DraftProfile,
    jurisdiction: Option<&str>,
    events: bool,
) -> Result<i32> {
    let profile = draft_profile(profile, jurisdiction)?;
    let settings = load_settings(settings_path)?;

    let store = Arc::new(DocumentStore::from_settings(&settings));
    store
        .load()
        .with_context(|| format!("load source documents from {}", store.dir().display()))?;
    let gateway = CommandGateway::new(settings.gateway.clone())?;
    let agent = DraftingAgent::new(store, gateway, AgentConfig::from_settings(&settings))?;

    let run = agent.run_with(prompt, &profile, |event| {
        if !events {
            return;
        }
        match serde_json::to_string(event) {
            Ok(line) => eprintln!("{line}"),
            Err(err) => warn!(err = %err, "failed to serialize agent event"),
        }
    });

    print_json(&run.result)?;
    if run.result.success {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::VIOLATIONS)
    }
}

fn draft_profile(profile: &DraftProfile, jurisdiction: Option<&str>) -> Result<ConstraintProfile> {
    if jurisdiction.is_some() && profile.contract_type.is_none() {
        return Err(anyhow!("--jurisdiction requires --contract-type"));
    }
    if let Some(path) = &profile.profile {
        return load_profile(path);
    }
    resolve_profile(
        profile.preset.as_deref(),
        profile.contract_type.as_deref(),
        jurisdiction,
    )
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
