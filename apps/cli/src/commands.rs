//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use conceptlens_completion::build_client;
use conceptlens_core::{
    EnrichmentProgress, FieldSelection, Orchestrator, PromptCatalog, filter_unknown,
    static_record,
};
use conceptlens_server::AppState;
use conceptlens_shared::{
    AppConfig, Concept, ConceptLensError, KnownConceptSet, init_config, load_config,
    load_config_from, resolve_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{error, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ConceptLens: find the concepts a text introduces and describe them.
#[derive(Parser)]
#[command(
    name = "conceptlens",
    version,
    about = "Extract unknown domain concepts from text and enrich them with definitions, synonyms, and ontology links.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.conceptlens/conceptlens.toml.
    #[arg(long, global = true, env = "CONCEPTLENS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Which fields `enrich` generates.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum Field {
    All,
    Description,
    Synonym,
    Ontology,
}

impl From<Field> for FieldSelection {
    fn from(field: Field) -> Self {
        match field {
            Field::All => FieldSelection::ALL,
            Field::Description => FieldSelection::DESCRIPTION_ONLY,
            Field::Synonym => FieldSelection::SYNONYM_ONLY,
            Field::Ontology => FieldSelection::ONTOLOGY_ONLY,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind (defaults to `[server] bind_addr`).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Find unknown concepts in a text and print them as JSON.
    Identify {
        /// Text to analyse.
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// Read the text from a file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Already-known concepts (repeatable or comma-separated).
        #[arg(short, long, value_delimiter = ',')]
        known: Vec<String>,

        /// Print unknown labels without enrichment.
        #[arg(long)]
        labels_only: bool,

        /// Return the fixed development record without calling the service.
        #[arg(long)]
        dev_mode: bool,
    },

    /// Enrich the given concepts directly, skipping extraction.
    Enrich {
        /// Concepts to enrich.
        #[arg(required = true)]
        concepts: Vec<String>,

        /// Field(s) to generate.
        #[arg(long, value_enum, default_value = "all")]
        field: Field,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "conceptlens=info,tower_http=info",
        1 => "conceptlens=debug,tower_http=debug",
        _ => "conceptlens=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Serve { bind } => cmd_serve(config_path, bind.as_deref()).await,
        Command::Identify {
            text,
            file,
            known,
            labels_only,
            dev_mode,
        } => {
            let text = read_text(text, file.as_deref())?;
            cmd_identify(config_path, &text, &known, labels_only, dev_mode).await
        }
        Command::Enrich { concepts, field } => {
            cmd_enrich(config_path, &concepts, field.into()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read {}", path.display())),
        (None, None) => Err(eyre!("either --text or --file is required")),
    }
}

/// Wire the completion client and prompt catalog into an orchestrator.
fn build_orchestrator(config: &AppConfig) -> std::result::Result<Orchestrator, ConceptLensError> {
    let key = resolve_api_key(&config.completion)?;
    let client = build_client(&config.completion, key)?;
    let catalog = PromptCatalog::from_config(&config.prompts)?;
    Ok(Orchestrator::new(client, Arc::new(catalog), &config.pipeline))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(config_path: Option<&Path>, bind: Option<&str>) -> Result<()> {
    let config = load(config_path)?;
    let timeout = config.pipeline.request_timeout();

    let state = match build_orchestrator(&config) {
        Ok(orchestrator) => AppState::new(Arc::new(orchestrator), timeout),
        Err(e @ ConceptLensError::Config { .. }) => {
            error!(error = %e, "completion service unavailable, serving development mode only");
            AppState::dev_only(timeout)
        }
        Err(e) => return Err(e.into()),
    };

    let addr = bind.unwrap_or(&config.server.bind_addr);
    conceptlens_server::serve(addr, state).await?;
    Ok(())
}

async fn cmd_identify(
    config_path: Option<&Path>,
    text: &str,
    known: &[String],
    labels_only: bool,
    dev_mode: bool,
) -> Result<()> {
    if dev_mode {
        print_json(&json!({ "unknownConcepts": [static_record()] }))?;
        return Ok(());
    }

    let config = load(config_path)?;
    let orchestrator = build_orchestrator(&config)?;
    let known: KnownConceptSet = known.iter().collect();
    let deadline = config.pipeline.request_timeout();

    info!(text_len = text.len(), known = known.len(), "identifying unknown concepts");

    let output = if labels_only {
        let labels = tokio::time::timeout(deadline, orchestrator.unknown_labels(text, &known))
            .await
            .map_err(|_| eyre!("timed out after {}s", deadline.as_secs()))??;
        let entries: Vec<_> = labels
            .unknown
            .iter()
            .map(|c| json!({ "originalLabel": c }))
            .collect();
        json!({ "unknownConcepts": entries, "extraction": labels.extraction })
    } else {
        let progress = CliProgress::new();
        let result =
            tokio::time::timeout(deadline, orchestrator.identify(text, &known, &progress)).await;
        progress.finish();
        let output = result.map_err(|_| eyre!("timed out after {}s", deadline.as_secs()))??;
        json!({ "unknownConcepts": output.records, "extraction": output.extraction })
    };

    print_json(&output)
}

async fn cmd_enrich(
    config_path: Option<&Path>,
    concepts: &[String],
    selection: FieldSelection,
) -> Result<()> {
    let config = load(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    let candidates: Vec<Concept> = concepts.iter().filter_map(Concept::new).collect();
    let concepts = filter_unknown(&candidates, &KnownConceptSet::new());
    if concepts.is_empty() {
        return Err(eyre!("no non-blank concepts given"));
    }

    let progress = CliProgress::new();
    progress.phase("Enriching concepts");
    let deadline = config.pipeline.request_timeout();
    let result =
        tokio::time::timeout(deadline, orchestrator.enrich(concepts, selection, &progress)).await;
    progress.finish();
    let records = result.map_err(|_| eyre!("timed out after {}s", deadline.as_secs()))?;

    print_json(&json!({ "unknownConcepts": records }))
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl EnrichmentProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("Enriched [{current}/{total}] {detail}"));
    }
}
