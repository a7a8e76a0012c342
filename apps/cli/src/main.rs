//! formguard CLI
//!
//! Commands: check
//! Writes JSON lines to stdout and logs to stderr.
//! Exits with 2 when the form is invalid.

mod config;
mod report;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use formguard_eventbus::EventBus;
use formguard_validator::config::RulePolicy;
use formguard_validator::messages::MessageTable;
use formguard_validator::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::report::Reporter;

#[derive(Parser)]
#[command(name = "formguard", version)]
#[command(about = "Validate JSON forms against declarative validation models")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "FORMGUARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a form document against a model document
    Check(CheckArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Model document (JSON)
    #[arg(short, long)]
    model: PathBuf,

    /// Form document (JSON object of field name to value)
    #[arg(short, long)]
    form: PathBuf,

    /// Reject unknown rules and malformed parameters instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Print every announcement instead of final field states only
    #[arg(long)]
    events: bool,

    /// Component identity used in announcements
    #[arg(long, default_value = "cli")]
    component: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_level);

    let outcome = match cli.command {
        Command::Check(args) => check(args, config).await,
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CliConfig> {
    if let Some(path) = path
        && !path.is_file()
    {
        bail!("config file {} does not exist", path.display());
    }
    CliConfig::load(path).context("invalid configuration")
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn check(args: CheckArgs, mut config: CliConfig) -> anyhow::Result<bool> {
    if args.strict {
        config.engine.rule_policy = RulePolicy::Strict;
    }

    let mut builder = Engine::builder().config(config.engine.clone());
    if let Some(path) = &config.messages {
        let table: MessageTable = read_json(path).context("invalid message table")?;
        builder = builder.messages(table);
    }
    let engine = builder.build();

    let document = fs::read_to_string(&args.model)
        .with_context(|| format!("failed to read model {}", args.model.display()))?;
    let model = engine
        .loader(Handlers::new())
        .load_str(&document)
        .with_context(|| format!("failed to load model {}", args.model.display()))?;
    let form: FormData = read_json(&args.form)?;
    let model_name = model.name().to_owned();
    tracing::debug!(model = %model_name, fields = form.len(), "validating form");

    let bus: Arc<EventBus<ValidationEvent>> = Arc::new(EventBus::new(form.len() * 4 + 8));
    let mut events = bus.subscribe();
    let validator = engine.bind(args.component, Arc::new(model), bus);

    let result = validator.validate_form(&form).finish().await;

    let stdout = io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), args.events);
    for event in events.drain() {
        reporter.event(&event)?;
    }
    reporter.verdict(&model_name, &result)?;

    if events.lagged() > 0 {
        tracing::warn!(missed = events.lagged(), "some announcements were not reported");
    }
    Ok(result.valid)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
