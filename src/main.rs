//! Auto-Analyst - multi-agent AI data analysis
//!
//! A CLI tool that routes a natural-language analysis goal through
//! specialized code-generating agents (planner, analysis agents, code
//! combiner) backed by a local Ollama model, and assembles their
//! outputs into one runnable analysis script.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, planning or agent failure)

mod cli;
mod combiner;
mod config;
mod context;
mod dataset;
mod error;
mod executor;
mod llm;
mod models;
mod orchestrator;
mod planner;
mod registry;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use dataset::DatasetRef;
use llm::{OllamaClient, OllamaConfig};
use orchestrator::{Orchestrator, OrchestratorConfig};
use registry::AgentRegistry;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Auto-Analyst v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .autoanalyst.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".autoanalyst.toml");

    if path.exists() {
        eprintln!("⚠️  .autoanalyst.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .autoanalyst.toml")?;

    println!("✅ Created .autoanalyst.toml with default settings.");
    println!("   Edit it to customize the model, timeouts, and custom agents.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one complete analysis request.
async fn run_analysis(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // In quiet mode only errors reach the console.
    let quiet = args.quiet;

    // Step 1: Load the dataset reference (header only)
    let dataset_path = args
        .dataset
        .as_deref()
        .context("A dataset is required")?;
    if !quiet {
        println!("📂 Loading dataset: {}", dataset_path.display());
    }
    let dataset = DatasetRef::from_csv(dataset_path, args.dataset_name.as_deref())?;
    if !quiet {
        println!(
            "   '{}' with {} columns: {}",
            dataset.name,
            dataset.columns.len(),
            dataset.columns.join(", ")
        );
    }

    // Step 2: Register agents. A malformed contract blocks startup.
    let registry = build_registry(&config)?;

    // Handle --dry-run: show contracts, no LLM call
    if args.dry_run {
        return handle_dry_run(&registry, &dataset);
    }

    let goal = args.goal.as_deref().context("An analysis goal is required")?;

    // Step 3: Build the orchestrator
    if !quiet {
        println!("🤖 Registered {} analysis agents", registry.len());
        println!("   Model: {}", config.model.name);
        println!("   Ollama: {}", config.model.ollama_url);
        println!("   Stage timeout: {}s", config.orchestrator.stage_timeout_seconds);
    }

    let client = OllamaClient::new(OllamaConfig {
        url: config.model.ollama_url.clone(),
        model: config.model.name.clone(),
        temperature: config.model.temperature,
        timeout_seconds: config.model.timeout_seconds,
    })?;

    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::new(dataset),
        Arc::new(client),
        &config.model.name,
        OrchestratorConfig {
            max_refinements: config.orchestrator.max_refinements,
            stage_timeout_seconds: config.orchestrator.stage_timeout_seconds,
        },
    );

    // Step 4: Run the request
    if !quiet {
        println!("\n🔬 Analyzing: {}\n", goal);
    }
    let outcome = orchestrator.run_request(goal).await?;

    // Step 5: Report
    let output_content = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&outcome)
            .context("Failed to serialize request outcome")?,
        OutputFormat::Script => outcome
            .final_code()
            .context("Request produced no combined code")?
            .to_string(),
    };

    std::fs::write(&args.output, &output_content)
        .with_context(|| format!("Failed to write output to {}", args.output.display()))?;

    if !quiet {
        print!("{}", render_summary(&outcome));
        println!(
            "\n✅ Analysis complete! Output saved to: {}",
            args.output.display()
        );
    }

    Ok(())
}

/// Render the per-agent and summary lines printed after a request.
fn render_summary(outcome: &models::RequestOutcome) -> String {
    let mut text = String::new();

    if outcome.metadata.refinements > 0 {
        text.push_str(&format!(
            "   Goal refined to: {}\n",
            outcome.metadata.effective_goal
        ));
    }
    for (agent, result) in outcome.agent_results() {
        let first_line = result.commentary.lines().next().unwrap_or_default();
        text.push_str(&format!("   ✔ {} — {}\n", agent, first_line));
    }

    text.push_str("\n📊 Analysis Summary:\n");
    text.push_str(&format!(
        "   Agents executed: {}\n",
        outcome.agent_results().count()
    ));
    text.push_str(&format!(
        "   Goal refinements: {}\n",
        outcome.metadata.refinements
    ));
    text.push_str(&format!(
        "   Duration: {:.1}s\n",
        outcome.metadata.duration_seconds
    ));
    text
}

/// Build the registry: built-in analysis agents plus any custom agents
/// declared in the config file.
fn build_registry(config: &Config) -> Result<AgentRegistry> {
    let mut registry = AgentRegistry::new();

    for contract in llm::prompts::default_analysis_agents() {
        registry
            .register(contract)
            .context("Failed to register built-in agent")?;
    }

    for custom in &config.custom_agents {
        info!("Registering custom agent: {}", custom.signature);
        registry
            .register_signature(&custom.signature, &custom.instructions)
            .with_context(|| format!("Failed to register custom agent '{}'", custom.signature))?;
    }

    Ok(registry)
}

/// Handle --dry-run: print agent contracts and the dataset summary.
fn handle_dry_run(registry: &AgentRegistry, dataset: &DatasetRef) -> Result<()> {
    println!("\n🔍 Dry run: no LLM calls will be made.\n");

    println!("Dataset summary passed to agents:");
    for line in dataset.summary().lines() {
        println!("   {}", line);
    }

    println!("\nRegistered agents:");
    for descriptor in registry.descriptors() {
        println!("   🤖 {}", descriptor.name);
        println!("      inputs: {:?}", descriptor.required_inputs);
    }

    println!("\n✅ Dry run complete.");
    Ok(())
}


/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .autoanalyst.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
