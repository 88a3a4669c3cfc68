//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Auto-Analyst - multi-agent AI data analysis
///
/// Route a natural-language analysis goal through specialized
/// code-generating agents and assemble their outputs into one runnable
/// script, using a local Ollama model.
///
/// Examples:
///   auto-analyst --dataset bookings.csv "which airline has the cheapest fares?"
///   auto-analyst --dataset bookings.csv --model qwen2.5-coder:32b "predict fare"
///   auto-analyst --dataset bookings.csv --format json "fare trends"
///   auto-analyst --dataset bookings.csv --dry-run
///   auto-analyst --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// The analysis goal in natural language
    ///
    /// Not required with --dry-run or --init-config.
    #[arg(value_name = "GOAL")]
    pub goal: Option<String>,

    /// CSV dataset to analyze
    ///
    /// Only the header row is read; agents see the name and column
    /// list, and the generated script loads the full data itself.
    #[arg(
        short,
        long,
        value_name = "FILE",
        required_unless_present = "init_config"
    )]
    pub dataset: Option<PathBuf>,

    /// Frame name agents refer to (defaults to the file stem)
    #[arg(long, value_name = "NAME")]
    pub dataset_name: Option<String>,

    /// Ollama model to use for all stages
    ///
    /// Can also be set via AUTOANALYST_MODEL env var or .autoanalyst.toml.
    #[arg(
        short,
        long,
        default_value = "llama3.2:latest",
        env = "AUTOANALYST_MODEL"
    )]
    pub model: String,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Output file for the combined script (or JSON outcome)
    #[arg(
        short,
        long,
        default_value = "analysis_script.py",
        value_name = "FILE"
    )]
    pub output: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for .autoanalyst.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (script, json)
    ///
    /// `script` writes the combined code; `json` writes the full
    /// request outcome with every stage's output.
    #[arg(long, default_value = "script", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Temperature for LLM responses (0.0 - 1.0)
    ///
    /// Lower values produce more consistent/deterministic output
    #[arg(long, default_value = "0.1")]
    pub temperature: f32,

    /// Per-stage deadline in seconds
    ///
    /// Applies to the planner, refiner, each agent, and the combiner.
    /// Default: from config or 300s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Goal refinements allowed before the request fails
    ///
    /// Used when the planner cannot produce an actionable plan.
    /// Default: from config or 1.
    #[arg(long, value_name = "COUNT")]
    pub max_refinements: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load the dataset and print registered agent contracts
    /// without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .autoanalyst.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the request result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// The combined script only (default)
    #[default]
    Script,
    /// The full request outcome as JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.goal.is_none() && !self.dry_run {
            return Err("An analysis goal is required (or use --dry-run)".to_string());
        }

        if let Some(ref dataset) = self.dataset {
            if !dataset.exists() {
                return Err(format!("Dataset does not exist: {}", dataset.display()));
            }
            if !dataset.is_file() {
                return Err(format!("Dataset is not a file: {}", dataset.display()));
            }
        }

        // Validate Ollama URL format (not needed for dry-run)
        if !self.dry_run
            && !self.ollama_url.starts_with("http://")
            && !self.ollama_url.starts_with("https://")
        {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            goal: Some("analyze fares".to_string()),
            dataset: None,
            dataset_name: None,
            model: "test".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            output: PathBuf::from("analysis_script.py"),
            config: None,
            format: OutputFormat::Script,
            temperature: 0.1,
            timeout: None,
            max_refinements: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_requires_goal() {
        let mut args = make_args();
        args.goal = None;
        assert!(args.validate().is_err());

        args.dry_run = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_ollama_url() {
        let mut args = make_args();
        args.ollama_url = "localhost:11434".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut args = make_args();
        args.temperature = 1.5;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
