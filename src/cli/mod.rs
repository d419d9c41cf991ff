// src/cli/mod.rs — CLI definition (clap derive) and shared session setup

pub mod develop;
pub mod exec;
pub mod optimize;
pub mod progress;
pub mod review;
pub mod search;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;
use crate::provider::gateway::{ApiKeys, ModelGateway};

#[derive(Parser)]
#[command(
    name = "devflow",
    about = "LLM-driven development workflow with role agents and iterative refiners",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ~/.devflow/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model for every agent and solver (overrides the config file)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// OpenAI API key (falls back to OPENAI_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Anthropic API key (falls back to ANTHROPIC_API_KEY)
    #[arg(long, global = true)]
    pub anthropic_api_key: Option<String>,

    /// DeepSeek API key (falls back to DEEPSEEK_API_KEY)
    #[arg(long, global = true)]
    pub deepseek_api_key: Option<String>,

    /// Log progress at info level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress output (only emit final result)
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full development workflow for a project
    Develop {
        /// Project description handed to every agent
        #[arg(long)]
        project_name: String,
        /// Output directory (defaults to workflow.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate and iteratively refine a Python script
    Code {
        /// Project description
        #[arg(long, required_unless_present = "file", conflicts_with = "file")]
        description: Option<String>,
        /// Read the project description from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Refinement steps (defaults to refiner.max_steps)
        #[arg(long)]
        steps: Option<u32>,
        /// Execute each candidate and feed errors back
        #[arg(long)]
        execute: bool,
        /// Write the best script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate and iteratively refine a LaTeX research paper
    Paper {
        #[arg(long)]
        topic: String,
        /// Refinement steps (defaults to refiner.max_steps)
        #[arg(long)]
        steps: Option<u32>,
        /// Compile each candidate with pdflatex and feed errors back
        #[arg(long)]
        compile: bool,
        /// Write the best paper here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Review a codebase against a project plan
    Review {
        /// Project plan text
        #[arg(long)]
        plan: String,
        /// File holding the code to review
        #[arg(long)]
        code: PathBuf,
    },
    /// Execute a Python file with the configured interpreter
    Exec { file: PathBuf },
    /// Write a LaTeX file into the build directory and compile it
    Latex {
        file: PathBuf,
        /// Only write temp.tex, skip pdflatex
        #[arg(long)]
        no_compile: bool,
    },
    /// Search Semantic Scholar for open-access papers
    Papers {
        query: String,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },
    /// Search a local dataset catalog (JSON or JSONL)
    Datasets {
        query: String,
        /// Catalog file (defaults to datasets.jsonl in the data directory)
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },
}

impl Commands {
    /// Whether the command talks to a model.
    pub fn needs_gateway(&self) -> bool {
        matches!(
            self,
            Commands::Develop { .. }
                | Commands::Code { .. }
                | Commands::Paper { .. }
                | Commands::Review { .. }
        )
    }
}

impl Cli {
    /// Apply `--model` on top of the loaded config: it replaces the default
    /// and every per-role override.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            let models = &mut config.models;
            models.default = model.clone();
            models.engineer = None;
            models.qa = None;
            models.devops = None;
            models.reviewer = None;
            models.solver = None;
        }
    }

    pub fn api_keys(&self) -> ApiKeys {
        ApiKeys::resolve(
            self.api_key.clone(),
            self.anthropic_api_key.clone(),
            self.deepseek_api_key.clone(),
        )
    }
}

/// Gateway over every backend that has a key. With `print_cost` set (and
/// not `--quiet`) the running estimate goes to stderr after each call.
pub fn build_gateway(cli: &Cli, config: &Config) -> anyhow::Result<Arc<ModelGateway>> {
    let mut gateway = ModelGateway::from_keys(&cli.api_keys(), &config.gateway)?;
    if config.gateway.print_cost && !cli.quiet {
        gateway =
            gateway.with_cost_sink(|estimate| eprintln!("{}", progress::format_cost(estimate)));
    }
    Ok(Arc::new(gateway))
}

/// Cost analytics to stderr once a model-using command is done.
pub fn print_cost_report(gateway: &ModelGateway) {
    let costs = gateway.cost_snapshot();
    if costs.total_calls() == 0 {
        return;
    }
    eprintln!();
    eprint!("{}", costs.analytics_report());
}
