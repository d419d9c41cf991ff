// src/main.rs — devflow entry point

use clap::Parser;

use devflow::cli::optimize::{CodeArgs, PaperArgs};
use devflow::cli::{self, Cli, Commands};
use devflow::infra::config::Config;
use devflow::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Respects RUST_LOG; otherwise warn, or info with --verbose
    logger::init_logging(logger::level_for(cli.verbose, cli.quiet));

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply_overrides(&mut config);

    // Commands that don't need a model
    if !cli.command.needs_gateway() {
        return run_tool(&cli.command, &config).await;
    }

    let gateway = cli::build_gateway(&cli, &config)?;
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Develop {
            project_name,
            output,
        } => {
            cli::develop::run_develop(&project_name, output, gateway.clone(), &config, quiet).await
        }
        Commands::Code {
            description,
            file,
            steps,
            execute,
            output,
        } => {
            let args = CodeArgs {
                description,
                file,
                steps,
                execute,
                output,
            };
            cli::optimize::run_code(args, gateway.clone(), &config, quiet).await
        }
        Commands::Paper {
            topic,
            steps,
            compile,
            output,
        } => {
            let args = PaperArgs {
                topic,
                steps,
                compile,
                output,
            };
            cli::optimize::run_paper(args, gateway.clone(), &config, quiet).await
        }
        Commands::Review { plan, code } => {
            cli::review::run_review(&plan, &code, gateway.clone(), &config).await
        }
        Commands::Exec { .. }
        | Commands::Latex { .. }
        | Commands::Papers { .. }
        | Commands::Datasets { .. } => Ok(()),
    };

    // Report spend even when the command failed part-way
    if !quiet {
        cli::print_cost_report(&gateway);
    }
    result
}

/// Commands that only drive local tools or public search APIs.
async fn run_tool(command: &Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Exec { file } => cli::exec::run_exec(file, config).await,
        Commands::Latex { file, no_compile } => {
            cli::exec::run_latex(file, *no_compile, config).await
        }
        Commands::Papers { query, top_n } => cli::search::run_papers(query, *top_n, config).await,
        Commands::Datasets {
            query,
            catalog,
            top_n,
        } => cli::search::run_datasets(query, catalog.clone(), *top_n, config),
        Commands::Develop { .. }
        | Commands::Code { .. }
        | Commands::Paper { .. }
        | Commands::Review { .. } => anyhow::bail!("This command needs a model gateway"),
    }
}
