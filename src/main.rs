use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use pyrefine::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Analyze(args) => pyrefine::analyze_run(args, &ctx),
        Commands::Functions(args) => pyrefine::functions_run(args, &ctx).map(|_| ExitCode::SUCCESS),
        Commands::Suggest(args) => pyrefine::suggest_run(args, &ctx).map(|_| ExitCode::SUCCESS),
        Commands::Fix(args) => pyrefine::fix_run(args, &ctx),
        Commands::Split(args) => pyrefine::split_run(args, &ctx).map(|_| ExitCode::SUCCESS),
        Commands::Init(args) => {
            pyrefine::infra::config::init(args, &ctx).map(|_| ExitCode::SUCCESS)
        }
        Commands::Completions(args) => {
            pyrefine::completion::run(args, &ctx).map(|_| ExitCode::SUCCESS)
        }
    }
}
