use std::io;
use std::process::ExitCode;

use clap::Parser;
use gridviz_cli::cli::{Cli, Commands};
use gridviz_cli::commands;
use gridviz_cli::config::Settings;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(cli.log_level).into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.conf.as_deref())?;
    match &cli.command {
        Commands::Process(args) => {
            settings.apply_process_args(args);
            commands::process(&settings)
        }
        Commands::List(args) => {
            settings.apply_paths(args);
            commands::list(&settings)
        }
    }
}
