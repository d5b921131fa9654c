mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "audioclean=info,audioclean_core=info,audioclean_enhance=info",
        1 => "audioclean=debug,audioclean_core=debug,audioclean_enhance=debug",
        2 => "audioclean=trace,audioclean_core=trace,audioclean_enhance=trace",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Some(Commands::Enhance { files, options }) => {
            commands::enhance::run(&files, &options, cli.config.as_deref()).await
        }
        Some(Commands::Config) => commands::config::run(cli.config.as_deref()).await,
        None => {
            // Bare file list is treated as `enhance`
            if !cli.files.is_empty() {
                commands::enhance::run(&cli.files, &cli.options, cli.config.as_deref()).await
            } else {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                println!();
                Ok(())
            }
        }
    }
}
