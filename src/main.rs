//! imx93-build CLI
//!
//! Entry point for the imx93-build command-line application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use imx93_build::cli::output::display_error;
use imx93_build::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = cli.output();

    // RUST_LOG wins over -v/-q
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(output.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.run().await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
