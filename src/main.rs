//! Provider Fraud - Main Entry Point
//!
//! Batch CLI for the provider fraud feature pipeline and classifier.

use clap::Parser;
use provider_fraud::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provider_fraud=info".into()),
        )
        .init();

    cli::run(Cli::parse())
}
