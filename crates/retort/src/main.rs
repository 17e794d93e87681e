//! The `retort` command-line entry point.
//!
//! ```bash
//! retort --token "$DISCORD_TOKEN" --config rules.json --verbose
//! ```
//!
//! Flags take precedence over `retort.toml` and `RETORT_*` environment
//! variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use retort::discord::DiscordAdapter;
use retort::runtime::{RetortRuntime, RuntimeBuilder};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log everything that happens, including every rule check
    #[arg(short, long)]
    verbose: bool,

    /// Discord bot token
    #[arg(short, long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path of the JSON rules file [default: config.json]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path of the settings file (searched for as retort.toml when omitted)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Settings profile
    #[arg(short, long, env = "RETORT_PROFILE")]
    profile: Option<String>,
}

impl Cli {
    /// Turns the flags into settings overrides.
    fn runtime_builder(&self) -> RuntimeBuilder {
        let mut builder = RetortRuntime::builder();

        if let Some(path) = &self.settings {
            builder = builder.config_file(path);
        }
        if let Some(profile) = &self.profile {
            builder = builder.profile(profile);
        }
        if let Some(rules) = &self.config {
            builder = builder.set("rules", rules);
        }
        if let Some(token) = &self.token {
            builder = builder.set("adapters.discord.token", token);
        }
        if self.verbose {
            builder = builder.set("logging.level", "debug");
        }

        builder
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = cli
        .runtime_builder()
        .build()
        .context("failed to load settings and rules")?;

    runtime
        .register_adapter::<DiscordAdapter>()
        .await
        .context("failed to set up the Discord adapter")?;

    runtime.run().await?;
    info!("Goodbye");

    Ok(())
}
