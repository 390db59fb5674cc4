use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::channel::{Channel, OpenAiBackend};
use crate::ai::tokens::TokenEstimator;
use crate::core::AppConfig;

pub mod constraints;
pub mod ping;
pub mod terminal;

#[derive(Subcommand)]
enum Command {
    /// Discover the input constraints of a function through a
    /// conversation with the LLM
    Constraints {
        /// What the function is for. Prompted for when not given.
        #[arg(long)]
        purpose: Option<String>,
        /// Consecutive malformed replies allowed before giving up
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_retries: Option<u32>,
        /// Only accept replies that are exactly one JSON object
        #[arg(long, action, default_value = "false")]
        strict: bool,
        /// Print the final constraints as JSON
        #[arg(long, action, default_value = "false")]
        json: bool,
    },
    /// Send a single prompt to the LLM and print the reply
    Ping {
        #[arg(long, default_value = "Write me a haiku about test-driven development.")]
        prompt: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Logs go to stderr so they don't get mixed into the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::default();

    // Handle each sub command
    match args.command {
        Some(Command::Constraints {
            purpose,
            max_retries,
            strict,
            json,
        }) => {
            if let Some(max_retries) = max_retries {
                config.max_retries = max_retries;
            }
            constraints::run(&config, purpose, strict, json).await?;
        }
        Some(Command::Ping { prompt }) => {
            ping::run(&config, &prompt).await?;
        }
        None => {}
    }

    Ok(())
}

/// Build a channel to the OpenAI compatible API described by
/// `config`.
pub fn openai_channel(config: &AppConfig) -> Result<Channel<OpenAiBackend>> {
    let backend = OpenAiBackend::new(
        &config.openai_api_hostname,
        &config.openai_api_key,
        &config.openai_model,
        config.completion_params,
    );
    let estimator = TokenEstimator::for_model(&config.openai_model)?;
    Ok(Channel::new(backend, estimator, config.token_budget))
}
