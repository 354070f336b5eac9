//! Command-line arguments for the feedback loop driver.

use std::path::PathBuf;

use clap::Parser;

fn iterations_in_range(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err("iterations must be between 1 and 5".to_string())
    }
}

/// Iterative text→image→text creative feedback loop.
#[derive(Debug, Parser)]
#[command(name = "driftloop", version, about)]
pub struct Cli {
    /// Initial prompt seeding the loop, e.g. "A cat playing piano"
    pub prompt: String,

    /// Number of iterations to run
    #[arg(short, long, default_value_t = 3, value_parser = iterations_in_range)]
    pub iterations: u32,

    /// Replicate API token (falls back to the configured environment variable)
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    pub replicate_token: Option<String>,

    /// Base URL of the local expansion endpoint
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Output directory for persisted prompts, descriptions, and images
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Path to a config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
