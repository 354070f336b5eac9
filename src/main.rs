use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use tokio::sync::mpsc;

use driftloop::cli::Cli;
use driftloop::config::Config;
use driftloop::domain::{ExpansionSource, LoopEvent, LoopSession, SessionOutcome};
use driftloop::engine::{CaptionAdapter, ExpansionAdapter, FeedbackEngine, SynthesisAdapter};
use driftloop::provider::replicate::{LLAMA3_MODEL, LLAVA_MODEL, STABLE_DIFFUSION_MODEL};
use driftloop::provider::{
    HttpImageFetcher, OllamaClient, ReplicateClient, ReplicateDiffusionModel, ReplicateTextModel,
    ReplicateVisionModel,
};
use driftloop::store::ArtifactStore;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("driftloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("driftloop.log");

    // Setup env_logger with file output so stdout stays clean for status
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Render engine events as they arrive.
async fn render_events(mut events: mpsc::Receiver<LoopEvent>, verbose: bool) {
    while let Some(event) = events.recv().await {
        match event {
            LoopEvent::IterationStarted { iteration } => {
                println!("\n{}", format!("── Iteration {} ──", iteration + 1).as_str().bold());
            }
            LoopEvent::Expanding => println!("{}", "Expanding the prompt...".cyan()),
            LoopEvent::Expanded { prompt, source } => {
                let via = match source {
                    ExpansionSource::Local => "locally",
                    ExpansionSource::Fallback => "via fallback",
                };
                println!("{} Prompt expanded {}", "✅".green(), via);
                if verbose {
                    println!("  {}", prompt.dimmed());
                }
            }
            LoopEvent::ExpansionFallback { reason } => {
                println!("{} Local expansion failed ({}), falling back...", "⚠️".yellow(), reason);
            }
            LoopEvent::ExpansionDegraded { reason } => {
                println!(
                    "{} Fallback expansion failed ({}), continuing with original prompt",
                    "⚠️".yellow(),
                    reason
                );
            }
            LoopEvent::Synthesizing => println!("{}", "Generating image from prompt...".cyan()),
            LoopEvent::ImageReady { path } => {
                println!("{} Image saved to {}", "✅".green(), path.display());
            }
            LoopEvent::SynthesisFailed { reason } => {
                println!("{} Image generation failed: {}", "❌".red(), reason);
            }
            LoopEvent::Captioning => println!("{}", "Describing the image...".cyan()),
            LoopEvent::Described { description } => {
                println!("{} Description generated", "✅".green());
                if verbose {
                    println!("  {}", description.dimmed());
                }
            }
            LoopEvent::CaptioningFailed { reason } => {
                println!("{} Image description failed: {}", "❌".red(), reason);
            }
            LoopEvent::ArtifactWriteFailed { category, reason } => {
                println!("{} Failed to save {:?} artifact: {}", "⚠️".yellow(), category, reason);
            }
            LoopEvent::IterationComplete { iteration } => {
                info!("Iteration {} complete", iteration);
            }
            LoopEvent::SessionComplete { iterations } => {
                println!(
                    "\n{}",
                    format!("Feedback loop complete after {} iterations!", iterations)
                        .as_str()
                        .green()
                        .bold()
                );
            }
            LoopEvent::SessionAborted { iteration, status } => {
                println!(
                    "\n{}",
                    format!("Loop stopped at iteration {} ({:?})", iteration + 1, status)
                        .as_str()
                        .red()
                        .bold()
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.ollama_url {
        config.ollama.base_url = url.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.storage.output_dir = dir.clone();
    }
    config.validate()?;

    // Configuration fault: the credential must exist before any provider
    // call is attempted.
    let token = cli
        .replicate_token
        .clone()
        .or_else(|| std::env::var(&config.replicate.api_token_env).ok())
        .ok_or_else(|| {
            eyre!(
                "Replicate API token not set; pass --replicate-token or set {}",
                config.replicate.api_token_env
            )
        })?;

    info!(
        "Starting session: {} iterations, prompt: {}",
        cli.iterations, cli.prompt
    );

    let store = Arc::new(ArtifactStore::open(&config.storage.output_dir)?);
    println!("Artifacts will be written under {}", store.root().display());

    let (events, receiver) = mpsc::channel(64);
    let renderer = tokio::spawn(render_events(receiver, cli.verbose));

    let ollama = Arc::new(OllamaClient::new(&config.ollama)?);
    let replicate = ReplicateClient::new(token, &config.replicate)?;
    let llama = Arc::new(ReplicateTextModel::new(replicate.clone(), LLAMA3_MODEL));
    let diffusion = Arc::new(ReplicateDiffusionModel::new(
        replicate.clone(),
        STABLE_DIFFUSION_MODEL,
    ));
    let vision = Arc::new(ReplicateVisionModel::new(replicate, LLAVA_MODEL));
    let fetcher = Arc::new(HttpImageFetcher::new(Duration::from_millis(
        config.replicate.timeout_ms,
    ))?);

    let engine = FeedbackEngine::new(
        ExpansionAdapter::new(ollama, llama, store.clone(), events.clone()),
        SynthesisAdapter::new(diffusion, fetcher, store.clone(), events.clone()),
        CaptionAdapter::new(vision, store, events.clone()),
        events,
    );

    let mut session = LoopSession::new(cli.prompt, cli.iterations);
    let outcome = engine.run_session(&mut session).await;

    // Close the channel so the renderer drains and exits.
    drop(engine);
    renderer.await.context("Event renderer failed")?;

    match outcome {
        SessionOutcome::Complete => Ok(()),
        SessionOutcome::Aborted { iteration, status } => Err(eyre!(
            "session aborted at iteration {} with status {:?}",
            iteration + 1,
            status
        )),
    }
}
