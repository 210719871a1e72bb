mod config;
mod errors;
mod ingest;
mod llm_client;
mod pipeline;
mod store;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, RunConfig};
use crate::errors::GauntletError;
use crate::ingest::{load_document, InstructionSet, InstructionStore};
use crate::llm_client::LlmClient;
use crate::pipeline::manifest::write_manifest;
use crate::pipeline::prompts::build_context;
use crate::pipeline::run_pipeline;
use crate::store::{ArtifactKey, ArtifactStore};

/// Everything a run needs, built before any unit of work executes.
struct Session {
    context: String,
    instructions: InstructionSet,
    llm: LlmClient,
    store: ArtifactStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing API key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gauntlet v{}", env!("CARGO_PKG_VERSION"));

    let run = RunConfig::default();
    let session = setup(&config, &run).context("Setup failed; no reviews were attempted")?;

    if session.store.exists(&ArtifactKey::Manifest) {
        info!("[setup]   Resuming from existing outputs in {}", session.store.root().display());
    }
    write_manifest(&session.store, &run)?;

    let summary = run_pipeline(
        &run,
        &session.store,
        &session.llm,
        &session.instructions,
        &session.context,
    )
    .await?;

    info!("[done]    outputs in {}", session.store.root().display());
    info!(
        "  expert_reviews/  {} cached, {} generated, {} failed  ({} personas x {} runs)",
        summary.reviews.cached,
        summary.reviews.generated,
        summary.reviews.failed,
        run.reviewers.len(),
        run.variant_count()
    );
    info!(
        "  syntheses/       {} cached, {} generated, {} failed, {} blocked  (of {})",
        summary.syntheses.cached,
        summary.syntheses.generated,
        summary.syntheses.failed,
        summary.syntheses.blocked,
        run.synthesis_count()
    );
    info!("  RUN_CONFIG.md    temperature and naming reference");

    Ok(())
}

/// Validates the run, loads both documents and every instruction file, and
/// builds the LLM client.
fn setup(config: &Config, run: &RunConfig) -> Result<Session, GauntletError> {
    run.validate()?;

    info!("[setup]   Loading documents from {}", config.base_dir.display());
    let call_text = load_document(&config.call_document)?;
    let proposal_text = load_document(&config.proposal_document)?;
    info!(
        "          {} chars (call) + {} chars (proposal)",
        call_text.len(),
        proposal_text.len()
    );

    let instructions =
        InstructionStore::new(&config.personas_dir).load_all(run.instruction_ids())?;

    let llm = LlmClient::new(config.anthropic_api_key.clone(), run.retry)?;
    info!(
        "LLM client initialized (model: {}, max attempts: {})",
        run.review_model,
        llm.retry_policy().max_attempts
    );

    Ok(Session {
        context: build_context(&call_text, &proposal_text),
        instructions,
        llm,
        store: ArtifactStore::new(&config.output_dir),
    })
}
