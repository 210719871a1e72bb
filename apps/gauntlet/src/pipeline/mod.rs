// Two-phase review pipeline.
// Phase 1 builds every (reviewer, variant) review; Phase 2 builds one synthesis per combo.
// Both phases run sequentially and resume from whatever the artifact store already holds.

pub mod manifest;
pub mod prompts;
pub mod reviews;
pub mod roster;
pub mod syntheses;

#[cfg(test)]
pub mod testing;

use tracing::info;

use crate::config::RunConfig;
use crate::errors::GauntletError;
use crate::ingest::InstructionSet;
use crate::llm_client::Generator;
use crate::store::ArtifactStore;

pub use reviews::{run_reviews, ReviewReport};
pub use syntheses::{run_syntheses, SynthesisReport};

/// Counts from both phases of one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub reviews: ReviewReport,
    pub syntheses: SynthesisReport,
}

/// Runs Phase 1 to completion, then Phase 2.
pub async fn run_pipeline(
    run: &RunConfig,
    store: &ArtifactStore,
    generator: &dyn Generator,
    instructions: &InstructionSet,
    context: &str,
) -> Result<PipelineSummary, GauntletError> {
    info!(
        "[phase 1] {} expert reviews  (sequential, idempotent)",
        run.review_count()
    );
    let (leaves, reviews) = run_reviews(run, store, generator, instructions, context).await?;

    info!(
        "[phase 2] {} syntheses       (sequential, idempotent)",
        run.synthesis_count()
    );
    let syntheses = run_syntheses(run, store, generator, instructions, context, &leaves).await?;

    Ok(PipelineSummary { reviews, syntheses })
}
