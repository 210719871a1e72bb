//! Phase 2: syntheses, one per combo of review variants.
//!
//! Each combo folder is self-contained: `SYNTHESIS.md` plus a copy of every
//! review it was built from. A combo is only generated when all of its source
//! reviews are currently Valid in the Phase 1 store.

use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::errors::GauntletError;
use crate::ingest::InstructionSet;
use crate::llm_client::{GenerationRequest, Generator};
use crate::pipeline::prompts::{build_synthesis_input, TaggedReview};
use crate::pipeline::reviews::LeafSet;
use crate::pipeline::roster::{enumerate_combos, Combo, Reviewer};
use crate::store::{ArtifactKey, ArtifactStore};

/// Per-combo outcome counts for Phase 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    pub cached: usize,
    pub generated: usize,
    pub failed: usize,
    /// Skipped because a source review is not Valid yet.
    pub blocked: usize,
}

/// One source review resolved for a combo.
struct SourceReview<'a> {
    reviewer: &'a Reviewer,
    variant: u32,
    temperature: f32,
    name: String,
    text: String,
}

/// Runs (or resumes) every synthesis. Only store I/O failures abort the phase.
pub async fn run_syntheses(
    run: &RunConfig,
    store: &ArtifactStore,
    generator: &dyn Generator,
    instructions: &InstructionSet,
    context: &str,
    leaves: &LeafSet,
) -> Result<SynthesisReport, GauntletError> {
    let system = instructions.get(&run.synthesizer).ok_or_else(|| {
        GauntletError::Setup(format!("no instructions loaded for '{}'", run.synthesizer))
    })?;
    let mut report = SynthesisReport::default();
    if leaves.is_empty() {
        debug!("No reviews carried over from Phase 1; reading sources from the store");
    }

    for combo in enumerate_combos(run.reviewers.len(), run.variant_count()) {
        let label = combo.label(&run.reviewers);

        if is_complete(run, store, &combo, &label)? {
            info!("[skip]    {}", label);
            warn_if_stale(run, store, &combo, &label)?;
            report.cached += 1;
            continue;
        }

        let waiting_on = unmet_dependencies(run, store, &combo)?;
        if !waiting_on.is_empty() {
            info!("[blocked] {}  (waiting on {})", label, waiting_on.join(", "));
            report.blocked += 1;
            continue;
        }

        let sources = resolve_sources(run, store, &combo, leaves)?;
        let tagged: Vec<TaggedReview<'_>> = sources
            .iter()
            .map(|s| TaggedReview {
                reviewer_name: &s.name,
                variant: s.variant,
                temperature: s.temperature,
                text: &s.text,
            })
            .collect();
        let input = build_synthesis_input(context, &tagged);

        info!("[synth]   {}", label);
        let request = GenerationRequest {
            model: &run.synthesis_model,
            instructions: system,
            context: &input,
            temperature: run.synthesis_temperature,
            max_tokens: run.synthesis_max_tokens,
        };

        let synthesis_key = ArtifactKey::synthesis(&label);
        match generator.generate(request).await {
            Ok(text) => {
                store.write(&synthesis_key, &text)?;
                for source in &sources {
                    // Copy the stored bytes as they are right now, overwriting older copies.
                    let leaf = ArtifactKey::review(&source.reviewer.id, source.variant);
                    let current = store.read_bytes(&leaf)?;
                    store.write_bytes(
                        &ArtifactKey::review_copy(&label, &source.reviewer.id),
                        &current,
                    )?;
                }
                info!("[done]    {}  ({} chars)", label, text.len());
                report.generated += 1;
            }
            Err(e) => {
                warn!("[failed]  {}  {}", label, e);
                if store.status(&synthesis_key)?.is_valid() {
                    warn!(
                        "[failed]  {}  replacing the previous synthesis with an error placeholder",
                        label
                    );
                }
                store.write_error(&synthesis_key, &e.to_string())?;
                report.failed += 1;
            }
        }
    }

    info!(
        "Phase 2 complete: {} cached, {} generated, {} failed, {} blocked",
        report.cached, report.generated, report.failed, report.blocked
    );
    Ok(report)
}

/// Synthesis and all of its review copies are Valid.
fn is_complete(
    run: &RunConfig,
    store: &ArtifactStore,
    combo: &Combo,
    label: &str,
) -> Result<bool, GauntletError> {
    if !store.status(&ArtifactKey::synthesis(label))?.is_valid() {
        return Ok(false);
    }
    for (reviewer, _) in combo.picks(&run.reviewers) {
        if !store
            .status(&ArtifactKey::review_copy(label, &reviewer.id))?
            .is_valid()
        {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `short_variant` of every source review that is not Valid in the review store.
fn unmet_dependencies(
    run: &RunConfig,
    store: &ArtifactStore,
    combo: &Combo,
) -> Result<Vec<String>, GauntletError> {
    let mut unmet = Vec::new();
    for (reviewer, variant) in combo.picks(&run.reviewers) {
        if !store
            .status(&ArtifactKey::review(&reviewer.id, variant))?
            .is_valid()
        {
            unmet.push(format!("{}_{}", reviewer.short, variant));
        }
    }
    Ok(unmet)
}

fn resolve_sources<'a>(
    run: &'a RunConfig,
    store: &ArtifactStore,
    combo: &Combo,
    leaves: &LeafSet,
) -> Result<Vec<SourceReview<'a>>, GauntletError> {
    let mut sources = Vec::with_capacity(run.reviewers.len());
    for (reviewer, variant) in combo.picks(&run.reviewers) {
        let temperature = run.temperature(variant).ok_or_else(|| {
            GauntletError::Setup(format!("variant {variant} has no temperature"))
        })?;
        let text = match leaves.get(&reviewer.id, variant) {
            Some(text) => text.to_string(),
            None => store.read(&ArtifactKey::review(&reviewer.id, variant))?,
        };
        sources.push(SourceReview {
            reviewer,
            variant,
            temperature,
            name: reviewer.display_name(),
            text,
        });
    }
    Ok(sources)
}

/// Cached combos are never rebuilt when their reviews change; flag the drift.
fn warn_if_stale(
    run: &RunConfig,
    store: &ArtifactStore,
    combo: &Combo,
    label: &str,
) -> Result<(), GauntletError> {
    for (reviewer, variant) in combo.picks(&run.reviewers) {
        let leaf = ArtifactKey::review(&reviewer.id, variant);
        if !store.status(&leaf)?.is_valid() {
            continue;
        }
        let copy = store.read_bytes(&ArtifactKey::review_copy(label, &reviewer.id))?;
        if copy != store.read_bytes(&leaf)? {
            warn!(
                "[stale]   {}  copy of {} run={} differs from the current review",
                label, reviewer.id, variant
            );
        }
    }
    Ok(())
}
