//! Phase 1: expert reviews.
//!
//! Walks the reviewer × variant grid in order. A Valid stored review is reused
//! verbatim; anything else is generated, and a failed generation is persisted
//! as an error placeholder so the next invocation retries it.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::errors::GauntletError;
use crate::ingest::InstructionSet;
use crate::llm_client::{GenerationRequest, Generator};
use crate::store::{ArtifactKey, ArtifactStore};

/// Valid review texts by reviewer id, then variant index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafSet {
    texts: BTreeMap<String, BTreeMap<u32, String>>,
}

impl LeafSet {
    pub fn get(&self, reviewer: &str, variant: u32) -> Option<&str> {
        self.texts
            .get(reviewer)
            .and_then(|runs| runs.get(&variant))
            .map(String::as_str)
    }

    pub fn insert(&mut self, reviewer: &str, variant: u32, text: String) {
        self.texts
            .entry(reviewer.to_string())
            .or_default()
            .insert(variant, text);
    }

    pub fn len(&self) -> usize {
        self.texts.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-unit outcome counts for Phase 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewReport {
    pub cached: usize,
    pub generated: usize,
    pub failed: usize,
}

/// Runs (or resumes) every review. Only store I/O failures abort the phase.
pub async fn run_reviews(
    run: &RunConfig,
    store: &ArtifactStore,
    generator: &dyn Generator,
    instructions: &InstructionSet,
    context: &str,
) -> Result<(LeafSet, ReviewReport), GauntletError> {
    let mut leaves = LeafSet::default();
    let mut report = ReviewReport::default();

    for reviewer in &run.reviewers {
        let system = instructions.get(&reviewer.id).ok_or_else(|| {
            GauntletError::Setup(format!("no instructions loaded for '{}'", reviewer.id))
        })?;

        for (variant, &temperature) in (1u32..).zip(run.temperatures.iter()) {
            let key = ArtifactKey::review(&reviewer.id, variant);

            if store.status(&key)?.is_valid() {
                info!("[skip]    {:<20} run={}  (cached)", reviewer.id, variant);
                leaves.insert(&reviewer.id, variant, store.read(&key)?);
                report.cached += 1;
                continue;
            }

            info!(
                "[review]  {:<20} run={}  temp={:?}",
                reviewer.id, variant, temperature
            );
            let request = GenerationRequest {
                model: &run.review_model,
                instructions: system,
                context,
                temperature,
                max_tokens: run.review_max_tokens,
            };

            match generator.generate(request).await {
                Ok(text) => {
                    store.write(&key, &text)?;
                    info!(
                        "[done]    {:<20} run={}  ({} chars)",
                        reviewer.id,
                        variant,
                        text.len()
                    );
                    leaves.insert(&reviewer.id, variant, text);
                    report.generated += 1;
                }
                Err(e) => {
                    warn!("[failed]  {:<20} run={}  {}", reviewer.id, variant, e);
                    store.write_error(&key, &e.to_string())?;
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        "Phase 1 complete: {} cached, {} generated, {} failed ({} usable reviews)",
        report.cached,
        report.generated,
        report.failed,
        leaves.len()
    );
    Ok((leaves, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::roster::Reviewer;
    use crate::pipeline::testing::{capture_logs, ScriptedGenerator};
    use crate::store::ArtifactStatus;
    use tempfile::tempdir;

    fn abc_run() -> RunConfig {
        RunConfig {
            reviewers: vec![
                Reviewer::new("alice", "a"),
                Reviewer::new("bob", "b"),
                Reviewer::new("carol", "c"),
            ],
            ..RunConfig::default()
        }
    }

    fn instructions() -> InstructionSet {
        let mut set = InstructionSet::default();
        set.insert("alice", "Reviewer A");
        set.insert("bob", "Reviewer B");
        set.insert("carol", "Reviewer C");
        set
    }

    #[tokio::test]
    async fn test_generates_full_grid() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let generator = ScriptedGenerator::new();
        let run = abc_run();

        let (leaves, report) = run_reviews(&run, &store, &generator, &instructions(), "ctx")
            .await
            .unwrap();

        assert_eq!(generator.call_count(), 9);
        assert_eq!(
            report,
            ReviewReport {
                cached: 0,
                generated: 9,
                failed: 0
            }
        );
        assert_eq!(leaves.len(), 9);

        // Sequential, reviewer-major, ascending variant.
        let calls = generator.calls();
        assert_eq!(calls[0].instructions, "Reviewer A");
        assert_eq!(calls[0].temperature, 0.3);
        assert_eq!(calls[2].temperature, 1.0);
        assert_eq!(calls[3].instructions, "Reviewer B");
        assert!(calls.iter().all(|c| c.context == "ctx" && c.max_tokens == 4096));

        let stored = store.read(&ArtifactKey::review("bob", 2)).unwrap();
        assert_eq!(leaves.get("bob", 2), Some(stored.as_str()));
    }

    #[tokio::test]
    async fn test_resume_only_generates_missing_reviews() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let run = abc_run();

        let prepopulated = [("alice", 1), ("alice", 3), ("bob", 2), ("carol", 1), ("carol", 3)];
        for (reviewer, variant) in prepopulated {
            store
                .write(
                    &ArtifactKey::review(reviewer, variant),
                    &format!("hand-written {reviewer} {variant}"),
                )
                .unwrap();
        }

        let generator = ScriptedGenerator::new();
        let (leaves, report) = run_reviews(&run, &store, &generator, &instructions(), "ctx")
            .await
            .unwrap();

        assert_eq!(generator.call_count(), 4);
        assert_eq!(report.cached, 5);
        assert_eq!(report.generated, 4);
        for (reviewer, variant) in prepopulated {
            let expected = format!("hand-written {reviewer} {variant}");
            assert_eq!(
                store.read(&ArtifactKey::review(reviewer, variant)).unwrap(),
                expected
            );
            assert_eq!(leaves.get(reviewer, variant), Some(expected.as_str()));
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_persisted() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let run = abc_run();
        let generator = ScriptedGenerator::failing_when(|r| {
            r.instructions == "Reviewer B" && r.temperature == 0.7
        });

        let (leaves, report) = run_reviews(&run, &store, &generator, &instructions(), "ctx")
            .await
            .unwrap();

        assert_eq!(generator.call_count(), 9);
        assert_eq!(report.failed, 1);
        assert_eq!(report.generated, 8);
        assert_eq!(leaves.len(), 8);
        assert_eq!(leaves.get("bob", 2), None);

        let failed = ArtifactKey::review("bob", 2);
        assert_eq!(store.status(&failed).unwrap(), ArtifactStatus::Error);
        assert!(store.read(&failed).unwrap().contains("scripted rate limit"));

        for reviewer in ["alice", "bob", "carol"] {
            for variant in 1..=3 {
                if (reviewer, variant) != ("bob", 2) {
                    let key = ArtifactKey::review(reviewer, variant);
                    assert_eq!(store.status(&key).unwrap(), ArtifactStatus::Valid);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_error_placeholder_is_retried() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let run = abc_run();

        let flaky = ScriptedGenerator::failing_when(|r| r.instructions == "Reviewer C");
        run_reviews(&run, &store, &flaky, &instructions(), "ctx")
            .await
            .unwrap();

        let healthy = ScriptedGenerator::new();
        let (leaves, report) = run_reviews(&run, &store, &healthy, &instructions(), "ctx")
            .await
            .unwrap();

        assert_eq!(healthy.call_count(), 3);
        assert!(healthy.calls().iter().all(|c| c.instructions == "Reviewer C"));
        assert_eq!(report.cached, 6);
        assert_eq!(report.generated, 3);
        assert_eq!(leaves.len(), 9);
    }

    #[tokio::test]
    async fn test_missing_instructions_is_setup_error() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let generator = ScriptedGenerator::new();

        let result = run_reviews(
            &abc_run(),
            &store,
            &generator,
            &InstructionSet::default(),
            "ctx",
        )
        .await;

        assert!(matches!(result, Err(GauntletError::Setup(_))));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_is_logged_per_unit() {
        let (_guard, logs) = capture_logs();
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .write(&ArtifactKey::review("alice", 1), "cached review")
            .unwrap();
        let generator = ScriptedGenerator::failing_when(|r| r.instructions == "Reviewer C");

        run_reviews(&abc_run(), &store, &generator, &instructions(), "ctx")
            .await
            .unwrap();

        let output = logs.contents();
        assert!(output.contains("[skip]    alice"));
        assert!(output.contains("[review]  bob"));
        assert!(output.contains("[done]    bob                  run=2"));
        assert!(output.contains("[failed]  carol"));
    }
}
