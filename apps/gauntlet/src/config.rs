use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::errors::GauntletError;
use crate::llm_client::RetryPolicy;
use crate::pipeline::roster::Reviewer;

/// Model used for both the review and synthesis phases.
pub const DEFAULT_MODEL: &str = "claude-opus-4-5-20251101";

/// Environment-derived configuration: credentials and filesystem locations.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub base_dir: PathBuf,
    pub call_document: PathBuf,
    pub proposal_document: PathBuf,
    pub personas_dir: PathBuf,
    pub output_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let base_dir = std::env::var("GAUNTLET_BASE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            call_document: optional_path("GAUNTLET_CALL_DOC")
                .unwrap_or_else(|| base_dir.join("inputs").join("proposal_call.pdf")),
            proposal_document: optional_path("GAUNTLET_PROPOSAL_DOC")
                .unwrap_or_else(|| base_dir.join("inputs").join("my_proposal.pdf")),
            personas_dir: base_dir.join("personas"),
            output_dir: base_dir.join("outputs"),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            base_dir,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn optional_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Immutable parameters of one run, passed explicitly into both phases.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Reviewer order fixes combo label grammar and slot positions.
    pub reviewers: Vec<Reviewer>,
    /// `temperatures[i - 1]` is the sampling temperature of variant `i`.
    pub temperatures: Vec<f32>,
    pub review_model: String,
    pub synthesis_model: String,
    /// Instruction id loaded for the synthesizer.
    pub synthesizer: String,
    pub synthesis_temperature: f32,
    pub review_max_tokens: u32,
    pub synthesis_max_tokens: u32,
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            reviewers: vec![
                Reviewer::new("dr_silas_vane", "silas"),
                Reviewer::new("prof_amara_kito", "amara"),
                Reviewer::new("dr_julian_rex", "julian"),
            ],
            // Low → precise, mid → balanced, high → divergent.
            temperatures: vec![0.3, 0.7, 1.0],
            review_model: DEFAULT_MODEL.to_string(),
            synthesis_model: DEFAULT_MODEL.to_string(),
            synthesizer: "synthesizer".to_string(),
            // Diversity comes from which reviews are combined, not from sampling.
            synthesis_temperature: 0.5,
            review_max_tokens: 4096,
            synthesis_max_tokens: 8192,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Number of sampling variants per reviewer (R).
    pub fn variant_count(&self) -> u32 {
        self.temperatures.len() as u32
    }

    /// Temperature of a 1-based variant index.
    pub fn temperature(&self, variant: u32) -> Option<f32> {
        let index = usize::try_from(variant).ok()?.checked_sub(1)?;
        self.temperatures.get(index).copied()
    }

    /// P·R
    pub fn review_count(&self) -> usize {
        self.reviewers.len() * self.temperatures.len()
    }

    /// R^P
    pub fn synthesis_count(&self) -> usize {
        self.temperatures.len().pow(self.reviewers.len() as u32)
    }

    /// Every instruction id the run needs, reviewers first.
    pub fn instruction_ids(&self) -> Vec<&str> {
        self.reviewers
            .iter()
            .map(|r| r.id.as_str())
            .chain(std::iter::once(self.synthesizer.as_str()))
            .collect()
    }

    /// Checks the invariants the label grammar and variant table depend on.
    pub fn validate(&self) -> Result<(), GauntletError> {
        if self.reviewers.is_empty() {
            return Err(setup("reviewer roster is empty"));
        }
        if self.temperatures.is_empty() {
            return Err(setup("temperature table is empty"));
        }
        if let Some(t) = self
            .temperatures
            .iter()
            .chain(std::iter::once(&self.synthesis_temperature))
            .find(|t| !(0.0..=1.0).contains(*t))
        {
            return Err(setup(&format!("temperature {t} is outside [0.0, 1.0]")));
        }

        if !is_path_safe_id(&self.synthesizer) {
            return Err(setup(&format!(
                "synthesizer id '{}' must be non-empty lowercase ASCII letters, digits or '_'",
                self.synthesizer
            )));
        }

        let mut ids = HashSet::new();
        let mut shorts = HashSet::new();
        for reviewer in &self.reviewers {
            if !is_path_safe_id(&reviewer.id) {
                return Err(setup(&format!(
                    "reviewer id '{}' must be non-empty lowercase ASCII letters, digits or '_'",
                    reviewer.id
                )));
            }
            if !ids.insert(reviewer.id.as_str()) {
                return Err(setup(&format!("duplicate reviewer id '{}'", reviewer.id)));
            }
            let short_ok = !reviewer.short.is_empty()
                && reviewer
                    .short
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
            if !short_ok {
                return Err(setup(&format!(
                    "short code '{}' for '{}' must be non-empty lowercase ASCII letters or digits",
                    reviewer.short, reviewer.id
                )));
            }
            if !shorts.insert(reviewer.short.as_str()) {
                return Err(setup(&format!("duplicate short code '{}'", reviewer.short)));
            }
        }
        Ok(())
    }
}

/// Ids name files under `personas/` and `expert_reviews/`.
fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn setup(message: &str) -> GauntletError {
    GauntletError::Setup(format!("invalid run configuration: {message}"))
}
