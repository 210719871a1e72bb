//! `RUN_CONFIG.md`: a human-readable record of the run parameters.
//!
//! Write-only: nothing in the resume logic reads it back.

use crate::config::RunConfig;
use crate::errors::StoreError;
use crate::pipeline::roster::SLOT_SEPARATOR;
use crate::store::{ArtifactKey, ArtifactStore};

pub fn render_manifest(run: &RunConfig) -> String {
    let personas: Vec<&str> = run.reviewers.iter().map(|r| r.id.as_str()).collect();

    let mut lines = vec![
        "# Gauntlet Run Configuration".to_string(),
        String::new(),
        format!("- **Review model:** `{}`", run.review_model),
        format!("- **Synthesis model:** `{}`", run.synthesis_model),
        format!("- **Personas:** {}", personas.join(", ")),
        format!("- **Runs per persona:** {}", run.variant_count()),
        format!("- **Temperatures:** {:?}", run.temperatures),
        format!("- **Synthesis temperature:** {:?}", run.synthesis_temperature),
        format!(
            "- **Token budgets:** {} per review, {} per synthesis",
            run.review_max_tokens, run.synthesis_max_tokens
        ),
        format!("- **Total expert reviews:** {}", run.review_count()),
        format!("- **Total syntheses:** {}", run.synthesis_count()),
        String::new(),
        "## Temperature → run mapping".to_string(),
        String::new(),
    ];

    for (variant, temperature) in (1u32..).zip(&run.temperatures) {
        lines.push(format!("- `run_{variant}` → temperature **{temperature:?}**"));
    }

    let placeholders: Vec<String> = (0..run.reviewers.len()).map(slot_placeholder).collect();
    let pattern = run
        .reviewers
        .iter()
        .zip(&placeholders)
        .map(|(r, p)| format!("{}_{}", r.short, p))
        .collect::<Vec<_>>()
        .join(SLOT_SEPARATOR);
    let received = run
        .reviewers
        .iter()
        .zip(&placeholders)
        .map(|(r, p)| format!("{} `run_{}`", r.short, p))
        .collect::<Vec<_>>()
        .join(", ");

    lines.extend([
        String::new(),
        "## Synthesis folder naming".to_string(),
        String::new(),
        format!("`{pattern}` means the synthesiser received {received}."),
        String::new(),
        format!(
            "Each folder contains `SYNTHESIS.md` **plus** copies of the {} source",
            run.reviewers.len()
        ),
        "reviews that produced it, so no cross-referencing is needed.".to_string(),
        String::new(),
    ]);

    lines.join("\n")
}

pub fn write_manifest(store: &ArtifactStore, run: &RunConfig) -> Result<(), StoreError> {
    store.write(&ArtifactKey::Manifest, &render_manifest(run))
}

/// `<a>`, `<b>`, … for the first 26 slots, then `<v27>`, `<v28>`, …
fn slot_placeholder(slot: usize) -> String {
    match u8::try_from(slot) {
        Ok(i) if i < 26 => format!("<{}>", char::from(b'a' + i)),
        _ => format!("<v{}>", slot + 1),
    }
}
