// Section headers and builders for the user-side context sent with every call.
// Reviewer and synthesizer *instructions* live in the personas directory, not here.

pub const CALL_HEADER: &str = "=== SOLICITATION / CALL FOR PROPOSALS ===";
pub const PROPOSAL_HEADER: &str = "=== MY PROPOSAL ===";
pub const REVIEWS_HEADER: &str = "=== EXPERT REVIEWS ===";

/// One review as presented to the synthesizer.
#[derive(Debug, Clone, Copy)]
pub struct TaggedReview<'a> {
    pub reviewer_name: &'a str,
    pub variant: u32,
    pub temperature: f32,
    pub text: &'a str,
}

/// Labeled concatenation of the two source documents.
pub fn build_context(call_text: &str, proposal_text: &str) -> String {
    format!("{CALL_HEADER}\n{call_text}\n\n{PROPOSAL_HEADER}\n{proposal_text}\n")
}

/// Shared context followed by every review, each tagged with its reviewer,
/// run index and temperature.
pub fn build_synthesis_input(context: &str, reviews: &[TaggedReview<'_>]) -> String {
    let review_block = reviews
        .iter()
        .map(|r| {
            format!(
                "=== REVIEW BY {} (run {}, temp {:?}) ===\n{}",
                r.reviewer_name, r.variant, r.temperature, r.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{context}\n{REVIEWS_HEADER}\n{review_block}\n")
}
