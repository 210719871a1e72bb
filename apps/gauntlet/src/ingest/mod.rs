// Source ingestion: the two input documents and the per-reviewer instruction files.
// Both collaborators only ever produce text or fail; the pipeline treats the text as opaque.

pub mod documents;
pub mod instructions;

pub use documents::load_document;
pub use instructions::{InstructionSet, InstructionStore};
