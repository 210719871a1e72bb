use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::IngestError;

/// Leading literal that persona files may carry; stripped before use.
pub const SYSTEM_PROMPT_PREFIX: &str = "**System Prompt:**";

/// Directory of `<id>.md` instruction files.
#[derive(Debug, Clone)]
pub struct InstructionStore {
    dir: PathBuf,
}

impl InstructionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.md"))
    }

    /// Reads the instructions for `id`, trimmed and without the leading literal.
    pub fn load(&self, id: &str) -> Result<String, IngestError> {
        let path = self.path(id);
        if !path.is_file() {
            return Err(IngestError::NotFound(path));
        }
        let raw = fs::read_to_string(&path).map_err(|e| extraction(&path, e.to_string()))?;
        let text = strip_system_prompt_prefix(&raw);
        if text.is_empty() {
            return Err(extraction(&path, "instruction file is empty".to_string()));
        }
        debug!("Loaded instructions '{}' ({} chars)", id, text.len());
        Ok(text.to_string())
    }

    /// Loads every id up front so a missing file fails before any unit runs.
    pub fn load_all<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<InstructionSet, IngestError> {
        let mut by_id = HashMap::new();
        for id in ids {
            by_id.insert(id.to_string(), self.load(id)?);
        }
        Ok(InstructionSet { by_id })
    }
}

fn extraction(path: &Path, message: String) -> IngestError {
    IngestError::Extraction {
        path: path.to_path_buf(),
        message,
    }
}

/// Trims the text and drops a leading `**System Prompt:**` marker.
pub fn strip_system_prompt_prefix(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix(SYSTEM_PROMPT_PREFIX)
        .map(str::trim)
        .unwrap_or(text)
}

/// Instructions loaded for one run, keyed by reviewer (or synthesizer) id.
#[derive(Debug, Clone, Default)]
pub struct InstructionSet {
    by_id: HashMap<String, String>,
}

impl InstructionSet {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    #[cfg(test)]
    pub fn insert(&mut self, id: &str, text: &str) {
        self.by_id.insert(id.to_string(), text.to_string());
    }
}
