//! Artifact Store: filesystem-backed cache of review and synthesis text.
//!
//! Layout under the store root:
//!
//! ```text
//! RUN_CONFIG.md
//! expert_reviews/<reviewer>/run_<i>.md
//! syntheses/<combo_label>/SYNTHESIS.md
//! syntheses/<combo_label>/<reviewer>_review.md
//! ```
//!
//! Resume decisions in both phases go through `ArtifactStore::status`, which is
//! a pure function of (entry exists, entry starts with `ERROR_MARKER`).

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::StoreError;

/// Leading literal of every error placeholder.
pub const ERROR_MARKER: &str = "[ERROR";

const REVIEWS_DIR: &str = "expert_reviews";
const SYNTHESES_DIR: &str = "syntheses";
const SYNTHESIS_FILE: &str = "SYNTHESIS.md";
const MANIFEST_FILE: &str = "RUN_CONFIG.md";

/// Derived state of one stored unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    Absent,
    Error,
    Valid,
}

impl ArtifactStatus {
    pub fn is_valid(self) -> bool {
        self == ArtifactStatus::Valid
    }
}

/// Classifies stored content. `None` means the key has no entry.
///
/// Anything not starting with `ERROR_MARKER` is Valid, however malformed.
pub fn classify(content: Option<&[u8]>) -> ArtifactStatus {
    match content {
        None => ArtifactStatus::Absent,
        Some(bytes) if bytes.starts_with(ERROR_MARKER.as_bytes()) => ArtifactStatus::Error,
        Some(_) => ArtifactStatus::Valid,
    }
}

/// Builds the placeholder persisted when a unit fails.
pub fn error_placeholder(reason: &str) -> String {
    format!("{ERROR_MARKER}: {reason}]\n")
}

/// Deterministic key of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// Phase 1 leaf: one reviewer at one sampling variant.
    Review { reviewer: String, variant: u32 },
    /// Phase 2 synthesis for a combo label.
    Synthesis { label: String },
    /// Copy of a reviewer's leaf inside a combo folder.
    ReviewCopy { label: String, reviewer: String },
    /// Write-only run manifest.
    Manifest,
}

impl ArtifactKey {
    pub fn review(reviewer: &str, variant: u32) -> Self {
        ArtifactKey::Review {
            reviewer: reviewer.to_string(),
            variant,
        }
    }

    pub fn synthesis(label: &str) -> Self {
        ArtifactKey::Synthesis {
            label: label.to_string(),
        }
    }

    pub fn review_copy(label: &str, reviewer: &str) -> Self {
        ArtifactKey::ReviewCopy {
            label: label.to_string(),
            reviewer: reviewer.to_string(),
        }
    }

    /// Path relative to the store root.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            ArtifactKey::Review { reviewer, variant } => Path::new(REVIEWS_DIR)
                .join(reviewer)
                .join(format!("run_{variant}.md")),
            ArtifactKey::Synthesis { label } => {
                Path::new(SYNTHESES_DIR).join(label).join(SYNTHESIS_FILE)
            }
            ArtifactKey::ReviewCopy { label, reviewer } => Path::new(SYNTHESES_DIR)
                .join(label)
                .join(format!("{reviewer}_review.md")),
            ArtifactKey::Manifest => PathBuf::from(MANIFEST_FILE),
        }
    }
}

/// Single-writer, single-process store rooted at an output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    pub fn exists(&self, key: &ArtifactKey) -> bool {
        self.path(key).is_file()
    }

    pub fn status(&self, key: &ArtifactKey) -> Result<ArtifactStatus, StoreError> {
        let path = self.path(key);
        let mut file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ArtifactStatus::Absent),
            Err(e) => return Err(StoreError::io(path, e)),
        };

        // Only the leading bytes decide the status.
        let mut head = Vec::with_capacity(ERROR_MARKER.len());
        Read::by_ref(&mut file)
            .take(ERROR_MARKER.len() as u64)
            .read_to_end(&mut head)
            .map_err(|e| StoreError::io(&path, e))?;

        Ok(classify(Some(head.as_slice())))
    }

    /// Reads an entry as text. Bytes that are not UTF-8 are replaced, since a
    /// Valid entry may hold arbitrary content.
    pub fn read(&self, key: &ArtifactKey) -> Result<String, StoreError> {
        let bytes = self.read_bytes(key)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn read_bytes(&self, key: &ArtifactKey) -> Result<Vec<u8>, StoreError> {
        let path = self.path(key);
        fs::read(&path).map_err(|e| StoreError::io(path, e))
    }

    pub fn write(&self, key: &ArtifactKey, content: &str) -> Result<(), StoreError> {
        self.write_bytes(key, content.as_bytes())
    }

    /// Whole-blob overwrite. The content is written to a temporary file in the
    /// destination directory and renamed over the target, so readers never see
    /// a partially written entry.
    pub fn write_bytes(&self, key: &ArtifactKey, content: &[u8]) -> Result<(), StoreError> {
        let path = self.path(key);
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(content)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;
        Ok(())
    }

    /// Persists an error placeholder carrying `reason`.
    pub fn write_error(&self, key: &ArtifactKey, reason: &str) -> Result<(), StoreError> {
        self.write(key, &error_placeholder(reason))
    }
}
