use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::IngestError;

/// Extracts plain text from a source document.
///
/// PDFs go through `pdf-extract`; anything else is read as UTF-8 text.
pub fn load_document(path: &Path) -> Result<String, IngestError> {
    if !path.is_file() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }

    let text = if is_pdf(path) {
        pdf_extract::extract_text(path).map_err(|e| IngestError::Extraction {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        fs::read_to_string(path).map_err(|e| IngestError::Extraction {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    if text.trim().is_empty() {
        return Err(IngestError::Extraction {
            path: path.to_path_buf(),
            message: "document contains no extractable text".to_string(),
        });
    }

    debug!("Loaded {} chars from {}", text.len(), path.display());
    Ok(text)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
