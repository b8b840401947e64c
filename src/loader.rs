//! Document loading and text extraction.
//!
//! The loader reads heterogeneous source files (PDF, plain text, DOCX) from a
//! folder and extracts one or more [`TextUnit`]s per file. PDF extraction is
//! per-page via `lopdf`, with a whole-document `pdf-extract` fallback when
//! structured extraction yields nothing. A file that cannot be parsed is
//! logged and skipped; loading continues for the remaining files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::{DocumentProperties, TextUnit, UNKNOWN_PROPERTY};
use crate::error::{RagError, Result};

/// File extensions the loader recognizes. Everything else is silently skipped.
const RECOGNIZED_EXTENSIONS: &[&str] = &["pdf", "txt", "docx"];

/// Loads source documents and extracts plain text per page or file.
///
/// # Example
///
/// ```rust,ignore
/// use semrag::DocumentLoader;
///
/// let loader = DocumentLoader::new().with_properties(true);
/// let units = loader.load_folder("data/corpus")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    enrich_properties: bool,
}

impl DocumentLoader {
    /// Create a loader that does not read document properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable PDF document-property enrichment (author, title,
    /// creation/modification dates). Missing properties default to the
    /// `"Unknown"` sentinel, never absence.
    pub fn with_properties(mut self, enrich: bool) -> Self {
        self.enrich_properties = enrich;
        self
    }

    /// Load every recognized file in a folder.
    ///
    /// Directory entries are visited in sorted filename order so runs are
    /// reproducible. Unrecognized extensions are skipped silently; files that
    /// fail to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] only if the folder itself cannot be read.
    pub fn load_folder(&self, folder: impl AsRef<Path>) -> Result<Vec<TextUnit>> {
        let folder = folder.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut units = Vec::new();
        for path in &paths {
            if !is_recognized(path) {
                debug!(path = %path.display(), "skipping unrecognized extension");
                continue;
            }
            match self.load_file(path) {
                Ok(file_units) => units.extend(file_units),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                }
            }
        }

        info!(folder = %folder.display(), unit_count = units.len(), "loaded folder");
        Ok(units)
    }

    /// Load a single file, dispatching on its extension.
    ///
    /// PDFs produce one [`TextUnit`] per page; txt and docx files produce a
    /// single unit.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LoadError`] for unsupported extensions or parse
    /// failures.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Vec<TextUnit>> {
        let path = path.as_ref();
        match extension_of(path).as_str() {
            "pdf" => self.load_pdf(path),
            "txt" => self.load_txt(path),
            "docx" => self.load_docx(path),
            other => Err(RagError::LoadError {
                path: path.display().to_string(),
                message: format!("unsupported extension '{other}'"),
            }),
        }
    }

    fn load_txt(&self, path: &Path) -> Result<Vec<TextUnit>> {
        let text = std::fs::read_to_string(path).map_err(|e| RagError::LoadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(vec![TextUnit::new(text, path.display().to_string())])
    }

    fn load_docx(&self, path: &Path) -> Result<Vec<TextUnit>> {
        let text = docx_lite::extract_text(path).map_err(|e| RagError::LoadError {
            path: path.display().to_string(),
            message: format!("docx extraction failed: {e}"),
        })?;
        Ok(vec![TextUnit::new(text, path.display().to_string())])
    }

    /// Extract a PDF page by page, falling back to whole-document extraction
    /// when structured extraction fails or yields no text at all.
    fn load_pdf(&self, path: &Path) -> Result<Vec<TextUnit>> {
        let properties = if self.enrich_properties {
            pdf_properties(path)
        } else {
            DocumentProperties::default()
        };

        match self.load_pdf_pages(path, &properties) {
            Ok(units) if !units.is_empty() => return Ok(units),
            Ok(_) => debug!(path = %path.display(), "per-page extraction empty, trying fallback"),
            Err(e) => debug!(path = %path.display(), error = %e, "per-page extraction failed, trying fallback"),
        }

        let text = pdf_extract::extract_text(path).map_err(|e| RagError::LoadError {
            path: path.display().to_string(),
            message: format!("pdf extraction failed: {e}"),
        })?;
        if text.trim().is_empty() {
            return Err(RagError::LoadError {
                path: path.display().to_string(),
                message: "pdf contains no extractable text".to_string(),
            });
        }
        debug!(path = %path.display(), chars = text.len(), "pdf extracted with whole-document fallback");

        let mut unit = TextUnit::new(text, path.display().to_string());
        unit.properties = properties;
        Ok(vec![unit])
    }

    fn load_pdf_pages(&self, path: &Path, properties: &DocumentProperties) -> Result<Vec<TextUnit>> {
        let doc = lopdf::Document::load(path).map_err(|e| RagError::LoadError {
            path: path.display().to_string(),
            message: format!("pdf parse failed: {e}"),
        })?;

        let mut units = Vec::new();
        for (page_number, _) in doc.get_pages() {
            let text = match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    debug!(path = %path.display(), page = page_number, error = %e, "page extraction failed");
                    continue;
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            let mut unit = TextUnit::new(text, path.display().to_string());
            unit.page = Some(page_number as usize);
            unit.properties = properties.clone();
            units.push(unit);
        }
        Ok(units)
    }
}

/// Read author/title/dates from the PDF Info dictionary.
///
/// Every failure path degrades to the `"Unknown"` sentinels; property
/// extraction never fails a load.
fn pdf_properties(path: &Path) -> DocumentProperties {
    let Ok(doc) = lopdf::Document::load(path) else {
        debug!(path = %path.display(), "failed to load pdf for properties");
        return DocumentProperties::default();
    };

    let info = match doc.trailer.get(b"Info") {
        Ok(info_ref) => match info_ref.as_reference() {
            Ok(ref_id) => doc.get_object(ref_id).ok(),
            Err(_) => None,
        },
        Err(_) => None,
    };

    let Some(lopdf::Object::Dictionary(info_dict)) = info else {
        debug!(path = %path.display(), "no Info dictionary in pdf");
        return DocumentProperties::default();
    };

    // Try UTF-8 first, then Latin-1.
    let get_string = |key: &[u8]| -> String {
        info_dict
            .get(key)
            .ok()
            .and_then(|obj| match obj {
                lopdf::Object::String(bytes, _) => String::from_utf8(bytes.clone())
                    .ok()
                    .or_else(|| Some(bytes.iter().map(|&b| b as char).collect())),
                _ => None,
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_PROPERTY.to_string())
    };

    DocumentProperties {
        author: get_string(b"Author"),
        title: get_string(b"Title"),
        creation_date: get_string(b"CreationDate"),
        modification_date: get_string(b"ModDate"),
    }
}

/// Write uploaded byte blobs into the corpus folder, creating it if needed.
///
/// This is the collaborator boundary for external upload handlers: stored
/// files become ordinary loader input on the next (re)index. Returns the
/// stored paths in input order.
///
/// # Errors
///
/// Returns [`RagError::Io`] if the folder cannot be created or a file cannot
/// be written.
pub fn stash_uploads(folder: impl AsRef<Path>, files: &[(String, Vec<u8>)]) -> Result<Vec<PathBuf>> {
    let folder = folder.as_ref();
    std::fs::create_dir_all(folder)?;

    let mut stored = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        let path = folder.join(name);
        std::fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "stashed upload");
        stored.push(path);
    }
    info!(folder = %folder.display(), count = stored.len(), "stashed uploads");
    Ok(stored)
}

fn extension_of(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).unwrap_or_default()
}

fn is_recognized(path: &Path) -> bool {
    RECOGNIZED_EXTENSIONS.contains(&extension_of(path).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert!(is_recognized(Path::new("a/b/REPORT.PDF")));
        assert!(is_recognized(Path::new("notes.Txt")));
        assert!(!is_recognized(Path::new("image.png")));
        assert!(!is_recognized(Path::new("no_extension")));
    }
}
