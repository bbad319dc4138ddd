//! Loaders - turn files, uploads and URLs into documents and chunks
//!
//! - `fetch`: download a file from an http(s) URL
//! - `extract`: PDF, text and DOCX text extraction
//! - `chunker`: fixed-size, overlap-based splitting

pub mod chunker;
pub mod extract;
pub mod fetch;

use std::path::Path;

pub use chunker::CharacterTextSplitter;
pub use extract::extract_document;
pub use fetch::{fetch_url, validate_url, FetchedFile};

use crate::document::Document;
use crate::Result;

/// Load a document from the local filesystem
pub fn load_path(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    extract_document(&file_name, &file_name, None, &bytes)
}

/// Load a document from an uploaded file
pub fn load_upload(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<Document> {
    extract_document(file_name, file_name, content_type, bytes)
}

/// Download and load a document of at most `max_bytes`; the URL becomes the
/// document source
pub async fn load_url(
    client: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> Result<(FetchedFile, Document)> {
    let fetched = fetch_url(client, url, max_bytes).await?;
    let document = extract_document(
        &fetched.url,
        &fetched.file_name,
        fetched.content_type.as_deref(),
        &fetched.bytes,
    )?;
    Ok((fetched, document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKind;

    #[test]
    fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.md");
        std::fs::write(&path, "# Guide\nStep one").unwrap();

        let doc = load_path(&path).unwrap();
        assert_eq!(doc.source, "guide.md");
        assert_eq!(doc.kind, DocumentKind::Text);
        assert_eq!(doc.text, "# Guide\nStep one");
    }

    #[test]
    fn test_load_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_path(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
