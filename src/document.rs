//! Document types
//!
//! A document moves through the pipeline in two shapes:
//! - `Document`: the full extracted text of one uploaded or downloaded file
//! - `Chunk`: an overlapping slice of that text, the unit that gets embedded

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Magic number at the start of every PDF file
const PDF_MAGIC: &[u8] = b"%PDF-";

/// File formats the loader can extract text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Portable Document Format
    Pdf,
    /// Plain text and Markdown
    Text,
    /// Office Open XML word processing document
    Docx,
}

impl DocumentKind {
    /// Get the string representation of the document kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
            DocumentKind::Docx => "docx",
        }
    }

    /// Map a file extension to a document kind
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "text" | "md" | "markdown" | "rst" | "csv" => Some(DocumentKind::Text),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }

    /// Map a MIME content type (parameters allowed) to a document kind
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        match mime.as_str() {
            "application/pdf" | "application/x-pdf" => Some(DocumentKind::Pdf),
            "text/plain" | "text/markdown" | "text/x-markdown" | "text/csv" => {
                Some(DocumentKind::Text)
            }
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentKind::Docx)
            }
            _ => None,
        }
    }

    /// Detect the kind of a file.
    ///
    /// The file name extension wins, then the content type, then the PDF
    /// magic number. Legacy `.doc` files are rejected explicitly.
    pub fn detect(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<Self> {
        let ext = extension_of(file_name);

        if let Some(ext) = ext {
            if ext.eq_ignore_ascii_case("doc") {
                return Err(Error::UnsupportedFile(format!(
                    "{} (legacy .doc files are not supported, save it as .docx)",
                    file_name
                )));
            }
            if let Some(kind) = Self::from_extension(ext) {
                return Ok(kind);
            }
        }

        if let Some(kind) = content_type.and_then(Self::from_content_type) {
            return Ok(kind);
        }

        if bytes.starts_with(PDF_MAGIC) {
            return Ok(DocumentKind::Pdf);
        }

        Err(Error::UnsupportedFile(file_name.to_string()))
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "text" | "txt" => Ok(DocumentKind::Text),
            "docx" => Ok(DocumentKind::Docx),
            _ => Err(Error::UnsupportedFile(s.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extension of the last path segment, if any
pub(crate) fn extension_of(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// The full text of a loaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name or URL the text came from
    pub source: String,
    pub kind: DocumentKind,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, kind: DocumentKind, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            text: text.into(),
        }
    }

    /// blake3 hash of the text, used to detect an already indexed document
    pub fn content_hash(&self) -> String {
        blake3::hash(self.text.as_bytes()).to_hex().to_string()
    }
}

/// A slice of a document produced by the splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based position in the document
    pub index: usize,
    pub content: String,
    pub source: String,
}

impl Chunk {
    pub fn new(index: usize, content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            index,
            content: content.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(DocumentKind::detect("report.PDF", None, b"").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("notes.md", None, b"").unwrap(), DocumentKind::Text);
        assert_eq!(DocumentKind::detect("dir/letter.docx", None, b"").unwrap(), DocumentKind::Docx);
    }

    #[test]
    fn test_detect_falls_back_to_content_type_and_magic() {
        let kind = DocumentKind::detect("download", Some("application/pdf; charset=binary"), b"").unwrap();
        assert_eq!(kind, DocumentKind::Pdf);

        let kind = DocumentKind::detect("blob", None, b"%PDF-1.7\n...").unwrap();
        assert_eq!(kind, DocumentKind::Pdf);
    }

    #[test]
    fn test_detect_rejects_doc_and_unknown() {
        assert!(matches!(
            DocumentKind::detect("old.doc", None, b""),
            Err(Error::UnsupportedFile(_))
        ));
        assert!(matches!(
            DocumentKind::detect("image.png", Some("image/png"), b"\x89PNG"),
            Err(Error::UnsupportedFile(_))
        ));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a/b/file.txt"), Some("txt"));
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = Document::new("a.txt", DocumentKind::Text, "hello");
        let b = Document::new("b.txt", DocumentKind::Text, "hello");
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), Document::new("a.txt", DocumentKind::Text, "bye").content_hash());
    }
}
