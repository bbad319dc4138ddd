//! Text extraction for PDF, plain text and DOCX files

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::document::{Document, DocumentKind};
use crate::{Error, Result};

/// Path of the main body part inside a DOCX container
const DOCX_BODY: &str = "word/document.xml";

/// Extract the text of a file held in memory.
///
/// `source` is recorded on the document (file name or URL); `file_name` and
/// `content_type` drive format detection.
pub fn extract_document(
    source: &str,
    file_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<Document> {
    let kind = DocumentKind::detect(file_name, content_type, bytes)?;
    tracing::debug!("Extracting {} as {} ({} bytes)", source, kind, bytes.len());

    let text = match kind {
        DocumentKind::Pdf => extract_pdf(bytes)?,
        DocumentKind::Text => String::from_utf8_lossy(bytes).into_owned(),
        DocumentKind::Docx => extract_docx(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(Error::EmptyDocument(source.to_string()));
    }

    Ok(Document::new(source, kind, text))
}

/// Concatenated text of every page
pub fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed fonts and encodings
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::Extraction(format!("Failed to read PDF: {}", e))),
        Err(_) => Err(Error::Extraction("Failed to read PDF: parser panicked".to_string())),
    }
}

/// Paragraph text of a DOCX body, one paragraph per line
pub fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Extraction(format!("Not a valid DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| Error::Extraction(format!("DOCX is missing {}: {}", DOCX_BODY, e)))?
        .read_to_string(&mut xml)?;

    docx_xml_to_text(&xml)
}

fn docx_xml_to_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| Error::Extraction(format!("Malformed DOCX text: {}", e)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Extraction(format!(
                    "Malformed DOCX XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Build a minimal DOCX container around the given body XML
    pub(crate) fn docx_bytes(body: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file(DOCX_BODY, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Quarterly report</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Revenue </w:t></w:r><w:r><w:t>&amp; costs</w:t></w:r><w:r><w:tab/><w:t>up</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_extract_text_file() {
        let doc = extract_document("notes.txt", "notes.txt", None, b"hello\nworld").unwrap();
        assert_eq!(doc.kind, DocumentKind::Text);
        assert_eq!(doc.text, "hello\nworld");
        assert_eq!(doc.source, "notes.txt");
    }

    #[test]
    fn test_extract_docx_paragraphs() {
        let bytes = docx_bytes(BODY);
        let doc = extract_document("report.docx", "report.docx", None, &bytes).unwrap();

        assert_eq!(doc.kind, DocumentKind::Docx);
        assert_eq!(doc.text, "Quarterly report\nRevenue & costs\tup\n");
    }

    #[test]
    fn test_extract_docx_breaks_and_empty_paragraphs() {
        let body = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Dear reader,</w:t><w:br/><w:t>welcome</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>Signed</w:t></w:r></w:p>
</w:body></w:document>"#;
        let text = extract_docx(&docx_bytes(body)).unwrap();
        assert_eq!(text, "Dear reader,\nwelcome\n\nSigned\n");
    }

    #[test]
    fn test_blank_document_is_rejected() {
        let result = extract_document("blank.txt", "blank.txt", None, b"  \n\t ");
        assert!(matches!(result, Err(Error::EmptyDocument(_))));
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let result = extract_document("broken.pdf", "broken.pdf", None, b"%PDF-1.4 garbage");
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[test]
    fn test_invalid_docx_is_extraction_error() {
        let result = extract_document("broken.docx", "broken.docx", None, b"not a zip");
        assert!(matches!(result, Err(Error::Extraction(_))));
    }
}
