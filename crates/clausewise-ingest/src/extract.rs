//! Document text extraction (PDF, plain text).
//!
//! Callers supply bytes plus a declared format; this module returns the flat
//! contract text. Pages are joined with single newlines and the result is
//! trimmed. Undecodable bytes are dropped rather than failing the request.

use std::path::Path;

use clausewise_core::{Document, DocumentFormat, Error, Result};
use tracing::debug;

/// Extract text from bytes declared as `format`.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<Document> {
    let pages = match format {
        DocumentFormat::Pdf => extract_pdf_pages(bytes)?,
        DocumentFormat::PlainText => String::from_utf8_lossy(bytes)
            .split('\u{0C}')
            .map(str::to_string)
            .collect(),
    };

    let text = join_pages(&pages);
    if text.is_empty() {
        return Err(Error::Extraction(format!(
            "no extractable text in {} document",
            format
        )));
    }

    debug!("Extracted {} chars from {} bytes of {}", text.chars().count(), bytes.len(), format);
    Ok(Document::new(text))
}

/// Extract text from bytes declared by MIME type.
pub fn extract_declared(bytes: &[u8], content_type: &str) -> Result<Document> {
    let format = DocumentFormat::from_mime(content_type).ok_or_else(|| {
        Error::Extraction(format!("unsupported content-type: {}", content_type))
    })?;
    extract_text(bytes, format)
}

/// Read a file and extract its text, detecting format from the extension.
pub fn extract_file(path: &Path) -> Result<Document> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = DocumentFormat::from_extension(ext).ok_or_else(|| {
        Error::Extraction(format!("unsupported file type: {}", path.display()))
    })?;
    let bytes = std::fs::read(path)?;
    extract_text(&bytes, format)
}

/// One string per page; the extractor itself puts nothing between pages.
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>> {
    if bytes.is_empty() {
        return Err(Error::Extraction("empty PDF".into()));
    }
    pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::Extraction(format!("PDF extraction failed: {}", e)))
}

/// Drop control/replacement chars, trim each page, skip blank pages and
/// join the rest with single newlines.
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| {
            page.chars()
                .filter(|&c| c != '\u{FFFD}' && (!c.is_control() || matches!(c, '\n' | '\t')))
                .collect::<String>()
        })
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_bytes_fail() {
        let err = extract_text(b"", DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        let err = extract_text(b"", DocumentFormat::PlainText).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn test_invalid_pdf_fails() {
        let err = extract_text(b"not a pdf", DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn test_whitespace_only_text_fails() {
        let err = extract_text(b"  \n\n\t ", DocumentFormat::PlainText).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_plain_text_tolerates_invalid_utf8() {
        let bytes = b"Payment \xff\xfeis due.\x00";
        let doc = extract_text(bytes, DocumentFormat::PlainText).unwrap();
        assert_eq!(doc.text(), "Payment is due.");
    }

    #[test]
    fn test_pages_joined_with_single_newline() {
        let doc = extract_text(b"  Page one.  \x0cPage two.\n", DocumentFormat::PlainText).unwrap();
        assert_eq!(doc.text(), "Page one.\nPage two.");
    }

    fn two_page_pdf(first: &str, second: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in [first, second] {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_pages_joined_with_single_newline() {
        let bytes = two_page_pdf("First page ends here", "Second page starts");
        let doc = extract_text(&bytes, DocumentFormat::Pdf).unwrap();
        assert_eq!(doc.text(), "First page ends here\nSecond page starts");
    }

    #[test]
    fn test_unsupported_content_type() {
        let err = extract_declared(b"data", "application/octet-stream").unwrap_err();
        assert!(err.to_string().contains("unsupported content-type"));
    }

    #[test]
    fn test_extract_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "The Client shall pay $2,000 upon completion.").unwrap();
        let doc = extract_file(file.path()).unwrap();
        assert!(doc.text().starts_with("The Client shall pay"));

        let other = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        assert!(extract_file(other.path()).is_err());
    }
}
