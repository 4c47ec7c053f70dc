//! Document text extraction
//!
//! Turns an uploaded file into study material. Only UTF-8 text formats are
//! read; binary formats are refused.

use crate::error::{Error, Result};
use std::path::Path;

/// Kind of uploaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// `.txt`
    PlainText,
    /// `.md`
    Markdown,
    /// `.csv`
    Csv,
    /// Anything else, with the extension or content type it was seen as
    Unsupported(String),
}

impl DocumentKind {
    /// Detect from a file name, falling back to the declared content type.
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Self {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("txt" | "text") => Self::PlainText,
            Some("md" | "markdown") => Self::Markdown,
            Some("csv") => Self::Csv,
            Some(other) => Self::Unsupported(other.to_string()),
            None => Self::from_content_type(content_type.unwrap_or("")),
        }
    }

    fn from_content_type(content_type: &str) -> Self {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        match mime.as_str() {
            "text/plain" => Self::PlainText,
            "text/markdown" => Self::Markdown,
            "text/csv" => Self::Csv,
            "" => Self::Unsupported("unknown".to_string()),
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// Extract UTF-8 text from `bytes`.
pub fn extract_text(bytes: &[u8], kind: &DocumentKind) -> Result<String> {
    if let DocumentKind::Unsupported(what) = kind {
        return Err(Error::InvalidInput(format!(
            "unsupported document type '{}', upload a .txt, .md or .csv file",
            what
        )));
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::InvalidInput("document is not valid UTF-8 text".to_string()))?;

    let text = text.replace("\r\n", "\n");
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput("document contains no text".to_string()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(DocumentKind::detect("notes.TXT", None), DocumentKind::PlainText);
        assert_eq!(DocumentKind::detect("README.md", None), DocumentKind::Markdown);
        assert_eq!(DocumentKind::detect("grades.csv", None), DocumentKind::Csv);
        assert_eq!(
            DocumentKind::detect("slides.pdf", Some("text/plain")),
            DocumentKind::Unsupported("pdf".to_string())
        );
    }

    #[test]
    fn test_detect_by_content_type() {
        assert_eq!(
            DocumentKind::detect("upload", Some("text/plain; charset=utf-8")),
            DocumentKind::PlainText
        );
        assert!(matches!(
            DocumentKind::detect("upload", None),
            DocumentKind::Unsupported(_)
        ));
    }

    #[test]
    fn test_extract_strips_bom_and_crlf() {
        let text = extract_text(b"\xEF\xBB\xBFline one\r\nline two\r\n", &DocumentKind::PlainText)
            .unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_extract_rejects_unsupported() {
        let err = extract_text(b"%PDF-1.7", &DocumentKind::Unsupported("pdf".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_extract_rejects_binary_and_empty() {
        assert!(extract_text(&[0xff, 0xfe, 0x00], &DocumentKind::Csv).is_err());
        assert!(extract_text(b"  \n ", &DocumentKind::Markdown).is_err());
    }
}
