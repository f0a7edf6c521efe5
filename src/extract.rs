//! Text extraction from uploaded email files.
//!
//! Uploads are spooled to uniquely named temp files (deleted when the
//! guard drops) and read back as either per-page PDF text or verbatim
//! UTF-8 plain text.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ExtractError;

/// Supported upload kinds, detected by filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.pdf` uploads, extracted page by page.
    Pdf,
    /// Everything else is read verbatim as UTF-8 text.
    Txt,
}

impl FileKind {
    /// Detect the kind from the uploaded filename. Only the `.pdf` suffix
    /// (any casing) selects PDF extraction.
    pub fn from_filename(name: &str) -> Self {
        if name.to_ascii_lowercase().ends_with(".pdf") {
            FileKind::Pdf
        } else {
            FileKind::Txt
        }
    }
}

/// Write uploaded bytes to a uniquely named temp file.
///
/// The returned guard removes the file when dropped, so the spooled
/// upload never outlives the request that carried it, even on error
/// paths. Unique random names mean concurrent uploads of the same
/// filename cannot collide.
pub fn spool_to_temp(bytes: &[u8]) -> Result<NamedTempFile, ExtractError> {
    let mut file = NamedTempFile::new()?;
    file.write_all(bytes)?;
    debug!(path = %file.path().display(), bytes = bytes.len(), "Spooled upload to temp file");
    Ok(file)
}

/// Extract the text content of a file of the given kind.
pub async fn extract_text(path: &Path, kind: FileKind) -> Result<String, ExtractError> {
    match kind {
        FileKind::Pdf => extract_pdf(path).await,
        FileKind::Txt => extract_txt(path).await,
    }
}

/// Read a plain-text file verbatim. Invalid UTF-8 is an error, not a
/// lossy conversion.
async fn extract_txt(path: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await?;
    String::from_utf8(bytes).map_err(|e| ExtractError::Encoding(e.to_string()))
}

/// Extract PDF text page by page, joined with newlines.
///
/// Pages with no extractable text contribute an empty segment, so page
/// positions survive in the joined output. Each page is trimmed of the
/// newline artifacts the extraction backend emits before and after its
/// text.
async fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let path = path.to_path_buf();

    // The PDF interpreter is CPU-bound and can panic on malformed files;
    // run it on a blocking thread and turn a panic into an error.
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&path))
        .await
        .map_err(|_| ExtractError::Pdf("extraction panicked (malformed file)".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    debug!(page_count = pages.len(), "PDF text extraction complete");

    Ok(pages
        .iter()
        .map(|page| page.trim())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Kind detection ──────────────────────────────────────────────

    #[test]
    fn pdf_suffix_selects_pdf_any_casing() {
        assert_eq!(FileKind::from_filename("email.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_filename("EMAIL.PDF"), FileKind::Pdf);
        assert_eq!(FileKind::from_filename("relatório.Pdf"), FileKind::Pdf);
    }

    #[test]
    fn everything_else_is_plain_text() {
        assert_eq!(FileKind::from_filename("email.txt"), FileKind::Txt);
        assert_eq!(FileKind::from_filename("mensagem"), FileKind::Txt);
        assert_eq!(FileKind::from_filename("nota.pdf.txt"), FileKind::Txt);
        assert_eq!(FileKind::from_filename(""), FileKind::Txt);
    }

    // ── Temp spool ──────────────────────────────────────────────────

    #[test]
    fn spool_writes_bytes_to_unique_paths() {
        let a = spool_to_temp(b"mesmo nome").unwrap();
        let b = spool_to_temp(b"mesmo nome").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"mesmo nome");
    }

    #[test]
    fn spooled_file_removed_on_drop() {
        let file = spool_to_temp("efêmero".as_bytes()).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    // ── Plain text ──────────────────────────────────────────────────

    #[tokio::test]
    async fn txt_content_is_read_verbatim() {
        let file = spool_to_temp("Olá mundo".as_bytes()).unwrap();
        let text = extract_text(file.path(), FileKind::Txt).await.unwrap();
        assert_eq!(text, "Olá mundo");
    }

    #[tokio::test]
    async fn txt_invalid_utf8_is_an_error() {
        let file = spool_to_temp(&[0x4f, 0x6c, 0xe1, 0x21]).unwrap();
        let err = extract_text(file.path(), FileKind::Txt).await.unwrap_err();
        assert!(matches!(err, ExtractError::Encoding(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = extract_text(Path::new("/nonexistent/upload"), FileKind::Txt)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    // ── PDF ─────────────────────────────────────────────────────────

    /// Assemble a minimal two-page PDF: page one draws `text`, page two
    /// has an empty content stream. Offsets in the xref table are computed
    /// while writing, so the file is well formed.
    fn build_two_page_pdf(text: &str) -> Vec<u8> {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let objects = [
            "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_string(),
            "2 0 obj\n<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>\nendobj\n".to_string(),
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 6 0 R >>\nendobj\n"
                .to_string(),
            "4 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n".to_string(),
            "5 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 7 0 R >>\nendobj\n"
                .to_string(),
            format!(
                "6 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                content.len(),
                content
            ),
            "7 0 obj\n<< /Length 0 >>\nstream\n\nendstream\nendobj\n".to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for object in &objects {
            offsets.push(pdf.len());
            pdf.extend_from_slice(object.as_bytes());
        }

        let xref_offset = pdf.len();
        let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in &offsets {
            trailer.push_str(&format!("{offset:010} 00000 n \n"));
        }
        trailer.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        ));
        pdf.extend_from_slice(trailer.as_bytes());
        pdf
    }

    #[tokio::test]
    async fn pdf_pages_join_with_newlines_and_empty_pages_survive() {
        let file = spool_to_temp(&build_two_page_pdf("Relatorio")).unwrap();
        let text = extract_text(file.path(), FileKind::Pdf).await.unwrap();

        let segments: Vec<&str> = text.split('\n').collect();
        assert_eq!(segments.len(), 2, "one segment per page: {text:?}");
        assert_eq!(segments[0], "Relatorio", "no backend artifacts around page text");
        assert_eq!(segments[1], "", "textless page keeps its position");
    }

    #[tokio::test]
    async fn corrupt_pdf_is_an_extraction_error() {
        let file = spool_to_temp(b"this is not a pdf at all").unwrap();
        let err = extract_text(file.path(), FileKind::Pdf).await.unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
